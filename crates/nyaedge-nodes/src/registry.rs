//! Node registry: durable node identity records keyed by [`NodeId`].
//!
//! The secret of a node is readable only inside this crate. Public reads
//! return a [`NodeView`]; the full [`Node`] (with secret) leaves the
//! crate exactly once, from [`NodeRegistry::create_node`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use nyaedge_common::id::NodeId;
use nyaedge_common::persist;
use nyaedge_crypto::random::{generate_secret, OsRandomSource, RandomStringSource};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::NodeError;

// ── Records ─────────────────────────────────────────────────────────

/// Shared secret between the control plane and one node.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSecret(String);

impl NodeSecret {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for NodeSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeSecret(<redacted>)")
    }
}

impl Drop for NodeSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A registered edge node as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub secret: NodeSecret,
    pub name: String,
    /// Empty until an activation handshake succeeds.
    #[serde(default)]
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

/// Read-side projection of a node, without its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Node> for NodeView {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            endpoint: node.endpoint.clone(),
            created_at: node.created_at,
        }
    }
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(String),

    #[error("node store lock poisoned")]
    Poisoned,

    #[error("duplicate node id: {0}")]
    Duplicate(NodeId),
}

/// Backing store for node records.
///
/// Implementations serialize writes internally; each call is atomic with
/// respect to the record it touches.
pub trait NodeStore: Send + Sync {
    /// Persist a new record. Fails with [`StoreError::Duplicate`] if the id exists.
    fn insert(&self, node: Node) -> Result<(), StoreError>;

    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError>;

    /// Set the endpoint of an existing record. Returns `false` if absent.
    fn update_endpoint(&self, id: &NodeId, endpoint: &str) -> Result<bool, StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Poisoned)
}

/// Volatile store for tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<HashMap<NodeId, Node>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeStore for MemoryStore {
    fn insert(&self, node: Node) -> Result<(), StoreError> {
        let mut nodes = lock(&self.nodes)?;
        if nodes.contains_key(&node.id) {
            return Err(StoreError::Duplicate(node.id.clone()));
        }
        nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        Ok(lock(&self.nodes)?.get(id).cloned())
    }

    fn update_endpoint(&self, id: &NodeId, endpoint: &str) -> Result<bool, StoreError> {
        let mut nodes = lock(&self.nodes)?;
        match nodes.get_mut(id) {
            Some(node) => {
                node.endpoint = endpoint.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeFile {
    #[serde(default)]
    nodes: Vec<Node>,
}

/// Store persisted as a single JSON document (`{"nodes": [...]}`).
///
/// Every mutation rewrites the file atomically while holding the lock.
/// If the write fails the in-memory map is rolled back, so memory and
/// disk never diverge.
pub struct JsonFileStore {
    path: PathBuf,
    nodes: Mutex<BTreeMap<NodeId, Node>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file: NodeFile = persist::read_json_or_default(&path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
        let nodes = file
            .nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<BTreeMap<_, _>>();
        tracing::debug!(path = %path.display(), count = nodes.len(), "Node store opened");
        Ok(Self {
            path,
            nodes: Mutex::new(nodes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, nodes: &BTreeMap<NodeId, Node>) -> Result<(), StoreError> {
        let file = NodeFile {
            nodes: nodes.values().cloned().collect(),
        };
        // Node secrets live in this file; it is owner-only from creation.
        persist::write_json_private(&self.path, &file)
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.path.display())))
    }
}

impl NodeStore for JsonFileStore {
    fn insert(&self, node: Node) -> Result<(), StoreError> {
        let mut nodes = lock(&self.nodes)?;
        if nodes.contains_key(&node.id) {
            return Err(StoreError::Duplicate(node.id.clone()));
        }
        let id = node.id.clone();
        nodes.insert(id.clone(), node);
        if let Err(e) = self.persist(&nodes) {
            nodes.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        Ok(lock(&self.nodes)?.get(id).cloned())
    }

    fn update_endpoint(&self, id: &NodeId, endpoint: &str) -> Result<bool, StoreError> {
        let mut nodes = lock(&self.nodes)?;
        let Some(node) = nodes.get_mut(id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut node.endpoint, endpoint.to_string());
        if let Err(e) = self.persist(&nodes) {
            if let Some(node) = nodes.get_mut(id) {
                node.endpoint = previous;
            }
            return Err(e);
        }
        Ok(true)
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Create/read/update operations over a [`NodeStore`].
#[derive(Clone)]
pub struct NodeRegistry {
    store: Arc<dyn NodeStore>,
    random: Arc<dyn RandomStringSource>,
}

impl NodeRegistry {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self::with_random(store, Arc::new(OsRandomSource))
    }

    pub fn with_random(store: Arc<dyn NodeStore>, random: Arc<dyn RandomStringSource>) -> Self {
        Self { store, random }
    }

    /// Register a new node. The returned record is the only place its
    /// secret is ever handed out.
    pub fn create_node(&self, name: &str) -> Result<Node, NodeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NodeError::Validation("name is required".into()));
        }
        if name.chars().any(char::is_control) {
            return Err(NodeError::Validation(
                "name must not contain control characters".into(),
            ));
        }

        let node = Node {
            id: NodeId::generate(),
            secret: NodeSecret::new(generate_secret(self.random.as_ref())),
            name: name.to_string(),
            endpoint: String::new(),
            created_at: Utc::now(),
        };
        self.store.insert(node.clone())?;
        Ok(node)
    }

    /// Public read: the node without its secret.
    pub fn get_node(&self, id: &str) -> Result<NodeView, NodeError> {
        self.load(id).map(|node| NodeView::from(&node))
    }

    /// Crate-internal read including the secret, for the handshakes.
    pub(crate) fn load(&self, id: &str) -> Result<Node, NodeError> {
        let node_id = NodeId::parse(id)?;
        self.store
            .get(&node_id)?
            .ok_or_else(|| NodeError::NotFound(id.to_string()))
    }

    /// Set a node's endpoint. Re-setting the same value is a no-op.
    pub fn update_endpoint(&self, id: &str, endpoint: &str) -> Result<(), NodeError> {
        let node_id = NodeId::parse(id)?;
        if self.store.update_endpoint(&node_id, endpoint)? {
            Ok(())
        } else {
            Err(NodeError::NotFound(id.to_string()))
        }
    }
}
