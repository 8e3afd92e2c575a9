use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of a node identifier: a UUID v7 in simple (unhyphenated) form.
pub const NODE_ID_LEN: usize = 32;

/// Opaque, immutable node identifier.
///
/// Generated from UUID v7 so identifiers sort by creation time while the
/// random tail keeps them unique within the same millisecond. Only
/// 32 lowercase hex characters are accepted when parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node identifier: {0:?}")]
pub struct InvalidNodeId(pub String);

impl NodeId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidNodeId> {
        let well_formed = raw.len() == NODE_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidNodeId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = InvalidNodeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = InvalidNodeId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
