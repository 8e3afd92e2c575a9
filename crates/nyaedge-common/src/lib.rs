//! Nyaedge Common: types shared by every nyaedge crate.
//!
//! Wire error codes, node identifiers, data-directory paths and the
//! atomic JSON persistence used by the node registry.

pub mod error;
pub mod id;
pub mod paths;
pub mod persist;
