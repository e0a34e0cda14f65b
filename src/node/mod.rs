//! Collaborator seam for cluster members
//!
//! A member is made of two opaque parts owned by its [`NodeHandle`]:
//! - a consensus node (Raft replication, leader election)
//! - a state machine (command application)
//!
//! Neither is implemented here. The traits only carry what teardown needs;
//! [`crate::testing`] provides in-process stand-ins.
//!
//! [`NodeHandle`]: crate::client::NodeHandle

use crate::common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The replication half of a cluster member
pub trait ConsensusNode: Send {
    /// Stop serving and release resources. Called last during teardown.
    fn close(&mut self);
}

/// The command-application half of a cluster member
pub trait StateMachine: Send {
    /// Release resources. Called before the consensus node is closed.
    fn close(&mut self);
}

/// Bootstrap parameters handed to the consensus node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOptions {
    /// Address to listen on, e.g. "127.0.0.1:20001"
    pub listen_addr: String,

    /// Address of an existing member to join; empty for the first node
    pub join_addr: String,

    /// Per-node persistent state directory
    pub data_dir: PathBuf,
}

impl NodeOptions {
    /// Is this the bootstrap (first) node of its cluster?
    pub fn is_bootstrap(&self) -> bool {
        self.join_addr.is_empty()
    }
}

/// Name of the data directory of the node listening on `port`
pub fn data_dir_name(prefix: &str, port: u16) -> String {
    format!("{}{}", prefix, port)
}

/// Remove every directory under `root` whose name starts with `prefix`.
///
/// Returns the number of directories removed.
pub fn cleanup_data_dirs(root: &Path, prefix: &str) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            std::fs::remove_dir_all(entry.path())?;
            removed += 1;
        }
    }
    tracing::info!("Cleanup: removed {} data directories under {}", removed, root.display());
    Ok(removed)
}
