//! # kvrouter
//!
//! Leader-redirect-transparent client for a Raft-replicated key-value store
//! speaking the Redis wire protocol (RESP):
//! - Sticky leader routing, following `TRY <port>` redirects from followers
//! - Pipelined command dispatch over one connection per member
//! - Reply normalization and expectation matching for tests
//! - Startup probe synchronizing with freshly bootstrapped members
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ Batch runner │───▶│  Cluster router  │───▶│ Node handle  │── RESP ──▶ member
//! └──────┬───────┘    │ (sticky leader,  │    │ (pipelined   │
//!        │            │  TRY redirects)  │    │  connection) │
//!        ▼            └──────────────────┘    └──────────────┘
//! ┌──────────────┐
//! │ Normalizer + │
//! │   matcher    │
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use kvrouter::client::{Expectation, Step};
//! use kvrouter::protocol::Command;
//! use kvrouter::{testing, Config};
//!
//! # async fn run() -> kvrouter::Result<()> {
//! let config = Config::default();
//! let mut cluster = testing::open_cluster(3, &config).await?;
//! cluster
//!     .run_batch(vec![
//!         Step::expect(Command::new("SET").arg("please").arg("allow"), "OK"),
//!         Step::expect(Command::new("GET").arg("please"), "allow"),
//!         Step::expect(Command::new("GET").arg("missing"), Expectation::nil()),
//!     ])
//!     .await?;
//! cluster.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod node;
pub mod protocol;
pub mod testing;

// Re-export commonly used types
pub use client::{Cluster, NodeHandle};
pub use common::{Config, Error, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
