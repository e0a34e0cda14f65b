//! Client side of the cluster
//!
//! - [`connection`]: pipelined RESP connection
//! - [`node`]: handle to one member, owning its connection and collaborators
//! - [`probe`]: startup synchronization for fresh members
//! - [`cluster`]: redirect-following router with sticky leader hint
//! - [`expect`]: reply normalization and expectation matching
//! - [`batch`]: scripted command/expectation sequences

pub mod batch;
pub mod cluster;
pub mod connection;
pub mod expect;
pub mod node;
pub mod probe;

pub use batch::Step;
pub use cluster::Cluster;
pub use connection::Connection;
pub use expect::{check, round, Expectation, Normalize, Value};
pub use node::NodeHandle;
