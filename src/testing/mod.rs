//! In-process cluster fixture
//!
//! Stand-ins for the consensus node and state machine, wired to real TCP
//! listeners on localhost so the router can be exercised end to end.
//! Set `PRINTLOG=1` to see fixture and router logs while testing.

pub mod consensus;
pub mod machine;

pub use consensus::{LocalConsensus, Role};
pub use machine::LocalMachine;

use crate::client::{Cluster, NodeHandle};
use crate::common::{Config, Error, Result};
use crate::node::{data_dir_name, NodeOptions};
use rand::Rng;

/// How many random ports to try before giving up on a bind
const BIND_ATTEMPTS: usize = 8;

/// Install a log subscriber when `PRINTLOG=1`. Safe to call repeatedly.
pub fn init_tracing() {
    if std::env::var("PRINTLOG").as_deref() != Ok("1") {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvrouter=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Start one fixture node on a random port and wait until it is ready.
///
/// With `join` set the node joins (and redirects to) the member on that port.
pub async fn open_node(config: &Config, join: Option<u16>) -> Result<NodeHandle> {
    let local = &config.local;
    let join_addr = join
        .map(|p| format!("{}:{}", config.host, p))
        .unwrap_or_default();

    let mut attempt = 0;
    let (consensus, machine) = loop {
        attempt += 1;
        let port = rand::thread_rng().gen_range(local.port_min..local.port_max);
        let opts = NodeOptions {
            listen_addr: format!("{}:{}", config.host, port),
            join_addr: join_addr.clone(),
            data_dir: local
                .data_root
                .join(data_dir_name(&local.data_dir_prefix, port)),
        };
        let machine = LocalMachine::new();
        match LocalConsensus::open(&opts, machine.clone(), local.election_delay()).await {
            Ok(consensus) => break (consensus, machine),
            Err(Error::Io(e))
                if e.kind() == std::io::ErrorKind::AddrInUse && attempt < BIND_ATTEMPTS =>
            {
                tracing::debug!("Port {} in use, picking another", port);
            }
            Err(e) => return Err(e),
        }
    };

    let port = consensus.port();
    tracing::info!("Starting test server at port {}", port);
    let mut handle = NodeHandle::attach(
        config.host.clone(),
        port,
        join_addr,
        Box::new(consensus),
        Box::new(machine),
    );
    if let Err(e) = handle.wait_for_startup(&config.probe).await {
        tracing::warn!("Node {} failed to start: {}", port, e);
        handle.close();
        return Err(e);
    }
    Ok(handle)
}

/// Start `count` fixture nodes; every node after the first joins the first.
pub async fn open_cluster(count: usize, config: &Config) -> Result<Cluster> {
    if count == 0 {
        return Err(Error::InvalidConfig("cluster needs at least one node".into()));
    }
    tracing::info!("Starting Raft cluster of {} servers", count);

    let mut nodes: Vec<NodeHandle> = Vec::with_capacity(count);
    for _ in 0..count {
        let join = nodes.first().map(NodeHandle::port);
        match open_node(config, join).await {
            Ok(node) => nodes.push(node),
            Err(e) => {
                for node in nodes.iter_mut().rev() {
                    node.close();
                }
                return Err(e);
            }
        }
    }

    Ok(Cluster::new(nodes).with_max_redirects(config.max_redirects))
}
