//! Fixed-topology stand-in for a consensus node
//!
//! The bootstrap node is the leader for its whole life; every joining node
//! is a follower pointing at the node it joined. There is no election, no
//! term and no log: followers simply refuse to serve and redirect.

use crate::client::Connection;
use crate::common::{Error, Result};
use crate::node::{ConsensusNode, NodeOptions};
use crate::protocol::{redirect_to, Reply};
use crate::testing::machine::LocalMachine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// Role of a fixture node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    Follower { leader_port: u16 },
}

/// Metadata persisted into the node's data directory
#[derive(Debug, Serialize, Deserialize)]
struct NodeMeta {
    port: u16,
    join: String,
    role: Role,
}

struct ServeState {
    port: u16,
    role: Role,
    machine: LocalMachine,
    /// Commands other than PING are refused until then
    leader_known_at: Instant,
}

pub struct LocalConsensus {
    port: u16,
    role: Role,
    server: Option<JoinHandle<()>>,
}

impl LocalConsensus {
    /// Bind `opts.listen_addr`, record the node in its data directory and
    /// start serving in the background.
    pub async fn open(
        opts: &NodeOptions,
        machine: LocalMachine,
        election_delay: Duration,
    ) -> Result<Self> {
        let role = if opts.is_bootstrap() {
            Role::Leader
        } else {
            let port = opts
                .join_addr
                .rsplit(':')
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| {
                    Error::InvalidConfig(format!("invalid join address: {}", opts.join_addr))
                })?;
            Role::Follower { leader_port: port }
        };

        let listener = TcpListener::bind(&opts.listen_addr).await?;
        let port = listener.local_addr()?.port();

        std::fs::create_dir_all(&opts.data_dir)?;
        let meta = NodeMeta {
            port,
            join: opts.join_addr.clone(),
            role,
        };
        std::fs::write(
            opts.data_dir.join("node.json"),
            serde_json::to_vec_pretty(&meta)?,
        )?;

        let state = Arc::new(ServeState {
            port,
            role,
            machine,
            leader_known_at: Instant::now() + election_delay,
        });
        let server = tokio::spawn(serve(listener, state));
        tracing::info!("Node {} listening as {:?}", port, role);

        Ok(Self {
            port,
            role,
            server: Some(server),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl ConsensusNode for LocalConsensus {
    fn close(&mut self) {
        // Aborting the accept loop drops its JoinSet, which aborts every
        // connection task with it.
        if let Some(server) = self.server.take() {
            server.abort();
            tracing::debug!("Node {} stopped serving", self.port);
        }
    }
}

impl Drop for LocalConsensus {
    fn drop(&mut self) {
        ConsensusNode::close(self);
    }
}

async fn serve(listener: TcpListener, state: Arc<ServeState>) {
    let mut conns = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::trace!("Node {} accepted {}", state.port, peer);
                    conns.spawn(handle_conn(stream, state.clone()));
                }
                Err(e) => tracing::warn!("Node {} accept error: {}", state.port, e),
            },
            Some(_) = conns.join_next() => {}
        }
    }
}

async fn handle_conn(stream: TcpStream, state: Arc<ServeState>) {
    let mut conn = Connection::from_stream(stream);
    loop {
        let reply = match conn.read_frame().await {
            Ok(Some(frame)) => state.dispatch(frame),
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Node {} dropping connection: {}", state.port, e);
                return;
            }
        };
        if conn.send_reply(&reply).await.is_err() || conn.flush().await.is_err() {
            return;
        }
    }
}

impl ServeState {
    fn dispatch(&self, frame: Reply) -> Reply {
        let Some((name, args)) = split_request(frame) else {
            return Reply::error("ERR Protocol error: expected array of bulk strings");
        };

        if name.eq_ignore_ascii_case("PING") {
            return self.machine.apply(&name, &args);
        }
        if Instant::now() < self.leader_known_at {
            return Reply::error("CLUSTERDOWN no leader elected");
        }
        match self.role {
            Role::Leader => self.machine.apply(&name, &args),
            Role::Follower { leader_port } => Reply::Error(redirect_to(leader_port)),
        }
    }
}

fn split_request(frame: Reply) -> Option<(String, Vec<Bytes>)> {
    let Reply::Array(items) = frame else {
        return None;
    };
    let mut parts = items.into_iter().map(|item| match item {
        Reply::Bulk(Some(payload)) => Some(payload),
        _ => None,
    });
    let name = parts.next()??;
    let args = parts.collect::<Option<Vec<_>>>()?;
    Some((String::from_utf8_lossy(&name).into_owned(), args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parts: &[&str]) -> Reply {
        Reply::Array(parts.iter().map(|p| Reply::bulk(p.to_string())).collect())
    }

    fn state(role: Role, delay: Duration) -> ServeState {
        ServeState {
            port: 1,
            role,
            machine: LocalMachine::new(),
            leader_known_at: Instant::now() + delay,
        }
    }

    #[tokio::test]
    async fn test_follower_redirects() {
        let s = state(Role::Follower { leader_port: 20001 }, Duration::ZERO);
        assert_eq!(
            s.dispatch(request(&["SET", "please", "allow"])),
            Reply::error("TRY 20001")
        );
        assert_eq!(s.dispatch(request(&["PING"])), Reply::Status("PONG".into()));
    }

    #[tokio::test]
    async fn test_leader_serves() {
        let s = state(Role::Leader, Duration::ZERO);
        assert_eq!(s.dispatch(request(&["SET", "k", "v"])), Reply::ok());
        assert_eq!(s.dispatch(request(&["GET", "k"])), Reply::bulk("v"));
    }

    #[tokio::test]
    async fn test_no_leader_during_election_delay() {
        let s = state(Role::Leader, Duration::from_secs(60));
        assert_eq!(
            s.dispatch(request(&["SET", "k", "v"])),
            Reply::error("CLUSTERDOWN no leader elected")
        );
    }

    #[test]
    fn test_split_request_rejects_non_arrays() {
        assert!(split_request(Reply::ok()).is_none());
        assert!(split_request(Reply::Array(vec![])).is_none());
        assert!(split_request(Reply::Array(vec![Reply::bulk("GET"), Reply::Integer(1)])).is_none());
        let (name, args) = split_request(request(&["GET", "k"])).unwrap();
        assert_eq!(name, "GET");
        assert_eq!(args, vec![Bytes::from("k")]);
    }
}
