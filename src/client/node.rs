//! Handle to one cluster member

use crate::client::connection::Connection;
use crate::common::{Error, Result};
use crate::node::{ConsensusNode, StateMachine};
use crate::protocol::{Command, Reply};

/// One cluster member: its address, its collaborators and at most one
/// lazily-opened connection.
pub struct NodeHandle {
    host: String,
    port: u16,
    join: String,
    consensus: Option<Box<dyn ConsensusNode>>,
    machine: Option<Box<dyn StateMachine>>,
    conn: Option<Connection>,
}

impl NodeHandle {
    /// Handle owning a locally running member
    pub fn attach(
        host: impl Into<String>,
        port: u16,
        join: impl Into<String>,
        consensus: Box<dyn ConsensusNode>,
        machine: Box<dyn StateMachine>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            join: join.into(),
            consensus: Some(consensus),
            machine: Some(machine),
            conn: None,
        }
    }

    /// Handle to a member running elsewhere; only the connection is owned
    pub fn remote(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            join: String::new(),
            consensus: None,
            machine: None,
            conn: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Join address; empty for the bootstrap node
    pub fn join(&self) -> &str {
        &self.join
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Send all commands, flush once, then read one reply per command.
    ///
    /// Opening, writing or flushing failures abort the whole call. A failure
    /// while reading lands in that command's slot only.
    pub async fn pipeline(&mut self, cmds: &[Command]) -> Result<Vec<Result<Reply>>> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                tracing::debug!("Dialing node {}", self.addr());
                Connection::open(&self.addr()).await?
            }
        };
        let conn = self.conn.insert(conn);

        for cmd in cmds {
            conn.send(cmd).await?;
        }
        conn.flush().await?;

        let mut replies = Vec::with_capacity(cmds.len());
        for _ in cmds {
            replies.push(conn.receive().await);
        }
        Ok(replies)
    }

    /// Run a single command
    pub async fn execute(&mut self, cmd: Command) -> Result<Reply> {
        let mut replies = self.pipeline(std::slice::from_ref(&cmd)).await?;
        if replies.len() != 1 {
            return Err(Error::ResponseCount {
                expected: 1,
                actual: replies.len(),
            });
        }
        replies.remove(0)
    }

    /// Drop the connection; the next call dials again
    pub fn reset_conn(&mut self) {
        self.conn = None;
    }

    /// Tear down: connection, then state machine, then consensus node
    pub fn close(&mut self) {
        self.conn = None;
        if let Some(mut machine) = self.machine.take() {
            machine.close();
        }
        if let Some(mut consensus) = self.consensus.take() {
            consensus.close();
            tracing::info!("Closed node {}", self.port);
        }
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("addr", &self.addr())
            .field("join", &self.join)
            .field("connected", &self.is_connected())
            .finish()
    }
}
