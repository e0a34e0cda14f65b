//! Cluster router: follows leader redirects transparently
//!
//! Followers answer commands with `TRY <port>` instead of serving them. The
//! router chases that pointer until a non-redirect outcome is reached and
//! remembers the member it last talked to, so later calls usually go
//! straight to the leader.

use crate::client::node::NodeHandle;
use crate::common::{Error, Result};
use crate::protocol::{parse_redirect, Command, Reply};
use rand::Rng;

pub struct Cluster {
    nodes: Vec<NodeHandle>,
    /// Sticky routing hint, always an index into `nodes`
    current: Option<usize>,
    max_redirects: Option<usize>,
}

impl Cluster {
    pub fn new(nodes: Vec<NodeHandle>) -> Self {
        Self {
            nodes,
            current: None,
            max_redirects: None,
        }
    }

    /// Give up after `max` redirect hops instead of chasing forever
    pub fn with_max_redirects(mut self, max: Option<usize>) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    /// Direct access to one member, bypassing redirect handling
    pub fn node_mut(&mut self, index: usize) -> Option<&mut NodeHandle> {
        self.nodes.get_mut(index)
    }

    /// The member the router last dispatched to
    pub fn current(&self) -> Option<&NodeHandle> {
        self.current.map(|i| &self.nodes[i])
    }

    /// Index of the member listening on `port`
    pub fn node_for_port(&self, port: u16) -> Option<usize> {
        self.nodes.iter().position(|n| n.port() == port)
    }

    /// Drop the sticky member's connection and forget it
    pub fn reset_conn(&mut self) {
        if let Some(i) = self.current.take() {
            self.nodes[i].reset_conn();
        }
    }

    /// Run `cmd` on the leader, following redirects.
    ///
    /// Transport failures propagate immediately. Error replies other than
    /// redirects are returned as `Reply::Error`.
    pub async fn execute(&mut self, cmd: Command) -> Result<Reply> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyCluster);
        }
        let start = match self.current {
            Some(i) => i,
            None => rand::thread_rng().gen_range(0..self.nodes.len()),
        };
        self.execute_from(start, cmd).await
    }

    /// Like [`Cluster::execute`], but start at member `start` instead of the
    /// sticky one
    pub async fn execute_from(&mut self, start: usize, cmd: Command) -> Result<Reply> {
        if start >= self.nodes.len() {
            return Err(Error::Other(format!(
                "no member at index {} (cluster of {})",
                start,
                self.nodes.len()
            )));
        }
        let mut index = start;
        let mut hops = 0;

        loop {
            self.current = Some(index);
            let reply = self.nodes[index].execute(cmd.clone()).await?;

            let Some(redirect) = reply.as_error().and_then(parse_redirect) else {
                return Ok(reply);
            };
            let port = redirect?;

            hops += 1;
            if let Some(max) = self.max_redirects {
                if hops > max {
                    return Err(Error::TooManyRedirects(max));
                }
            }

            tracing::debug!(
                "{} redirected from {} to {}",
                cmd.name(),
                self.nodes[index].port(),
                port
            );
            index = self.node_for_port(port).ok_or(Error::UnknownNode(port))?;
        }
    }

    /// Close every member
    pub fn close(&mut self) {
        self.current = None;
        for node in &mut self.nodes {
            node.close();
        }
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("nodes", &self.nodes)
            .field("current", &self.current().map(NodeHandle::port))
            .finish()
    }
}
