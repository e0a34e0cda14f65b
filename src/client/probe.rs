//! Startup probe: wait until a fresh member is correctly placed in the
//! cluster before using it.
//!
//! - bootstrap node: a throwaway write and delete must both succeed
//! - joining node: the same write must be refused with a leader redirect

use crate::client::node::NodeHandle;
use crate::common::{Error, ProbeConfig, Result};
use crate::protocol::{is_redirect, Command, Reply};
use tokio::time::{sleep, Instant};

/// Result of one probe tick
enum Tick {
    Ready,
    Probing(Error),
}

impl NodeHandle {
    /// Poll the node every `interval` until it is ready or `timeout` elapses.
    ///
    /// On timeout returns the last error observed, or [`Error::StartupTimeout`]
    /// when none was.
    pub async fn wait_for_startup(&mut self, config: &ProbeConfig) -> Result<()> {
        let start = Instant::now();
        let mut last_err: Option<Error> = None;
        loop {
            if start.elapsed() >= config.timeout() {
                return Err(last_err.unwrap_or(Error::StartupTimeout));
            }

            let tick = if self.join().is_empty() {
                self.probe_leader(config).await
            } else {
                self.probe_follower(config).await
            };
            match tick {
                Tick::Ready => {
                    tracing::debug!("Node {} ready after {:?}", self.port(), start.elapsed());
                    return Ok(());
                }
                Tick::Probing(err) => {
                    tracing::trace!("Node {} not ready: {}", self.port(), err);
                    last_err = Some(err);
                }
            }

            sleep(config.interval()).await;
        }
    }

    async fn probe_leader(&mut self, config: &ProbeConfig) -> Tick {
        let set = Command::new("SET").arg(config.key.as_str()).arg(config.value.as_str());
        match self.execute(set).await {
            Err(e) => return Tick::Probing(e),
            Ok(Reply::Error(text)) => return Tick::Probing(Error::Server(text)),
            Ok(Reply::Status(s)) if s == "OK" => {}
            Ok(_) => return Tick::Probing(Error::Other("not OK".into())),
        }

        match self.execute(Command::new("DEL").arg(config.key.as_str())).await {
            Err(e) => Tick::Probing(e),
            Ok(Reply::Error(text)) => Tick::Probing(Error::Server(text)),
            Ok(Reply::Integer(1)) => Tick::Ready,
            Ok(_) => Tick::Probing(Error::Other("not 1".into())),
        }
    }

    async fn probe_follower(&mut self, config: &ProbeConfig) -> Tick {
        let set = Command::new("SET").arg(config.key.as_str()).arg(config.value.as_str());
        match self.execute(set).await {
            Err(e) => Tick::Probing(e),
            Ok(Reply::Error(text)) if is_redirect(&text) => Tick::Ready,
            Ok(Reply::Error(text)) => Tick::Probing(Error::Server(text)),
            Ok(_) => Tick::Probing(Error::Other("not TRY".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_timeout_is_generic_timeout() {
        let mut handle = NodeHandle::remote("127.0.0.1", 1);
        let config = ProbeConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        let err = handle.wait_for_startup(&config).await.unwrap_err();
        assert!(matches!(err, Error::StartupTimeout));
        assert_eq!(err.to_string(), "timeout");
    }

    #[tokio::test]
    async fn test_unreachable_node_reports_last_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut handle = NodeHandle::remote("127.0.0.1", port);
        let config = ProbeConfig {
            timeout_ms: 300,
            interval_ms: 50,
            ..Default::default()
        };
        let err = handle.wait_for_startup(&config).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { .. }), "got {err}");
    }
}
