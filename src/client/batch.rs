//! Batch runner: command/expectation pairs with optional pauses

use crate::client::cluster::Cluster;
use crate::client::expect::{check, Expectation};
use crate::common::Result;
use crate::protocol::Command;
use std::time::Duration;

/// One step of a batch
#[derive(Debug)]
pub enum Step {
    /// Let replication or expiry settle
    Pause(Duration),
    Expect(Command, Expectation),
}

impl Step {
    pub fn pause(duration: Duration) -> Self {
        Step::Pause(duration)
    }

    pub fn expect(cmd: Command, expect: impl Into<Expectation>) -> Self {
        Step::Expect(cmd, expect.into())
    }
}

impl Cluster {
    /// Route `cmd` and check the outcome
    pub async fn execute_expect(&mut self, cmd: Command, expect: &Expectation) -> Result<()> {
        let result = self.execute(cmd).await;
        check(result, expect)
    }

    /// Run steps in order; the first failing step aborts the batch
    pub async fn run_batch(&mut self, steps: Vec<Step>) -> Result<()> {
        for (i, step) in steps.into_iter().enumerate() {
            match step {
                Step::Pause(duration) => tokio::time::sleep(duration).await,
                Step::Expect(cmd, expect) => {
                    let label = cmd.to_string();
                    if let Err(e) = self.execute_expect(cmd, &expect).await {
                        tracing::debug!("Batch step {} ({}) failed: {}", i, label, e);
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}
