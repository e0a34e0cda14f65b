//! Shared helpers for integration tests

#![allow(dead_code)]

use kvrouter::protocol::Command;
use kvrouter::{testing, Config};
use tempfile::TempDir;

/// Config whose node data directories land in `dir`
pub fn test_config(dir: &TempDir) -> Config {
    testing::init_tracing();
    let mut config = Config::default();
    config.local.data_root = dir.path().to_path_buf();
    config
}

/// A port nothing listens on (bound then released)
pub fn dead_port() -> u16 {
    dead_ports(1)[0]
}

/// `n` distinct ports nothing listens on; all are held until every one is bound
pub fn dead_ports(n: usize) -> Vec<u16> {
    let listeners: Vec<_> = (0..n)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect()
}

pub fn cmd(parts: &[&str]) -> Command {
    Command::from_parts(parts).unwrap()
}
