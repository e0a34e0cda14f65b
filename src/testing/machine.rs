//! In-memory state machine serving a handful of string commands

use crate::common::lossy_text;
use crate::node::StateMachine;
use crate::protocol::Reply;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MachineState {
    data: BTreeMap<String, Bytes>,
    closed: bool,
}

/// Cloning shares the underlying state
#[derive(Clone, Default)]
pub struct LocalMachine {
    state: Arc<Mutex<MachineState>>,
}

impl LocalMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MachineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.state().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one command and produce its reply
    pub fn apply(&self, name: &str, args: &[Bytes]) -> Reply {
        let mut state = self.state();
        if state.closed {
            return Reply::error("ERR state machine closed");
        }

        let cmd = name.to_ascii_uppercase();
        match (cmd.as_str(), args.len()) {
            ("PING", 0) => Reply::Status("PONG".into()),
            ("PING", 1) | ("ECHO", 1) => Reply::Bulk(Some(args[0].clone())),
            ("SET", 2) => {
                state.data.insert(lossy_text(&args[0]), args[1].clone());
                Reply::ok()
            }
            ("GET", 1) => Reply::Bulk(state.data.get(&lossy_text(&args[0])).cloned()),
            ("DEL", n) if n >= 1 => {
                let removed = args
                    .iter()
                    .filter(|k| state.data.remove(&lossy_text(k)).is_some())
                    .count();
                Reply::Integer(removed as i64)
            }
            ("MGET", n) if n >= 1 => Reply::Array(
                args.iter()
                    .map(|k| Reply::Bulk(state.data.get(&lossy_text(k)).cloned()))
                    .collect(),
            ),
            ("INCRBYFLOAT", 2) => incr_by_float(&mut state, &args[0], &args[1]),
            ("PING" | "ECHO" | "SET" | "GET" | "DEL" | "MGET" | "INCRBYFLOAT", _) => {
                Reply::error(format!(
                    "ERR wrong number of arguments for '{}' command",
                    name.to_ascii_lowercase()
                ))
            }
            _ => Reply::error(format!("ERR unknown command '{}'", name)),
        }
    }
}

fn incr_by_float(state: &mut MachineState, key: &Bytes, incr: &Bytes) -> Reply {
    const NOT_FLOAT: &str = "ERR value is not a valid float";

    let Ok(incr) = lossy_text(incr).trim().parse::<f64>() else {
        return Reply::error(NOT_FLOAT);
    };
    let key = lossy_text(key);
    let current = match state.data.get(&key) {
        Some(v) => match lossy_text(v).parse::<f64>() {
            Ok(n) => n,
            Err(_) => return Reply::error(NOT_FLOAT),
        },
        None => 0.0,
    };

    let updated = Bytes::from((current + incr).to_string());
    state.data.insert(key, updated.clone());
    Reply::Bulk(Some(updated))
}

impl StateMachine for LocalMachine {
    fn close(&mut self) {
        let mut state = self.state();
        state.closed = true;
        state.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())).collect()
    }

    #[test]
    fn test_set_get_del() {
        let m = LocalMachine::new();
        assert_eq!(m.apply("SET", &args(&["please", "allow"])), Reply::ok());
        assert_eq!(m.apply("get", &args(&["please"])), Reply::bulk("allow"));
        assert_eq!(m.apply("DEL", &args(&["please", "other"])), Reply::Integer(1));
        assert_eq!(m.apply("GET", &args(&["please"])), Reply::nil());
        assert!(m.is_empty());
    }

    #[test]
    fn test_mget_reports_missing_as_nil() {
        let m = LocalMachine::new();
        m.apply("SET", &args(&["a", "1"]));
        assert_eq!(
            m.apply("MGET", &args(&["x", "a"])),
            Reply::Array(vec![Reply::nil(), Reply::bulk("1")])
        );
    }

    #[test]
    fn test_incr_by_float() {
        let m = LocalMachine::new();
        assert_eq!(m.apply("INCRBYFLOAT", &args(&["f", "1.5"])), Reply::bulk("1.5"));
        assert_eq!(m.apply("INCRBYFLOAT", &args(&["f", "2"])), Reply::bulk("3.5"));
        assert_eq!(
            m.apply("INCRBYFLOAT", &args(&["f", "abc"])),
            Reply::error("ERR value is not a valid float")
        );
    }

    #[test]
    fn test_errors() {
        let m = LocalMachine::new();
        assert_eq!(
            m.apply("SET", &args(&["k"])),
            Reply::error("ERR wrong number of arguments for 'set' command")
        );
        assert_eq!(
            m.apply("NOPE", &[]),
            Reply::error("ERR unknown command 'NOPE'")
        );
    }

    #[test]
    fn test_closed_machine_refuses_commands() {
        let mut m = LocalMachine::new();
        m.apply("SET", &args(&["k", "v"]));
        StateMachine::close(&mut m);
        assert!(m.is_closed());
        assert_eq!(m.apply("GET", &args(&["k"])), Reply::error("ERR state machine closed"));
    }
}
