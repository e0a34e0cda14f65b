//! Common utilities and types shared across kvrouter

pub mod config;
pub mod error;
pub mod utils;

pub use config::{Config, LocalConfig, ProbeConfig};
pub use error::{Error, Result};
pub use utils::{lossy_text, parse_duration};
