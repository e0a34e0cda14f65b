//! Minimal RESP wire codec
//!
//! Only what the router and the local fixture need: request encoding,
//! incremental reply decoding, reply encoding and the leader redirect
//! convention.

pub mod command;
pub mod reply;

pub use command::{Command, ToArg};
pub use reply::Reply;

use crate::common::{Error, Result};

/// Prefix of the error reply a follower sends instead of serving a command.
/// The leader's port follows immediately.
pub const REDIRECT_PREFIX: &str = "TRY ";

/// Is this error text a leader redirect?
pub fn is_redirect(text: &str) -> bool {
    text.starts_with(REDIRECT_PREFIX)
}

/// Extract the leader port from a redirect error text.
///
/// Returns `None` when `text` is not a redirect at all. A `host:` part in
/// front of the port is tolerated.
pub fn parse_redirect(text: &str) -> Option<Result<u16>> {
    let target = text.strip_prefix(REDIRECT_PREFIX)?;
    let port = target.rsplit(':').next().unwrap_or(target);
    Some(
        port.parse::<u16>()
            .map_err(|_| Error::InvalidRedirect(text.to_string())),
    )
}

/// Build the redirect error text pointing at `port`
pub fn redirect_to(port: u16) -> String {
    format!("{}{}", REDIRECT_PREFIX, port)
}
