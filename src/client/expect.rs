//! Reply normalization and expectation matching
//!
//! Replies come in several shapes (status, integer, bulk bytes, nested
//! arrays). Tests compare them against expectations through a canonical
//! text form, so `"1"` and the integer `1` are equal.

use crate::common::{lossy_text, Error, Result};
use crate::protocol::Reply;
use std::fmt;

/// Normalized reply, ready for comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Text(String),
    Array(Vec<Value>),
}

/// Marker standing in for a nil element inside an array
pub const NIL_MARKER: &str = "nil";

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "<nil>"),
            Value::Text(text) => write!(f, "{}", text),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Text(n.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Text(n.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

/// Rewrite into comparison form.
///
/// Top-level nil stays [`Value::Nil`]; nil nested in an array becomes the
/// text [`NIL_MARKER`].
pub trait Normalize {
    fn normalize(&self) -> Value;
}

impl Normalize for Reply {
    fn normalize(&self) -> Value {
        match self {
            Reply::Bulk(None) => Value::Nil,
            Reply::Array(items) => Value::Array(items.iter().map(normalize_element).collect()),
            Reply::Bulk(Some(payload)) => Value::Text(lossy_text(payload)),
            Reply::Status(text) | Reply::Error(text) => Value::Text(text.clone()),
            Reply::Integer(n) => Value::Text(n.to_string()),
        }
    }
}

impl Normalize for Value {
    fn normalize(&self) -> Value {
        match self {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Nil => Value::Text(NIL_MARKER.to_string()),
                        other => other.normalize(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn normalize_element(reply: &Reply) -> Value {
    match reply {
        Reply::Bulk(None) => Value::Text(NIL_MARKER.to_string()),
        other => other.normalize(),
    }
}

/// Maps the normalized actual reply to an (actual, expected) pair
pub type Transform = Box<dyn Fn(Value) -> (Value, Value) + Send + Sync>;

/// What a command is expected to return
pub enum Expectation {
    /// Compared by canonical text form
    Literal(Value),
    /// The call must fail with exactly this text
    Error(String),
    /// Tolerant comparison, e.g. rounded floats
    Transform(Transform),
}

impl Expectation {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expectation::Literal(value.into())
    }

    pub fn nil() -> Self {
        Expectation::Literal(Value::Nil)
    }

    pub fn ok() -> Self {
        Expectation::literal("OK")
    }

    pub fn error(text: impl Into<String>) -> Self {
        Expectation::Error(text.into())
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(Value) -> (Value, Value) + Send + Sync + 'static,
    {
        Expectation::Transform(Box::new(f))
    }

    /// Match a float reply after rounding both sides to `decimals` places
    pub fn float(expected: f64, decimals: u32) -> Self {
        let ex = round(expected, decimals);
        Expectation::transform(move |actual| {
            let parsed = match &actual {
                Value::Text(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            };
            match parsed {
                Some(n) => (Value::from(round(n, decimals)), Value::from(ex)),
                None => (actual, Value::from(ex)),
            }
        })
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Expectation::Error(text) => f.debug_tuple("Error").field(text).finish(),
            Expectation::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl From<&str> for Expectation {
    fn from(s: &str) -> Self {
        Expectation::literal(s)
    }
}

impl From<i64> for Expectation {
    fn from(n: i64) -> Self {
        Expectation::literal(n)
    }
}

impl From<Value> for Expectation {
    fn from(v: Value) -> Self {
        Expectation::Literal(v)
    }
}

/// Check the outcome of a call against an expectation.
///
/// Error replies count as failures; a failure passes only against an
/// [`Expectation::Error`] carrying the same text.
pub fn check(result: Result<Reply>, expect: &Expectation) -> Result<()> {
    let reply = match result {
        Ok(Reply::Error(text)) => return check_failure(Error::Server(text), expect),
        Err(e) => return check_failure(e, expect),
        Ok(reply) => reply,
    };

    let actual = reply.normalize();
    let (actual, expected) = match expect {
        Expectation::Literal(Value::Nil) if actual != Value::Nil => {
            return Err(Error::mismatch(Value::Nil, actual));
        }
        Expectation::Literal(v) => (actual, v.clone()),
        Expectation::Error(text) => (actual, Value::Text(text.clone())),
        Expectation::Transform(f) => f(actual),
    };

    if actual.to_string() != expected.to_string() {
        return Err(Error::mismatch(expected, actual));
    }
    Ok(())
}

fn check_failure(err: Error, expect: &Expectation) -> Result<()> {
    match expect {
        Expectation::Error(text) if *text == err.to_string() => Ok(()),
        _ => Err(err),
    }
}

/// Round half up: scale, add 0.5, truncate toward zero, scale back.
///
/// Not symmetric for negative inputs (`round(-2.345, 2) == -2.34`);
/// approximate assertions depend on this exact behavior.
pub fn round(v: f64, decimals: u32) -> f64 {
    let mut pow = 1.0f64;
    for _ in 0..decimals {
        pow *= 10.0;
    }
    ((v * pow + 0.5) as i64) as f64 / pow
}
