//! Audit payloads and the sanitizer every payload passes through.
//!
//! Before/after snapshots and metadata are open-ended documents. Callers
//! build them as `Payload`, a tagged union that keeps typed scalars (UUIDs,
//! dates, timestamps, decimals) distinct from plain text. The audit sink only
//! stores `SanitizedPayload`, and the only way to obtain one is `sanitize()`.
//!
//! Sanitization rules:
//! - mapping keys whose lowercase form is in `SENSITIVE_KEYS` have their value
//!   replaced with `REDACTED`, at any depth;
//! - sequences are sanitized element-wise and always come out as a JSON array;
//! - typed scalars become their canonical string form;
//! - every other scalar passes through unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Replacement written in place of any sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Keys (compared lowercase) whose values never reach the audit trail.
pub const SENSITIVE_KEYS: [&str; 9] = [
    "password",
    "token",
    "secret",
    "authorization",
    "cookie",
    "cookies",
    "session",
    "csrftoken",
    "csrf",
];

/// An unsanitized, structured audit payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Decimal(Decimal),
    List(Vec<Payload>),
    Map(BTreeMap<String, Payload>),
}

impl Payload {
    /// Build a mapping payload from `(key, value)` pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Payload)>,
    {
        Payload::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Return the value at `key` when this payload is a mapping.
    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Payload::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Bool(v)
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Int(v)
    }
}

impl From<i32> for Payload {
    fn from(v: i32) -> Self {
        Payload::Int(i64::from(v))
    }
}

impl From<u32> for Payload {
    fn from(v: u32) -> Self {
        Payload::Int(i64::from(v))
    }
}

impl From<usize> for Payload {
    fn from(v: usize) -> Self {
        i64::try_from(v)
            .map(Payload::Int)
            .unwrap_or_else(|_| Payload::Text(v.to_string()))
    }
}

impl From<u64> for Payload {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(Payload::Int)
            .unwrap_or_else(|_| Payload::Text(v.to_string()))
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Float(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<&String> for Payload {
    fn from(v: &String) -> Self {
        Payload::Text(v.clone())
    }
}

impl From<Uuid> for Payload {
    fn from(v: Uuid) -> Self {
        Payload::Uuid(v)
    }
}

impl From<NaiveDate> for Payload {
    fn from(v: NaiveDate) -> Self {
        Payload::Date(v)
    }
}

impl From<DateTime<Utc>> for Payload {
    fn from(v: DateTime<Utc>) -> Self {
        Payload::Timestamp(v)
    }
}

impl From<Decimal> for Payload {
    fn from(v: Decimal) -> Self {
        Payload::Decimal(v)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Payload::Null)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(v: Vec<T>) -> Self {
        Payload::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Payload::Int(i),
                None => match n.as_f64() {
                    Some(f) => Payload::Float(f),
                    None => Payload::Text(n.to_string()),
                },
            },
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => Payload::List(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Map(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

/// Types that can describe themselves as an audit snapshot.
///
/// The projection lists the fields relevant to an audit reader. It goes
/// through `sanitize()` like every other payload before it is stored.
pub trait AuditProjection {
    fn audit_projection(&self) -> Payload;
}

/// A payload that has been through `sanitize()`.
///
/// The inner JSON is only reachable read-only; there is no public
/// constructor other than `sanitize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedPayload(Value);

impl SanitizedPayload {
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// Look up a top-level key of a mapping payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// True when `key` names a value that must be redacted.
pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEYS.contains(&lowered.as_str())
}

/// Redact and normalise `payload` into its storable form.
pub fn sanitize(payload: &Payload) -> SanitizedPayload {
    SanitizedPayload(sanitize_value(payload))
}

/// `sanitize` lifted over an optional payload; `None` stays `None`.
pub fn sanitize_opt(payload: Option<&Payload>) -> Option<SanitizedPayload> {
    payload.map(sanitize)
}

fn sanitize_value(payload: &Payload) -> Value {
    match payload {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Int(i) => Value::Number(Number::from(*i)),
        Payload::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Payload::Text(s) => Value::String(s.clone()),
        Payload::Uuid(u) => Value::String(u.to_string()),
        Payload::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        Payload::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
        Payload::Decimal(d) => Value::String(d.to_string()),
        Payload::List(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Payload::Map(map) => {
            let mut cleaned = Map::with_capacity(map.len());
            for (key, value) in map {
                let value = if is_sensitive_key(key) {
                    Value::String(REDACTED.to_string())
                } else {
                    sanitize_value(value)
                };
                cleaned.insert(key.clone(), value);
            }
            Value::Object(cleaned)
        }
    }
}
