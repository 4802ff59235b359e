use std::future::Future;

use serde::{Deserialize, Deserializer};

use crate::models::{NewRecord, PersistedRecord};

use super::GatewayError;

/// A remote persistence backend for attendance records.
///
/// Implementations translate between [`NewRecord`]/[`PersistedRecord`] and
/// their own wire format, and classify failures into [`GatewayError`].
pub trait RemoteStore {
    /// Store one record; returns it with the backend-assigned id.
    fn insert(
        &self,
        record: &NewRecord,
    ) -> impl Future<Output = Result<PersistedRecord, GatewayError>> + Send;

    /// Every stored record, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<PersistedRecord>, GatewayError>> + Send;

    /// Delete every stored record.
    fn clear_all(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Cheap round trip for diagnostics. Never gates submission.
    fn health_check(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Accept a row id given as a JSON number or string.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(text_value).filter(|s| !s.is_empty()))
}

/// A required text cell that spreadsheets may hand back as a number.
pub(crate) fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    text_value(value).ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

/// Optional text cell, string or number. Anything else reads as absent.
pub(crate) fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(text_value))
}

fn text_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
