//! Supabase (PostgREST) backend.
//!
//! Records live in the `presencas` table with snake_case columns. A unique
//! index on `(registration, date)` enforces one check-in per person per day;
//! its violations surface as PostgreSQL code `23505`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{NewRecord, PersistedRecord};

use super::http::{build_client, send};
use super::store::deserialize_id;
use super::{GatewayError, RemoteStore};

const TABLE: &str = "presencas";

#[derive(Debug, Serialize)]
struct PresencaInsert<'a> {
    full_name: &'a str,
    registration: &'a str,
    course: &'a str,
    photo: &'a str,
    date: &'a str,
    time: &'a str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PresencaRow {
    #[serde(default, deserialize_with = "deserialize_id")]
    id: Option<String>,
    full_name: String,
    registration: String,
    #[serde(default)]
    course: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl PresencaRow {
    fn into_persisted(self) -> Result<PersistedRecord, GatewayError> {
        let id = self
            .id
            .ok_or_else(|| GatewayError::InvalidResponse("Row without id".to_string()))?;
        Ok(PersistedRecord {
            id,
            full_name: self.full_name,
            registration: self.registration,
            course: self.course.unwrap_or_default(),
            photo: self.photo,
            date: self.date.unwrap_or_default(),
            time: self.time.unwrap_or_default(),
            // Rows written before the timestamp column existed only carry created_at
            timestamp: self.timestamp.or(self.created_at).unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}

/// Client for a Supabase project's REST endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    table_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        if url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(GatewayError::Unconfigured);
        }
        Ok(Self {
            client: build_client(timeout)?,
            table_url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), TABLE),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, GatewayError> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(&self.anon_key)
            .map_err(|_| GatewayError::Unconfigured)?;
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|_| GatewayError::Unconfigured)?;
        headers.insert("apikey", key);
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn parse_rows(response: reqwest::Response) -> Result<Vec<PersistedRecord>, GatewayError> {
        let body = response.text().await?;
        let rows: Vec<PresencaRow> = serde_json::from_str(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!(
                "{}: {}",
                e,
                GatewayError::truncate_body(&body)
            ))
        })?;
        rows.into_iter().map(PresencaRow::into_persisted).collect()
    }
}

impl RemoteStore for SupabaseClient {
    async fn insert(&self, record: &NewRecord) -> Result<PersistedRecord, GatewayError> {
        let body = PresencaInsert {
            full_name: &record.full_name,
            registration: &record.registration,
            course: &record.course,
            photo: record.photo.as_deref().unwrap_or(""),
            date: &record.date,
            time: &record.time,
            timestamp: record.timestamp,
        };

        let request = self
            .client
            .post(&self.table_url)
            .headers(self.auth_headers()?)
            .header("Prefer", "return=representation")
            .json(&[body]);

        let response = send(request, "insert").await?;
        let mut rows = Self::parse_rows(response).await?;
        if rows.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "Insert returned no rows".to_string(),
            ));
        }
        let stored = rows.swap_remove(0);
        debug!(id = %stored.id, "Record stored in Supabase");
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<PersistedRecord>, GatewayError> {
        let request = self
            .client
            .get(&self.table_url)
            .headers(self.auth_headers()?)
            .query(&[("select", "*"), ("order", "created_at.desc")]);

        let response = send(request, "list").await?;
        let rows = Self::parse_rows(response).await?;
        debug!(count = rows.len(), "Records listed from Supabase");
        Ok(rows)
    }

    async fn clear_all(&self) -> Result<(), GatewayError> {
        let request = self
            .client
            .delete(&self.table_url)
            .headers(self.auth_headers()?)
            .query(&[("id", "neq.0")]);

        send(request, "clear_all").await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let request = self
            .client
            .get(&self.table_url)
            .headers(self.auth_headers()?)
            .query(&[("select", "id"), ("limit", "1")]);

        send(request, "health_check").await?;
        Ok(())
    }
}
