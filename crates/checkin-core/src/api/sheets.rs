//! Google Sheets backend, reached through an Apps Script web app.
//!
//! The script answers every action with `{success, message, data}`. An HTML
//! page after a redirect counts as success for writes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{NewRecord, PersistedRecord};

use super::http::{build_client, send};
use super::store::{deserialize_id, deserialize_opt_text, deserialize_text};
use super::{GatewayError, RemoteStore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetRecordOut<'a> {
    full_name: &'a str,
    registration: &'a str,
    course: &'a str,
    photo: &'a str,
    has_photo: bool,
    date: &'a str,
    time: &'a str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SheetRecordOut<'a>>,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetRow {
    #[serde(default, deserialize_with = "deserialize_id")]
    id: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    full_name: String,
    #[serde(deserialize_with = "deserialize_text")]
    registration: String,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    course: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    time: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl SheetRow {
    fn into_persisted(self, row: usize) -> PersistedRecord {
        let timestamp = self.timestamp.unwrap_or_default();
        let id = self
            .id
            .unwrap_or_else(|| sheet_id(timestamp, &self.registration, Some(row)));
        PersistedRecord {
            id,
            full_name: self.full_name,
            registration: self.registration,
            course: self.course.unwrap_or_default(),
            photo: self.photo,
            date: self.date.unwrap_or_default(),
            time: self.time.unwrap_or_default(),
            timestamp,
            created_at: self.timestamp,
        }
    }
}

/// Fallback key for rows the script sent without an id.
///
/// Instant and registration alone repeat for rows missing a timestamp, so
/// listed rows also carry their position in the sheet.
fn sheet_id(timestamp: DateTime<Utc>, registration: &str, row: Option<usize>) -> String {
    let base = format!("sheet-{}-{}", timestamp.timestamp_millis(), registration);
    match row {
        Some(row) => format!("{}-{}", base, row),
        None => base,
    }
}

/// Interpret a script reply. `None` means the body was not JSON.
fn parse_reply(body: &str) -> Result<Option<ScriptResponse>, GatewayError> {
    let Ok(reply) = serde_json::from_str::<ScriptResponse>(body) else {
        return Ok(None);
    };
    if reply.success == Some(false) {
        let message = reply
            .message
            .unwrap_or_else(|| "Script reported failure".to_string());
        return Err(GatewayError::rejected(message));
    }
    Ok(Some(reply))
}

fn parse_rows(body: &str) -> Result<Vec<PersistedRecord>, GatewayError> {
    let reply = parse_reply(body)?.ok_or_else(|| {
        GatewayError::InvalidResponse(format!(
            "Script reply is not JSON: {}",
            GatewayError::truncate_body(body)
        ))
    })?;
    if reply.success != Some(true) {
        return Err(GatewayError::InvalidResponse(
            "Script reply without success flag".to_string(),
        ));
    }
    let rows = match reply.data {
        Some(serde_json::Value::Array(rows)) => rows,
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(GatewayError::InvalidResponse(format!(
                "Script data is not a list: {}",
                GatewayError::truncate_body(&other.to_string())
            )))
        }
    };
    let mut records = Vec::with_capacity(rows.len());
    for (index, value) in rows.into_iter().enumerate() {
        match serde_json::from_value::<SheetRow>(value) {
            Ok(row) => records.push(row.into_persisted(index)),
            Err(e) => warn!(row = index, error = %e, "Skipping malformed spreadsheet row"),
        }
    }
    // Sheets keep insertion order; newest first like every other store
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

/// Client for an Apps Script web app in front of a spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    url: String,
}

impl SheetsClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        if url.trim().is_empty() {
            return Err(GatewayError::Unconfigured);
        }
        Ok(Self {
            client: build_client(timeout)?,
            url: url.trim().to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_action(
        &self,
        request: &ActionRequest<'_>,
        op: &'static str,
    ) -> Result<Option<ScriptResponse>, GatewayError> {
        let response = send(self.client.post(&self.url).json(request), op).await?;
        let body = response.text().await?;
        parse_reply(&body)
    }
}

impl RemoteStore for SheetsClient {
    async fn insert(&self, record: &NewRecord) -> Result<PersistedRecord, GatewayError> {
        let request = ActionRequest {
            action: "saveRecord",
            data: Some(SheetRecordOut {
                full_name: &record.full_name,
                registration: &record.registration,
                course: &record.course,
                photo: record.photo.as_deref().unwrap_or(""),
                has_photo: record.has_photo(),
                date: &record.date,
                time: &record.time,
                timestamp: record.timestamp,
            }),
        };

        let reply = self.post_action(&request, "insert").await?;
        let id = reply
            .and_then(|r| r.data)
            .and_then(|d| d.get("id").cloned())
            .and_then(|id| match id {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| sheet_id(record.timestamp, &record.registration, None));

        debug!(id = %id, "Record stored in spreadsheet");
        Ok(PersistedRecord {
            id,
            full_name: record.full_name.clone(),
            registration: record.registration.clone(),
            course: record.course.clone(),
            photo: record.photo.clone(),
            date: record.date.clone(),
            time: record.time.clone(),
            timestamp: record.timestamp,
            created_at: Some(record.timestamp),
        })
    }

    async fn list(&self) -> Result<Vec<PersistedRecord>, GatewayError> {
        let request = self.client.get(&self.url).query(&[("action", "getRecords")]);
        let response = send(request, "list").await?;
        let body = response.text().await?;
        let records = parse_rows(&body)?;
        debug!(count = records.len(), "Records listed from spreadsheet");
        Ok(records)
    }

    async fn clear_all(&self) -> Result<(), GatewayError> {
        let request = ActionRequest {
            action: "clearAllRecords",
            data: None,
        };
        self.post_action(&request, "clear_all").await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let request = self.client.get(&self.url).query(&[("action", "test")]);
        let response = send(request, "health_check").await?;
        let body = response.text().await?;
        parse_reply(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{respond, serve};
    use crate::cache::CacheManager;
    use crate::directory::RecordDirectory;
    use crate::models::AttendanceRecord;

    #[test]
    fn test_non_json_reply_is_success() {
        let reply = parse_reply("<html>Script completed</html>").unwrap();
        assert!(reply.is_none());
    }

    #[test]
    fn test_failure_reply_is_classified() {
        let err = parse_reply(r#"{"success": false, "message": "Matrícula já registrada hoje"}"#)
            .unwrap_err();
        assert!(err.is_duplicate());

        let err = parse_reply(r#"{"success": false, "message": "Sheet not found"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { duplicate: false, .. }));
    }

    #[test]
    fn test_parse_rows_sorts_newest_first() {
        let body = r#"{
            "success": true,
            "data": [
                {"fullName": "Old", "registration": "1", "timestamp": "2025-02-01T10:00:00Z"},
                {"id": 9, "fullName": "New", "registration": "2", "hasPhoto": false,
                 "timestamp": "2025-02-01T11:00:00Z"}
            ]
        }"#;
        let records = parse_rows(body).unwrap();
        assert_eq!(records[0].full_name, "New");
        assert_eq!(records[0].id, "9");
        assert!(records[1].id.starts_with("sheet-"));
    }

    #[test]
    fn test_parse_rows_rejects_html() {
        assert!(matches!(
            parse_rows("<html></html>"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_action_request_shape() {
        let request = ActionRequest {
            action: "clearAllRecords",
            data: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"action": "clearAllRecords"}));
    }

    #[test]
    fn test_parse_rows_accepts_numeric_cells() {
        let body = r#"{"success":true,"data":[
            {"fullName":"Ana Silva","registration":12345,"timestamp":"2025-02-01T10:00:00.000Z"}
        ]}"#;
        let records = parse_rows(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].registration, "12345");
    }

    #[test]
    fn test_parse_rows_skips_malformed_rows() {
        let body = r#"{
            "success": true,
            "data": [
                {"fullName": "Ana Silva", "registration": "1"},
                {"fullName": null, "registration": "2"},
                "not a row",
                {"fullName": "Bruno Lima", "registration": 3, "course": 101}
            ]
        }"#;
        let records = parse_rows(body).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, ["Ana Silva", "Bruno Lima"]);
        assert_eq!(records[1].course, "101");
    }

    #[test]
    fn test_parse_rows_rejects_non_list_data() {
        let body = r#"{"success": true, "data": {"fullName": "Ana"}}"#;
        assert!(matches!(
            parse_rows(body),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_rows_without_id_or_timestamp_stay_distinct() {
        let body = r#"{
            "success": true,
            "data": [
                {"fullName": "Ana Silva", "registration": "1"},
                {"fullName": "Bruno Lima", "registration": "2"},
                {"fullName": "Ana Silva", "registration": "1"}
            ]
        }"#;
        let records = parse_rows(body).unwrap();

        let dir = std::env::temp_dir()
            .join(format!("checkin_sheets_ids_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut directory = RecordDirectory::init(CacheManager::new(dir).unwrap());
        directory
            .replace_all(records.into_iter().map(AttendanceRecord::from).collect())
            .unwrap();

        assert_eq!(directory.len(), 3);
    }

    #[test]
    fn test_fallback_id_includes_registration_and_row() {
        let at = DateTime::<Utc>::default();
        assert_eq!(sheet_id(at, "123", Some(4)), "sheet-0-123-4");
        assert_eq!(sheet_id(at, "123", None), "sheet-0-123");
    }

    #[tokio::test]
    async fn test_list_requests_records_action() {
        let body = r#"{"success":true,"data":[{"id":1,"fullName":"Ana","registration":"1"}]}"#;
        let (url, requests) = serve(move |_| respond("200 OK", body)).await;
        let client = SheetsClient::new(&format!("{}/exec", url), Duration::from_secs(5)).unwrap();

        let records = client.list().await.unwrap();

        assert_eq!(records.len(), 1);
        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("GET /exec?action=getRecords HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_insert_posts_save_action() {
        let (url, requests) = serve(|_| respond("200 OK", r#"{"success":true}"#)).await;
        let client = SheetsClient::new(&url, Duration::from_secs(5)).unwrap();
        let record = NewRecord::stamp(
            &crate::models::CheckIn::new("Ana Silva", "12345"),
            DateTime::<Utc>::default(),
        );

        let stored = client.insert(&record).await.unwrap();

        assert_eq!(stored.id, "sheet-0-12345");
        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("POST / HTTP/1.1"));
        assert!(requests[0].contains(r#""action":"saveRecord""#));
        assert!(requests[0].contains(r#""fullName":"Ana Silva""#));
    }
}
