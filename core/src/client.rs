//! Stateless HTTP request builder and response parser for the Airtable
//! record API.
//!
//! # Design
//! `AirtableClient` holds only an immutable `ClientConfig` and the immutable
//! header set derived from it. Each CRUD operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. `BaseClient` runs the round-trip between the two; tests
//! can drive either half with plain values.
//!
//! Status alone decides success: any status in `[200, 300)` is decoded as the
//! expected payload, anything else is classified into an `AirtableError`
//! without ever failing a second time on a bad error body.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::AirtableError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::QueryParams;
use crate::types::{
    DeletedRecord, Fields, FieldsBody, Record, RecordId, RecordPage, RecordsBody, RecordsResponse,
};
use crate::url::build_url;

/// Most records one batch create may carry.
pub const MAX_BATCH_SIZE: usize = 10;

/// Synchronous, stateless client for one Airtable base.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Clone)]
pub struct AirtableClient {
    config: ClientConfig,
    base_headers: Vec<(String, String)>,
}

// `base_headers` carries the bearer token, so only the redacted config is shown.
impl fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AirtableClient {
    pub fn new(config: ClientConfig) -> Self {
        let base_headers = vec![(
            "authorization".to_string(),
            format!("Bearer {}", config.api_key()),
        )];
        Self {
            config,
            base_headers,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_list(&self, table: &str, params: &QueryParams) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, None, Some(params))?;
        Ok(self.request(HttpMethod::Get, url, None))
    }

    pub fn build_get(&self, table: &str, id: &str) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, Some(id), None)?;
        Ok(self.request(HttpMethod::Get, url, None))
    }

    pub fn build_create(&self, table: &str, fields: &Fields) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, None, None)?;
        let body = encode(&FieldsBody { fields })?;
        Ok(self.request(HttpMethod::Post, url, Some(body)))
    }

    /// Create up to `MAX_BATCH_SIZE` records in one request.
    pub fn build_create_many(&self, table: &str, records: &[Fields]) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, None, None)?;
        if records.is_empty() || records.len() > MAX_BATCH_SIZE {
            return Err(AirtableError::InvalidParam {
                name: "records".to_string(),
                reason: format!("batch of {} is outside 1..={MAX_BATCH_SIZE}", records.len()),
            });
        }
        let body = encode(&RecordsBody {
            records: records.iter().map(|fields| FieldsBody { fields }).collect(),
        })?;
        Ok(self.request(HttpMethod::Post, url, Some(body)))
    }

    /// Full replace. Fields not named in `fields` are cleared by the server.
    pub fn build_update(&self, table: &str, id: &str, fields: &Fields) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, Some(id), None)?;
        let body = encode(&FieldsBody { fields })?;
        Ok(self.request(HttpMethod::Put, url, Some(body)))
    }

    /// Partial update. Only fields named in `fields` change.
    pub fn build_patch(&self, table: &str, id: &str, fields: &Fields) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, Some(id), None)?;
        let body = encode(&FieldsBody { fields })?;
        Ok(self.request(HttpMethod::Patch, url, Some(body)))
    }

    pub fn build_delete(&self, table: &str, id: &str) -> Result<HttpRequest, AirtableError> {
        let url = self.url(table, Some(id), None)?;
        Ok(self.request(HttpMethod::Delete, url, None))
    }

    pub fn parse_list(&self, response: &HttpResponse) -> Result<RecordPage, AirtableError> {
        decode(response)
    }

    pub fn parse_get(&self, response: &HttpResponse) -> Result<Record, AirtableError> {
        decode(response)
    }

    pub fn parse_create(&self, response: &HttpResponse) -> Result<Record, AirtableError> {
        decode(response)
    }

    pub fn parse_create_many(&self, response: &HttpResponse) -> Result<Vec<Record>, AirtableError> {
        decode::<RecordsResponse>(response).map(|r| r.records)
    }

    pub fn parse_update(&self, response: &HttpResponse) -> Result<Record, AirtableError> {
        decode(response)
    }

    pub fn parse_patch(&self, response: &HttpResponse) -> Result<Record, AirtableError> {
        decode(response)
    }

    /// A 2xx response without `"deleted": true` is `DeleteNotConfirmed`.
    pub fn parse_delete(&self, response: &HttpResponse) -> Result<DeletedRecord, AirtableError> {
        #[derive(Deserialize)]
        struct Confirmation {
            id: Option<RecordId>,
            deleted: Option<bool>,
        }

        let confirmation: Confirmation = decode(response)?;
        match (confirmation.id, confirmation.deleted) {
            (Some(id), Some(true)) => Ok(DeletedRecord { id, deleted: true }),
            (None, Some(true)) => Err(AirtableError::Conversion(
                "delete confirmation is missing the record id".to_string(),
            )),
            (id, _) => Err(AirtableError::DeleteNotConfirmed {
                id: id.map(|id| id.to_string()),
            }),
        }
    }

    fn url(&self, table: &str, id: Option<&str>, params: Option<&QueryParams>) -> Result<String, AirtableError> {
        build_url(self.config.api_root(), self.config.base_id(), table, id, params)
    }

    /// Per-request headers: the shared auth header plus content type when a
    /// body is present.
    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let mut headers = self.base_headers.clone();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: self.config.timeout(),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, AirtableError> {
    serde_json::to_string(value).map_err(|e| AirtableError::Serialization(e.to_string()))
}

/// Classify the status, then decode a 2xx body as `T`.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, AirtableError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| AirtableError::Conversion(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

/// Airtable sends either `{"error": {"type", "message"}}` or, for some 404s,
/// `{"error": "NOT_FOUND"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Full {
        #[serde(rename = "type")]
        code: Option<String>,
        message: Option<String>,
    },
    Code(String),
}

/// Map a non-2xx response to the matching `AirtableError` variant.
///
/// The error body is parsed leniently; when it is empty or not the expected
/// JSON the error carries the status and a generic message.
pub fn check_status(response: &HttpResponse) -> Result<(), AirtableError> {
    if response.is_success() {
        return Ok(());
    }
    let status = response.status;

    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(ErrorEnvelope {
            error: ErrorDetail::Full { code, message },
        }) => (code, message),
        Ok(ErrorEnvelope {
            error: ErrorDetail::Code(code),
        }) => (Some(code), None),
        Err(_) => (None, None),
    };
    let generic = || format!("request failed with HTTP status {status}");

    Err(match status {
        404 => AirtableError::NotFound {
            message: message.or_else(|| code.clone()).unwrap_or_else(generic),
            code,
        },
        429 => AirtableError::RateLimited {
            message: message.or_else(|| code.clone()).unwrap_or_else(generic),
            code,
        },
        _ => AirtableError::Api {
            status,
            code,
            message: message.unwrap_or_else(generic),
        },
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const RECORD: &str = r#"{"id":"rec0000000000001","createdTime":"2024-01-01T00:00:00.000Z","fields":{"Name":"Ada"}}"#;

    fn client() -> AirtableClient {
        AirtableClient::new(ClientConfig::new("appTEST", "keyTEST").with_api_root("http://localhost:3000/v0"))
    }

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn build_list_produces_correct_request() {
        let req = client().build_list("Tasks", &QueryParams::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v0/appTEST/Tasks");
        assert!(req.body.is_none());
        assert_eq!(
            req.headers,
            vec![("authorization".to_string(), "Bearer keyTEST".to_string())]
        );
    }

    #[test]
    fn build_list_with_params() {
        let params = QueryParams::new().page_size(2).view("Grid view");
        let req = client().build_list("Tasks", &params).unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/v0/appTEST/Tasks?pageSize=2&view=Grid%20view"
        );
    }

    #[test]
    fn build_get_produces_correct_request() {
        let req = client().build_get("Tasks", "rec0000000000001").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v0/appTEST/Tasks/rec0000000000001");
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn build_create_produces_correct_request() {
        let req = client()
            .build_create("Tasks", &fields(json!({"Name": "Buy milk", "Done": false})))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/v0/appTEST/Tasks");
        assert_eq!(
            req.headers,
            vec![
                ("authorization".to_string(), "Bearer keyTEST".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"fields": {"Name": "Buy milk", "Done": false}}));
    }

    #[test]
    fn build_create_many_wraps_records() {
        let batch = vec![fields(json!({"Name": "a"})), fields(json!({"Name": "b"}))];
        let req = client().build_create_many("Tasks", &batch).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"records": [{"fields": {"Name": "a"}}, {"fields": {"Name": "b"}}]})
        );
    }

    #[test]
    fn build_create_many_rejects_oversized_and_empty_batches() {
        let batch = vec![Fields::new(); MAX_BATCH_SIZE + 1];
        assert!(matches!(
            client().build_create_many("Tasks", &batch),
            Err(AirtableError::InvalidParam { .. })
        ));
        assert!(matches!(
            client().build_create_many("Tasks", &[]),
            Err(AirtableError::InvalidParam { .. })
        ));
    }

    #[test]
    fn build_update_uses_put_and_patch_uses_patch() {
        let f = fields(json!({"Name": "x"}));
        let put = client().build_update("Tasks", "rec1", &f).unwrap();
        let patch = client().build_patch("Tasks", "rec1", &f).unwrap();
        assert_eq!(put.method, HttpMethod::Put);
        assert_eq!(patch.method, HttpMethod::Patch);
        assert_eq!(put.url, patch.url);
        assert_eq!(put.body, patch.body);
    }

    #[test]
    fn build_delete_produces_correct_request() {
        let req = client().build_delete("Tasks", "rec1").unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/v0/appTEST/Tasks/rec1");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_rejects_invalid_table_name() {
        let c = client();
        assert!(matches!(c.build_get("a/b", "rec1"), Err(AirtableError::InvalidTableName(_))));
        assert!(matches!(
            c.build_create("", &Fields::new()),
            Err(AirtableError::InvalidTableName(_))
        ));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("keyTEST"));
        assert!(rendered.contains("appTEST"));
    }

    #[test]
    fn shared_headers_are_not_mutated_by_body_requests() {
        let c = client();
        c.build_create("Tasks", &Fields::new()).unwrap();
        let req = c.build_get("Tasks", "rec1").unwrap();
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn timeout_is_carried_on_requests() {
        let c = AirtableClient::new(
            ClientConfig::new("appTEST", "k").with_timeout(std::time::Duration::from_millis(250)),
        );
        let req = c.build_get("Tasks", "rec1").unwrap();
        assert_eq!(req.timeout, Some(std::time::Duration::from_millis(250)));
    }

    #[test]
    fn parse_list_success() {
        let body = format!(r#"{{"records":[{RECORD}],"offset":"itr1/rec1"}}"#);
        let page = client().parse_list(&HttpResponse::new(200, body)).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].fields["Name"], "Ada");
        assert_eq!(page.offset.as_deref(), Some("itr1/rec1"));
    }

    #[test]
    fn parse_get_not_found_short_form() {
        let err = client()
            .parse_get(&HttpResponse::new(404, r#"{"error":"NOT_FOUND"}"#))
            .unwrap_err();
        assert_eq!(
            err,
            AirtableError::NotFound {
                code: Some("NOT_FOUND".to_string()),
                message: "NOT_FOUND".to_string(),
            }
        );
    }

    #[test]
    fn parse_get_missing_table_keeps_code() {
        let err = client()
            .parse_get(&HttpResponse::new(
                404,
                r#"{"error":{"type":"TABLE_NOT_FOUND","message":"Could not find table Tasks"}}"#,
            ))
            .unwrap_err();
        assert_eq!(err.code(), Some("TABLE_NOT_FOUND"));
        assert_eq!(err.to_string(), "not found: Could not find table Tasks");
    }

    #[test]
    fn parse_create_success() {
        let record = client().parse_create(&HttpResponse::new(200, RECORD)).unwrap();
        assert_eq!(record.id.as_str(), "rec0000000000001");
    }

    #[test]
    fn parse_create_many_success() {
        let body = format!(r#"{{"records":[{RECORD},{RECORD}]}}"#);
        let records = client().parse_create_many(&HttpResponse::new(200, body)).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn parse_structured_error() {
        let err = client()
            .parse_update(&HttpResponse::new(
                422,
                r#"{"error":{"type":"INVALID_REQUEST","message":"bad"}}"#,
            ))
            .unwrap_err();
        assert_eq!(
            err,
            AirtableError::Api {
                status: 422,
                code: Some("INVALID_REQUEST".to_string()),
                message: "bad".to_string(),
            }
        );
    }

    #[test]
    fn parse_empty_error_body_is_generic() {
        let err = client().parse_patch(&HttpResponse::new(500, "")).unwrap_err();
        assert_eq!(
            err,
            AirtableError::Api {
                status: 500,
                code: None,
                message: "request failed with HTTP status 500".to_string(),
            }
        );
    }

    #[test]
    fn parse_html_error_body_is_generic() {
        let err = client()
            .parse_get(&HttpResponse::new(502, "<html>Bad Gateway</html>"))
            .unwrap_err();
        assert!(matches!(err, AirtableError::Api { status: 502, code: None, .. }));
    }

    #[test]
    fn parse_rate_limited() {
        let err = client()
            .parse_list(&HttpResponse::new(
                429,
                r#"{"error":{"type":"RATE_LIMIT_REACHED","message":"slow down"}}"#,
            ))
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn parse_success_with_bad_json_is_conversion_error() {
        let err = client().parse_list(&HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, AirtableError::Conversion(_)));
    }

    #[test]
    fn status_alone_decides_success() {
        // An error-shaped body under a 2xx status is still decoded as success.
        let err = client()
            .parse_get(&HttpResponse::new(200, r#"{"error":{"type":"X","message":"y"}}"#))
            .unwrap_err();
        assert!(matches!(err, AirtableError::Conversion(_)));
    }

    #[test]
    fn parse_delete_success() {
        let deleted = client()
            .parse_delete(&HttpResponse::new(200, r#"{"id":"rec1","deleted":true}"#))
            .unwrap();
        assert_eq!(deleted.id.as_str(), "rec1");
        assert!(deleted.deleted);
    }

    #[test]
    fn parse_delete_unconfirmed() {
        let err = client()
            .parse_delete(&HttpResponse::new(200, r#"{"id":"rec1","deleted":false}"#))
            .unwrap_err();
        assert_eq!(err, AirtableError::DeleteNotConfirmed { id: Some("rec1".to_string()) });

        let err = client()
            .parse_delete(&HttpResponse::new(200, r#"{"id":"rec1"}"#))
            .unwrap_err();
        assert!(matches!(err, AirtableError::DeleteNotConfirmed { .. }));
    }

    #[test]
    fn parse_delete_not_found() {
        let err = client().parse_delete(&HttpResponse::new(404, "")).unwrap_err();
        assert!(matches!(err, AirtableError::NotFound { .. }));
    }
}
