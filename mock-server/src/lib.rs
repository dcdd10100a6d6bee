//! In-memory stand-in for the Airtable record API.
//!
//! Serves `/v0/{base_id}/{table}` and `/v0/{base_id}/{table}/{record_id}`
//! with Airtable's request and response shapes: bearer auth, `{fields}` and
//! `{records: [...]}` bodies, cursor pagination through `offset`, full
//! replace on PUT, merge on PATCH, and `{"error": ...}` error bodies.
//! Tables spring into existence on first use.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MAX_PAGE_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "createdTime")]
    pub created_time: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Server settings. With `api_key` unset any bearer token is accepted.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub api_key: Option<String>,
}

type Tables = HashMap<(String, String), Vec<Record>>;

#[derive(Clone)]
struct AppState {
    tables: Arc<RwLock<Tables>>,
    api_key: Option<Arc<str>>,
}

pub fn app() -> Router {
    router(Config::default())
}

pub fn router(config: Config) -> Router {
    let state = AppState {
        tables: Arc::new(RwLock::new(HashMap::new())),
        api_key: config.api_key.map(Arc::from),
    };
    Router::new()
        .route("/v0/{base_id}/{table}", get(list_records).post(create_records))
        .route(
            "/v0/{base_id}/{table}/{record_id}",
            get(get_record)
                .put(replace_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, config: Config) -> Result<(), std::io::Error> {
    axum::serve(listener, router(config)).await
}

/// An Airtable-shaped error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({"error": {"type": kind, "message": message.into()}}),
        }
    }

    fn invalid(kind: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, kind, message)
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({"error": "NOT_FOUND"}),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match (token, state.api_key.as_deref()) {
        (None, _) => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "AUTHENTICATION_REQUIRED",
            "Authentication required",
        )
        .into_response(),
        (Some(token), Some(expected)) if token != expected => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_API_KEY",
            "Invalid API key",
        )
        .into_response(),
        _ => next.run(request).await,
    }
}

fn new_record(fields: Map<String, Value>) -> Record {
    let id = Uuid::new_v4().simple().to_string();
    Record {
        id: format!("rec{}", &id[..14]),
        created_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        fields: without_nulls(fields),
    }
}

fn without_nulls(fields: Map<String, Value>) -> Map<String, Value> {
    fields.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// Pull the `fields` object out of a `{fields: {...}}` value.
fn fields_of(value: &Value) -> Result<Map<String, Value>, ApiError> {
    match value.get("fields") {
        Some(Value::Object(fields)) => Ok(fields.clone()),
        Some(_) => Err(ApiError::invalid(
            "INVALID_REQUEST_BODY",
            "fields must be an object",
        )),
        None => Err(ApiError::invalid(
            "INVALID_REQUEST_MISSING_FIELDS",
            "Could not find field \"fields\" in the request body",
        )),
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(ApiError::invalid(
            "INVALID_REQUEST_UNKNOWN",
            "Invalid request: parameter validation failed",
        )),
    }
}

#[derive(Debug, Default)]
struct ListQuery {
    fields: Vec<String>,
    page_size: Option<usize>,
    max_records: Option<usize>,
    offset: Option<String>,
    sort: BTreeMap<usize, (Option<String>, Option<String>)>,
}

fn parse_list_query(query: Option<&str>) -> Result<ListQuery, ApiError> {
    let mut parsed = ListQuery::default();
    let pairs = query
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")));

    for (raw_key, raw_value) in pairs {
        let key = decode(raw_key)?;
        let value = decode(raw_value)?;
        match key.as_str() {
            "fields[]" | "fields" => parsed.fields.push(value),
            "pageSize" => {
                let size = parse_count("pageSize", &value)?;
                if size == 0 || size > MAX_PAGE_SIZE {
                    return Err(ApiError::invalid(
                        "INVALID_PAGE_SIZE",
                        format!("pageSize must be between 1 and {MAX_PAGE_SIZE}"),
                    ));
                }
                parsed.page_size = Some(size);
            }
            "maxRecords" => parsed.max_records = Some(parse_count("maxRecords", &value)?),
            "offset" => parsed.offset = Some(value),
            "view" | "filterByFormula" => {}
            other => match parse_sort_key(other) {
                Some((index, "field")) => parsed.sort.entry(index).or_default().0 = Some(value),
                Some((index, "direction")) => parsed.sort.entry(index).or_default().1 = Some(value),
                _ => {
                    return Err(ApiError::invalid(
                        "INVALID_REQUEST_UNKNOWN",
                        format!("Unknown parameter: {other}"),
                    ))
                }
            },
        }
    }
    Ok(parsed)
}

fn parse_count(name: &str, value: &str) -> Result<usize, ApiError> {
    value.parse().map_err(|_| {
        ApiError::invalid("INVALID_REQUEST_UNKNOWN", format!("{name} must be an integer"))
    })
}

fn decode(raw: &str) -> Result<String, ApiError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|_| ApiError::invalid("INVALID_REQUEST_UNKNOWN", "query is not valid UTF-8"))
}

/// `sort[3][field]` -> `(3, "field")`.
fn parse_sort_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("sort[")?;
    let (index, rest) = rest.split_once("][")?;
    let part = rest.strip_suffix(']')?;
    Some((index.parse().ok()?, part))
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn offset_token(index: usize, record: &Record) -> String {
    format!("itr{index}/{}", record.id)
}

fn parse_offset(token: &str, records: &[Record]) -> Option<usize> {
    let (index, id) = token.strip_prefix("itr")?.split_once('/')?;
    let index: usize = index.parse().ok()?;
    (records.get(index)?.id == id).then_some(index)
}

async fn list_records(
    State(state): State<AppState>,
    Path((base_id, table)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, ApiError> {
    let query = parse_list_query(query.as_deref())?;
    let tables = state.tables.read().await;
    let mut records = tables.get(&(base_id, table)).cloned().unwrap_or_default();
    drop(tables);

    let sort: Vec<(String, bool)> = query
        .sort
        .values()
        .filter_map(|(field, dir)| {
            let desc = dir.as_deref() == Some("desc");
            field.clone().map(|f| (f, desc))
        })
        .collect();
    if !sort.is_empty() {
        records.sort_by(|a, b| {
            for (field, desc) in &sort {
                let ord = compare_cells(a.fields.get(field), b.fields.get(field));
                let ord = if *desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
    if let Some(max) = query.max_records {
        records.truncate(max);
    }

    let start = match &query.offset {
        Some(token) => parse_offset(token, &records).ok_or_else(|| {
            ApiError::invalid(
                "LIST_RECORDS_ITERATOR_NOT_AVAILABLE",
                "The offset is no longer valid",
            )
        })?,
        None => 0,
    };
    let end = (start + query.page_size.unwrap_or(MAX_PAGE_SIZE)).min(records.len());

    let page: Vec<Record> = records[start..end]
        .iter()
        .cloned()
        .map(|mut record| {
            if !query.fields.is_empty() {
                record.fields.retain(|name, _| query.fields.contains(name));
            }
            record
        })
        .collect();

    let mut body = json!({ "records": page });
    if end < records.len() {
        body["offset"] = json!(offset_token(end, &records[end]));
    }
    Ok(Json(body))
}

async fn create_records(
    State(state): State<AppState>,
    Path((base_id, table)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = parse_body(&body)?;

    if let Some(items) = body.get("records") {
        let items = items.as_array().ok_or_else(|| {
            ApiError::invalid("INVALID_RECORDS", "records must be an array")
        })?;
        if items.is_empty() || items.len() > MAX_BATCH_SIZE {
            return Err(ApiError::invalid(
                "INVALID_RECORDS",
                format!("records must contain between 1 and {MAX_BATCH_SIZE} items"),
            ));
        }
        let created = items
            .iter()
            .map(|item| fields_of(item).map(new_record))
            .collect::<Result<Vec<_>, _>>()?;
        let mut tables = state.tables.write().await;
        tables
            .entry((base_id, table))
            .or_default()
            .extend(created.iter().cloned());
        tracing::debug!(count = created.len(), "created records");
        return Ok(Json(json!({ "records": created })));
    }

    let record = new_record(fields_of(&body)?);
    let mut tables = state.tables.write().await;
    tables.entry((base_id, table)).or_default().push(record.clone());
    tracing::debug!(id = %record.id, "created record");
    Ok(Json(json!(record)))
}

async fn get_record(
    State(state): State<AppState>,
    Path((base_id, table, record_id)): Path<(String, String, String)>,
) -> Result<Json<Record>, ApiError> {
    let tables = state.tables.read().await;
    tables
        .get(&(base_id, table))
        .and_then(|records| records.iter().find(|r| r.id == record_id))
        .cloned()
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

async fn replace_record(
    State(state): State<AppState>,
    Path((base_id, table, record_id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<Record>, ApiError> {
    let fields = fields_of(&parse_body(&body)?)?;
    let mut tables = state.tables.write().await;
    let record = find_mut(&mut tables, base_id, table, &record_id)?;
    record.fields = without_nulls(fields);
    Ok(Json(record.clone()))
}

async fn update_record(
    State(state): State<AppState>,
    Path((base_id, table, record_id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<Record>, ApiError> {
    let fields = fields_of(&parse_body(&body)?)?;
    let mut tables = state.tables.write().await;
    let record = find_mut(&mut tables, base_id, table, &record_id)?;
    for (name, value) in fields {
        if value.is_null() {
            record.fields.remove(&name);
        } else {
            record.fields.insert(name, value);
        }
    }
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(state): State<AppState>,
    Path((base_id, table, record_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let mut tables = state.tables.write().await;
    let records = tables
        .get_mut(&(base_id, table))
        .ok_or_else(ApiError::not_found)?;
    let index = records
        .iter()
        .position(|r| r.id == record_id)
        .ok_or_else(ApiError::not_found)?;
    records.remove(index);
    tracing::debug!(id = %record_id, "deleted record");
    Ok(Json(json!({ "id": record_id, "deleted": true })))
}

fn find_mut<'a>(
    tables: &'a mut Tables,
    base_id: String,
    table: String,
    record_id: &str,
) -> Result<&'a mut Record, ApiError> {
    tables
        .get_mut(&(base_id, table))
        .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
        .ok_or_else(ApiError::not_found)
}
