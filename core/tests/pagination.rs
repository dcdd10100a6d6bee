//! Cursor draining against an in-memory page fixture.

use std::collections::VecDeque;
use std::sync::Mutex;

use airtable_core::{
    AirtableError, BaseClient, ClientConfig, HttpRequest, HttpResponse, QueryParams, Transport,
    TransportError,
};
use serde_json::json;

/// Serves a fixed sequence of pages, remembering each request URL.
struct PageFixture {
    pages: Mutex<VecDeque<HttpResponse>>,
    urls: Mutex<Vec<String>>,
}

impl PageFixture {
    fn new(pages: Vec<HttpResponse>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for PageFixture {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.urls.lock().unwrap().push(request.url.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::connection_failed("no more fixture pages"))
    }
}

fn page(ids: &[&str], offset: Option<&str>) -> HttpResponse {
    let records: Vec<_> = ids
        .iter()
        .map(|id| json!({"id": id, "createdTime": "2024-01-01T00:00:00.000Z", "fields": {"Name": id}}))
        .collect();
    let mut body = json!({ "records": records });
    if let Some(offset) = offset {
        body["offset"] = json!(offset);
    }
    HttpResponse::new(200, body.to_string())
}

fn three_pages() -> Vec<HttpResponse> {
    vec![
        page(&["rec1", "rec2"], Some("itr2/rec3")),
        page(&["rec3", "rec4"], Some("itr4/rec5")),
        page(&["rec5"], None),
    ]
}

fn client(fixture: PageFixture) -> BaseClient<PageFixture> {
    BaseClient::new(ClientConfig::new("appTEST", "keyTEST"), fixture)
}

#[test]
fn drains_three_pages_in_order() {
    let client = client(PageFixture::new(three_pages()));

    let ids: Vec<String> = client
        .records("Tasks", &QueryParams::new().page_size(2))
        .map(|r| r.unwrap().id.to_string())
        .collect();

    assert_eq!(ids, ["rec1", "rec2", "rec3", "rec4", "rec5"]);
    assert_eq!(
        client.transport().urls(),
        [
            "https://api.airtable.com/v0/appTEST/Tasks?pageSize=2",
            "https://api.airtable.com/v0/appTEST/Tasks?pageSize=2&offset=itr2%2Frec3",
            "https://api.airtable.com/v0/appTEST/Tasks?pageSize=2&offset=itr4%2Frec5",
        ]
    );
}

#[test]
fn pages_are_lazy() {
    let client = client(PageFixture::new(three_pages()));

    let mut pages = client.pages("Tasks", &QueryParams::new());
    assert!(client.transport().urls().is_empty());

    let first = pages.next().unwrap().unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(client.transport().urls().len(), 1);
}

#[test]
fn iteration_restarts_with_fresh_cursor() {
    let mut responses = three_pages();
    responses.extend(three_pages());
    let client = client(PageFixture::new(responses));
    let params = QueryParams::new();

    assert_eq!(client.list_all("Tasks", &params).unwrap().len(), 5);
    assert_eq!(client.list_all("Tasks", &params).unwrap().len(), 5);

    let urls = client.transport().urls();
    assert_eq!(urls.len(), 6);
    assert_eq!(urls[0], urls[3]);
    assert!(!urls[3].contains("offset"));
}

#[test]
fn single_page_without_offset_stops_after_one_request() {
    let client = client(PageFixture::new(vec![page(&["rec1"], None)]));

    let pages: Vec<_> = client.pages("Tasks", &QueryParams::new()).collect();
    assert_eq!(pages.len(), 1);
    assert_eq!(client.transport().urls().len(), 1);
}

#[test]
fn error_mid_stream_is_yielded_once_then_ends() {
    let client = client(PageFixture::new(vec![
        page(&["rec1", "rec2"], Some("itr2/rec3")),
        HttpResponse::new(
            429,
            r#"{"error":{"type":"RATE_LIMIT_REACHED","message":"slow down"}}"#,
        ),
    ]));

    let results: Vec<_> = client.records("Tasks", &QueryParams::new()).collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].as_ref().unwrap_err().is_rate_limited());
    assert_eq!(client.transport().urls().len(), 2);
}

#[test]
fn list_all_returns_first_error() {
    let client = client(PageFixture::new(vec![
        page(&["rec1"], Some("itr1/rec2")),
        HttpResponse::new(500, ""),
    ]));

    let err = client.list_all("Tasks", &QueryParams::new()).unwrap_err();
    assert!(matches!(err, AirtableError::Api { status: 500, code: None, .. }));
}

#[test]
fn repeated_cursor_is_an_error_not_a_loop() {
    let client = client(PageFixture::new(vec![
        page(&["rec1"], Some("itr1/rec2")),
        page(&["rec2"], Some("itr1/rec2")),
    ]));

    let results: Vec<_> = client.pages("Tasks", &QueryParams::new()).collect();
    assert_eq!(results.len(), 2);
    assert!(matches!(results[1], Err(AirtableError::Conversion(_))));
}

#[test]
fn invalid_table_name_is_yielded_without_a_request() {
    let client = client(PageFixture::new(Vec::new()));

    let results: Vec<_> = client.records("a/b", &QueryParams::new()).collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(AirtableError::InvalidTableName(_))));
    assert!(client.transport().urls().is_empty());
}
