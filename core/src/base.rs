//! Connected client: `AirtableClient` plus a `Transport`.
//!
//! Every public operation runs through `execute`, which sends exactly one
//! request and hands the response to the matching `parse_*` method. Nothing
//! is retried here; a caller that wants retries branches on
//! `AirtableError::is_rate_limited` / `is_timeout` in its own loop.

use std::time::Instant;

use crate::client::AirtableClient;
use crate::config::ClientConfig;
use crate::error::AirtableError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::pagination::{Pages, Records};
use crate::query::QueryParams;
use crate::types::{DeletedRecord, Fields, Record, RecordPage};

/// Record CRUD against one base.
///
/// Holds no mutable state, so one instance can serve concurrent callers when
/// `T` is `Sync`.
#[derive(Debug, Clone)]
pub struct BaseClient<T> {
    client: AirtableClient,
    transport: T,
}

#[cfg(feature = "ureq")]
impl BaseClient<crate::transport::UreqTransport> {
    /// Client over a fresh `UreqTransport`.
    pub fn from_config(config: ClientConfig) -> Self {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}

impl<T: Transport> BaseClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            client: AirtableClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &AirtableClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One page of records. Use `pages` or `records` to follow the cursor.
    pub fn list(&self, table: &str, params: &QueryParams) -> Result<RecordPage, AirtableError> {
        self.execute(self.client.build_list(table, params), AirtableClient::parse_list)
    }

    pub fn get(&self, table: &str, id: &str) -> Result<Record, AirtableError> {
        self.execute(self.client.build_get(table, id), AirtableClient::parse_get)
    }

    pub fn create(&self, table: &str, fields: &Fields) -> Result<Record, AirtableError> {
        self.execute(self.client.build_create(table, fields), AirtableClient::parse_create)
    }

    pub fn create_many(&self, table: &str, records: &[Fields]) -> Result<Vec<Record>, AirtableError> {
        self.execute(
            self.client.build_create_many(table, records),
            AirtableClient::parse_create_many,
        )
    }

    /// Replace every field of a record.
    ///
    /// **Destructive:** any field not present in `fields` is cleared on the
    /// server. Use `patch` to change only some fields.
    pub fn update(&self, table: &str, id: &str, fields: &Fields) -> Result<Record, AirtableError> {
        self.execute(self.client.build_update(table, id, fields), AirtableClient::parse_update)
    }

    /// Change only the fields present in `fields`.
    pub fn patch(&self, table: &str, id: &str, fields: &Fields) -> Result<Record, AirtableError> {
        self.execute(self.client.build_patch(table, id, fields), AirtableClient::parse_patch)
    }

    pub fn delete(&self, table: &str, id: &str) -> Result<DeletedRecord, AirtableError> {
        self.execute(self.client.build_delete(table, id), AirtableClient::parse_delete)
    }

    /// Lazily walk every page of `table`, starting a new cursor chain.
    pub fn pages(&self, table: &str, params: &QueryParams) -> Pages<'_, T> {
        Pages::new(self, table, params.clone())
    }

    /// Lazily walk every record of `table`, one page buffered at a time.
    pub fn records(&self, table: &str, params: &QueryParams) -> Records<'_, T> {
        Records::new(self.pages(table, params))
    }

    /// Drain all pages into memory.
    pub fn list_all(&self, table: &str, params: &QueryParams) -> Result<Vec<Record>, AirtableError> {
        self.records(table, params).collect()
    }

    fn execute<R>(
        &self,
        request: Result<HttpRequest, AirtableError>,
        parse: fn(&AirtableClient, &HttpResponse) -> Result<R, AirtableError>,
    ) -> Result<R, AirtableError> {
        let request = request?;
        let response = self.send(&request)?;
        parse(&self.client, &response)
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AirtableError> {
        let start = Instant::now();
        let response = self.transport.send(request).map_err(|e| {
            tracing::warn!(method = %request.method, url = %request.url, error = %e, "airtable request failed");
            AirtableError::from(e)
        })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if response.is_success() {
            tracing::debug!(method = %request.method, url = %request.url, status = response.status, elapsed_ms, "airtable request");
        } else {
            tracing::warn!(method = %request.method, url = %request.url, status = response.status, elapsed_ms, "airtable request rejected");
        }
        Ok(response)
    }
}
