//! Synchronous client for the Airtable record API.
//!
//! # Overview
//! Translates record CRUD calls into authenticated requests against
//! `https://api.airtable.com/v0/{baseId}/{table}` and responses back into
//! typed records or a typed `AirtableError`.
//!
//! # Design
//! - `AirtableClient` is stateless and does no I/O: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`.
//! - `BaseClient` pairs it with a `Transport` and exposes `list`, `get`,
//!   `create`, `create_many`, `update`, `patch`, `delete`, and the
//!   cursor-following `pages` / `records` iterators.
//! - `UreqTransport` (feature `ureq`, on by default) is the stock blocking
//!   transport. Anything implementing `Transport` can replace it.
//!
//! ```no_run
//! use airtable_core::{BaseClient, ClientConfig, QueryParams};
//!
//! let client = BaseClient::from_config(ClientConfig::from_env()?);
//! for record in client.records("Tasks", &QueryParams::new().page_size(50)) {
//!     let record = record?;
//!     println!("{} {:?}", record.id, record.fields.get("Name"));
//! }
//! # Ok::<(), airtable_core::AirtableError>(())
//! ```

pub mod base;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pagination;
pub mod query;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;
pub mod url;

pub use base::BaseClient;
pub use client::AirtableClient;
pub use config::ClientConfig;
pub use error::{AirtableError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use pagination::{Pages, Records};
pub use query::{Direction, QueryParams, Sort};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{DeletedRecord, Fields, Record, RecordId, RecordPage, TableName};
