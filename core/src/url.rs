//! Request URL construction.
//!
//! URLs have the fixed shape `{apiRoot}/{baseId}/{table}[/{recordId}][?query]`.
//! Absent segments are skipped rather than rendered empty, so no URL ever
//! contains `//` in its path.

use crate::error::AirtableError;
use crate::query::QueryParams;
use crate::types::{RecordId, TableName};

/// Join `root` and the present `segments` with exactly one `/` between each.
///
/// `join_url("http://x", &[Some("foo"), None, Some("bar")])` is
/// `"http://x/foo/bar"`.
pub fn join_url(root: &str, segments: &[Option<&str>]) -> String {
    let mut url = root.trim_end_matches('/').to_string();
    for segment in segments.iter().flatten() {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

/// Build the absolute URL for a table or record request.
///
/// The table name is validated first; an invalid name fails with
/// `InvalidTableName` and nothing else is evaluated. Path segments are
/// percent-encoded and the query string is appended only when `params`
/// holds at least one option.
pub fn build_url(
    api_root: &str,
    base_id: &str,
    table: &str,
    record_id: Option<&str>,
    params: Option<&QueryParams>,
) -> Result<String, AirtableError> {
    let table = TableName::new(table)?;
    let record_id = record_id.map(RecordId::new).transpose()?;
    if let Some(params) = params {
        params.validate()?;
    }

    let table = urlencoding::encode(table.as_str());
    let record_id = record_id.as_ref().map(|id| urlencoding::encode(id.as_str()));
    let mut url = join_url(
        api_root,
        &[Some(base_id), Some(&*table), record_id.as_deref()],
    );

    if let Some(params) = params.filter(|p| !p.is_empty()) {
        url.push('?');
        url.push_str(&params.to_query_string());
    }
    Ok(url)
}
