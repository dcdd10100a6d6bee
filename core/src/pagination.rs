//! Cursor-following iterators over the list endpoint.
//!
//! `Pages` re-issues `list` with the `offset` returned by the previous page
//! until a page arrives without one. It is lazy (no request until the first
//! `next`), holds at most one page, and stops for good after yielding an
//! error. Each call to `BaseClient::pages` starts a fresh chain.

use std::iter::FusedIterator;

use crate::base::BaseClient;
use crate::error::AirtableError;
use crate::http::Transport;
use crate::query::QueryParams;
use crate::types::{Record, RecordPage};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Iterator over the pages of a table.
pub struct Pages<'a, T> {
    client: &'a BaseClient<T>,
    table: String,
    params: QueryParams,
    cursor: Cursor,
}

impl<'a, T: Transport> Pages<'a, T> {
    pub(crate) fn new(client: &'a BaseClient<T>, table: &str, params: QueryParams) -> Self {
        Self {
            client,
            table: table.to_string(),
            params,
            cursor: Cursor::Start,
        }
    }
}

impl<T: Transport> Iterator for Pages<'_, T> {
    type Item = Result<RecordPage, AirtableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let params = match &self.cursor {
            Cursor::Done => return None,
            Cursor::Start => self.params.clone(),
            Cursor::Next(offset) => self.params.clone().offset(offset.clone()),
        };

        let page = match self.client.list(&self.table, &params) {
            Ok(page) => page,
            Err(e) => {
                self.cursor = Cursor::Done;
                return Some(Err(e));
            }
        };

        match page.offset.clone() {
            None => self.cursor = Cursor::Done,
            Some(next) if params.get_offset() == Some(next.as_str()) => {
                self.cursor = Cursor::Done;
                return Some(Err(AirtableError::Conversion(format!(
                    "list cursor {next:?} did not advance"
                ))));
            }
            Some(next) => self.cursor = Cursor::Next(next),
        }
        tracing::trace!(table = %self.table, records = page.records.len(), more = page.offset.is_some(), "fetched page");
        Some(Ok(page))
    }
}

impl<T: Transport> FusedIterator for Pages<'_, T> {}

/// Iterator over the records of a table, flattening `Pages`.
pub struct Records<'a, T> {
    pages: Pages<'a, T>,
    buffer: std::vec::IntoIter<Record>,
}

impl<'a, T: Transport> Records<'a, T> {
    pub(crate) fn new(pages: Pages<'a, T>) -> Self {
        Self {
            pages,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<T: Transport> Iterator for Records<'_, T> {
    type Item = Result<Record, AirtableError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            match self.pages.next()? {
                Ok(page) => self.buffer = page.records.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<T: Transport> FusedIterator for Records<'_, T> {}
