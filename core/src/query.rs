//! Query options for the list endpoint.
//!
//! # Design
//! `QueryParams` is an ordered list of recognized options. Setters replace an
//! option in place when it is already present, so the rendered query string
//! follows the order in which the caller first set each option. String input
//! (`from_pairs`) and JSON input (`Deserialize`) apply options in source
//! order and reject unknown keys at construction instead of forwarding them
//! to the server.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AirtableError;

/// Largest page the list endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort direction for a `sort` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = AirtableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(invalid("sort", format!("unknown direction {other:?}"))),
        }
    }
}

/// One `sort` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Param {
    Fields(Vec<String>),
    FilterByFormula(String),
    MaxRecords(u32),
    PageSize(u32),
    Sort(Vec<Sort>),
    View(String),
    Offset(String),
}

impl Param {
    fn same_kind(&self, other: &Param) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Options for `list`. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<Param>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Only return these fields.
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(Param::Fields(fields.into_iter().map(Into::into).collect()))
    }

    pub fn filter_by_formula(self, formula: impl Into<String>) -> Self {
        self.set(Param::FilterByFormula(formula.into()))
    }

    /// Cap on the total number of records across all pages.
    pub fn max_records(self, max: u32) -> Self {
        self.set(Param::MaxRecords(max))
    }

    /// Records per page, 1..=100.
    pub fn page_size(self, size: u32) -> Self {
        self.set(Param::PageSize(size))
    }

    /// Append a sort entry. Entries apply in the order they are added.
    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        let entry = Sort {
            field: field.into(),
            direction,
        };
        for param in &mut self.params {
            if let Param::Sort(entries) = param {
                entries.push(entry);
                return self;
            }
        }
        self.params.push(Param::Sort(vec![entry]));
        self
    }

    pub fn view(self, view: impl Into<String>) -> Self {
        self.set(Param::View(view.into()))
    }

    /// Resume from a cursor returned by a previous page.
    pub fn offset(self, offset: impl Into<String>) -> Self {
        self.set(Param::Offset(offset.into()))
    }

    pub fn get_offset(&self) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            Param::Offset(o) => Some(o.as_str()),
            _ => None,
        })
    }

    fn set(mut self, param: Param) -> Self {
        match self.params.iter_mut().find(|p| p.same_kind(&param)) {
            Some(slot) => *slot = param,
            None => self.params.push(param),
        }
        self
    }

    /// Build from string pairs, e.g. `--param pageSize=10` on a command line.
    ///
    /// `fields` and `sort` may repeat; a sort value is `Field` or
    /// `Field:asc` / `Field:desc`. Unknown keys fail with `UnknownParam`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, AirtableError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = QueryParams::new();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            params = match key {
                "fields" | "fields[]" => {
                    let mut fields = params.current_fields();
                    fields.push(value.to_string());
                    params.fields(fields)
                }
                "filterByFormula" => params.filter_by_formula(value),
                "maxRecords" => params.max_records(parse_number(key, value)?),
                "pageSize" => params.page_size(parse_number(key, value)?),
                "sort" => {
                    let (field, direction) = match value.rsplit_once(':') {
                        Some((field, dir)) => (field, dir.parse()?),
                        None => (value, Direction::Asc),
                    };
                    params.sort(field, direction)
                }
                "view" => params.view(value),
                "offset" => params.offset(value),
                other => return Err(AirtableError::UnknownParam(other.to_string())),
            };
        }
        params.validate()?;
        Ok(params)
    }

    fn current_fields(&self) -> Vec<String> {
        self.params
            .iter()
            .find_map(|p| match p {
                Param::Fields(f) => Some(f.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Check value ranges. Called before any request is built.
    pub fn validate(&self) -> Result<(), AirtableError> {
        for param in &self.params {
            match param {
                Param::PageSize(size) if *size == 0 || *size > MAX_PAGE_SIZE => {
                    return Err(invalid(
                        "pageSize",
                        format!("{size} is outside 1..={MAX_PAGE_SIZE}"),
                    ));
                }
                Param::MaxRecords(0) => {
                    return Err(invalid("maxRecords", "must be at least 1".to_string()));
                }
                Param::Sort(entries) if entries.iter().any(|s| s.field.is_empty()) => {
                    return Err(invalid("sort", "field name is empty".to_string()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Key/value pairs in wire order, not yet percent-encoded.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for param in &self.params {
            match param {
                Param::Fields(fields) => {
                    for field in fields {
                        pairs.push(("fields[]".to_string(), field.clone()));
                    }
                }
                Param::FilterByFormula(f) => pairs.push(("filterByFormula".to_string(), f.clone())),
                Param::MaxRecords(n) => pairs.push(("maxRecords".to_string(), n.to_string())),
                Param::PageSize(n) => pairs.push(("pageSize".to_string(), n.to_string())),
                Param::Sort(entries) => {
                    for (i, entry) in entries.iter().enumerate() {
                        pairs.push((format!("sort[{i}][field]"), entry.field.clone()));
                        pairs.push((format!("sort[{i}][direction]"), entry.direction.as_str().to_string()));
                    }
                }
                Param::View(v) => pairs.push(("view".to_string(), v.clone())),
                Param::Offset(o) => pairs.push(("offset".to_string(), o.clone())),
            }
        }
        pairs
    }

    /// `key=value&...` with values percent-encoded. Empty when no options are set.
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32, AirtableError> {
    value
        .parse()
        .map_err(|_| invalid(name, format!("{value:?} is not a non-negative integer")))
}

fn invalid(name: &str, reason: String) -> AirtableError {
    AirtableError::InvalidParam {
        name: name.to_string(),
        reason,
    }
}

const KEYS: &[&str] = &[
    "fields",
    "filterByFormula",
    "maxRecords",
    "pageSize",
    "sort",
    "view",
    "offset",
];

/// JSON form, e.g. `{"pageSize": 10, "sort": [{"field": "Name"}]}`.
///
/// Options are applied in the order their keys appear, so the rendered query
/// string follows the source document. Unknown and repeated keys are errors.
impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(QueryParamsVisitor)
    }
}

struct QueryParamsVisitor;

impl<'de> Visitor<'de> for QueryParamsVisitor {
    type Value = QueryParams;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of list query options")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<QueryParams, A::Error> {
        let mut params = QueryParams::new();
        let mut seen: Vec<String> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if seen.contains(&key) {
                return Err(de::Error::custom(format_args!("duplicate field `{key}`")));
            }
            params = match key.as_str() {
                "fields" => params.fields(map.next_value::<Vec<String>>()?),
                "filterByFormula" => params.filter_by_formula(map.next_value::<String>()?),
                "maxRecords" => params.max_records(map.next_value()?),
                "pageSize" => params.page_size(map.next_value()?),
                "sort" => map
                    .next_value::<Vec<Sort>>()?
                    .into_iter()
                    .fold(params, |p, entry| p.sort(entry.field, entry.direction)),
                "view" => params.view(map.next_value::<String>()?),
                "offset" => params.offset(map.next_value::<String>()?),
                other => return Err(de::Error::unknown_field(other, KEYS)),
            };
            seen.push(key);
        }
        params.validate().map_err(de::Error::custom)?;
        Ok(params)
    }
}
