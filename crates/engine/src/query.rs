// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record filtering and projection.
//!
//! Filter syntax:
//!
//! - `key=<text>`: the record key equals `<text>`
//! - `value~<text>`: the raw value contains `<text>`
//! - `/<json-pointer>=<json>`: the value parses as JSON and the pointed-to
//!   field equals `<json>` (bare words compare as strings)
//!
//! A projection is a JSON pointer; the record's value is replaced by the
//! pointed-to field, or `null` when it is absent.

use kr_core::Record;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid filter {0:?}: expected key=<text>, value~<text> or /<pointer>=<json>")]
    InvalidFilter(String),
    #[error("invalid projection {0:?}: expected a JSON pointer such as /payload/id")]
    InvalidProjection(String),
}

/// Decides whether a record passes and what it looks like afterwards.
pub trait RecordQuery: Send + Sync + 'static {
    /// `None` drops the record.
    fn apply(&self, record: Record) -> Option<Record>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    KeyEquals(String),
    ValueContains(String),
    PointerEquals { pointer: String, expected: Value },
}

impl Filter {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if let Some(key) = raw.strip_prefix("key=") {
            return Ok(Self::KeyEquals(key.to_string()));
        }
        if let Some(needle) = raw.strip_prefix("value~") {
            return Ok(Self::ValueContains(needle.to_string()));
        }
        match raw.split_once('=') {
            Some((pointer, expected)) if pointer.starts_with('/') => Ok(Self::PointerEquals {
                pointer: pointer.to_string(),
                expected: serde_json::from_str(expected)
                    .unwrap_or_else(|_| Value::String(expected.to_string())),
            }),
            _ => Err(QueryError::InvalidFilter(raw.to_string())),
        }
    }

    fn matches(&self, record: &Record, parsed: &mut Option<Option<Value>>) -> bool {
        match self {
            Self::KeyEquals(key) => record.key.as_deref() == Some(key.as_str()),
            Self::ValueContains(needle) => record.value.contains(needle.as_str()),
            Self::PointerEquals { pointer, expected } => parsed
                .get_or_insert_with(|| serde_json::from_str(&record.value).ok())
                .as_ref()
                .and_then(|value| value.pointer(pointer))
                == Some(expected),
        }
    }
}

/// [`RecordQuery`] over JSON pointers. Filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonPointerQuery {
    filters: Vec<Filter>,
    projection: Option<String>,
}

impl JsonPointerQuery {
    pub fn parse<S: AsRef<str>>(filters: &[S], projection: Option<&str>) -> Result<Self, QueryError> {
        let filters =
            filters.iter().map(|f| Filter::parse(f.as_ref())).collect::<Result<Vec<_>, _>>()?;
        let projection = match projection {
            Some(p) if p.starts_with('/') || p.is_empty() => Some(p.to_string()),
            Some(p) => return Err(QueryError::InvalidProjection(p.to_string())),
            None => None,
        };
        Ok(Self { filters, projection })
    }

    pub fn is_pass_through(&self) -> bool {
        self.filters.is_empty() && self.projection.is_none()
    }
}

impl RecordQuery for JsonPointerQuery {
    fn apply(&self, mut record: Record) -> Option<Record> {
        // Parsed at most once per record, and only if some step needs it.
        let mut parsed: Option<Option<Value>> = None;
        if !self.filters.iter().all(|f| f.matches(&record, &mut parsed)) {
            return None;
        }
        if let Some(pointer) = &self.projection {
            let projected = parsed
                .get_or_insert_with(|| serde_json::from_str(&record.value).ok())
                .as_ref()
                .and_then(|value| value.pointer(pointer))
                .cloned()
                .unwrap_or(Value::Null);
            record.value = match projected {
                Value::String(s) => s,
                other => other.to_string(),
            };
        }
        Some(record)
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
