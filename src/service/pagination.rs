//! # Pagination
//!
//! Query-string pagination for listing endpoints.
//!
//! Listings accept `page` (1-based, default 1) and `per-page`
//! (default 20, capped at 100). Responses carry a `pagination` object
//! with the total count and links to the neighbouring pages; `next`
//! disappears past the last page and `previous` disappears on the
//! first.

use std::collections::HashMap;

use crate::schema::{Field, Mode, Schema, Value, ValueMap};

use super::errors::ApiResult;

/// Per-page size used when the query string does not name one.
/// Links back to the default size omit the parameter.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a caller may request
pub const MAX_PER_PAGE: i64 = 100;

fn query_schema() -> Schema {
    Schema::new()
        .field("page", Field::integer_bounded(Some(0), None).with_default(1))
        .field(
            "per-page",
            Field::integer_bounded(Some(0), Some(MAX_PER_PAGE)).with_default(DEFAULT_PER_PAGE),
        )
}

/// A validated pagination window over `count` records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub count: usize,
    pub page: i64,
    pub per_page: i64,
}

/// Validate pagination query parameters against `count` records.
///
/// Unknown query parameters are ignored; out-of-range or non-numeric
/// values fail validation field by field.
pub fn nav(query: &HashMap<String, String>, count: usize) -> ApiResult<Pagination> {
    let mut input = ValueMap::new();
    for (name, value) in query {
        input.insert(name.clone(), Value::from(value.as_str()));
    }

    let output = query_schema().check(&input, Mode::Standard)?;

    let page = match output.get("page") {
        Some(Value::Int(n)) => *n,
        _ => 1,
    };
    let per_page = match output.get("per-page") {
        Some(Value::Int(n)) => *n,
        _ => DEFAULT_PER_PAGE,
    };

    Ok(Pagination {
        count,
        page,
        per_page,
    })
}

impl Pagination {
    /// Inclusive index range this page covers, or `None` when the
    /// window selects nothing (page 0, or a zero-sized page).
    pub fn range(&self) -> Option<(usize, usize)> {
        let start = (self.page - 1) * self.per_page;
        let stop = self.page * self.per_page - 1;
        if stop < start.max(0) {
            return None;
        }
        Some((start.max(0) as usize, stop as usize))
    }

    fn next(&self) -> Option<i64> {
        let stop = self.page * self.per_page - 1;
        if stop > self.count as i64 {
            None
        } else {
            Some(self.page + 1)
        }
    }

    fn previous(&self) -> Option<i64> {
        if self.page <= 1 {
            None
        } else {
            Some(self.page - 1)
        }
    }

    /// Navigation object for listing responses. Links are relative to
    /// the server root, pointing back at `path`.
    pub fn to_json(&self, path: &str) -> serde_json::Value {
        let mut nav = serde_json::Map::new();
        nav.insert("count".to_string(), serde_json::json!(self.count));
        nav.insert("page".to_string(), serde_json::json!(self.page));
        nav.insert("per-page".to_string(), serde_json::json!(self.per_page));
        if let Some(page) = self.previous() {
            nav.insert(
                "previous".to_string(),
                serde_json::json!(link(path, page, self.per_page)),
            );
        }
        if let Some(page) = self.next() {
            nav.insert(
                "next".to_string(),
                serde_json::json!(link(path, page, self.per_page)),
            );
        }
        serde_json::Value::Object(nav)
    }
}

fn link(path: &str, page: i64, per_page: i64) -> String {
    if per_page == DEFAULT_PER_PAGE {
        format!("{path}?page={page}")
    } else {
        format!("{path}?page={page}&per-page={per_page}")
    }
}
