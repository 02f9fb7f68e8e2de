use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An APM span as returned by span search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub service: String,
    pub name: String,
    pub resource: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub span_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ns: i64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub error: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn default_status() -> String {
    "ok".to_string()
}

impl Span {
    pub fn duration_ms(&self) -> f64 {
        self.duration_ns as f64 / 1e6
    }
}

/// Parameters handed to the backend for one page of span search.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanSearch {
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: u32,
    pub cursor: Option<String>,
}

/// One page of spans plus the backend's opaque continuation token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanBatch {
    pub spans: Vec<Span>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}
