//! Tool handlers: typed inputs in, a readable summary plus a structured
//! payload out.
//!
//! Framing (JSON-RPC, stdio, HTTP) belongs to whoever hosts these handlers;
//! [`call`] only dispatches by tool name over JSON arguments.

pub mod dashboards;
pub mod metrics;
pub mod services;
pub mod spans;
pub mod stats;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backend::ObservabilityBackend;
use crate::errors::QueryError;
use crate::query::truncate::SeriesCaps;
use crate::query::window::WindowPolicy;

// ── Catalog ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CATALOG: &[ToolDef] = &[
    ToolDef {
        name: "query_metrics",
        description: "Query timeseries metrics data. Returns metric values over a time range with support for aggregations and grouping.",
    },
    ToolDef {
        name: "list_metrics",
        description: "List metrics that reported in the last 24 hours. Can filter by tag, host, or name prefix.",
    },
    ToolDef {
        name: "get_apm_services",
        description: "List APM services from the service catalog with team, tier, lifecycle, and contacts.",
    },
    ToolDef {
        name: "query_spans",
        description: "Search APM spans by service, operation, status code, or custom tags.",
    },
    ToolDef {
        name: "query_apm_stats",
        description: "Query APM statistics for a service: average and p95 latency, error rate, and throughput.",
    },
    ToolDef {
        name: "list_dashboards",
        description: "List dashboards with titles, IDs, layout types, and metadata.",
    },
    ToolDef {
        name: "get_dashboard",
        description: "Get a dashboard's configuration, widget count, and template variables.",
    },
];

// ── Context ───────────────────────────────────────────────────

/// Limits applied by the tools when the caller does not ask for others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSettings {
    pub series_caps: SeriesCaps,
    pub page: WindowPolicy,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            series_caps: SeriesCaps::default(),
            page: WindowPolicy::default(),
        }
    }
}

/// Everything a tool invocation needs. `now` is fixed for the whole request.
pub struct ToolContext<'a> {
    pub backend: &'a dyn ObservabilityBackend,
    pub now: DateTime<Utc>,
    pub settings: ToolSettings,
}

impl<'a> ToolContext<'a> {
    pub fn new(backend: &'a dyn ObservabilityBackend, now: DateTime<Utc>) -> Self {
        Self {
            backend,
            now,
            settings: ToolSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ToolSettings) -> Self {
        self.settings = settings;
        self
    }
}

// ── Output ────────────────────────────────────────────────────

/// Typed result of one tool.
#[derive(Debug, Clone)]
pub struct ToolResponse<T> {
    pub text: String,
    pub data: T,
}

impl<T: Serialize> ToolResponse<T> {
    pub fn into_output(self) -> ToolOutput {
        let structured = serde_json::to_value(&self.data)
            .unwrap_or_else(|e| serde_json::json!({ "serialization_error": e.to_string() }));
        ToolOutput {
            text: self.text,
            structured,
            is_error: false,
        }
    }
}

/// Untyped tool result as handed back to the host.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Value,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            text: err.to_string(),
            structured: serde_json::json!({
                "error": { "code": err.code(), "message": err.to_string() }
            }),
            is_error: true,
        }
    }

    /// Text as shown to the end user.
    pub fn render(&self) -> String {
        if self.is_error {
            format!("Error: {}", self.text)
        } else {
            self.text.clone()
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────

pub async fn call(ctx: &ToolContext<'_>, name: &str, args: Value) -> Result<ToolOutput, QueryError> {
    tracing::debug!(tool = name, "tool call");
    let output = match name {
        "query_metrics" => metrics::query_metrics(ctx, parse(name, args)?).await?.into_output(),
        "list_metrics" => metrics::list_metrics(ctx, parse(name, args)?).await?.into_output(),
        "get_apm_services" => services::get_apm_services(ctx, parse(name, args)?).await?.into_output(),
        "query_spans" => spans::query_spans(ctx, parse(name, args)?).await?.into_output(),
        "query_apm_stats" => stats::query_apm_stats(ctx, parse(name, args)?).await?.into_output(),
        "list_dashboards" => dashboards::list_dashboards(ctx, parse(name, args)?).await?.into_output(),
        "get_dashboard" => dashboards::get_dashboard(ctx, parse(name, args)?).await?.into_output(),
        other => return Err(QueryError::UnknownTool(other.to_string())),
    };
    Ok(output)
}

/// Like [`call`], but folds failures into an error output.
pub async fn call_or_error(ctx: &ToolContext<'_>, name: &str, args: Value) -> ToolOutput {
    match call(ctx, name, args).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "tool call failed");
            ToolOutput::from_error(&e)
        }
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, QueryError> {
    let args = if args.is_null() { serde_json::json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| QueryError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn fmt_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn fmt_wall(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Treat an empty string the same as a missing field.
pub(crate) fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SnapshotBackend;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let mut names: Vec<_> = CATALOG.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[tokio::test]
    async fn test_every_catalog_tool_dispatches() {
        let backend = SnapshotBackend::from_json("{}").unwrap();
        let ctx = ToolContext::new(&backend, noon());
        for tool in CATALOG {
            let err = call(&ctx, tool.name, serde_json::json!({ "__bogus": [1, 2] })).await;
            assert!(!matches!(err, Err(QueryError::UnknownTool(_))), "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let backend = SnapshotBackend::from_json("{}").unwrap();
        let ctx = ToolContext::new(&backend, noon());
        let err = call(&ctx, "drop_tables", Value::Null).await.unwrap_err();
        assert!(matches!(err, QueryError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_bad_arguments_render_as_error_output() {
        let backend = SnapshotBackend::from_json("{}").unwrap();
        let ctx = ToolContext::new(&backend, noon());
        let out = call_or_error(&ctx, "query_metrics", serde_json::json!({ "query": 42 })).await;
        assert!(out.is_error);
        assert!(out.render().starts_with("Error: invalid arguments for 'query_metrics'"));
        assert_eq!(out.structured["error"]["code"], "invalid_arguments");
    }
}
