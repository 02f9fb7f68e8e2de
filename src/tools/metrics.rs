use chrono::Duration;
use serde::Deserialize;

use super::{fmt_instant, non_empty, ToolContext, ToolResponse};
use crate::errors::QueryError;
use crate::models::metrics::{ListMetricsResult, QueryMetricsResult};
use crate::query::time::{default_lookback, resolve_range};
use crate::query::truncate::truncate_series;
use crate::query::window::{window, WindowRequest};

/// Maximum metric names written into the summary text.
const MAX_DISPLAYED_METRICS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryMetricsInput {
    /// Metric query, e.g. `avg:system.cpu.user{*} by {host}`.
    pub query: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub max_data_points: Option<i64>,
    #[serde(default)]
    pub max_series: Option<i64>,
}

pub async fn query_metrics(
    ctx: &ToolContext<'_>,
    input: QueryMetricsInput,
) -> Result<ToolResponse<QueryMetricsResult>, QueryError> {
    if input.query.trim().is_empty() {
        return Err(QueryError::InvalidArguments {
            tool: "query_metrics".into(),
            reason: "query must not be empty".into(),
        });
    }
    let range = resolve_range(
        input.from.as_deref(),
        input.to.as_deref(),
        ctx.now,
        default_lookback(),
    )?;

    let series = ctx
        .backend
        .query_metrics(&input.query, range.from(), range.to())
        .await
        .map_err(|source| QueryError::Backend {
            query: input.query.clone(),
            from: range.from(),
            to: range.to(),
            source,
        })?;

    let caps = ctx
        .settings
        .series_caps
        .with_overrides(input.max_series, input.max_data_points);
    let capped = truncate_series(series, caps);
    if capped.truncated {
        tracing::info!(
            query = %input.query,
            series_dropped = capped.series_dropped,
            points_dropped = capped.points_dropped,
            "metric response truncated"
        );
    }

    let mut text = format!(
        "Query: {}\nTime Range: {} to {}\nSeries Count: {}",
        input.query,
        fmt_instant(range.from()),
        fmt_instant(range.to()),
        capped.series.len()
    );
    if capped.series_dropped > 0 {
        text.push_str(&format!(
            " (truncated from {}, use max_series to see more)",
            capped.total_series
        ));
    }
    text.push('\n');

    for (i, s) in capped.series.iter().enumerate() {
        text.push_str(&format!("\n[{}] {} ({} data points)", i + 1, s.metric, s.points.len()));
        if let Some(unit) = &s.unit {
            text.push_str(&format!(" [{}]", unit));
        }
        if !s.tags.is_empty() {
            text.push_str(&format!(" - Tags: {}", s.tags.join(", ")));
        }
    }
    if capped.points_truncated() {
        text.push_str(&format!(
            "\n\n{} data points dropped (max {} per series, use max_data_points to see more)",
            capped.points_dropped, caps.max_points
        ));
    }

    Ok(ToolResponse {
        text,
        data: QueryMetricsResult {
            series: capped.series,
            query: input.query,
            from: range.from(),
            to: range.to(),
            total_series: capped.total_series,
            series_dropped: capped.series_dropped,
            points_dropped: capped.points_dropped,
            truncated: capped.truncated,
        },
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListMetricsInput {
    /// Tag filter, e.g. `env:production`.
    pub tag_filter: Option<String>,
    pub host: Option<String>,
    /// Client-side name prefix filter.
    pub prefix: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_metrics(
    ctx: &ToolContext<'_>,
    input: ListMetricsInput,
) -> Result<ToolResponse<ListMetricsResult>, QueryError> {
    let from = ctx.now - Duration::hours(24);
    let tag_filter = non_empty(&input.tag_filter);
    let host = non_empty(&input.host);
    let prefix = non_empty(&input.prefix);

    let mut metrics = ctx
        .backend
        .list_metrics(from, host, tag_filter)
        .await
        .map_err(|e| QueryError::listing("list_metrics", e))?;
    if let Some(prefix) = prefix {
        metrics.retain(|m| m.starts_with(prefix));
    }

    let page = window(
        metrics,
        WindowRequest::new(input.offset, input.limit),
        ctx.settings.page,
    );

    let mut text = format!("Found {} metrics", page.total_count);
    if let Some(t) = tag_filter {
        text.push_str(&format!(" (tag filter: {})", t));
    }
    if let Some(h) = host {
        text.push_str(&format!(" (host: {})", h));
    }
    if let Some(p) = prefix {
        text.push_str(&format!(" (prefix: {})", p));
    }
    text.push_str(":\n\n");

    for (i, metric) in page.items.iter().enumerate() {
        if i >= MAX_DISPLAYED_METRICS {
            text.push_str(&format!(
                "\n... and {} more metrics in this page",
                page.items.len() - MAX_DISPLAYED_METRICS
            ));
            break;
        }
        text.push_str(metric);
        text.push('\n');
    }
    if let Some(next) = page.next_offset() {
        text.push_str(&format!(
            "\nMore results available. Use offset={} to get the next page.",
            next
        ));
    }

    Ok(ToolResponse {
        text,
        data: ListMetricsResult {
            from: from.timestamp(),
            total: page.total_count,
            offset: page.window_start,
            has_more: page.has_more,
            metrics: page.items,
        },
    })
}
