use serde::Deserialize;

use super::{fmt_instant, non_empty, ToolContext, ToolResponse};
use crate::errors::QueryError;
use crate::models::stats::{DerivedStats, StatSelector};
use crate::query::stats::StatsEngine;
use crate::query::time::{default_lookback, resolve_range};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryApmStatsInput {
    pub service: String,
    /// Operation or resource name.
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl QueryApmStatsInput {
    fn selector(&self) -> StatSelector {
        StatSelector {
            service: self.service.clone(),
            operation: non_empty(&self.operation).map(str::to_string),
            environment: non_empty(&self.env).map(str::to_string),
        }
    }
}

pub async fn query_apm_stats(
    ctx: &ToolContext<'_>,
    input: QueryApmStatsInput,
) -> Result<ToolResponse<DerivedStats>, QueryError> {
    let range = resolve_range(
        input.from.as_deref(),
        input.to.as_deref(),
        ctx.now,
        default_lookback(),
    )?;
    let stats = StatsEngine::new(ctx.backend)
        .compute(&input.selector(), range)
        .await?;

    Ok(ToolResponse {
        text: render(&stats),
        data: stats,
    })
}

fn or_na(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

pub fn render(stats: &DerivedStats) -> String {
    let sel = &stats.selector;
    let mut text = format!("APM Stats for service: {}\n", sel.service);
    if let Some(op) = &sel.operation {
        text.push_str(&format!("Operation: {}\n", op));
    }
    if let Some(env) = &sel.environment {
        text.push_str(&format!("Environment: {}\n", env));
    }
    text.push_str(&format!(
        "Time Range: {} to {}\n",
        fmt_instant(stats.time_range.from()),
        fmt_instant(stats.time_range.to())
    ));

    if let Some(latency) = &stats.latency {
        text.push_str("\nLatency:\n");
        text.push_str(&format!("  Avg: {} ms\n", or_na(latency.avg, 2)));
        text.push_str(&format!("  P95: {} ms\n", or_na(latency.p95, 2)));
    }
    if let Some(er) = &stats.error_rate {
        text.push_str("\nError Rate:\n");
        text.push_str(&format!("  Errors: {}\n", or_na(er.error_count, 0)));
        text.push_str(&format!("  Total: {}\n", or_na(er.total_count, 0)));
        match er.error_percent {
            Some(p) => text.push_str(&format!("  Rate: {:.2}%\n", p)),
            None => text.push_str("  Rate: n/a\n"),
        }
    }
    if let Some(tp) = &stats.throughput {
        text.push_str("\nThroughput:\n");
        text.push_str(&format!("  Requests/sec: {}\n", or_na(tp.requests_per_second, 2)));
        text.push_str(&format!("  Total Requests: {:.0}\n", tp.total_requests));
    }
    if stats.latency.is_none() && stats.error_rate.is_none() && stats.throughput.is_none() {
        text.push_str("\nNo data returned for this service in the requested window.\n");
    }
    text.push_str(&format!("\nNote: {}\n", stats.notes));
    text
}
