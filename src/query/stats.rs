//! Derived service statistics.
//!
//! Four independent timeseries queries (average latency, p95 latency, error
//! count, hit count) are issued concurrently and folded into one
//! [`DerivedStats`]. A failed or empty sub-query only leaves its own field
//! unset; it never aborts the others.

use std::future::Future;
use std::time::Instant;

use crate::backend::MetricQueryClient;
use crate::errors::QueryError;
use crate::models::metrics::Series;
use crate::models::stats::{
    DerivedStats, ErrorRateStats, LatencyStats, StatSelector, ThroughputStats, TimeRange,
    COARSE_SUMMARY_NOTE,
};
use crate::query::window::{window, WindowPolicy, WindowRequest};

/// Trace duration metrics are reported in nanoseconds.
const NANOS_PER_MILLI: f64 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatQuery {
    AvgLatency,
    P95Latency,
    Errors,
    Hits,
}

impl StatQuery {
    pub const ALL: [StatQuery; 4] = [
        StatQuery::AvgLatency,
        StatQuery::P95Latency,
        StatQuery::Errors,
        StatQuery::Hits,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatQuery::AvgLatency => "avg_latency",
            StatQuery::P95Latency => "p95_latency",
            StatQuery::Errors => "errors",
            StatQuery::Hits => "hits",
        }
    }

    /// Metric query string for `service` scoped by `tags`.
    pub fn build(&self, service: &str, tags: &str) -> String {
        match self {
            StatQuery::AvgLatency => format!("avg:trace.{}.duration{{{}}}", service, tags),
            StatQuery::P95Latency => format!("p95:trace.{}.duration{{{}}}", service, tags),
            StatQuery::Errors => format!("sum:trace.{}.errors{{{}}}.as_count()", service, tags),
            StatQuery::Hits => format!("sum:trace.{}.hits{{{}}}.as_count()", service, tags),
        }
    }
}

/// Computes [`DerivedStats`] against any metric query client.
pub struct StatsEngine<'a, C: MetricQueryClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: MetricQueryClient + ?Sized> StatsEngine<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Issue the four stat queries and fold whatever came back.
    ///
    /// Fails only on an invalid selector or when every sub-query errored.
    pub async fn compute(
        &self,
        selector: &StatSelector,
        range: TimeRange,
    ) -> Result<DerivedStats, QueryError> {
        selector.validate()?;
        let tags = selector.tag_filter();

        let (avg, p95, errors, hits) = tokio::join!(
            self.run(StatQuery::AvgLatency, &selector.service, &tags, range),
            self.run(StatQuery::P95Latency, &selector.service, &tags, range),
            self.run(StatQuery::Errors, &selector.service, &tags, range),
            self.run(StatQuery::Hits, &selector.service, &tags, range),
        );

        let failures: Vec<String> = [&avg, &p95, &errors, &hits]
            .into_iter()
            .zip(StatQuery::ALL)
            .filter_map(|(slot, kind)| {
                slot.as_ref()
                    .err()
                    .map(|e| format!("{}: {}", kind.name(), e))
            })
            .collect();
        if failures.len() == StatQuery::ALL.len() {
            tracing::error!(service = %selector.service, "every stat query failed");
            return Err(QueryError::AllQueriesFailed {
                service: selector.service.clone(),
                failures,
            });
        }

        let avg = settle(StatQuery::AvgLatency, avg);
        let p95 = settle(StatQuery::P95Latency, p95);
        let errors = settle(StatQuery::Errors, errors);
        let hits = settle(StatQuery::Hits, hits);

        let stats = fold(selector.clone(), range, avg, p95, errors, hits);
        tracing::info!(
            service = %selector.service,
            latency = stats.latency.is_some(),
            error_rate = stats.error_rate.is_some(),
            throughput = stats.throughput.is_some(),
            "derived stats computed"
        );
        Ok(stats)
    }

    /// Like [`compute`](Self::compute), abandoning all in-flight queries once
    /// `cancel` completes. No partial result is returned on cancellation.
    pub async fn compute_until<F>(
        &self,
        selector: &StatSelector,
        range: TimeRange,
        cancel: F,
    ) -> Result<DerivedStats, QueryError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::warn!(service = %selector.service, "stats computation cancelled");
                Err(QueryError::Cancelled)
            }
            result = self.compute(selector, range) => result,
        }
    }

    async fn run(
        &self,
        kind: StatQuery,
        service: &str,
        tags: &str,
        range: TimeRange,
    ) -> Result<Vec<Series>, QueryError> {
        let query = kind.build(service, tags);
        let started = Instant::now();
        let result = self
            .client
            .query_metrics(&query, range.from(), range.to())
            .await
            .map_err(|source| QueryError::Backend {
                query: query.clone(),
                from: range.from(),
                to: range.to(),
                source,
            });
        tracing::debug!(
            query = %query,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stat query finished"
        );
        result
    }
}

/// Reduce one slot to its first non-empty series, logging failures.
fn settle(kind: StatQuery, slot: Result<Vec<Series>, QueryError>) -> Option<Series> {
    let series = match slot {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(stat = kind.name(), error = %e, "stat query failed, field left unset");
            return None;
        }
    };
    // Intermediate results go through the same windowing as caller-facing
    // lists: a one-item window, since the tag filter selects a single group.
    let page = window(series, WindowRequest::new(Some(0), Some(1)), WindowPolicy::default());
    if page.has_more {
        tracing::debug!(
            stat = kind.name(),
            ignored = page.total_count - page.items.len(),
            "stat query returned extra series"
        );
    }
    page.items.into_iter().next().filter(|s| !s.is_empty())
}

fn fold(
    selector: StatSelector,
    time_range: TimeRange,
    avg: Option<Series>,
    p95: Option<Series>,
    errors: Option<Series>,
    hits: Option<Series>,
) -> DerivedStats {
    let avg_ms = avg.and_then(|s| s.mean()).map(|v| v / NANOS_PER_MILLI);
    let p95_ms = p95.and_then(|s| s.mean()).map(|v| v / NANOS_PER_MILLI);
    let latency = (avg_ms.is_some() || p95_ms.is_some()).then_some(LatencyStats {
        avg: avg_ms,
        p95: p95_ms,
    });

    let error_count = errors.map(|s| s.sum());
    let total_count = hits.map(|s| s.sum());

    let error_percent = match (error_count, total_count) {
        (Some(e), Some(t)) if t > 0.0 => Some(100.0 * e / t),
        _ => None,
    };
    let error_rate = (error_count.is_some() || total_count.is_some()).then_some(ErrorRateStats {
        error_count,
        total_count,
        error_percent,
    });

    let duration = time_range.duration_seconds();
    let throughput = total_count.map(|total| ThroughputStats {
        total_requests: total,
        requests_per_second: (total > 0.0 && duration > 0.0).then(|| total / duration),
    });

    DerivedStats {
        selector,
        time_range,
        latency,
        error_rate,
        throughput,
        notes: COARSE_SUMMARY_NOTE.to_string(),
    }
}
