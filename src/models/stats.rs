//! Value types of the derived-statistics engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

/// A resolved, validated time window. `from <= to` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, QueryError> {
        if from > to {
            return Err(QueryError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Window length in seconds, including sub-second precision.
    pub fn duration_seconds(&self) -> f64 {
        let d = self.to - self.from;
        match d.num_nanoseconds() {
            Some(ns) => ns as f64 / 1e9,
            None => d.num_milliseconds() as f64 / 1e3,
        }
    }
}

/// Which slice of telemetry a stats query targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSelector {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, rename = "env", skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl StatSelector {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: None,
            environment: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Reject selectors the backend cannot scope a query to.
    ///
    /// Operation and env are passed through verbatim.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.service.trim().is_empty() {
            return Err(QueryError::InvalidSelector("service is required".into()));
        }
        Ok(())
    }

    /// Tag filter in stable order: service, then resource name, then env.
    pub fn tag_filter(&self) -> String {
        let mut tags = format!("service:{}", self.service);
        if let Some(op) = self.operation.as_deref().filter(|s| !s.is_empty()) {
            tags.push_str(&format!(",resource_name:{}", op));
        }
        if let Some(env) = self.environment.as_deref().filter(|s| !s.is_empty()) {
            tags.push_str(&format!(",env:{}", env));
        }
        tags
    }
}

/// Latency averages in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    #[serde(rename = "avg_ms", skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(rename = "p95_ms", skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRateStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<f64>,
    /// Unset when it cannot be computed; never defaulted to zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    pub total_requests: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<f64>,
}

/// Caveat attached to every stats result.
pub const COARSE_SUMMARY_NOTE: &str = "Values are averages of backend pre-aggregated series \
     (mean of means), not percentiles recomputed from raw samples.";

/// Health summary of one selector over one window.
///
/// Each section is present only when the queries feeding it returned data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStats {
    #[serde(flatten)]
    pub selector: StatSelector,
    pub time_range: TimeRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<ErrorRateStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<ThroughputStats>,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_time_range_rejects_inverted_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let err = TimeRange::new(now, now - Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange { .. }));
    }

    #[test]
    fn test_time_range_allows_empty_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let range = TimeRange::new(now, now).unwrap();
        assert_eq!(range.duration_seconds(), 0.0);
    }

    #[test]
    fn test_duration_seconds() {
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let range = TimeRange::new(to - Duration::hours(1), to).unwrap();
        assert_eq!(range.duration_seconds(), 3600.0);
    }

    #[test]
    fn test_tag_filter_order_is_stable() {
        assert_eq!(StatSelector::new("checkout").tag_filter(), "service:checkout");
        let sel = StatSelector::new("checkout")
            .with_environment("prod")
            .with_operation("GET /cart");
        assert_eq!(
            sel.tag_filter(),
            "service:checkout,resource_name:GET /cart,env:prod"
        );
    }

    #[test]
    fn test_tag_filter_skips_empty_optionals() {
        let sel = StatSelector::new("web").with_operation("").with_environment("");
        assert_eq!(sel.tag_filter(), "service:web");
    }

    #[test]
    fn test_selector_validation() {
        assert!(StatSelector::new("checkout").validate().is_ok());
        assert!(matches!(
            StatSelector::new("  ").validate(),
            Err(QueryError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_selector_passes_resource_names_through() {
        let sel = StatSelector::new("db").with_operation("SELECT a, b FROM t");
        assert!(sel.validate().is_ok());
        assert_eq!(
            sel.tag_filter(),
            "service:db,resource_name:SELECT a, b FROM t"
        );
    }
}
