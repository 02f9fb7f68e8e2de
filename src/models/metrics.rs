use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single data point in a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A metric timeseries with its data points, ordered by timestamp ascending.
///
/// A series with zero points is a valid answer ("no data in the window") and
/// is distinct from a failed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, rename = "data_points")]
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(metric: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            metric: metric.into(),
            tags: Vec::new(),
            unit: None,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Arithmetic mean of the points, `None` for an empty series.
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.sum() / self.points.len() as f64)
    }
}

/// Structured payload of the `query_metrics` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetricsResult {
    pub series: Vec<Series>,
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_series: usize,
    pub series_dropped: usize,
    pub points_dropped: usize,
    pub truncated: bool,
}

/// Structured payload of the `list_metrics` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMetricsResult {
    pub metrics: Vec<String>,
    /// Unix seconds of the activity lookback start.
    pub from: i64,
    pub total: usize,
    pub offset: usize,
    pub has_more: bool,
}
