//! Size caps applied to every metric response, requested or not.

use serde::Serialize;

use crate::models::metrics::Series;

pub const DEFAULT_MAX_SERIES: usize = 100;
pub const DEFAULT_MAX_DATA_POINTS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesCaps {
    pub max_series: usize,
    pub max_points: usize,
}

impl Default for SeriesCaps {
    fn default() -> Self {
        Self {
            max_series: DEFAULT_MAX_SERIES,
            max_points: DEFAULT_MAX_DATA_POINTS,
        }
    }
}

impl SeriesCaps {
    /// Apply caller overrides on top of `self`; missing or non-positive values keep the default.
    pub fn with_overrides(self, max_series: Option<i64>, max_points: Option<i64>) -> Self {
        Self {
            max_series: positive(max_series).unwrap_or(self.max_series),
            max_points: positive(max_points).unwrap_or(self.max_points),
        }
    }
}

fn positive(v: Option<i64>) -> Option<usize> {
    v.filter(|n| *n > 0).map(|n| n as usize)
}

/// A series set after caps were applied, with an account of what was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruncatedSeries {
    pub series: Vec<Series>,
    pub total_series: usize,
    pub series_dropped: usize,
    pub points_dropped: usize,
    pub truncated: bool,
}

impl TruncatedSeries {
    /// Whether any single series lost points.
    pub fn points_truncated(&self) -> bool {
        self.points_dropped > 0
    }
}

pub fn truncate_series(mut series: Vec<Series>, caps: SeriesCaps) -> TruncatedSeries {
    let total_series = series.len();
    let max_series = caps.max_series.max(1);
    let max_points = caps.max_points.max(1);

    let series_dropped = total_series.saturating_sub(max_series);
    series.truncate(max_series);

    let mut points_dropped = 0;
    for s in &mut series {
        if s.points.len() > max_points {
            points_dropped += s.points.len() - max_points;
            s.points.truncate(max_points);
        }
    }

    TruncatedSeries {
        series,
        total_series,
        series_dropped,
        points_dropped,
        truncated: series_dropped > 0 || points_dropped > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::Point;
    use chrono::{TimeZone, Utc};

    fn series(name: &str, points: usize) -> Series {
        let pts = (0..points)
            .map(|i| Point::new(Utc.timestamp_opt(i as i64 * 60, 0).unwrap(), i as f64))
            .collect();
        Series::new(name, pts)
    }

    #[test]
    fn test_under_caps_is_untouched() {
        let out = truncate_series(vec![series("a", 10), series("b", 0)], SeriesCaps::default());
        assert!(!out.truncated);
        assert_eq!(out.total_series, 2);
        assert_eq!(out.series[0].points.len(), 10);
        assert!(out.series[1].is_empty());
    }

    #[test]
    fn test_series_count_cap_is_reported() {
        let input: Vec<Series> = (0..5).map(|i| series(&format!("s{}", i), 1)).collect();
        let out = truncate_series(input, SeriesCaps { max_series: 3, max_points: 10 });
        assert!(out.truncated);
        assert_eq!(out.series.len(), 3);
        assert_eq!(out.total_series, 5);
        assert_eq!(out.series_dropped, 2);
        assert_eq!(out.points_dropped, 0);
    }

    #[test]
    fn test_point_cap_keeps_earliest_points() {
        let out = truncate_series(vec![series("a", 500), series("b", 10)], SeriesCaps::default());
        assert!(out.truncated);
        assert!(out.points_truncated());
        assert_eq!(out.points_dropped, 200);
        assert_eq!(out.series[0].points.len(), 300);
        assert_eq!(out.series[0].points.last().unwrap().value, 299.0);
        assert_eq!(out.series[1].points.len(), 10);
    }

    #[test]
    fn test_overrides() {
        let caps = SeriesCaps::default().with_overrides(Some(5), None);
        assert_eq!(caps, SeriesCaps { max_series: 5, max_points: 300 });
        let caps = SeriesCaps::default().with_overrides(Some(0), Some(-1));
        assert_eq!(caps, SeriesCaps::default());
    }
}
