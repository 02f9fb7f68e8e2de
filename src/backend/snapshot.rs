//! Backend served from a captured JSON document.
//!
//! Useful for offline inspection and for exercising the tools without a live
//! account. Metric queries are matched by exact query string; anything not
//! captured answers with no series.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;

use super::{DashboardFilter, MetricQueryClient, ObservabilityBackend};
use crate::errors::BackendError;
use crate::models::dashboards::{Dashboard, DashboardSummary};
use crate::models::metrics::Series;
use crate::models::services::ServiceInfo;
use crate::models::spans::{SpanBatch, SpanSearch};

/// Key used for the first page of spans.
pub const FIRST_PAGE: &str = "";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    /// Query string → series returned for it.
    #[serde(default)]
    pub metrics: HashMap<String, Vec<Series>>,
    /// Queries that fail with a backend error.
    #[serde(default)]
    pub failing: HashSet<String>,
    #[serde(default)]
    pub active_metrics: Vec<ActiveMetric>,
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
    /// Cursor → page. The first page is keyed by the empty string.
    #[serde(default)]
    pub spans: HashMap<String, SpanBatch>,
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,
    #[serde(default)]
    pub dashboard_flags: HashMap<String, DashboardFlags>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveMetric {
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Last report time; `None` means always active.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DashboardFlags {
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub deleted: bool,
}

pub struct SnapshotBackend {
    snapshot: Snapshot,
}

impl SnapshotBackend {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).context("invalid snapshot document")?;
        Ok(Self::new(snapshot))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let backend = Self::from_json(&raw)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            queries = backend.snapshot.metrics.len(),
            services = backend.snapshot.services.len(),
            dashboards = backend.snapshot.dashboards.len(),
            "snapshot loaded"
        );
        Ok(backend)
    }

    fn flags(&self, id: &str) -> DashboardFlags {
        self.snapshot.dashboard_flags.get(id).copied().unwrap_or_default()
    }
}

#[async_trait]
impl MetricQueryClient for SnapshotBackend {
    async fn query_metrics(
        &self,
        query: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Series>, BackendError> {
        if self.snapshot.failing.contains(query) {
            return Err(BackendError::Rejected(format!("query '{}' is marked failing", query)));
        }
        let Some(series) = self.snapshot.metrics.get(query) else {
            tracing::debug!(query, "query not captured in snapshot");
            return Ok(Vec::new());
        };
        // Only points inside the requested window are returned.
        Ok(series
            .iter()
            .map(|s| {
                let mut s = s.clone();
                s.points.retain(|p| p.timestamp >= from && p.timestamp <= to);
                s
            })
            .collect())
    }
}

#[async_trait]
impl ObservabilityBackend for SnapshotBackend {
    async fn list_metrics(
        &self,
        from: DateTime<Utc>,
        host: Option<&str>,
        tag_filter: Option<&str>,
    ) -> Result<Vec<String>, BackendError> {
        Ok(self
            .snapshot
            .active_metrics
            .iter()
            .filter(|m| m.last_seen.map_or(true, |t| t >= from))
            .filter(|m| host.map_or(true, |h| m.hosts.iter().any(|x| x == h)))
            .filter(|m| tag_filter.map_or(true, |t| m.tags.iter().any(|x| x == t)))
            .map(|m| m.name.clone())
            .collect())
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>, BackendError> {
        Ok(self.snapshot.services.clone())
    }

    async fn search_spans(&self, search: &SpanSearch) -> Result<SpanBatch, BackendError> {
        let key = search.cursor.as_deref().unwrap_or(FIRST_PAGE);
        let Some(batch) = self.snapshot.spans.get(key) else {
            if key == FIRST_PAGE {
                return Ok(SpanBatch::default());
            }
            return Err(BackendError::Rejected(format!("unknown cursor '{}'", key)));
        };
        let mut batch = batch.clone();
        batch.spans.truncate(search.limit as usize);
        Ok(batch)
    }

    async fn list_dashboards(
        &self,
        filter: DashboardFilter,
    ) -> Result<Vec<DashboardSummary>, BackendError> {
        Ok(self
            .snapshot
            .dashboards
            .iter()
            .filter_map(|d| {
                let flags = self.flags(&d.id);
                if flags.deleted && !filter.include_deleted {
                    return None;
                }
                if filter.shared_only && !flags.shared {
                    return None;
                }
                Some(DashboardSummary {
                    id: d.id.clone(),
                    title: d.title.clone(),
                    description: d.description.clone(),
                    layout_type: d.layout_type.clone(),
                    url: d.url.clone(),
                    author_handle: d.author_handle.clone(),
                    created_at: d.created_at,
                    modified_at: d.modified_at,
                    is_read_only: d.is_read_only,
                    is_shared: flags.shared,
                    is_deleted: flags.deleted,
                })
            })
            .collect())
    }

    async fn get_dashboard(&self, id: &str) -> Result<Dashboard, BackendError> {
        self.snapshot
            .dashboards
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("dashboard '{}'", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOC: &str = r#"{
        "metrics": {
            "avg:system.cpu.user{*}": [{
                "metric": "system.cpu.user",
                "data_points": [
                    { "timestamp": "2024-01-01T10:00:00Z", "value": 1.0 },
                    { "timestamp": "2024-01-01T11:30:00Z", "value": 2.0 }
                ]
            }]
        },
        "failing": ["avg:broken{*}"],
        "active_metrics": [
            { "name": "system.cpu.user", "hosts": ["web-1"], "tags": ["env:prod"] },
            { "name": "system.load.1", "hosts": ["db-1"] },
            { "name": "old.metric", "last_seen": "2020-01-01T00:00:00Z" }
        ],
        "dashboards": [
            { "id": "abc-123", "title": "Overview", "layout_type": "ordered" },
            { "id": "def-456", "title": "Gone", "layout_type": "free" }
        ],
        "dashboard_flags": { "def-456": { "deleted": true } }
    }"#;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_query_filters_points_to_window() {
        let backend = SnapshotBackend::from_json(DOC).unwrap();
        let series = tokio_test::block_on(backend.query_metrics(
            "avg:system.cpu.user{*}",
            noon() - chrono::Duration::hours(1),
            noon(),
        ))
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 1);
        assert_eq!(series[0].points[0].value, 2.0);
    }

    #[tokio::test]
    async fn test_uncaptured_query_is_empty_and_failing_query_errors() {
        let backend = SnapshotBackend::from_json(DOC).unwrap();
        let empty = backend.query_metrics("avg:nothing{*}", noon(), noon()).await.unwrap();
        assert!(empty.is_empty());
        assert!(backend.query_metrics("avg:broken{*}", noon(), noon()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_metrics_filters() {
        let backend = SnapshotBackend::from_json(DOC).unwrap();
        let since = noon() - chrono::Duration::hours(24);
        let all = backend.list_metrics(since, None, None).await.unwrap();
        assert_eq!(all, vec!["system.cpu.user", "system.load.1"]);
        let by_host = backend.list_metrics(since, Some("db-1"), None).await.unwrap();
        assert_eq!(by_host, vec!["system.load.1"]);
        let by_tag = backend.list_metrics(since, None, Some("env:prod")).await.unwrap();
        assert_eq!(by_tag, vec!["system.cpu.user"]);
    }

    #[tokio::test]
    async fn test_dashboards_hide_deleted_unless_asked() {
        let backend = SnapshotBackend::from_json(DOC).unwrap();
        let listed = backend.list_dashboards(DashboardFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        let listed = backend
            .list_dashboards(DashboardFilter { include_deleted: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(matches!(
            backend.get_dashboard("nope").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        assert!(SnapshotBackend::from_json("{ not json").is_err());
    }
}
