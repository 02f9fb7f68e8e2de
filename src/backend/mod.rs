//! The observability backend, seen from this crate.
//!
//! Transport, authentication and wire formats live behind these traits.
//! Implementations must be safe to call concurrently: the stats engine issues
//! several `query_metrics` calls at once.

pub mod snapshot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::BackendError;
use crate::models::dashboards::{Dashboard, DashboardSummary};
use crate::models::metrics::Series;
use crate::models::services::ServiceInfo;
use crate::models::spans::{SpanBatch, SpanSearch};

pub use snapshot::SnapshotBackend;

#[async_trait]
pub trait MetricQueryClient: Send + Sync {
    /// Run a timeseries query over `[from, to]`.
    async fn query_metrics(
        &self,
        query: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Series>, BackendError>;
}

/// Filters for dashboard listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub shared_only: bool,
    pub include_deleted: bool,
}

#[async_trait]
pub trait ObservabilityBackend: MetricQueryClient {
    /// Names of metrics that reported since `from`.
    async fn list_metrics(
        &self,
        from: DateTime<Utc>,
        host: Option<&str>,
        tag_filter: Option<&str>,
    ) -> Result<Vec<String>, BackendError>;

    async fn list_services(&self) -> Result<Vec<ServiceInfo>, BackendError>;

    async fn search_spans(&self, search: &SpanSearch) -> Result<SpanBatch, BackendError>;

    async fn list_dashboards(
        &self,
        filter: DashboardFilter,
    ) -> Result<Vec<DashboardSummary>, BackendError>;

    async fn get_dashboard(&self, id: &str) -> Result<Dashboard, BackendError>;
}
