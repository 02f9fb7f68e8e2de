use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure reported by an observability backend for a single call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend rejected query: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid time expression '{expr}': {reason}")]
    InvalidTimeExpression { expr: String, reason: String },

    #[error("invalid time range: 'from' ({from}) must not be after 'to' ({to})")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("query '{query}' over {from} to {to} failed: {source}")]
    Backend {
        query: String,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        #[source]
        source: BackendError,
    },

    #[error("{operation} failed: {source}")]
    Listing {
        operation: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("all stat queries failed for service '{service}': {}", failures.join("; "))]
    AllQueriesFailed {
        service: String,
        failures: Vec<String>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl QueryError {
    pub(crate) fn invalid_time(expr: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidTimeExpression {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    /// Map a listing failure, promoting backend "not found" to a caller-facing error.
    pub(crate) fn listing(operation: &'static str, source: BackendError) -> Self {
        match source {
            BackendError::NotFound(what) => QueryError::NotFound(what),
            source => QueryError::Listing { operation, source },
        }
    }

    /// Short machine-readable code, used in structured tool errors.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidTimeExpression { .. } => "invalid_time_expression",
            QueryError::InvalidRange { .. } => "invalid_range",
            QueryError::InvalidSelector(_) => "invalid_selector",
            QueryError::Backend { .. } | QueryError::Listing { .. } => "backend_query_failure",
            QueryError::AllQueriesFailed { .. } => "all_queries_failed",
            QueryError::Cancelled => "cancelled",
            QueryError::UnknownTool(_) => "unknown_tool",
            QueryError::InvalidArguments { .. } => "invalid_arguments",
            QueryError::NotFound(_) => "not_found",
        }
    }
}
