use serde::{Deserialize, Serialize};

use super::{non_empty, ToolContext, ToolResponse};
use crate::errors::QueryError;
use crate::models::spans::{Span, SpanSearch};
use crate::query::time::{resolve_range, span_lookback};
use crate::query::window::{CursorPage, WindowPolicy};

const DEFAULT_SPAN_LIMIT: usize = 50;
const MAX_SPAN_LIMIT: usize = 1000;
/// Spans written into the summary text; the structured payload has all of them.
const MAX_DISPLAYED_SPANS: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuerySpansInput {
    /// Span search query, e.g. `service:web @http.status_code:500`. Defaults to `*`.
    pub query: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    /// Cursor from a previous response.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuerySpansResult {
    pub spans: Vec<Span>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

pub async fn query_spans(
    ctx: &ToolContext<'_>,
    input: QuerySpansInput,
) -> Result<ToolResponse<QuerySpansResult>, QueryError> {
    let query = non_empty(&input.query).unwrap_or("*").to_string();
    let range = resolve_range(
        input.from.as_deref(),
        input.to.as_deref(),
        ctx.now,
        span_lookback(),
    )?;
    let limit = WindowPolicy::new(DEFAULT_SPAN_LIMIT, MAX_SPAN_LIMIT).effective_limit(input.limit);

    let search = SpanSearch {
        query: query.clone(),
        from: range.from(),
        to: range.to(),
        limit: limit as u32,
        cursor: non_empty(&input.cursor).map(str::to_string),
    };
    let batch = ctx
        .backend
        .search_spans(&search)
        .await
        .map_err(|source| QueryError::Backend {
            query: query.clone(),
            from: range.from(),
            to: range.to(),
            source,
        })?;

    let page = CursorPage::from_backend(batch.spans, batch.next_cursor);
    let total = page.items.len();

    let mut text = format!("Found {} spans matching query: {}\n\n", total, query);
    for (i, span) in page.items.iter().enumerate() {
        if i >= MAX_DISPLAYED_SPANS {
            text.push_str(&format!(
                "\n... and {} more spans (see structured output for full results)",
                total - MAX_DISPLAYED_SPANS
            ));
            break;
        }
        text.push_str(&format!("[{}] {} / {}\n", i + 1, span.service, span.name));
        text.push_str(&format!("    Resource: {}\n", span.resource));
        text.push_str(&format!(
            "    Status: {}, Duration: {:.2}ms\n",
            span.status,
            span.duration_ms()
        ));
        text.push_str(&format!("    TraceID: {}, SpanID: {}\n\n", span.trace_id, span.span_id));
    }
    if let Some(cursor) = &page.next_cursor {
        text.push_str(&format!("\nNext page cursor: {}", cursor));
    }

    Ok(ToolResponse {
        text,
        data: QuerySpansResult {
            total_count: total,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
            spans: page.items,
        },
    })
}
