use serde::{Deserialize, Serialize};

use super::{fmt_wall, ToolContext, ToolResponse};
use crate::backend::DashboardFilter;
use crate::errors::QueryError;
use crate::models::dashboards::{Dashboard, DashboardSummary};
use crate::query::window::{window, WindowRequest};

/// Dashboards written into the summary text per page.
const MAX_DISPLAYED_DASHBOARDS: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListDashboardsInput {
    /// Only dashboards shared outside the organization.
    pub filter_shared: bool,
    /// Include deleted dashboards.
    pub filter_deleted: bool,
    pub limit: Option<i64>,
    /// 0-based offset.
    pub start: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDashboardsResult {
    pub dashboards: Vec<DashboardSummary>,
    pub total: usize,
    pub start: usize,
    pub has_more: bool,
}

pub async fn list_dashboards(
    ctx: &ToolContext<'_>,
    input: ListDashboardsInput,
) -> Result<ToolResponse<ListDashboardsResult>, QueryError> {
    let filter = DashboardFilter {
        shared_only: input.filter_shared,
        include_deleted: input.filter_deleted,
    };
    let all = ctx
        .backend
        .list_dashboards(filter)
        .await
        .map_err(|e| QueryError::listing("list_dashboards", e))?;

    let page = window(all, WindowRequest::new(input.start, input.limit), ctx.settings.page);

    let mut text = if page.is_empty() {
        format!("No dashboards in this range ({} total).\n", page.total_count)
    } else {
        format!(
            "Found {} dashboards (showing {}-{} of {} total):\n\n",
            page.items.len(),
            page.window_start + 1,
            page.window_start + page.items.len(),
            page.total_count
        )
    };

    for (i, d) in page.items.iter().enumerate() {
        if i >= MAX_DISPLAYED_DASHBOARDS {
            text.push_str(&format!(
                "\n... and {} more dashboards in this page",
                page.items.len() - MAX_DISPLAYED_DASHBOARDS
            ));
            break;
        }
        text.push_str(&format!("[{}] {}\n", d.id, d.title));
        if let Some(desc) = d.description.as_deref().filter(|s| !s.is_empty()) {
            text.push_str(&format!("  Description: {}\n", desc));
        }
        text.push_str(&format!("  Layout: {}\n", d.layout_type));
        if let Some(author) = &d.author_handle {
            text.push_str(&format!("  Author: {}\n", author));
        }
        if let Some(modified) = d.modified_at {
            text.push_str(&format!("  Modified: {}\n", fmt_wall(modified)));
        }
        text.push('\n');
    }
    if let Some(next) = page.next_offset() {
        text.push_str(&format!(
            "\nMore results available. Use start={} to get the next page.",
            next
        ));
    }

    Ok(ToolResponse {
        text,
        data: ListDashboardsResult {
            total: page.total_count,
            start: page.window_start,
            has_more: page.has_more,
            dashboards: page.items,
        },
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetDashboardInput {
    pub dashboard_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDetail {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub widget_count: usize,
}

pub async fn get_dashboard(
    ctx: &ToolContext<'_>,
    input: GetDashboardInput,
) -> Result<ToolResponse<DashboardDetail>, QueryError> {
    let id = input.dashboard_id.trim();
    if id.is_empty() {
        return Err(QueryError::InvalidArguments {
            tool: "get_dashboard".into(),
            reason: "dashboard_id must not be empty".into(),
        });
    }
    let dashboard = ctx
        .backend
        .get_dashboard(id)
        .await
        .map_err(|e| QueryError::listing("get_dashboard", e))?;

    let mut text = format!("Dashboard: {}\nID: {}\n", dashboard.title, dashboard.id);
    if let Some(desc) = dashboard.description.as_deref().filter(|s| !s.is_empty()) {
        text.push_str(&format!("Description: {}\n", desc));
    }
    text.push_str(&format!("Layout Type: {}\n", dashboard.layout_type));
    if let Some(url) = &dashboard.url {
        text.push_str(&format!("URL: {}\n", url));
    }
    if let Some(handle) = &dashboard.author_handle {
        text.push_str(&format!("Author: {}", handle));
        if let Some(name) = &dashboard.author_name {
            text.push_str(&format!(" ({})", name));
        }
        text.push('\n');
    }
    if let Some(created) = dashboard.created_at {
        text.push_str(&format!("Created: {}\n", fmt_wall(created)));
    }
    if let Some(modified) = dashboard.modified_at {
        text.push_str(&format!("Modified: {}\n", fmt_wall(modified)));
    }
    if dashboard.is_read_only {
        text.push_str("Read Only: Yes\n");
    }
    if !dashboard.tags.is_empty() {
        text.push_str(&format!("Tags: {}\n", dashboard.tags.join(", ")));
    }
    text.push_str(&format!("\nWidgets: {}\n", dashboard.widget_count()));

    if !dashboard.template_variables.is_empty() {
        text.push_str("\nTemplate Variables:\n");
        for tv in &dashboard.template_variables {
            text.push_str(&format!("  - {}", tv.name));
            if let Some(prefix) = &tv.prefix {
                text.push_str(&format!(" (prefix: {})", prefix));
            }
            if let Some(default) = &tv.default {
                text.push_str(&format!(" [default: {}]", default));
            }
            text.push('\n');
        }
    }

    Ok(ToolResponse {
        text,
        data: DashboardDetail {
            widget_count: dashboard.widget_count(),
            dashboard,
        },
    })
}
