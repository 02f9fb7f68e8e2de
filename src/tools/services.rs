use serde::{Deserialize, Serialize};

use super::{ToolContext, ToolResponse};
use crate::errors::QueryError;
use crate::models::services::ServiceInfo;
use crate::query::window::{window, WindowRequest};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetApmServicesInput {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListServicesResult {
    pub services: Vec<ServiceInfo>,
    pub total: usize,
    pub offset: usize,
    pub has_more: bool,
}

pub async fn get_apm_services(
    ctx: &ToolContext<'_>,
    input: GetApmServicesInput,
) -> Result<ToolResponse<ListServicesResult>, QueryError> {
    let services = ctx
        .backend
        .list_services()
        .await
        .map_err(|e| QueryError::listing("list_services", e))?;

    let page = window(
        services,
        WindowRequest::new(input.offset, input.limit),
        ctx.settings.page,
    );

    let mut text = format!("Found {} services:\n\n", page.total_count);
    for svc in &page.items {
        text.push_str(&format!("Service: {}\n", svc.name));
        let fields = [
            ("Description", svc.description.as_deref()),
            ("Team", svc.team.as_deref()),
            ("Tier", svc.tier.as_deref()),
            ("Lifecycle", svc.lifecycle.as_deref()),
        ];
        for (label, value) in fields {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                text.push_str(&format!("  {}: {}\n", label, v));
            }
        }
        if !svc.languages.is_empty() {
            text.push_str(&format!("  Languages: {}\n", svc.languages.join(", ")));
        }
        for contact in &svc.contacts {
            text.push_str(&format!("  Contact ({}): {}\n", contact.contact_type, contact.contact));
        }
        text.push('\n');
    }
    if let Some(next) = page.next_offset() {
        text.push_str(&format!(
            "More results available. Use offset={} to get the next page.",
            next
        ));
    }

    Ok(ToolResponse {
        text,
        data: ListServicesResult {
            total: page.total_count,
            offset: page.window_start,
            has_more: page.has_more,
            services: page.items,
        },
    })
}
