//! Bounded, resumable pages over list-shaped results.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Caller-supplied paging parameters. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WindowRequest {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl WindowRequest {
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        Self { offset, limit }
    }
}

/// Per-endpoint paging limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
            max_limit: MAX_PAGE_SIZE,
        }
    }
}

impl WindowPolicy {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// Limit actually applied: missing or non-positive means default, capped at `max_limit`.
    pub fn effective_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(n) if n > 0 => (n as u64).min(self.max_limit as u64) as usize,
            _ => self.default_limit,
        }
    }
}

/// One offset-based window over a larger collection.
///
/// `window_start + items.len() <= total_count` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub window_start: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Offset of the following page, if there is one.
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more.then(|| self.window_start + self.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slice `items` down to the requested window.
pub fn window<T>(items: Vec<T>, req: WindowRequest, policy: WindowPolicy) -> Page<T> {
    let total_count = items.len();
    let limit = policy.effective_limit(req.limit);
    let offset = req.offset.unwrap_or(0).max(0) as u64;

    if offset >= total_count as u64 {
        return Page {
            items: Vec::new(),
            total_count,
            window_start: total_count,
            has_more: false,
        };
    }

    let start = offset as usize;
    let end = start.saturating_add(limit).min(total_count);
    let items: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
    let has_more = start + items.len() < total_count;

    Page {
        items,
        total_count,
        window_start: start,
        has_more,
    }
}

/// One page of a cursor-paged result. The token is opaque and passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> CursorPage<T> {
    pub fn from_backend(items: Vec<T>, token: Option<String>) -> Self {
        let next_cursor = token.filter(|t| !t.is_empty());
        Self {
            has_more: next_cursor.is_some(),
            items,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_last_page_of_150() {
        let page = window(numbers(150), WindowRequest::new(Some(100), Some(50)), WindowPolicy::default());
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.items.first(), Some(&100));
        assert_eq!(page.items.last(), Some(&149));
        assert_eq!(page.total_count, 150);
        assert!(!page.has_more);
        assert_eq!(page.next_offset(), None);
    }

    #[test]
    fn test_first_page_reports_more() {
        let page = window(numbers(150), WindowRequest::default(), WindowPolicy::default());
        assert_eq!(page.items.len(), 100);
        assert_eq!(page.window_start, 0);
        assert!(page.has_more);
        assert_eq!(page.next_offset(), Some(100));
    }

    #[test]
    fn test_negative_offset_clamps_to_zero() {
        let page = window(numbers(10), WindowRequest::new(Some(-5), Some(3)), WindowPolicy::default());
        assert_eq!(page.items, vec![0, 1, 2]);
        assert_eq!(page.window_start, 0);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let page = window(numbers(10), WindowRequest::new(Some(25), Some(5)), WindowPolicy::default());
        assert!(page.is_empty());
        assert!(!page.has_more);
        assert!(page.window_start + page.items.len() <= page.total_count);
    }

    #[test]
    fn test_limit_defaults_and_caps() {
        let policy = WindowPolicy::new(50, 200);
        assert_eq!(policy.effective_limit(None), 50);
        assert_eq!(policy.effective_limit(Some(0)), 50);
        assert_eq!(policy.effective_limit(Some(-3)), 50);
        assert_eq!(policy.effective_limit(Some(150)), 150);
        assert_eq!(policy.effective_limit(Some(5000)), 200);
    }

    #[test]
    fn test_window_bounds_hold_for_all_sizes() {
        let policy = WindowPolicy::new(7, 20);
        for size in 0..30 {
            for offset in 0..35 {
                for limit in 1..25 {
                    let page = window(numbers(size), WindowRequest::new(Some(offset), Some(limit)), policy);
                    assert!(page.items.len() <= limit as usize);
                    assert!(page.window_start + page.items.len() <= page.total_count);
                    assert_eq!(page.total_count, size);
                    assert_eq!(page.has_more, page.window_start + page.items.len() < size);
                }
            }
        }
    }

    #[test]
    fn test_cursor_page_passes_token_through() {
        let page = CursorPage::from_backend(vec![1, 2], Some("eyJhZnRlciI6IjEyMyJ9==".to_string()));
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("eyJhZnRlciI6IjEyMyJ9=="));

        let page: CursorPage<i32> = CursorPage::from_backend(vec![], Some(String::new()));
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());

        let page: CursorPage<i32> = CursorPage::from_backend(vec![], None);
        assert!(!page.has_more);
    }
}
