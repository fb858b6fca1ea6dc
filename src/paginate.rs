//! Cursor pagination for "everything older than X" endpoints.

use anyhow::{Context, Result};
use std::future::Future;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// One page of results in provider order.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_next: bool,
}

/// Fetch pages until the provider reports no more, concatenating them in
/// provider order.
///
/// The first request has no cursor; each following request passes
/// `cursor_of(last item of the previous page)`. More than `max_pages` pages
/// is an error, as is any failed page.
pub async fn fetch_all<T, C, F, Fut>(max_pages: usize, cursor_of: C, mut fetch_page: F) -> Result<Vec<T>>
where
    C: Fn(&T) -> String,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    for page_number in 1..=max_pages {
        let page = fetch_page(cursor.take())
            .await
            .with_context(|| format!("Failed to fetch page {}", page_number))?;
        debug!(
            "Page {}: {} items, has_next={}",
            page_number,
            page.data.len(),
            page.has_next
        );

        if !page.has_next {
            items.extend(page.data);
            return Ok(items);
        }

        let Some(last) = page.data.last() else {
            warn!(
                "Page {} is empty but claims more pages follow; stopping",
                page_number
            );
            return Ok(items);
        };
        cursor = Some(cursor_of(last));
        items.extend(page.data);
    }

    Err(PipelineError::PageLimit(max_pages).into())
}
