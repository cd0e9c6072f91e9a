//! Lazy enumeration of page-numbered listings
//!
//! [`enumerate_all`] requests pages 1, 2, ... on demand and stops at the
//! first empty page. A page error is yielded once and ends the stream.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::collections::VecDeque;
use std::future::Future;

use super::error::ApiError;

/// Page size used by listings and name searches
pub const DEFAULT_PAGE_SIZE: u32 = 100;

struct PageState<T, F> {
    fetch_page: F,
    page_size: u32,
    next_page: u32,
    buffered: VecDeque<T>,
    finished: bool,
}

/// Streams every item of a listing, fetching pages only as they are consumed
pub fn enumerate_all<T, F, Fut>(
    page_size: u32,
    fetch_page: F,
) -> impl Stream<Item = Result<T, ApiError>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    let state = PageState {
        fetch_page,
        page_size,
        next_page: 1,
        buffered: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffered.pop_front() {
                return Some((Ok(item), state));
            }
            if state.finished {
                return None;
            }

            let page = state.next_page;
            match (state.fetch_page)(page, state.page_size).await {
                Ok(items) if items.is_empty() => {
                    tracing::debug!("Page {} is empty, listing complete", page);
                    return None;
                }
                Ok(items) => {
                    tracing::debug!("Fetched page {} with {} items", page, items.len());
                    state.buffered.extend(items);
                    state.next_page += 1;
                }
                Err(e) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            }
        }
    })
}

/// Gathers the full inventory; any page error discards what was gathered
pub async fn collect_all<T, S>(stream: S) -> Result<Vec<T>, ApiError>
where
    S: Stream<Item = Result<T, ApiError>>,
{
    stream.try_collect().await
}

/// Returns the first item matching `predicate` without fetching later pages
pub async fn find_first<T, S, P>(stream: S, mut predicate: P) -> Result<Option<T>, ApiError>
where
    S: Stream<Item = Result<T, ApiError>>,
    P: FnMut(&T) -> bool,
{
    futures::pin_mut!(stream);
    while let Some(item) = stream.next().await {
        let item = item?;
        if predicate(&item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}
