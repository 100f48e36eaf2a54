//! Cursor-following page walker. The API caps page sizes and routinely
//! returns short or empty pages, so termination is driven by the cursor
//! alone: the walk ends exactly when a response carries no next cursor,
//! never on an item-count heuristic.
//!
//! The sequence is restartable only from the beginning; checkpointing happens
//! at the caller's granularity (one video = one shard), not per page.

use crate::api::Page;
use crate::error::ApiResult;

/// Drain every page into one flat vector.
pub fn drain_pages<T, F>(fetch: F) -> ApiResult<Vec<T>>
where
    F: FnMut(Option<&str>) -> ApiResult<Page<T>>,
{
    let mut out = Vec::new();
    for_each_page(fetch, |items| out.extend(items))?;
    Ok(out)
}

/// Walk the cursor chain, handing each batch of items to `sink`. The cursor
/// from each response is passed back verbatim on the next call.
pub fn for_each_page<T, F, S>(mut fetch: F, mut sink: S) -> ApiResult<()>
where
    F: FnMut(Option<&str>) -> ApiResult<Page<T>>,
    S: FnMut(Vec<T>),
{
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.as_deref())?;
        sink(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(()),
        }
    }
}
