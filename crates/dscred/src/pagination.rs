//! Lazy page-by-page listing
//!
//! List endpoints are exposed as streams of items. Pages are fetched on
//! demand and the stream ends when [`Page::has_more`] says so.

use crate::error::{Error, Result};
use crate::models::{Page, PageRequest};
use futures::stream::{self, Stream, TryStreamExt};
use std::future::Future;

/// Turn a page fetcher into a stream over every item of every page.
///
/// `fetch` is called with page 1, 2, ... until the server reports no more
/// pages. The first error ends the stream.
pub fn paginate<'a, T, F, Fut>(page_size: u32, fetch: F) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: Fn(PageRequest) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>>> + 'a,
{
    stream::try_unfold(Some(PageRequest::first(page_size)), move |next| {
        let pending = next.map(|request| (request, fetch(request)));
        async move {
            let Some((request, fut)) = pending else {
                return Ok::<_, Error>(None);
            };
            let page = fut.await?;
            let following = page.has_more(request).then(|| request.next());
            Ok::<_, Error>(Some((page.items, following)))
        }
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, Error>)))
    .try_flatten()
}
