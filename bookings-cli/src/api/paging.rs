//! Continuation paging over collection resources
//!
//! The service caps how many items one response carries and hands back an
//! `@odata.nextLink` for the remainder. `Pages` walks those links one request
//! at a time; `into_stream` flattens the pages into a lazy item stream.

use futures::{Stream, TryStreamExt, stream};
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

use super::container::BookingsContainer;
use super::error::{ODataError, Result};
use super::models::Entity;

/// One page of a collection response
#[derive(Debug, Clone, Deserialize)]
pub struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
}

impl<T> ODataPage<T> {
    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }
}

/// Lazy reader over a paged collection
pub struct Pages<'c, T> {
    container: &'c BookingsContainer,
    next: Option<Url>,
    visited: HashSet<Url>,
    fetched: usize,
    _entity: std::marker::PhantomData<fn() -> T>,
}

impl<'c, T: Entity> Pages<'c, T> {
    pub(crate) fn new(container: &'c BookingsContainer, first: Url) -> Self {
        Self {
            container,
            next: Some(first),
            visited: HashSet::new(),
            fetched: 0,
            _entity: std::marker::PhantomData,
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch the next page, or `None` once the server stopped sending a nextLink
    ///
    /// A nextLink pointing back at any page already fetched is a `PagingLoop`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        let page: ODataPage<T> = self.container.get_json(url.clone()).await?;
        self.fetched += 1;
        self.visited.insert(url.clone());
        debug!(
            "Page {} of {}: {} items, has_more={}",
            self.fetched,
            url.path(),
            page.value.len(),
            page.has_more()
        );

        if let Some(link) = page.next_link {
            let next = self.container.resolve(&link)?;
            if self.visited.contains(&next) {
                return Err(ODataError::PagingLoop(link));
            }
            self.next = Some(next);
        }

        Ok(Some(page.value))
    }

    /// Flatten into a stream of items in server order
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + 'c
    where
        T: 'c,
    {
        stream::try_unfold(self, |mut pages| async move {
            match pages.next_page().await? {
                Some(items) => {
                    let items = stream::iter(items.into_iter().map(Ok::<T, ODataError>));
                    Ok::<_, ODataError>(Some((items, pages)))
                }
                None => Ok(None),
            }
        })
        .try_flatten()
    }
}
