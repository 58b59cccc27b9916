//! Entity set and single-entity handles
//!
//! Handles are cheap descriptions of a resource path relative to the
//! container's base URI. Nothing is sent until a read, save or action is
//! invoked on them.

use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use log::info;
use reqwest::Method;
use std::marker::PhantomData;
use url::Url;

use super::container::BookingsContainer;
use super::error::{ODataError, Result};
use super::models::{
    BookingAppointment, BookingBusiness, BookingCustomer, BookingService, BookingStaffMember,
    Entity,
};
use super::paging::{ODataPage, Pages};

/// Render an entity key as an OData key segment: `('key')`
pub fn key_segment(key: &str) -> String {
    let escaped = key.replace('\'', "''");
    format!("('{}')", urlencoding::encode(&escaped))
}

/// A collection resource such as `bookingBusinesses` or
/// `bookingBusinesses('id')/appointments`
pub struct EntitySet<'c, T> {
    container: &'c BookingsContainer,
    path: String,
    query: Vec<(String, String)>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntitySet<'_, T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container,
            path: self.path.clone(),
            query: self.query.clone(),
            _entity: PhantomData,
        }
    }
}

impl<'c, T: Entity> EntitySet<'c, T> {
    pub(crate) fn new(container: &'c BookingsContainer, path: impl Into<String>) -> Self {
        Self {
            container,
            path: path.into(),
            query: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Add a query option such as `$filter` or `$select`
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn container(&self) -> &'c BookingsContainer {
        self.container
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute request URI, query options included
    pub fn request_uri(&self) -> Result<Url> {
        let mut url = self.container.resolve(&self.path)?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// The entity set path relative to the container's base URI
    pub fn relative_path(&self) -> Result<String> {
        let mut url = self.request_uri()?;
        url.set_query(None);
        self.container
            .base_uri()
            .make_relative(&url)
            .ok_or_else(|| ODataError::InvalidUrl(url.to_string()))
    }

    /// A single entity in this set
    pub fn by_key(&self, key: &str) -> EntityRef<'c, T> {
        EntityRef::new(self.container, format!("{}{}", self.path, key_segment(key)))
    }

    /// Lazy page-by-page reader starting at this set
    pub fn pages(&self) -> Result<Pages<'c, T>> {
        Ok(Pages::new(self.container, self.request_uri()?))
    }

    /// The first page as the server returned it
    pub async fn first_page(&self) -> Result<ODataPage<T>> {
        self.container.get_json(self.request_uri()?).await
    }

    /// The first entity of the set, if any
    pub async fn first(&self) -> Result<Option<T>> {
        let top = self.clone().with_query("$top", "1");
        let page = top.first_page().await?;
        Ok(page.value.into_iter().next())
    }

    /// Every entity of the set, following `@odata.nextLink` until exhausted
    ///
    /// Each new page is fetched only when the stream reaches it.
    pub fn get_all_pages(&self) -> Result<impl Stream<Item = Result<T>> + use<'c, T>>
    where
        T: 'c,
    {
        Ok(self.pages()?.into_stream())
    }

    /// Drain every page into memory
    pub async fn collect_all(&self) -> Result<Vec<T>>
    where
        T: 'c,
    {
        self.get_all_pages()?.try_collect().await
    }
}

/// A single, already identified entity
pub struct EntityRef<'c, T> {
    container: &'c BookingsContainer,
    path: String,
    _entity: PhantomData<fn() -> T>,
}

impl<'c, T: Entity> EntityRef<'c, T> {
    pub(crate) fn new(container: &'c BookingsContainer, path: String) -> Self {
        Self {
            container,
            path,
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn uri(&self) -> Result<Url> {
        self.container.resolve(&self.path)
    }

    /// Fetch the entity
    pub async fn get_value(&self) -> Result<T> {
        self.container.get_json(self.uri()?).await
    }

    pub async fn delete(&self) -> Result<()> {
        info!("Deleting {}", self.path);
        self.container
            .send_json(Method::DELETE, self.uri()?, None)
            .await?;
        Ok(())
    }

    /// Navigate to a collection-valued property of this entity
    pub fn navigate<U: Entity>(&self, property: &str) -> EntitySet<'c, U> {
        EntitySet::new(self.container, format!("{}/{}", self.path, property))
    }

    /// Invoke a bound action that takes no parameters
    pub async fn invoke_action(&self, action: &str) -> Result<()> {
        let url = self.container.resolve(&format!("{}/{}", self.path, action))?;
        info!("Invoking {} on {}", action, self.path);
        self.container.send_json(Method::POST, url, None).await?;
        Ok(())
    }
}

impl<'c> EntityRef<'c, BookingBusiness> {
    pub fn staff_members(&self) -> EntitySet<'c, BookingStaffMember> {
        self.navigate("staffMembers")
    }

    pub fn services(&self) -> EntitySet<'c, BookingService> {
        self.navigate("services")
    }

    /// The server caps the number of appointments per response; read them
    /// with `get_all_pages` or use `calendar_view`.
    pub fn appointments(&self) -> EntitySet<'c, BookingAppointment> {
        self.navigate("appointments")
    }

    pub fn customers(&self) -> EntitySet<'c, BookingCustomer> {
        self.navigate("customers")
    }

    /// Appointments (occurrences expanded) between `start` and `end`
    pub fn calendar_view(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EntitySet<'c, BookingAppointment> {
        self.navigate("calendarView")
            .with_query("start", start.to_rfc3339())
            .with_query("end", end.to_rfc3339())
    }

    /// Make the business's public page visible to customers
    pub async fn publish(&self) -> Result<()> {
        self.invoke_action("publish").await
    }

    pub async fn unpublish(&self) -> Result<()> {
        self.invoke_action("unpublish").await
    }
}
