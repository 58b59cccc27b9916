//! Bookings service container
//!
//! The container owns the HTTP client and the request policies applied to
//! every request issued through it: a fresh `client-request-id`, the
//! caller-supplied `Authorization` header and the OData `Prefer` header.
//! It also carries the send and merge options the change tracker honours on
//! save and refresh.

use log::{debug, info, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::constants::{DEFAULT_V1_SERVICE_ROOT, headers};
use super::error::{ODataError, Result};
use super::models::{BookingBusiness, BookingCurrency, Entity};
use super::policy::{AuthorizationPolicy, CorrelationIdPolicy, PreferencePolicy, RequestPolicy};
use super::query::{EntitySet, key_segment};
use super::request::RequestAdapter;
use super::tracking::{Tracked, TrackingState};

/// Produces the `Authorization` header value for one request
pub type TokenProvider = Arc<dyn Fn() -> String + Send + Sync>;

/// Which properties of a tracked entity go out on save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendOption {
    /// Only properties set since creation or last save (POST / PATCH)
    #[default]
    OnlySetProperties,
    /// The whole entity (POST / PUT)
    FullProperties,
}

/// How a re-fetched entity is folded into a tracked local copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOption {
    /// Keep locally changed properties, take the server's value for the rest
    #[default]
    PreserveChanges,
    /// Take the server's copy and drop local changes
    OverwriteChanges,
}

/// Per-container request preferences
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// `odata.maxpagesize` preference
    pub max_page_size: Option<u32>,
    /// `odata.continue-on-error` preference
    pub continue_on_error: bool,
    /// Upstream HTTP proxy for every request
    pub web_proxy: Option<Url>,
    pub send_option: SendOption,
    pub merge_option: MergeOption,
}

impl ContainerOptions {
    pub fn builder() -> ContainerOptionsBuilder {
        ContainerOptionsBuilder::new()
    }
}

/// Builder for ContainerOptions
#[derive(Debug, Default)]
pub struct ContainerOptionsBuilder {
    options: ContainerOptions,
}

impl ContainerOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size the server is asked to honour
    pub fn max_page_size(mut self, size: Option<u32>) -> Self {
        self.options.max_page_size = size;
        self
    }

    /// Ask batch operations to continue past failures
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.options.continue_on_error = enabled;
        self
    }

    /// Route requests through an HTTP proxy
    pub fn web_proxy(mut self, proxy: Option<Url>) -> Self {
        self.options.web_proxy = proxy;
        self
    }

    pub fn send_option(mut self, option: SendOption) -> Self {
        self.options.send_option = option;
        self
    }

    pub fn merge_option(mut self, option: MergeOption) -> Self {
        self.options.merge_option = option;
        self
    }

    pub fn build(self) -> ContainerOptions {
        self.options
    }
}

/// Entry point to the Bookings OData service
pub struct BookingsContainer {
    base_uri: Url,
    http: reqwest::Client,
    policies: Vec<Box<dyn RequestPolicy>>,
    options: ContainerOptions,
}

impl BookingsContainer {
    /// Create a container for `service_root`
    ///
    /// `token_provider` is called once per request and its result sent as the
    /// `Authorization` header. Fails if `service_root` does not end in '/'.
    pub fn new<F>(service_root: Url, token_provider: F) -> Result<Self>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::with_options(service_root, token_provider, ContainerOptions::default())
    }

    pub fn with_options<F>(
        service_root: Url,
        token_provider: F,
        options: ContainerOptions,
    ) -> Result<Self>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        if !service_root.as_str().ends_with('/') {
            return Err(ODataError::InvalidServiceRoot(service_root.to_string()));
        }

        let http = build_http_client(options.web_proxy.as_ref())?;
        let policies: Vec<Box<dyn RequestPolicy>> = vec![
            Box::new(CorrelationIdPolicy),
            Box::new(AuthorizationPolicy::new(Arc::new(token_provider))),
            Box::new(PreferencePolicy),
        ];

        info!("Bookings container created for {}", service_root);

        Ok(Self {
            base_uri: service_root,
            http,
            policies,
            options,
        })
    }

    /// The default v1 service root
    pub fn default_service_root() -> Result<Url> {
        Ok(Url::parse(DEFAULT_V1_SERVICE_ROOT)?)
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub fn send_option(&self) -> SendOption {
        self.options.send_option
    }

    pub fn merge_option(&self) -> MergeOption {
        self.options.merge_option
    }

    pub fn max_page_size(&self) -> Option<u32> {
        self.options.max_page_size
    }

    /// Using the Prefer header we can control the page size of collection
    /// reads such as a business's appointments and customers.
    pub fn set_max_page_size(&mut self, size: Option<u32>) {
        self.options.max_page_size = size;
    }

    pub fn continue_on_error(&self) -> bool {
        self.options.continue_on_error
    }

    pub fn set_continue_on_error(&mut self, enabled: bool) {
        self.options.continue_on_error = enabled;
    }

    pub fn web_proxy(&self) -> Option<&Url> {
        self.options.web_proxy.as_ref()
    }

    /// Route every subsequent request through `proxy`
    pub fn set_web_proxy(&mut self, proxy: Option<Url>) -> Result<()> {
        self.http = build_http_client(proxy.as_ref())?;
        self.options.web_proxy = proxy;
        Ok(())
    }

    /// The `bookingBusinesses` entity set
    pub fn booking_businesses(&self) -> EntitySet<'_, BookingBusiness> {
        self.entity_set("bookingBusinesses")
    }

    /// The `bookingCurrencies` entity set
    pub fn booking_currencies(&self) -> EntitySet<'_, BookingCurrency> {
        self.entity_set("bookingCurrencies")
    }

    /// Any entity set, by path relative to the base URI
    pub fn entity_set<T: Entity>(&self, path: impl Into<String>) -> EntitySet<'_, T> {
        EntitySet::new(self, path)
    }

    /// Resolve a base-relative path, or pass an absolute URL through
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.base_uri.join(path)?)
    }

    /// Build a request with every container policy applied
    pub fn build_request(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Request> {
        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(headers::ODATA_VERSION, "4.0")
            .header(headers::ODATA_MAX_VERSION, "4.0");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let mut request = builder.build()?;
        {
            let mut message = RequestAdapter::new(&mut request);
            for policy in &self.policies {
                policy.apply(&self.options, &mut message)?;
            }
        }
        Ok(request)
    }

    /// Send a request and turn non-success statuses into `ODataError::Service`
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let correlation_id = request
            .headers()
            .get(headers::CLIENT_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        debug!("{} {} (client-request-id: {})", method, url, correlation_id);
        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!("{} {} -> {}", method, url, status);

        if status.is_success() {
            Ok(response)
        } else {
            warn!(
                "{} {} failed with {} (client-request-id: {})",
                method, url, status, correlation_id
            );
            Err(service_error(status, response).await)
        }
    }

    pub(crate) async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        let request = self.build_request(Method::GET, url, None)?;
        let response = self.execute(request).await?;
        Ok(response.json::<R>().await?)
    }

    /// Send `body` and return the response entity, if the service sent one
    pub(crate) async fn send_json(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<(Option<Value>, Option<String>)> {
        let request = self.build_request(method, url, body)?;
        let response = self.execute(request).await?;

        let entity_id = response
            .headers()
            .get("OData-EntityId")
            .or_else(|| response.headers().get(LOCATION))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if response.status() == StatusCode::NO_CONTENT {
            return Ok((None, entity_id));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok((None, entity_id));
        }
        Ok((Some(serde_json::from_slice(&bytes)?), entity_id))
    }

    /// Persist a tracked entity
    ///
    /// New entities are POSTed to their entity set and re-bound to the
    /// created resource. Existing entities are PATCHed (or PUT under
    /// `SendOption::FullProperties`). An entity with no recorded changes is
    /// left alone.
    pub async fn save_changes<T: Entity>(&self, tracked: &mut Tracked<T>) -> Result<()> {
        let send_option = self.options.send_option;

        match tracked.state().clone() {
            TrackingState::Added { entity_set_path } => {
                let url = self.resolve(&entity_set_path)?;
                let payload = tracked.payload(send_option)?;
                info!("Creating entity in {}", entity_set_path);

                let (body, entity_id) = self.send_json(Method::POST, url, Some(&payload)).await?;
                let created: Option<T> = body.map(serde_json::from_value).transpose()?;

                let edit_path = match created.as_ref().and_then(|entity| entity.key()) {
                    Some(key) => format!("{}{}", entity_set_path, key_segment(key)),
                    None => match entity_id {
                        Some(location) => self.relative_to_base(&location)?,
                        None => return Err(ODataError::MissingKey),
                    },
                };
                debug!("Created entity bound to {}", edit_path);
                tracked.accept_saved(created, edit_path);
            }
            TrackingState::Unchanged { edit_path } => {
                if !tracked.is_dirty() {
                    debug!("No changes to save for {}", edit_path);
                    return Ok(());
                }

                let method = match send_option {
                    SendOption::OnlySetProperties => Method::PATCH,
                    SendOption::FullProperties => Method::PUT,
                };
                let url = self.resolve(&edit_path)?;
                let payload = tracked.payload(send_option)?;
                info!("Updating {} ({})", edit_path, method);

                let (body, _) = self.send_json(method, url, Some(&payload)).await?;
                let updated: Option<T> = body.map(serde_json::from_value).transpose()?;
                tracked.accept_saved(updated, edit_path);
            }
        }
        Ok(())
    }

    /// Re-fetch a tracked entity and merge it according to the merge option
    pub async fn refresh<T: Entity>(&self, tracked: &mut Tracked<T>) -> Result<()> {
        let TrackingState::Unchanged { edit_path } = tracked.state().clone() else {
            return Err(ODataError::MissingKey);
        };
        let server: T = self.get_json(self.resolve(&edit_path)?).await?;
        tracked.merge(server, self.options.merge_option)
    }

    fn relative_to_base(&self, location: &str) -> Result<String> {
        let url = self.resolve(location)?;
        self.base_uri
            .make_relative(&url)
            .ok_or_else(|| ODataError::InvalidUrl(location.to_string()))
    }
}

impl std::fmt::Debug for BookingsContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingsContainer")
            .field("base_uri", &self.base_uri.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn build_http_client(proxy: Option<&Url>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = proxy {
        debug!("Routing requests through proxy {}", proxy);
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }
    Ok(builder.build()?)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

async fn service_error(status: StatusCode, response: Response) -> ODataError {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));
    let body = response.text().await.unwrap_or_default();

    let envelope = if is_json {
        serde_json::from_str::<ErrorEnvelope>(&body).ok()
    } else {
        None
    };

    match envelope {
        Some(ErrorEnvelope { error }) => ODataError::Service {
            status,
            code: error.code,
            message: error.message.unwrap_or(body),
        },
        None => ODataError::Service {
            status,
            code: None,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{BookingAppointment, BookingStaffMember};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn root() -> Url {
        Url::parse("https://bookings.office.net/api/v1.0/").unwrap()
    }

    fn container() -> BookingsContainer {
        BookingsContainer::new(root(), || "Bearer test-token".to_string()).unwrap()
    }

    async fn mock_container(server: &MockServer) -> BookingsContainer {
        let root = Url::parse(&format!("{}/api/v1.0/", server.uri())).unwrap();
        BookingsContainer::new(root, || "Bearer test-token".to_string()).unwrap()
    }

    fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
        request.headers().get(name).map(|v| v.to_str().unwrap())
    }

    #[test]
    fn test_service_root_must_end_with_slash() {
        let url = Url::parse("https://bookings.office.net/api/v1.0").unwrap();
        let err = BookingsContainer::new(url, String::new).unwrap_err();
        assert!(matches!(err, ODataError::InvalidServiceRoot(_)));

        assert!(BookingsContainer::new(root(), String::new).is_ok());
    }

    #[test]
    fn test_default_service_root() {
        assert_eq!(
            BookingsContainer::default_service_root().unwrap().as_str(),
            "https://bookings.office.net/api/v1.0/"
        );
    }

    #[test]
    fn test_default_policies() {
        let container = container();
        assert_eq!(container.send_option(), SendOption::OnlySetProperties);
        assert_eq!(container.merge_option(), MergeOption::PreserveChanges);
        assert_eq!(container.max_page_size(), None);
        assert!(!container.continue_on_error());
    }

    #[test]
    fn test_correlation_id_fresh_per_request() {
        let container = container();
        let mut seen = HashSet::new();

        for _ in 0..5 {
            let request = container
                .build_request(Method::GET, root(), None)
                .unwrap();
            let id = header_value(&request, "client-request-id").unwrap();
            uuid::Uuid::parse_str(id).unwrap();
            assert!(seen.insert(id.to_string()));
        }
    }

    #[test]
    fn test_token_provider_called_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let container = BookingsContainer::new(root(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            format!("Bearer token-{n}")
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = container.build_request(Method::GET, root(), None).unwrap();
        let second = container.build_request(Method::GET, root(), None).unwrap();

        assert_eq!(header_value(&first, "authorization"), Some("Bearer token-1"));
        assert_eq!(header_value(&second, "authorization"), Some("Bearer token-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_prefer_header_reflects_options() {
        let mut container = container();

        let request = container.build_request(Method::GET, root(), None).unwrap();
        assert_eq!(header_value(&request, "prefer"), None);

        container.set_max_page_size(Some(10));
        container.set_continue_on_error(true);
        let request = container.build_request(Method::GET, root(), None).unwrap();
        assert_eq!(
            header_value(&request, "prefer"),
            Some("odata.maxpagesize=10, odata.continue-on-error")
        );
    }

    #[test]
    fn test_set_web_proxy() {
        let mut container = container();
        let proxy = Url::parse("http://localhost:8888").unwrap();

        container.set_web_proxy(Some(proxy.clone())).unwrap();
        assert_eq!(container.web_proxy(), Some(&proxy));

        container.set_web_proxy(None).unwrap();
        assert_eq!(container.web_proxy(), None);
    }

    #[tokio::test]
    async fn test_requests_are_routed_through_web_proxy() {
        let proxy = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "id": "contoso" }]
            })))
            .expect(1)
            .mount(&proxy)
            .await;

        // Unresolvable host: the request only succeeds if it goes to the proxy
        let root = Url::parse("http://bookings.invalid/api/v1.0/").unwrap();
        let mut container = BookingsContainer::new(root, String::new).unwrap();
        container
            .set_web_proxy(Some(Url::parse(&proxy.uri()).unwrap()))
            .unwrap();

        let businesses = container.booking_businesses().collect_all().await.unwrap();
        assert_eq!(businesses.len(), 1);
    }

    #[test]
    fn test_options_builder() {
        let options = ContainerOptions::builder()
            .max_page_size(Some(50))
            .continue_on_error(true)
            .send_option(SendOption::FullProperties)
            .merge_option(MergeOption::OverwriteChanges)
            .build();
        let container = BookingsContainer::with_options(root(), String::new, options).unwrap();

        assert_eq!(container.max_page_size(), Some(50));
        assert!(container.continue_on_error());
        assert_eq!(container.send_option(), SendOption::FullProperties);
        assert_eq!(container.merge_option(), MergeOption::OverwriteChanges);
    }

    #[tokio::test]
    async fn test_save_new_entity_posts_only_set_properties() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1.0/bookingBusinesses"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({ "displayName": "Contoso" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "Contoso@contoso.onmicrosoft.com",
                "displayName": "Contoso",
                "isPublished": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let mut business = container
            .booking_businesses()
            .new_entity_with_change_tracking()
            .unwrap();
        business.set_display_name("Contoso");

        container.save_changes(&mut business).await.unwrap();

        assert_eq!(business.id.as_deref(), Some("Contoso@contoso.onmicrosoft.com"));
        assert!(!business.is_dirty());
        assert_eq!(
            business.state(),
            &TrackingState::Unchanged {
                edit_path: "bookingBusinesses('Contoso%40contoso.onmicrosoft.com')".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_save_new_child_entity() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1.0/bookingBusinesses('contoso')/staffMembers"))
            .and(body_json(serde_json::json!({
                "displayName": "Staff1",
                "emailAddress": "staff1@contoso.com",
                "role": "externalGuest"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "staff-1",
                "displayName": "Staff1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let business = container.booking_businesses().by_key("contoso");
        let mut staff: Tracked<BookingStaffMember> = business
            .staff_members()
            .new_entity_with_change_tracking()
            .unwrap();
        staff
            .set_email_address("staff1@contoso.com")
            .set_display_name("Staff1")
            .set_role(crate::api::models::BookingStaffRole::ExternalGuest);

        container.save_changes(&mut staff).await.unwrap();
        assert_eq!(staff.id.as_deref(), Some("staff-1"));
    }

    #[tokio::test]
    async fn test_patch_sends_only_changed_property() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1.0/bookingBusinesses('contoso')/appointments('a1')"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "a1",
                "customerName": "John Doe",
                "customerEmailAddress": "customer@contoso.com",
                "serviceId": "svc-1"
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/api/v1.0/bookingBusinesses('contoso')/appointments('a1')"))
            .and(body_json(serde_json::json!({ "customerName": "Jane Doe" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let appointment_ref = container
            .booking_businesses()
            .by_key("contoso")
            .appointments()
            .by_key("a1");
        let mut appointment: Tracked<BookingAppointment> = appointment_ref
            .patch_entity_with_change_tracking()
            .await
            .unwrap();
        appointment.set_customer_name("Jane Doe");

        container.save_changes(&mut appointment).await.unwrap();

        assert_eq!(appointment.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(appointment.service_id.as_deref(), Some("svc-1"));
        assert!(!appointment.is_dirty());
    }

    #[tokio::test]
    async fn test_save_without_changes_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let mut business = Tracked::unchanged(
            BookingBusiness::default(),
            "bookingBusinesses('contoso')",
        );
        container.save_changes(&mut business).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_preserves_local_changes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1.0/bookingBusinesses('contoso')"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "contoso",
                "displayName": "Server Name",
                "phone": "555-0199"
            })))
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let mut business = Tracked::unchanged(
            BookingBusiness::default(),
            "bookingBusinesses('contoso')",
        );
        business.set_display_name("Local Name");

        container.refresh(&mut business).await.unwrap();

        assert_eq!(business.display_name.as_deref(), Some("Local Name"));
        assert_eq!(business.phone.as_deref(), Some("555-0199"));
    }

    #[tokio::test]
    async fn test_service_error_surfaces_odata_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1.0/bookingBusinesses('missing')"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "code": "ErrorItemNotFound",
                    "message": "The specified object was not found in the store."
                }
            })))
            .mount(&server)
            .await;

        let container = mock_container(&server).await;
        let err = container
            .booking_businesses()
            .by_key("missing")
            .get_value()
            .await
            .unwrap_err();

        match err {
            ODataError::Service {
                status,
                code,
                message,
            } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(code.as_deref(), Some("ErrorItemNotFound"));
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
