//! Request policies applied by the container before dispatch
//!
//! Policies run in the order the container registers them; each one sees the
//! request through the narrow `ODataRequestMessage` surface.

use uuid::Uuid;

use super::constants::headers;
use super::container::{ContainerOptions, TokenProvider};
use super::error::Result;
use super::preference::PreferenceHeader;
use super::request::ODataRequestMessage;

/// A cross-cutting rule applied to every outgoing request
pub trait RequestPolicy: Send + Sync {
    fn apply(
        &self,
        options: &ContainerOptions,
        message: &mut dyn ODataRequestMessage,
    ) -> Result<()>;
}

/// Stamps a freshly generated `client-request-id` for server-side tracing
pub struct CorrelationIdPolicy;

impl RequestPolicy for CorrelationIdPolicy {
    fn apply(&self, _: &ContainerOptions, message: &mut dyn ODataRequestMessage) -> Result<()> {
        message.set_header(headers::CLIENT_REQUEST_ID, &Uuid::new_v4().to_string())
    }
}

/// Asks the token provider for the current `Authorization` value
///
/// The value is never cached; token lifetime belongs to the caller.
pub struct AuthorizationPolicy {
    token_provider: TokenProvider,
}

impl AuthorizationPolicy {
    pub fn new(token_provider: TokenProvider) -> Self {
        Self { token_provider }
    }
}

impl RequestPolicy for AuthorizationPolicy {
    fn apply(&self, _: &ContainerOptions, message: &mut dyn ODataRequestMessage) -> Result<()> {
        let value = (self.token_provider)();
        message.set_header(headers::AUTHORIZATION, &value)
    }
}

/// Translates the container's page-size and continue-on-error settings into `Prefer`
pub struct PreferencePolicy;

impl RequestPolicy for PreferencePolicy {
    fn apply(
        &self,
        options: &ContainerOptions,
        message: &mut dyn ODataRequestMessage,
    ) -> Result<()> {
        let mut preference = PreferenceHeader::new(message);
        preference.set_max_page_size(options.max_page_size)?;
        preference.set_continue_on_error(options.continue_on_error)
    }
}
