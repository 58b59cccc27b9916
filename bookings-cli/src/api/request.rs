//! Request message abstraction used by the OData layer
//!
//! The OData policies only ever need to read and write named headers and to
//! look at the method and target URL of an outgoing request. `RequestAdapter`
//! presents a `reqwest::Request` through that narrow surface. Everything else
//! on the trait is refused with `ODataError::Unsupported`.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Request};
use std::io::Read;
use url::Url;

use super::error::{ODataError, Result};

/// The request message surface the OData protocol layer works against
pub trait ODataRequestMessage {
    /// Value of the named header, or `None` when unset
    fn get_header(&self, name: &str) -> Option<String>;

    /// Overwrite the named header. An empty value removes it.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    fn method(&self) -> &Method;

    fn url(&self) -> &Url;

    /// Enumerate all headers
    fn headers(&self) -> Result<Vec<(String, String)>>;

    fn set_method(&mut self, method: Method) -> Result<()>;

    fn set_url(&mut self, url: Url) -> Result<()>;

    /// Stream over the request body
    fn body_stream(&mut self) -> Result<Box<dyn Read + '_>>;
}

/// Adapter that implements `ODataRequestMessage` on top of a `reqwest::Request`
///
/// Only header access, method and URL are wired through; the remaining
/// operations fail loudly.
pub struct RequestAdapter<'a> {
    request: &'a mut Request,
}

impl<'a> RequestAdapter<'a> {
    pub fn new(request: &'a mut Request) -> Self {
        Self { request }
    }
}

impl ODataRequestMessage for RequestAdapter<'_> {
    fn get_header(&self, name: &str) -> Option<String> {
        self.request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ODataError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if value.is_empty() {
            self.request.headers_mut().remove(&header_name);
            return Ok(());
        }

        let header_value = HeaderValue::from_str(value).map_err(|e| ODataError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.request.headers_mut().insert(header_name, header_value);
        Ok(())
    }

    fn method(&self) -> &Method {
        self.request.method()
    }

    fn url(&self) -> &Url {
        self.request.url()
    }

    fn headers(&self) -> Result<Vec<(String, String)>> {
        Err(ODataError::unsupported("headers"))
    }

    fn set_method(&mut self, _method: Method) -> Result<()> {
        Err(ODataError::unsupported("set_method"))
    }

    fn set_url(&mut self, _url: Url) -> Result<()> {
        Err(ODataError::unsupported("set_url"))
    }

    fn body_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        Err(ODataError::unsupported("body_stream"))
    }
}
