//! Well-known endpoints, identifiers and header names for the Bookings API

/// The resource identifier for the Bookings OData API when used by 3rd party applications
pub const RESOURCE_ID: &str = "https://microsoft.onmicrosoft.com/bookingsodataapi";

/// The default AAD instance to use when authenticating
pub const DEFAULT_AAD_INSTANCE: &str = "https://login.microsoftonline.com/common/";

/// The default v1 service root
pub const DEFAULT_V1_SERVICE_ROOT: &str = "https://bookings.office.net/api/v1.0/";

/// Scope requested by the samples
pub const BOOKINGS_READ_ALL_SCOPE: &str = "Bookings.Read.All";

pub mod headers {
    pub const CLIENT_REQUEST_ID: &str = "client-request-id";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const PREFER: &str = "Prefer";
    pub const ODATA_VERSION: &str = "OData-Version";
    pub const ODATA_MAX_VERSION: &str = "OData-MaxVersion";
}

pub mod preferences {
    pub const MAX_PAGE_SIZE: &str = "odata.maxpagesize";
    pub const CONTINUE_ON_ERROR: &str = "odata.continue-on-error";
    // Pre-4.0 spellings still sent by some clients
    pub const LEGACY_MAX_PAGE_SIZE: &str = "maxpagesize";
    pub const LEGACY_CONTINUE_ON_ERROR: &str = "continue-on-error";
}
