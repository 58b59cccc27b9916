//! Microsoft Bookings OData API client
//!
//! A thin OData layer over `reqwest`: a container that applies request
//! policies (correlation id, authorization, `Prefer`) to every call, entity
//! set handles with continuation paging, and change tracking so creates and
//! updates only send the properties that were actually set.

pub mod auth;
pub mod constants;
pub mod container;
pub mod error;
pub mod models;
pub mod paging;
pub mod policy;
pub mod preference;
pub mod query;
pub mod request;
pub mod tracking;

pub use auth::{Authority, TokenClient, TokenInfo, default_scopes};
pub use container::{
    BookingsContainer, ContainerOptions, ContainerOptionsBuilder, MergeOption, SendOption,
    TokenProvider,
};
pub use error::{ODataError, Result};
pub use models::{
    BookingAppointment, BookingBusiness, BookingCurrency, BookingCustomer, BookingReminder,
    BookingReminderRecipients, BookingService, BookingStaffMember, BookingStaffRole,
    DateTimeTimeZone, Entity, PhysicalAddress,
};
pub use paging::{ODataPage, Pages};
pub use policy::RequestPolicy;
pub use preference::PreferenceHeader;
pub use query::{EntityRef, EntitySet};
pub use request::{ODataRequestMessage, RequestAdapter};
pub use tracking::{Tracked, TrackingState};
