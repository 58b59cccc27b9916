//! Bookings entity and complex types
//!
//! All properties are nullable on the wire, so every field is an `Option`.
//! Fields are always serialized (nulls included); the change tracker decides
//! which of them actually go out on a save.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::tracking::tracked_setters;

/// A type that lives in an OData entity set
///
/// `Default` stands in for the parameterless constructor new entities are
/// created from.
pub trait Entity: Serialize + DeserializeOwned + Default + Clone + Send + Sync {
    /// Key used to address the entity inside its set
    fn key(&self) -> Option<&str>;
}

/// A tenant's bookable business
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingBusiness {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub business_type: Option<String>,
    pub address: Option<PhysicalAddress>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub web_site_url: Option<String>,
    pub default_currency_iso: Option<String>,
    pub is_published: Option<bool>,
    pub public_url: Option<String>,
}

/// Staff that can be assigned to appointments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingStaffMember {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    pub role: Option<BookingStaffRole>,
    pub use_business_hours: Option<bool>,
    pub availability_is_affected_by_personal_calendar: Option<bool>,
    pub color_index: Option<i32>,
}

/// A service offered by a business
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingService {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// ISO-8601 duration, e.g. `PT1H`
    pub default_duration: Option<String>,
    pub default_price: Option<f64>,
    pub staff_member_ids: Option<Vec<String>>,
}

/// A scheduled appointment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingAppointment {
    pub id: Option<String>,
    pub self_service_appointment_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email_address: Option<String>,
    pub customer_phone: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub staff_member_ids: Option<Vec<String>>,
    pub start: Option<DateTimeTimeZone>,
    pub end: Option<DateTimeTimeZone>,
    pub reminders: Option<Vec<BookingReminder>>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingCustomer {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingCurrency {
    pub id: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingStaffRole {
    Guest,
    Administrator,
    Viewer,
    ExternalGuest,
    #[serde(other)]
    UnknownFutureValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingReminderRecipients {
    AllAttendees,
    Staff,
    Customer,
    #[serde(other)]
    UnknownFutureValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country_or_region: Option<String>,
    pub postal_code: Option<String>,
}

/// Timestamp as the service sends it: a local date-time string plus a zone name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    pub date_time: String,
    pub time_zone: String,
}

impl DateTimeTimeZone {
    pub fn new(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: date_time.into(),
            time_zone: time_zone.into(),
        }
    }

    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self::new(instant.to_rfc3339_opts(SecondsFormat::Secs, true), "UTC")
    }

    /// Interpret as UTC
    ///
    /// Returns `None` for strings without an offset in a zone other than UTC,
    /// since Windows zone names are not resolved here.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.date_time) {
            return Some(parsed.with_timezone(&Utc));
        }
        if !self.time_zone.eq_ignore_ascii_case("UTC") {
            return None;
        }
        NaiveDateTime::parse_from_str(&self.date_time, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn to_local(&self) -> Option<DateTime<Local>> {
        self.to_utc().map(|utc| utc.with_timezone(&Local))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReminder {
    pub message: String,
    /// ISO-8601 duration before the appointment start
    pub offset: String,
    pub recipients: BookingReminderRecipients,
}

impl BookingReminder {
    pub fn new(
        message: impl Into<String>,
        offset: TimeDelta,
        recipients: BookingReminderRecipients,
    ) -> Self {
        Self {
            message: message.into(),
            offset: iso8601_duration(offset),
            recipients,
        }
    }
}

/// Format a non-negative duration as `P[nD]T[nH][nM][nS]`
pub fn iso8601_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

macro_rules! keyed_by_id {
    ($($entity:ty),* $(,)?) => {
        $(
            impl Entity for $entity {
                fn key(&self) -> Option<&str> {
                    self.id.as_deref()
                }
            }
        )*
    };
}

keyed_by_id!(
    BookingBusiness,
    BookingStaffMember,
    BookingService,
    BookingAppointment,
    BookingCustomer,
    BookingCurrency,
);

tracked_setters!(BookingBusiness {
    set_display_name => display_name: String as "displayName",
    set_business_type => business_type: String as "businessType",
    set_address => address: PhysicalAddress as "address",
    set_phone => phone: String as "phone",
    set_email => email: String as "email",
    set_web_site_url => web_site_url: String as "webSiteUrl",
    set_default_currency_iso => default_currency_iso: String as "defaultCurrencyIso",
});

tracked_setters!(BookingStaffMember {
    set_display_name => display_name: String as "displayName",
    set_email_address => email_address: String as "emailAddress",
    set_role => role: BookingStaffRole as "role",
    set_use_business_hours => use_business_hours: bool as "useBusinessHours",
    set_availability_is_affected_by_personal_calendar =>
        availability_is_affected_by_personal_calendar: bool
        as "availabilityIsAffectedByPersonalCalendar",
    set_color_index => color_index: i32 as "colorIndex",
});

tracked_setters!(BookingService {
    set_display_name => display_name: String as "displayName",
    set_description => description: String as "description",
    set_default_duration => default_duration: String as "defaultDuration",
    set_default_price => default_price: f64 as "defaultPrice",
    set_staff_member_ids => staff_member_ids: Vec<String> as "staffMemberIds",
});

tracked_setters!(BookingAppointment {
    set_customer_id => customer_id: String as "customerId",
    set_customer_name => customer_name: String as "customerName",
    set_customer_email_address => customer_email_address: String as "customerEmailAddress",
    set_customer_phone => customer_phone: String as "customerPhone",
    set_service_id => service_id: String as "serviceId",
    set_staff_member_ids => staff_member_ids: Vec<String> as "staffMemberIds",
    set_start => start: DateTimeTimeZone as "start",
    set_end => end: DateTimeTimeZone as "end",
    set_reminders => reminders: Vec<BookingReminder> as "reminders",
    set_price => price: f64 as "price",
});

tracked_setters!(BookingCustomer {
    set_display_name => display_name: String as "displayName",
    set_email_address => email_address: String as "emailAddress",
});

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_business_deserializes_partial_payload() {
        let json = r#"{
            "@odata.etag": "W/\"1\"",
            "id": "Contosolunchdelivery@contoso.onmicrosoft.com",
            "displayName": "Contoso Lunch Delivery",
            "isPublished": false,
            "publicUrl": "https://outlook.office.com/owa/calendar/Contoso@contoso.onmicrosoft.com/bookings/"
        }"#;

        let business: BookingBusiness = serde_json::from_str(json).unwrap();
        assert_eq!(business.key(), Some("Contosolunchdelivery@contoso.onmicrosoft.com"));
        assert_eq!(business.is_published, Some(false));
        assert!(business.phone.is_none());
    }

    #[test]
    fn test_staff_role_wire_names() {
        assert_eq!(
            serde_json::to_value(BookingStaffRole::ExternalGuest).unwrap(),
            "externalGuest"
        );
        let role: BookingStaffRole = serde_json::from_str("\"scheduler\"").unwrap();
        assert_eq!(role, BookingStaffRole::UnknownFutureValue);
    }

    #[test]
    fn test_appointment_wire_names() {
        let appointment = BookingAppointment {
            customer_email_address: Some("customer@contoso.com".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["customerEmailAddress"], "customer@contoso.com");
        assert!(value.get("staffMemberIds").is_some());
    }

    #[test]
    fn test_date_time_time_zone_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();
        let dt = DateTimeTimeZone::utc(instant);

        assert_eq!(dt.date_time, "2024-01-02T13:00:00Z");
        assert_eq!(dt.time_zone, "UTC");
        assert_eq!(dt.to_utc(), Some(instant));
    }

    #[test]
    fn test_date_time_time_zone_without_offset() {
        let dt = DateTimeTimeZone::new("2024-01-02T13:00:00.0000000", "UTC");
        assert_eq!(
            dt.to_utc(),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap())
        );

        let dt = DateTimeTimeZone::new("2024-01-02T13:00:00.0000000", "Pacific Standard Time");
        assert_eq!(dt.to_utc(), None);
    }

    #[test]
    fn test_iso8601_duration() {
        assert_eq!(iso8601_duration(TimeDelta::hours(1)), "PT1H");
        assert_eq!(iso8601_duration(TimeDelta::minutes(90)), "PT1H30M");
        assert_eq!(iso8601_duration(TimeDelta::days(1)), "P1D");
        assert_eq!(
            iso8601_duration(TimeDelta::days(1) + TimeDelta::seconds(5)),
            "P1DT5S"
        );
        assert_eq!(iso8601_duration(TimeDelta::zero()), "PT0S");
    }

    #[test]
    fn test_reminder_offset() {
        let reminder = BookingReminder::new(
            "Hello",
            TimeDelta::hours(1),
            BookingReminderRecipients::AllAttendees,
        );
        let value = serde_json::to_value(&reminder).unwrap();
        assert_eq!(value["offset"], "PT1H");
        assert_eq!(value["recipients"], "allAttendees");
    }
}
