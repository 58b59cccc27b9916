pub mod appointments;
pub mod businesses;
pub mod demo;
pub mod publish;
pub mod show;
pub mod staff;

/// Placeholder for properties the service left out
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}
