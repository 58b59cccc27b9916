//! OData `Prefer` header handling
//!
//! Reads the `Prefer` header of a request message, lets callers toggle the
//! OData directives we care about and writes the directive list back.
//! Directives we do not understand (e.g. `return=representation`) are kept
//! as-is.

use super::constants::{headers, preferences};
use super::error::Result;
use super::request::ODataRequestMessage;

/// View over the `Prefer` header of a request message
pub struct PreferenceHeader<'m, M: ODataRequestMessage + ?Sized> {
    message: &'m mut M,
    directives: Vec<String>,
    present: bool,
}

impl<'m, M: ODataRequestMessage + ?Sized> PreferenceHeader<'m, M> {
    /// Load the current `Prefer` header from `message`
    pub fn new(message: &'m mut M) -> Self {
        let existing = message.get_header(headers::PREFER);
        let present = existing.is_some();
        let directives = existing
            .as_deref()
            .map(parse_directives)
            .unwrap_or_default();

        Self {
            message,
            directives,
            present,
        }
    }

    /// The `odata.maxpagesize` preference, if set
    pub fn max_page_size(&self) -> Option<u32> {
        self.directives.iter().find_map(|directive| {
            let (name, value) = split_directive(directive);
            if is_max_page_size(name) {
                value.and_then(|v| v.parse().ok())
            } else {
                None
            }
        })
    }

    pub fn set_max_page_size(&mut self, size: Option<u32>) -> Result<()> {
        self.directives
            .retain(|directive| !is_max_page_size(split_directive(directive).0));
        if let Some(size) = size {
            self.directives
                .push(format!("{}={}", preferences::MAX_PAGE_SIZE, size));
        }
        self.write()
    }

    /// Whether `odata.continue-on-error` is requested
    pub fn continue_on_error(&self) -> bool {
        self.directives.iter().any(|directive| {
            let (name, value) = split_directive(directive);
            is_continue_on_error(name) && value.is_none_or(|v| v.eq_ignore_ascii_case("true"))
        })
    }

    pub fn set_continue_on_error(&mut self, enabled: bool) -> Result<()> {
        self.directives
            .retain(|directive| !is_continue_on_error(split_directive(directive).0));
        if enabled {
            self.directives
                .push(preferences::CONTINUE_ON_ERROR.to_string());
        }
        self.write()
    }

    /// Raw directives in header order
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    fn write(&mut self) -> Result<()> {
        let value = self.directives.join(", ");
        if value.is_empty() && !self.present {
            return Ok(());
        }

        self.message.set_header(headers::PREFER, &value)?;
        self.present = !value.is_empty();
        Ok(())
    }
}

fn parse_directives(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `name=value; param` into the lower-cased-comparable name and the value
fn split_directive(directive: &str) -> (&str, Option<&str>) {
    let head = directive.split(';').next().unwrap_or(directive);
    match head.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
        None => (head.trim(), None),
    }
}

fn is_max_page_size(name: &str) -> bool {
    name.eq_ignore_ascii_case(preferences::MAX_PAGE_SIZE)
        || name.eq_ignore_ascii_case(preferences::LEGACY_MAX_PAGE_SIZE)
}

fn is_continue_on_error(name: &str) -> bool {
    name.eq_ignore_ascii_case(preferences::CONTINUE_ON_ERROR)
        || name.eq_ignore_ascii_case(preferences::LEGACY_CONTINUE_ON_ERROR)
}
