//! # Form Validation
//!
//! Field-level checks for the onboarding form. Results are collected into
//! [`FieldErrors`] so every problem can be shown inline at once.
//!
//! Three depths exist:
//! - [`validate_restaurant_info`] gates the first wizard step (`name`, `address`).
//! - [`validate_restaurant_details`] adds `description` and `phone`, the fields an
//!   owner edits from the dashboard.
//! - [`validate_restaurant_form`] gates final submission (every field).

use crate::primitives::{
    MAX_NAME_LENGTH, MAX_SOCIAL_LINKS, MAX_TEXT_LENGTH, MIN_ADDRESS_LENGTH, MIN_NAME_LENGTH,
};
use crate::{FieldErrors, RestaurantForm};
use validator::ValidateUrl;

/// Number of characters after trimming surrounding whitespace.
pub(crate) fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

/// Checks a required name-like field against the shared length limits.
pub(crate) fn check_name(errors: &mut FieldErrors, field: &str, value: &str, min: usize) {
    let len = char_len(value);
    if len == 0 {
        errors.push(field, "is required");
    } else if len < min {
        errors.push(field, format!("must be at least {min} characters"));
    } else if len > MAX_NAME_LENGTH {
        errors.push(field, format!("must be at most {MAX_NAME_LENGTH} characters"));
    }
}

pub(crate) fn check_text(errors: &mut FieldErrors, field: &str, value: &str) {
    if char_len(value) > MAX_TEXT_LENGTH {
        errors.push(field, format!("must be at most {MAX_TEXT_LENGTH} characters"));
    }
}

/// Optional URL: empty is fine, anything else must parse as an absolute URL.
fn check_optional_url(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    let trimmed = value.trim().to_string();
    if !trimmed.is_empty() && !trimmed.validate_url() {
        errors.push(field, message);
    }
}

/// Fields required to leave the first wizard step.
#[must_use]
pub fn validate_restaurant_info(form: &RestaurantForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, "name", &form.name, MIN_NAME_LENGTH);

    let address_len = char_len(&form.address);
    if address_len < MIN_ADDRESS_LENGTH {
        errors.push("address", "Address is required");
    } else if address_len > MAX_TEXT_LENGTH {
        errors.push(
            "address",
            format!("must be at most {MAX_TEXT_LENGTH} characters"),
        );
    }
    errors
}

/// The basic information shown on the dashboard.
#[must_use]
pub fn validate_restaurant_details(form: &RestaurantForm) -> FieldErrors {
    let mut errors = validate_restaurant_info(form);
    check_text(&mut errors, "description", &form.description);
    check_text(&mut errors, "phone", &form.phone);
    errors
}

/// Every field, as checked on final submission.
#[must_use]
pub fn validate_restaurant_form(form: &RestaurantForm) -> FieldErrors {
    let mut errors = validate_restaurant_details(form);
    check_optional_url(&mut errors, "website", &form.website, "Invalid URL");
    check_optional_url(
        &mut errors,
        "google_location_url",
        &form.google_location_url,
        "Invalid Google Maps URL",
    );

    if form.social_media_links.len() > MAX_SOCIAL_LINKS {
        errors.push(
            "social_media_links",
            format!("at most {MAX_SOCIAL_LINKS} links are allowed"),
        );
    }
    for (i, link) in form.social_media_links.iter().enumerate() {
        if link.platform.trim().is_empty() {
            errors.push(
                format!("social_media_links[{i}].platform"),
                "Platform name is required",
            );
        }
        if !link.url.trim().to_string().validate_url() {
            errors.push(format!("social_media_links[{i}].url"), "Invalid URL");
        }
    }

    errors
}

// =============================================================================
// TESTS
// =============================================================================
