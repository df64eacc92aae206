//! # Restaurant Profile
//!
//! Owner edits of an onboarded restaurant's basic information from the
//! dashboard. Only `name`, `description`, `address` and `phone` are editable
//! here; links, images and documents change through resubmission.
//!
//! Edits keep the verification status as it is and are guarded by the
//! restaurant revision, so an edit racing an administrator's decision fails
//! with `RevisionConflict` instead of overwriting it.

use crate::store::RestaurantStore;
use crate::validation::validate_restaurant_details;
use crate::{DizmenError, Restaurant, RestaurantId};
use serde::{Deserialize, Serialize};

/// Fields to change. A missing field keeps its stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantInfoInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Validate and store an edit of the restaurant's basic information.
///
/// Without `expected_revision` the revision read here is used, which still
/// catches a write landing between the read and the update.
pub fn update_restaurant_info<S: RestaurantStore + ?Sized>(
    store: &mut S,
    id: &RestaurantId,
    input: RestaurantInfoInput,
    expected_revision: Option<u64>,
) -> Result<Restaurant, DizmenError> {
    let current = store
        .get_restaurant(id)?
        .ok_or_else(|| DizmenError::not_found("restaurant", id))?;

    let mut form = current.to_form();
    if let Some(name) = input.name {
        form.name = name;
    }
    if let Some(description) = input.description {
        form.description = description;
    }
    if let Some(address) = input.address {
        form.address = address;
    }
    if let Some(phone) = input.phone {
        form.phone = phone;
    }
    validate_restaurant_details(&form).into_result()?;

    let mut next = current.clone();
    next.apply_form(&form);
    store.update_restaurant(
        next,
        Some(expected_revision.unwrap_or(current.revision)),
        None,
    )
}

// =============================================================================
// TESTS
// =============================================================================
