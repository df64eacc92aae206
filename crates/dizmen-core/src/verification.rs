//! # Verification Lifecycle
//!
//! Administrator transitions over a restaurant's `verification_status`:
//!
//! | Action    | From       | To         | Reason     |
//! |-----------|------------|------------|------------|
//! | `verify`  | `pending`  | `verified` | -          |
//! | `reject`  | `pending`  | `rejected` | required   |
//! | `block`   | `verified` | `blocked`  | required   |
//! | `unblock` | `blocked`  | `verified` | -          |
//!
//! Anything else is an `InvalidTransition`. A blank reason is refused before the
//! status is looked at, and a refused action changes nothing.

use crate::primitives::MAX_TEXT_LENGTH;
use crate::store::RestaurantStore;
use crate::{Clock, DizmenError, FieldErrors, Restaurant, RestaurantId, VerificationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An administrator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VerificationAction {
    Verify,
    Reject { reason: String },
    Block { reason: String },
    Unblock,
}

impl VerificationAction {
    /// Verb used in error messages and logs.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Reject { .. } => "reject",
            Self::Block { .. } => "block",
            Self::Unblock => "unblock",
        }
    }
}

fn required_reason(reason: &str, action: &'static str) -> Result<String, DizmenError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DizmenError::MissingReason(action));
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(DizmenError::Validation(FieldErrors::single(
            "reason",
            format!("must be at most {MAX_TEXT_LENGTH} characters"),
        )));
    }
    Ok(trimmed.to_string())
}

/// Apply `action` to `restaurant`. Pure: on error the input is untouched.
pub fn apply(
    restaurant: &Restaurant,
    action: &VerificationAction,
    now: DateTime<Utc>,
) -> Result<Restaurant, DizmenError> {
    use VerificationStatus::{Blocked, Pending, Rejected, Verified};

    let reason = match action {
        VerificationAction::Reject { reason } | VerificationAction::Block { reason } => {
            Some(required_reason(reason, action.verb())?)
        }
        VerificationAction::Verify | VerificationAction::Unblock => None,
    };

    let from = restaurant.verification_status;
    let mut next = restaurant.clone();
    match (action, from) {
        (VerificationAction::Verify, Pending) => {
            next.verification_status = Verified;
            next.verified_at = Some(now);
            next.rejection_reason = None;
        }
        (VerificationAction::Reject { .. }, Pending) => {
            next.verification_status = Rejected;
            next.rejection_reason = reason;
        }
        (VerificationAction::Block { .. }, Verified) => {
            next.verification_status = Blocked;
            next.block_reason = reason;
        }
        (VerificationAction::Unblock, Blocked) => {
            next.verification_status = Verified;
            next.block_reason = None;
        }
        (action, from) => {
            return Err(DizmenError::InvalidTransition {
                from,
                action: action.verb(),
            });
        }
    }
    Ok(next)
}

/// Administrator operations over a store.
pub struct VerificationWorkflow<'a, S> {
    store: &'a mut S,
    clock: &'a dyn Clock,
}

impl<'a, S: RestaurantStore> VerificationWorkflow<'a, S> {
    pub fn new(store: &'a mut S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Apply an action and store the result.
    ///
    /// With `expected_revision`, a restaurant changed by someone else since it
    /// was read yields `RevisionConflict`.
    pub fn act(
        &mut self,
        id: &RestaurantId,
        action: &VerificationAction,
        expected_revision: Option<u64>,
    ) -> Result<Restaurant, DizmenError> {
        let current = self
            .store
            .get_restaurant(id)?
            .ok_or_else(|| DizmenError::not_found("restaurant", id))?;
        let next = apply(&current, action, self.clock.now())?;
        self.store
            .update_restaurant(
                next,
                Some(expected_revision.unwrap_or(current.revision)),
                None,
            )
    }
}

/// Restaurants in `status`, or all of them.
pub fn list_restaurants<S: RestaurantStore + ?Sized>(
    store: &S,
    status: Option<VerificationStatus>,
) -> Result<Vec<Restaurant>, DizmenError> {
    let all = store.list_restaurants()?;
    Ok(match status {
        Some(status) => all
            .into_iter()
            .filter(|r| r.verification_status == status)
            .collect(),
        None => all,
    })
}

// =============================================================================
// TESTS
// =============================================================================
