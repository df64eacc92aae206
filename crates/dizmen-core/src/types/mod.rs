//! # Core Type Definitions
//!
//! This module contains the records the Dizmen rules operate on:
//! - Identifiers (`UserId`, `RestaurantId`, `MenuId`, `MenuItemId`, `ReviewId`, `DocumentId`)
//! - Time of day (`ClockTime`, `TimeRange`) in the `time` submodule
//! - Money and ratings (`Price`, `Rating`, `AverageRating`)
//! - Lifecycle enums (`VerificationStatus`, `OnboardingStep`, `ReviewMode`)
//! - Records (`Restaurant`, `RestaurantForm`, `RestaurantDraft`, `Menu`, `MenuItem`, `Review`)
//! - Error types (`DizmenError`, `FieldErrors`)
//!
//! ## Persistence
//!
//! Every record here is stored with postcard by the redb backend, so no field uses
//! `skip_serializing_if`, `flatten` or internally tagged enums.

mod time;

pub use time::{ClockTime, MINUTES_PER_DAY, TimeRange};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::new_v4().simple()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a platform user (owner, customer or administrator).
    UserId,
    "user"
);
string_id!(
    /// Identifier of a restaurant. Doubles as the QR code payload.
    RestaurantId,
    "rest"
);
string_id!(
    /// Identifier of a menu.
    MenuId,
    "menu"
);
string_id!(
    /// Identifier of a menu item.
    MenuItemId,
    "item"
);
string_id!(
    /// Identifier of a review.
    ReviewId,
    "review"
);
string_id!(
    /// Identifier of an uploaded verification document.
    DocumentId,
    "doc"
);

// =============================================================================
// PRICE
// =============================================================================

/// A price in minor currency units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(pub u64);

impl Price {
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Price {
    /// US dollar formatting with thousands separators: `$1,234.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = (self.0 / 100).to_string();
        let cents = self.0 % 100;

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "${}.{:02}", grouped, cents)
    }
}

// =============================================================================
// RATINGS
// =============================================================================

/// A review rating, 1 to 5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = DizmenError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DizmenError::Validation(FieldErrors::single(
                "rating",
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            )))
        }
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// Mean rating rounded half-up to one decimal, kept as tenths to stay integer-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AverageRating {
    pub tenths: u32,
}

impl AverageRating {
    /// Average of the given ratings; `0.0` when there are none.
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(s, c), r| (s + u64::from(r.value()), c + 1));
        if count == 0 {
            return Self::default();
        }
        // round(sum / count, 1) == floor((20 * sum + count) / (2 * count)) / 10
        let tenths = (sum * 20 + count) / (count * 2);
        Self {
            tenths: tenths as u32,
        }
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

// =============================================================================
// LIFECYCLE ENUMS
// =============================================================================

/// Administrator-controlled gate deciding whether a restaurant's menu is public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Submitted, waiting for an administrator.
    Pending,
    /// Approved; the public menu is reachable.
    Verified,
    /// Refused with a reason; the owner may resubmit.
    Rejected,
    /// Taken offline by an administrator with a reason.
    Blocked,
}

impl VerificationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = DizmenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "blocked" => Ok(Self::Blocked),
            other => Err(DizmenError::Validation(FieldErrors::single(
                "status",
                format!("unknown verification status '{other}'"),
            ))),
        }
    }
}

/// Position of a restaurant owner in the onboarding wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    RestaurantInfo,
    VerificationDocuments,
    Complete,
}

impl OnboardingStep {
    /// 1-based step number as shown in the wizard header.
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Self::RestaurantInfo => 1,
            Self::VerificationDocuments => 2,
            Self::Complete => 3,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RestaurantInfo => "restaurant_info",
            Self::VerificationDocuments => "verification_documents",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a freshly submitted restaurant enters the verification lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// At least one document is required and the restaurant waits as `pending`.
    #[default]
    DocumentGated,
    /// Documents are optional and the restaurant goes live as `verified`.
    Immediate,
}

impl FromStr for ReviewMode {
    type Err = DizmenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_gated" => Ok(Self::DocumentGated),
            "immediate" => Ok(Self::Immediate),
            other => Err(DizmenError::ConfigError(format!(
                "unknown review mode '{other}' (expected document_gated or immediate)"
            ))),
        }
    }
}

/// Kind of verification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    BusinessLicense,
    TaxCertificate,
    FoodSafetyPermit,
    Identity,
    Other,
}

// =============================================================================
// RESTAURANT
// =============================================================================

/// A social media profile linked from the restaurant page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Metadata of the profile picture chosen during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileImage {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// A stored verification document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub id: DocumentId,
    pub document_type: DocumentType,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub document_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The wizard's form state. Nothing here is validated until a step is advanced
/// or the form is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantForm {
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub google_location_url: String,
    pub social_media_links: Vec<SocialLink>,
    pub profile_image: Option<ProfileImage>,
}

/// A registered restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub google_location_url: String,
    pub social_media_links: Vec<SocialLink>,
    pub profile_image: Option<ProfileImage>,
    /// Payload encoded in the table QR code; equal to the restaurant id.
    pub qr_code: String,
    pub verification_status: VerificationStatus,
    pub onboarding_step: OnboardingStep,
    pub rejection_reason: Option<String>,
    pub block_reason: Option<String>,
    pub verification_documents: Vec<VerificationDocument>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Incremented by the store on every update.
    pub revision: u64,
}

impl Restaurant {
    /// Customers can open the menu only for verified restaurants.
    #[must_use]
    pub fn is_publicly_visible(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// The owner-editable fields as a wizard form, for resubmission.
    #[must_use]
    pub fn to_form(&self) -> RestaurantForm {
        RestaurantForm {
            name: self.name.clone(),
            description: self.description.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            google_location_url: self.google_location_url.clone(),
            social_media_links: self.social_media_links.clone(),
            profile_image: self.profile_image.clone(),
        }
    }

    /// Copy the owner-editable fields of a form onto this record.
    pub fn apply_form(&mut self, form: &RestaurantForm) {
        self.name = form.name.trim().to_string();
        self.description = form.description.trim().to_string();
        self.address = form.address.trim().to_string();
        self.phone = form.phone.trim().to_string();
        self.website = form.website.trim().to_string();
        self.google_location_url = form.google_location_url.trim().to_string();
        self.social_media_links = form.social_media_links.clone();
        self.profile_image = form.profile_image.clone();
    }
}

/// A resumable snapshot of an in-progress onboarding wizard, one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantDraft {
    pub user_id: UserId,
    pub step: OnboardingStep,
    pub form: RestaurantForm,
    pub documents: Vec<VerificationDocument>,
    pub last_saved: DateTime<Utc>,
    /// Set by the store; starts at 1 and grows by one per save.
    pub revision: u64,
}

// =============================================================================
// MENUS & ITEMS
// =============================================================================

/// A named, orderable group of items with its own active flag and time windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub order: u32,
    pub is_active: bool,
    /// Empty means "all day".
    #[serde(default)]
    pub time_ranges: Vec<TimeRange>,
    pub created_at: DateTime<Utc>,
}

/// A dish or drink. Its schedule is always the parent menu's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub menu_id: MenuId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub images: Vec<String>,
    pub category: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer review. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub menu_item_id: MenuItemId,
    pub customer_id: UserId,
    pub customer_name: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A single inline form error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The set of field errors produced by one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one error concerns `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when empty, otherwise `DizmenError::Validation`.
    pub fn into_result(self) -> Result<(), DizmenError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DizmenError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Errors that can occur in the Dizmen core.
///
/// - No silent failures
/// - Use `Result<T, DizmenError>` for fallible operations
/// - The core never panics; every error is recoverable by the caller
#[derive(Debug, Error)]
pub enum DizmenError {
    /// One or more form fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The administrator action is not allowed from the current status.
    #[error("Cannot {action} a restaurant that is {from}")]
    InvalidTransition {
        from: VerificationStatus,
        action: &'static str,
    },

    /// The wizard operation is not allowed from the current step.
    #[error("Cannot {action} from onboarding step {step}")]
    InvalidStep {
        step: OnboardingStep,
        action: &'static str,
    },

    /// Reject and block require a non-blank reason.
    #[error("A reason is required to {0}")]
    MissingReason(&'static str),

    /// Document-gated submission without any document.
    #[error("At least one verification document is required")]
    NoDocuments,

    /// The draft changed since the caller last read it.
    #[error("Draft conflict: expected revision {expected}, found {actual}")]
    DraftConflict { expected: u64, actual: u64 },

    /// The restaurant changed since the caller last read it.
    #[error("Restaurant {id} was modified concurrently: expected revision {expected}, found {actual}")]
    RevisionConflict {
        id: RestaurantId,
        expected: u64,
        actual: u64,
    },

    /// The user already completed onboarding.
    #[error("User {0} already owns a restaurant")]
    AlreadyOnboarded(UserId),

    /// The caller may not act on this record.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The restaurant exists but its menu is not public.
    #[error("Restaurant {0} is not publicly available")]
    RestaurantUnavailable(RestaurantId),

    /// A time of day was not in `HH:mm` form.
    #[error("Invalid time of day '{0}' (expected HH:mm)")]
    InvalidClockTime(String),

    /// Storing a verification document failed.
    #[error("Document upload failed: {0}")]
    UploadFailed(String),

    /// The storage backend failed; usually transient.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error outside the storage backend.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl DizmenError {
    /// Shorthand for `NotFound`.
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageError(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
