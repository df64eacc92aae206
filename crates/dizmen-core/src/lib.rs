//! # dizmen-core
//!
//! The rules of the Dizmen restaurant-menu platform.
//!
//! This crate decides:
//! - whether a menu or item is visible at a given time of day (`availability`),
//! - how a new owner moves through onboarding and submits a restaurant (`onboarding`),
//! - which administrator actions are allowed on a restaurant (`verification`),
//! - how menus, items and reviews are managed and shown to customers (`catalog`).
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: no async, no network, no logging
//! - Storage is reached only through the traits in `store`
//! - Time is read only through `Clock`, so every rule is testable at a fixed instant
//! - Every fallible operation returns `Result<T, DizmenError>`

// =============================================================================
// MODULES
// =============================================================================

pub mod availability;
pub mod catalog;
pub mod clock;
pub mod onboarding;
pub mod platform;
pub mod primitives;
pub mod profile;
pub mod retry;
pub mod store;
pub mod types;
pub mod validation;
pub mod verification;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AverageRating, ClockTime, DizmenError, DocumentId, DocumentType, FieldError, FieldErrors,
    MINUTES_PER_DAY, Menu, MenuId, MenuItem, MenuItemId, OnboardingStep, Price, ProfileImage,
    Rating, Restaurant, RestaurantDraft, RestaurantForm, RestaurantId, Review, ReviewId,
    ReviewMode, SocialLink, TimeRange, UserId, VerificationDocument, VerificationStatus,
};

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use availability::{
    is_item_available_at, is_item_available_now, is_menu_available_at, is_menu_available_now,
    is_time_range_active,
};
pub use catalog::{
    Catalog, ItemInput, ItemReviews, MenuInput, MenuSummary, PublicMenu, PublicMenuSection,
    RestaurantProfile, ReviewInput,
};
pub use onboarding::{OnboardingEntry, OnboardingWizard, OnboardingWorkflow};
pub use profile::RestaurantInfoInput;
pub use validation::{
    validate_restaurant_details, validate_restaurant_form, validate_restaurant_info,
};
pub use verification::{VerificationAction, VerificationWorkflow};

// =============================================================================
// RE-EXPORTS: Infrastructure
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use platform::{Platform, PlatformSettings, StorageBackend};
pub use retry::{NoSleep, RetryPolicy, Sleeper, ThreadSleeper};
pub use store::{
    CatalogStore, DocumentStore, DocumentUpload, DraftStore, MemoryStore, RedbStore,
    RestaurantStore, StoredDocument,
};
