//! # Platform
//!
//! The single entry point the binary talks to. A `Platform` owns:
//! - the storage backend (in-memory or redb),
//! - the clock and the sleeper used between retries,
//! - the deployment settings (review mode, retry policy, time zone).
//!
//! Reads are plain `&self` methods. Writes go through short-lived workflow
//! handles (`onboarding()`, `verification()`, `catalog()`) borrowing the platform
//! mutably. The one-shot owner edit of a restaurant's basic information is a
//! plain `&mut self` method.

use crate::catalog::{self, Catalog, ItemReviews, MenuSummary, PublicMenu};
use crate::onboarding::{self, OnboardingEntry, OnboardingWizard, OnboardingWorkflow};
use crate::profile::{self, RestaurantInfoInput};
use crate::store::{
    CatalogStore, DocumentStore, DocumentUpload, DraftStore, MemoryStore, RedbStore,
    RestaurantStore, StoredDocument,
};
use crate::verification::{self, VerificationWorkflow};
use crate::{
    Clock, ClockTime, DizmenError, DocumentId, Menu, MenuId, MenuItem, MenuItemId, Restaurant,
    RestaurantDraft, RestaurantId, RetryPolicy, Review, ReviewMode, Sleeper, SystemClock,
    ThreadSleeper, UserId, VerificationStatus,
};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// SETTINGS
// =============================================================================

/// Behaviour a deployment can tune.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlatformSettings {
    /// Whether submissions wait for an administrator.
    pub review_mode: ReviewMode,
    /// Retry policy for draft saves.
    pub retry: RetryPolicy,
    /// Zone in which "now" is evaluated for availability. `None` = host local time.
    pub timezone: Option<Tz>,
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a platform.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile maps.
    InMemory(MemoryStore),
    /// redb database file (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            StorageBackend::InMemory(store) => store.$method($($arg),*),
            StorageBackend::Persistent(store) => store.$method($($arg),*),
        }
    };
}

impl DraftStore for StorageBackend {
    fn load_draft(&self, user: &UserId) -> Result<Option<RestaurantDraft>, DizmenError> {
        dispatch!(self, load_draft(user))
    }

    fn save_draft(
        &mut self,
        draft: RestaurantDraft,
        expected_revision: Option<u64>,
    ) -> Result<RestaurantDraft, DizmenError> {
        dispatch!(self, save_draft(draft, expected_revision))
    }

    fn clear_draft(&mut self, user: &UserId) -> Result<bool, DizmenError> {
        dispatch!(self, clear_draft(user))
    }
}

impl RestaurantStore for StorageBackend {
    fn get_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, DizmenError> {
        dispatch!(self, get_restaurant(id))
    }

    fn restaurant_for_owner(&self, owner: &UserId) -> Result<Option<Restaurant>, DizmenError> {
        dispatch!(self, restaurant_for_owner(owner))
    }

    fn list_restaurants(&self) -> Result<Vec<Restaurant>, DizmenError> {
        dispatch!(self, list_restaurants())
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Restaurant>, DizmenError> {
        dispatch!(self, find_by_idempotency_key(key))
    }

    fn insert_restaurant(
        &mut self,
        restaurant: Restaurant,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        dispatch!(self, insert_restaurant(restaurant, idempotency_key))
    }

    fn update_restaurant(
        &mut self,
        restaurant: Restaurant,
        expected_revision: Option<u64>,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        dispatch!(
            self,
            update_restaurant(restaurant, expected_revision, idempotency_key)
        )
    }
}

impl CatalogStore for StorageBackend {
    fn get_menu(&self, id: &MenuId) -> Result<Option<Menu>, DizmenError> {
        dispatch!(self, get_menu(id))
    }

    fn menus_for_restaurant(&self, restaurant: &RestaurantId) -> Result<Vec<Menu>, DizmenError> {
        dispatch!(self, menus_for_restaurant(restaurant))
    }

    fn put_menu(&mut self, menu: Menu) -> Result<(), DizmenError> {
        dispatch!(self, put_menu(menu))
    }

    fn delete_menu(&mut self, id: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        dispatch!(self, delete_menu(id))
    }

    fn get_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, DizmenError> {
        dispatch!(self, get_item(id))
    }

    fn items_for_menu(&self, menu: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        dispatch!(self, items_for_menu(menu))
    }

    fn put_item(&mut self, item: MenuItem) -> Result<(), DizmenError> {
        dispatch!(self, put_item(item))
    }

    fn delete_item(&mut self, id: &MenuItemId) -> Result<bool, DizmenError> {
        dispatch!(self, delete_item(id))
    }

    fn append_review(&mut self, review: Review) -> Result<(), DizmenError> {
        dispatch!(self, append_review(review))
    }

    fn reviews_for_item(&self, item: &MenuItemId) -> Result<Vec<Review>, DizmenError> {
        dispatch!(self, reviews_for_item(item))
    }
}

impl DocumentStore for StorageBackend {
    fn put_document(
        &mut self,
        owner: &UserId,
        id: &DocumentId,
        upload: &DocumentUpload,
    ) -> Result<String, DizmenError> {
        dispatch!(self, put_document(owner, id, upload))
    }

    fn load_document(&self, id: &DocumentId) -> Result<Option<StoredDocument>, DizmenError> {
        dispatch!(self, load_document(id))
    }

    fn delete_document(&mut self, id: &DocumentId) -> Result<bool, DizmenError> {
        dispatch!(self, delete_document(id))
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Storage, clock and settings bundled together.
///
/// Does not implement `Clone`: a redb handle cannot be duplicated.
#[derive(Debug)]
pub struct Platform {
    backend: StorageBackend,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    settings: PlatformSettings,
}

impl Default for Platform {
    fn default() -> Self {
        Self::with_backend(StorageBackend::default())
    }
}

impl Platform {
    /// In-memory platform on the system clock with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform on a redb database at `path`, created if missing.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, DizmenError> {
        Ok(Self::with_backend(StorageBackend::Persistent(
            RedbStore::open(path)?,
        )))
    }

    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(ThreadSleeper),
            settings: PlatformSettings::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PlatformSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    /// Current time of day, in the configured zone or host local time.
    #[must_use]
    pub fn clock_time_now(&self) -> ClockTime {
        match &self.settings.timezone {
            Some(tz) => ClockTime::from_time(&self.clock.now().with_timezone(tz)),
            None => ClockTime::from_time(&self.clock.now().with_timezone(&chrono::Local)),
        }
    }

    // -------------------------------------------------------------------------
    // Workflows
    // -------------------------------------------------------------------------

    pub fn onboarding(&mut self) -> OnboardingWorkflow<'_, StorageBackend> {
        OnboardingWorkflow::new(
            &mut self.backend,
            self.clock.as_ref(),
            self.sleeper.as_ref(),
            &self.settings,
        )
    }

    pub fn verification(&mut self) -> VerificationWorkflow<'_, StorageBackend> {
        VerificationWorkflow::new(&mut self.backend, self.clock.as_ref())
    }

    pub fn catalog(&mut self) -> Catalog<'_, StorageBackend> {
        Catalog::new(&mut self.backend, self.clock.as_ref())
    }

    /// Owner edit of name, description, address and phone.
    pub fn update_restaurant_info(
        &mut self,
        id: &RestaurantId,
        input: RestaurantInfoInput,
        expected_revision: Option<u64>,
    ) -> Result<Restaurant, DizmenError> {
        profile::update_restaurant_info(&mut self.backend, id, input, expected_revision)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn onboarding_entry(&self, user: &UserId) -> Result<OnboardingEntry, DizmenError> {
        onboarding::entry(&self.backend, user)
    }

    pub fn resume_onboarding(&self, user: &UserId) -> Result<OnboardingWizard, DizmenError> {
        onboarding::resume(&self.backend, user)
    }

    pub fn restaurant(&self, id: &RestaurantId) -> Result<Restaurant, DizmenError> {
        self.backend
            .get_restaurant(id)?
            .ok_or_else(|| DizmenError::not_found("restaurant", id))
    }

    pub fn restaurant_for_owner(&self, owner: &UserId) -> Result<Option<Restaurant>, DizmenError> {
        self.backend.restaurant_for_owner(owner)
    }

    /// The restaurant an earlier submission with this idempotency key produced.
    pub fn submission(&self, idempotency_key: &str) -> Result<Option<Restaurant>, DizmenError> {
        self.backend.find_by_idempotency_key(idempotency_key)
    }

    pub fn list_restaurants(
        &self,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<Restaurant>, DizmenError> {
        verification::list_restaurants(&self.backend, status)
    }

    /// Number of restaurants per status; every status is present.
    pub fn status_counts(&self) -> Result<BTreeMap<VerificationStatus, usize>, DizmenError> {
        let mut counts: BTreeMap<VerificationStatus, usize> = [
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
            VerificationStatus::Blocked,
        ]
        .into_iter()
        .map(|status| (status, 0))
        .collect();
        for restaurant in self.backend.list_restaurants()? {
            *counts.entry(restaurant.verification_status).or_default() += 1;
        }
        Ok(counts)
    }

    pub fn menu(&self, id: &MenuId) -> Result<Menu, DizmenError> {
        catalog::require_menu(&self.backend, id)
    }

    pub fn item(&self, id: &MenuItemId) -> Result<MenuItem, DizmenError> {
        catalog::require_item(&self.backend, id)
    }

    /// Dashboard menus, with availability evaluated now.
    pub fn menus_for_restaurant(
        &self,
        restaurant: &RestaurantId,
    ) -> Result<Vec<MenuSummary>, DizmenError> {
        catalog::menus_for_restaurant(&self.backend, restaurant, self.clock_time_now())
    }

    pub fn item_reviews(&self, item: &MenuItemId) -> Result<ItemReviews, DizmenError> {
        catalog::item_reviews(&self.backend, item)
    }

    /// Reviews for customers; hidden while the restaurant is not verified.
    pub fn public_item_reviews(&self, item: &MenuItemId) -> Result<ItemReviews, DizmenError> {
        catalog::public_item_reviews(&self.backend, item)
    }

    /// The customer view right now.
    pub fn public_menu(&self, restaurant: &RestaurantId) -> Result<PublicMenu, DizmenError> {
        self.public_menu_at(restaurant, self.clock_time_now())
    }

    /// The customer view at a chosen time of day.
    pub fn public_menu_at(
        &self,
        restaurant: &RestaurantId,
        now: ClockTime,
    ) -> Result<PublicMenu, DizmenError> {
        catalog::public_menu(&self.backend, restaurant, now)
    }

    /// A stored verification document.
    pub fn document(&self, id: &DocumentId) -> Result<StoredDocument, DizmenError> {
        self.backend
            .load_document(id)?
            .ok_or_else(|| DizmenError::not_found("document", id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
