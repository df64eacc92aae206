//! # Storage Interfaces
//!
//! The workflows never touch a database directly. They read and write through
//! these traits, which have two implementations:
//! - [`MemoryStore`]: `BTreeMap`s, volatile, used by tests and `--storage memory`.
//! - [`RedbStore`]: redb tables with postcard values, ACID and persistent.
//!
//! Reads take `&self`, writes take `&mut self`. Every fallible operation returns
//! `Result<T, DizmenError>` so both backends behave uniformly; backend failures
//! surface as [`DizmenError::StorageError`].

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{
    DizmenError, DocumentId, DocumentType, Menu, MenuId, MenuItem, MenuItemId, Restaurant,
    RestaurantDraft, RestaurantId, Review, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// DRAFTS
// =============================================================================

/// One resumable onboarding draft per user.
pub trait DraftStore {
    /// Load the user's draft, if any.
    fn load_draft(&self, user: &UserId) -> Result<Option<RestaurantDraft>, DizmenError>;

    /// Overwrite the user's draft.
    ///
    /// When `expected_revision` is `Some`, the stored revision (`0` when there is no
    /// draft) must match or `DraftConflict` is returned. The stored draft, with its
    /// new revision, is returned.
    fn save_draft(
        &mut self,
        draft: RestaurantDraft,
        expected_revision: Option<u64>,
    ) -> Result<RestaurantDraft, DizmenError>;

    /// Remove the user's draft. Returns whether one existed.
    fn clear_draft(&mut self, user: &UserId) -> Result<bool, DizmenError>;
}

// =============================================================================
// RESTAURANTS
// =============================================================================

/// Registered restaurants, indexed by owner and by submission idempotency key.
pub trait RestaurantStore {
    fn get_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, DizmenError>;

    /// The restaurant owned by `owner`. A user owns at most one.
    fn restaurant_for_owner(&self, owner: &UserId) -> Result<Option<Restaurant>, DizmenError>;

    /// All restaurants, oldest first.
    fn list_restaurants(&self) -> Result<Vec<Restaurant>, DizmenError>;

    /// The restaurant created or resubmitted under `key`.
    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Restaurant>, DizmenError>;

    /// Insert a new restaurant with revision `1`.
    ///
    /// Fails with `AlreadyOnboarded` if the owner already has one. When `key` is
    /// given it is recorded in the same transaction.
    fn insert_restaurant(
        &mut self,
        restaurant: Restaurant,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError>;

    /// Replace a stored restaurant, bumping its revision.
    ///
    /// When `expected_revision` is `Some` and differs from the stored revision,
    /// `RevisionConflict` is returned and nothing changes. When `key` is given
    /// it is recorded in the same transaction.
    fn update_restaurant(
        &mut self,
        restaurant: Restaurant,
        expected_revision: Option<u64>,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError>;
}

// =============================================================================
// CATALOG
// =============================================================================

/// Menus, items and reviews.
pub trait CatalogStore {
    fn get_menu(&self, id: &MenuId) -> Result<Option<Menu>, DizmenError>;

    /// Menus of a restaurant in display order.
    fn menus_for_restaurant(&self, restaurant: &RestaurantId) -> Result<Vec<Menu>, DizmenError>;

    /// Insert or replace a menu.
    fn put_menu(&mut self, menu: Menu) -> Result<(), DizmenError>;

    /// Delete a menu together with its items and their reviews.
    /// Returns the removed items.
    fn delete_menu(&mut self, id: &MenuId) -> Result<Vec<MenuItem>, DizmenError>;

    fn get_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, DizmenError>;

    /// Items of a menu, oldest first.
    fn items_for_menu(&self, menu: &MenuId) -> Result<Vec<MenuItem>, DizmenError>;

    /// Insert or replace an item.
    fn put_item(&mut self, item: MenuItem) -> Result<(), DizmenError>;

    /// Delete an item and its reviews. Returns whether it existed.
    fn delete_item(&mut self, id: &MenuItemId) -> Result<bool, DizmenError>;

    fn append_review(&mut self, review: Review) -> Result<(), DizmenError>;

    /// Reviews of an item, oldest first.
    fn reviews_for_item(&self, item: &MenuItemId) -> Result<Vec<Review>, DizmenError>;
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A verification document as received from the owner, before storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub document_type: DocumentType,
    pub bytes: Vec<u8>,
}

/// A verification document at rest, with the user who uploaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub owner: UserId,
    pub upload: DocumentUpload,
}

/// Blob storage for verification documents.
pub trait DocumentStore {
    /// Store the upload under `id` and return its URL.
    fn put_document(
        &mut self,
        owner: &UserId,
        id: &DocumentId,
        upload: &DocumentUpload,
    ) -> Result<String, DizmenError>;

    /// Fetch a stored document for review.
    fn load_document(&self, id: &DocumentId) -> Result<Option<StoredDocument>, DizmenError>;

    /// Remove a stored document. Returns whether it existed.
    fn delete_document(&mut self, id: &DocumentId) -> Result<bool, DizmenError>;
}

/// Location under which a document is served.
#[must_use]
pub fn document_url(id: &DocumentId) -> String {
    format!("documents/{id}")
}

// =============================================================================
// SHARED RULES
// =============================================================================

/// Optimistic check for drafts; a missing draft has revision `0`.
pub(crate) fn check_draft_revision(expected: Option<u64>, actual: u64) -> Result<(), DizmenError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(DizmenError::DraftConflict { expected, actual })
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_restaurant_revision(
    id: &RestaurantId,
    expected: Option<u64>,
    actual: u64,
) -> Result<(), DizmenError> {
    match expected {
        Some(expected) if expected != actual => Err(DizmenError::RevisionConflict {
            id: id.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Display order: `order`, then creation time, then id.
pub(crate) fn sort_menus(menus: &mut [Menu]) {
    menus.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then(a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_items(items: &mut [MenuItem]) {
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_restaurants(restaurants: &mut [Restaurant]) {
    restaurants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_reviews(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_revision_check() {
        assert!(check_draft_revision(None, 7).is_ok());
        assert!(check_draft_revision(Some(0), 0).is_ok());
        assert!(matches!(
            check_draft_revision(Some(1), 2),
            Err(DizmenError::DraftConflict {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn document_urls_are_relative() {
        assert_eq!(document_url(&DocumentId::new("doc-1")), "documents/doc-1");
    }
}
