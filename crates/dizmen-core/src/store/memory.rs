//! In-memory store backed by `BTreeMap`s for deterministic iteration.

use super::{
    CatalogStore, DocumentStore, DocumentUpload, DraftStore, RestaurantStore, StoredDocument,
    check_draft_revision, check_restaurant_revision, document_url, sort_items, sort_menus,
    sort_restaurants, sort_reviews,
};
use crate::{
    DizmenError, DocumentId, Menu, MenuId, MenuItem, MenuItemId, Restaurant, RestaurantDraft,
    RestaurantId, Review, UserId,
};
use std::collections::BTreeMap;

/// Volatile store. Everything is lost when it is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    restaurants: BTreeMap<RestaurantId, Restaurant>,
    idempotency: BTreeMap<String, RestaurantId>,
    drafts: BTreeMap<UserId, RestaurantDraft>,
    menus: BTreeMap<MenuId, Menu>,
    items: BTreeMap<MenuItemId, MenuItem>,
    reviews: BTreeMap<MenuItemId, Vec<Review>>,
    documents: BTreeMap<DocumentId, StoredDocument>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryStore {
    fn load_draft(&self, user: &UserId) -> Result<Option<RestaurantDraft>, DizmenError> {
        Ok(self.drafts.get(user).cloned())
    }

    fn save_draft(
        &mut self,
        mut draft: RestaurantDraft,
        expected_revision: Option<u64>,
    ) -> Result<RestaurantDraft, DizmenError> {
        let actual = self.drafts.get(&draft.user_id).map_or(0, |d| d.revision);
        check_draft_revision(expected_revision, actual)?;
        draft.revision = actual.saturating_add(1);
        self.drafts.insert(draft.user_id.clone(), draft.clone());
        Ok(draft)
    }

    fn clear_draft(&mut self, user: &UserId) -> Result<bool, DizmenError> {
        Ok(self.drafts.remove(user).is_some())
    }
}

impl RestaurantStore for MemoryStore {
    fn get_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, DizmenError> {
        Ok(self.restaurants.get(id).cloned())
    }

    fn restaurant_for_owner(&self, owner: &UserId) -> Result<Option<Restaurant>, DizmenError> {
        Ok(self
            .restaurants
            .values()
            .find(|r| &r.owner_id == owner)
            .cloned())
    }

    fn list_restaurants(&self) -> Result<Vec<Restaurant>, DizmenError> {
        let mut all: Vec<Restaurant> = self.restaurants.values().cloned().collect();
        sort_restaurants(&mut all);
        Ok(all)
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Restaurant>, DizmenError> {
        Ok(self
            .idempotency
            .get(key)
            .and_then(|id| self.restaurants.get(id))
            .cloned())
    }

    fn insert_restaurant(
        &mut self,
        mut restaurant: Restaurant,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        if self.restaurant_for_owner(&restaurant.owner_id)?.is_some() {
            return Err(DizmenError::AlreadyOnboarded(restaurant.owner_id));
        }
        restaurant.revision = 1;
        if let Some(key) = idempotency_key {
            self.idempotency
                .insert(key.to_string(), restaurant.id.clone());
        }
        self.restaurants
            .insert(restaurant.id.clone(), restaurant.clone());
        Ok(restaurant)
    }

    fn update_restaurant(
        &mut self,
        mut restaurant: Restaurant,
        expected_revision: Option<u64>,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        let actual = self
            .restaurants
            .get(&restaurant.id)
            .map(|r| r.revision)
            .ok_or_else(|| DizmenError::not_found("restaurant", &restaurant.id))?;
        check_restaurant_revision(&restaurant.id, expected_revision, actual)?;
        restaurant.revision = actual.saturating_add(1);
        if let Some(key) = idempotency_key {
            self.idempotency
                .insert(key.to_string(), restaurant.id.clone());
        }
        self.restaurants
            .insert(restaurant.id.clone(), restaurant.clone());
        Ok(restaurant)
    }
}

impl CatalogStore for MemoryStore {
    fn get_menu(&self, id: &MenuId) -> Result<Option<Menu>, DizmenError> {
        Ok(self.menus.get(id).cloned())
    }

    fn menus_for_restaurant(&self, restaurant: &RestaurantId) -> Result<Vec<Menu>, DizmenError> {
        let mut menus: Vec<Menu> = self
            .menus
            .values()
            .filter(|m| &m.restaurant_id == restaurant)
            .cloned()
            .collect();
        sort_menus(&mut menus);
        Ok(menus)
    }

    fn put_menu(&mut self, menu: Menu) -> Result<(), DizmenError> {
        self.menus.insert(menu.id.clone(), menu);
        Ok(())
    }

    fn delete_menu(&mut self, id: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        self.menus.remove(id);
        let removed = self.items_for_menu(id)?;
        for item in &removed {
            self.items.remove(&item.id);
            self.reviews.remove(&item.id);
        }
        Ok(removed)
    }

    fn get_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, DizmenError> {
        Ok(self.items.get(id).cloned())
    }

    fn items_for_menu(&self, menu: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        let mut items: Vec<MenuItem> = self
            .items
            .values()
            .filter(|i| &i.menu_id == menu)
            .cloned()
            .collect();
        sort_items(&mut items);
        Ok(items)
    }

    fn put_item(&mut self, item: MenuItem) -> Result<(), DizmenError> {
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn delete_item(&mut self, id: &MenuItemId) -> Result<bool, DizmenError> {
        self.reviews.remove(id);
        Ok(self.items.remove(id).is_some())
    }

    fn append_review(&mut self, review: Review) -> Result<(), DizmenError> {
        self.reviews
            .entry(review.menu_item_id.clone())
            .or_default()
            .push(review);
        Ok(())
    }

    fn reviews_for_item(&self, item: &MenuItemId) -> Result<Vec<Review>, DizmenError> {
        let mut reviews = self.reviews.get(item).cloned().unwrap_or_default();
        sort_reviews(&mut reviews);
        Ok(reviews)
    }
}

impl DocumentStore for MemoryStore {
    fn put_document(
        &mut self,
        owner: &UserId,
        id: &DocumentId,
        upload: &DocumentUpload,
    ) -> Result<String, DizmenError> {
        self.documents.insert(
            id.clone(),
            StoredDocument {
                owner: owner.clone(),
                upload: upload.clone(),
            },
        );
        Ok(document_url(id))
    }

    fn load_document(&self, id: &DocumentId) -> Result<Option<StoredDocument>, DizmenError> {
        Ok(self.documents.get(id).cloned())
    }

    fn delete_document(&mut self, id: &DocumentId) -> Result<bool, DizmenError> {
        Ok(self.documents.remove(id).is_some())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentType, OnboardingStep, Price, RestaurantForm, VerificationStatus};
    use chrono::{Duration, Utc};

    fn draft(user: &str) -> RestaurantDraft {
        RestaurantDraft {
            user_id: UserId::new(user),
            step: OnboardingStep::RestaurantInfo,
            form: RestaurantForm::default(),
            documents: Vec::new(),
            last_saved: Utc::now(),
            revision: 0,
        }
    }

    fn restaurant(id: &str, owner: &str) -> Restaurant {
        Restaurant {
            id: RestaurantId::new(id),
            owner_id: UserId::new(owner),
            name: "Test Cafe".to_string(),
            description: String::new(),
            address: "12 Main Street".to_string(),
            phone: String::new(),
            website: String::new(),
            google_location_url: String::new(),
            social_media_links: Vec::new(),
            profile_image: None,
            qr_code: id.to_string(),
            verification_status: VerificationStatus::Pending,
            onboarding_step: OnboardingStep::Complete,
            rejection_reason: None,
            block_reason: None,
            verification_documents: Vec::new(),
            created_at: Utc::now(),
            verified_at: None,
            revision: 0,
        }
    }

    fn menu(id: &str, order: u32) -> Menu {
        Menu {
            id: MenuId::new(id),
            restaurant_id: RestaurantId::new("rest-1"),
            name: id.to_string(),
            description: String::new(),
            icon: None,
            order,
            is_active: true,
            time_ranges: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn item(id: &str, menu: &str) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(id),
            restaurant_id: RestaurantId::new("rest-1"),
            menu_id: MenuId::new(menu),
            name: id.to_string(),
            description: String::new(),
            price: Price::from_cents(500),
            images: Vec::new(),
            category: String::new(),
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn draft_revisions_grow_and_conflict() {
        let mut store = MemoryStore::new();
        let first = store.save_draft(draft("u1"), Some(0)).expect("save");
        assert_eq!(first.revision, 1);

        let second = store.save_draft(draft("u1"), Some(1)).expect("save");
        assert_eq!(second.revision, 2);

        let stale = store.save_draft(draft("u1"), Some(1));
        assert!(matches!(
            stale,
            Err(DizmenError::DraftConflict {
                expected: 1,
                actual: 2
            })
        ));

        let forced = store.save_draft(draft("u1"), None).expect("save");
        assert_eq!(forced.revision, 3);
        assert!(store.clear_draft(&UserId::new("u1")).expect("clear"));
        assert!(!store.clear_draft(&UserId::new("u1")).expect("clear"));
    }

    #[test]
    fn one_restaurant_per_owner() {
        let mut store = MemoryStore::new();
        let stored = store
            .insert_restaurant(restaurant("r1", "u1"), Some("key-1"))
            .expect("insert");
        assert_eq!(stored.revision, 1);

        let again = store.insert_restaurant(restaurant("r2", "u1"), None);
        assert!(matches!(again, Err(DizmenError::AlreadyOnboarded(_))));

        let by_key = store.find_by_idempotency_key("key-1").expect("lookup");
        assert_eq!(by_key.map(|r| r.id), Some(RestaurantId::new("r1")));
    }

    #[test]
    fn restaurant_update_checks_revision() {
        let mut store = MemoryStore::new();
        let stored = store
            .insert_restaurant(restaurant("r1", "u1"), None)
            .expect("insert");

        let updated = store
            .update_restaurant(stored.clone(), Some(1), None)
            .expect("update");
        assert_eq!(updated.revision, 2);

        let stale = store.update_restaurant(stored, Some(1), Some("key-2"));
        assert!(matches!(stale, Err(DizmenError::RevisionConflict { .. })));
        assert!(store.find_by_idempotency_key("key-2").expect("lookup").is_none());

        let missing = store.update_restaurant(restaurant("r9", "u9"), None, None);
        assert!(matches!(missing, Err(DizmenError::NotFound { .. })));
    }

    #[test]
    fn restaurant_update_records_key() {
        let mut store = MemoryStore::new();
        let stored = store
            .insert_restaurant(restaurant("r1", "u1"), None)
            .expect("insert");
        store
            .update_restaurant(stored, Some(1), Some("resubmit-1"))
            .expect("update");

        let by_key = store.find_by_idempotency_key("resubmit-1").expect("lookup");
        assert_eq!(by_key.map(|r| r.revision), Some(2));
    }

    #[test]
    fn menus_sorted_by_order() {
        let mut store = MemoryStore::new();
        store.put_menu(menu("menu-b", 2)).expect("put");
        store.put_menu(menu("menu-a", 1)).expect("put");
        let menus = store
            .menus_for_restaurant(&RestaurantId::new("rest-1"))
            .expect("menus");
        let ids: Vec<&str> = menus.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["menu-a", "menu-b"]);
    }

    #[test]
    fn deleting_menu_cascades_to_items_and_reviews() {
        let mut store = MemoryStore::new();
        store.put_menu(menu("menu-a", 1)).expect("put");
        store.put_item(item("item-1", "menu-a")).expect("put");
        store.put_item(item("item-2", "menu-a")).expect("put");
        store.put_item(item("item-3", "menu-b")).expect("put");
        store
            .append_review(Review {
                id: crate::ReviewId::new("review-1"),
                menu_item_id: MenuItemId::new("item-1"),
                customer_id: UserId::new("c1"),
                customer_name: "Ayse".to_string(),
                rating: crate::Rating::try_from(5).expect("rating"),
                comment: String::new(),
                created_at: Utc::now() + Duration::seconds(1),
            })
            .expect("review");

        let removed = store.delete_menu(&MenuId::new("menu-a")).expect("delete");
        assert_eq!(removed.len(), 2);
        assert!(store.get_item(&MenuItemId::new("item-1")).expect("get").is_none());
        assert!(store.get_item(&MenuItemId::new("item-3")).expect("get").is_some());
        assert!(
            store
                .reviews_for_item(&MenuItemId::new("item-1"))
                .expect("reviews")
                .is_empty()
        );
    }

    #[test]
    fn documents_round_trip() {
        let mut store = MemoryStore::new();
        let owner = UserId::new("u1");
        let id = DocumentId::new("doc-1");
        let upload = DocumentUpload {
            file_name: "license.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            document_type: DocumentType::BusinessLicense,
            bytes: vec![1, 2, 3],
        };

        let url = store.put_document(&owner, &id, &upload).expect("put");
        assert_eq!(url, "documents/doc-1");
        let stored = store.load_document(&id).expect("load").expect("present");
        assert_eq!(stored.owner, owner);
        assert_eq!(stored.upload.bytes, vec![1, 2, 3]);
        assert!(store.delete_document(&id).expect("delete"));
        assert!(store.load_document(&id).expect("load").is_none());
    }
}
