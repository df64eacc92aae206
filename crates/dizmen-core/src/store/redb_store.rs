//! # redb-backed Store
//!
//! Persistent implementation of every store trait on a single redb database.
//!
//! Each record kind lives in its own table keyed by its string id, with the
//! record encoded by postcard. Two index tables map owners and idempotency keys
//! to restaurant ids. Multi-step writes (insert + index, cascading deletes, draft
//! revision check + write) happen inside one write transaction, so a failure
//! leaves the database unchanged.

use super::{
    CatalogStore, DocumentStore, DocumentUpload, DraftStore, RestaurantStore, StoredDocument,
    check_draft_revision, check_restaurant_revision, document_url, sort_items, sort_menus,
    sort_restaurants, sort_reviews,
};
use crate::{
    DizmenError, DocumentId, Menu, MenuId, MenuItem, MenuItemId, Restaurant, RestaurantDraft,
    RestaurantId, Review, UserId,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;
type IndexTable = TableDefinition<'static, &'static str, &'static str>;

/// RestaurantId -> Restaurant
const RESTAURANTS: RecordTable = TableDefinition::new("restaurants");

/// UserId -> RestaurantId
const OWNER_INDEX: IndexTable = TableDefinition::new("owner_index");

/// Idempotency key -> RestaurantId
const IDEMPOTENCY: IndexTable = TableDefinition::new("idempotency");

/// UserId -> RestaurantDraft
const DRAFTS: RecordTable = TableDefinition::new("drafts");

/// MenuId -> Menu
const MENUS: RecordTable = TableDefinition::new("menus");

/// MenuItemId -> MenuItem
const ITEMS: RecordTable = TableDefinition::new("items");

/// ReviewId -> Review
const REVIEWS: RecordTable = TableDefinition::new("reviews");

/// DocumentId -> StoredDocument
const DOCUMENTS: RecordTable = TableDefinition::new("documents");

fn storage_err(e: impl std::fmt::Display) -> DizmenError {
    DizmenError::StorageError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DizmenError> {
    postcard::to_allocvec(value).map_err(|e| DizmenError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DizmenError> {
    postcard::from_bytes(bytes).map_err(|e| DizmenError::SerializationError(e.to_string()))
}

/// A persistent store on a redb database file.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DizmenError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Create every table up front so read transactions never miss one.
        let write_txn = db.begin_write().map_err(storage_err)?;
        for table in [RESTAURANTS, DRAFTS, MENUS, ITEMS, REVIEWS, DOCUMENTS] {
            let _ = write_txn.open_table(table).map_err(storage_err)?;
        }
        for table in [OWNER_INDEX, IDEMPOTENCY] {
            let _ = write_txn.open_table(table).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), DizmenError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        key: &str,
    ) -> Result<Option<T>, DizmenError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        match table.get(key).map_err(storage_err)? {
            Some(data) => decode(data.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Every record of `table` for which `keep` holds.
    fn scan_records<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        keep: impl Fn(&T) -> bool,
    ) -> Result<Vec<T>, DizmenError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            let record: T = decode(value.value())?;
            if keep(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn get_index(&self, table: IndexTable, key: &str) -> Result<Option<String>, DizmenError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table).map_err(storage_err)?;
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .map(|v| v.value().to_string()))
    }

    fn put_record<T: Serialize>(
        &mut self,
        table: RecordTable,
        key: &str,
        value: &T,
    ) -> Result<(), DizmenError> {
        let bytes = encode(value)?;
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(table).map_err(storage_err)?;
            table.insert(key, bytes.as_slice()).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn remove_record(&mut self, table: RecordTable, key: &str) -> Result<bool, DizmenError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(table).map_err(storage_err)?;
            let removed = table.remove(key).map_err(storage_err)?;
            removed.is_some()
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    /// Delete the given items and all reviews pointing at them, in one transaction.
    fn delete_items_with_reviews(
        &mut self,
        menu: Option<&MenuId>,
        items: &[MenuItemId],
    ) -> Result<(), DizmenError> {
        let doomed_reviews: Vec<String> = self
            .scan_records::<Review>(REVIEWS, |r| items.contains(&r.menu_item_id))?
            .into_iter()
            .map(|r| r.id.0)
            .collect();

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            if let Some(menu) = menu {
                let mut menus = write_txn.open_table(MENUS).map_err(storage_err)?;
                menus.remove(menu.as_str()).map_err(storage_err)?;
            }
            let mut item_table = write_txn.open_table(ITEMS).map_err(storage_err)?;
            for id in items {
                item_table.remove(id.as_str()).map_err(storage_err)?;
            }
            let mut review_table = write_txn.open_table(REVIEWS).map_err(storage_err)?;
            for id in &doomed_reviews {
                review_table.remove(id.as_str()).map_err(storage_err)?;
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }
}

impl DraftStore for RedbStore {
    fn load_draft(&self, user: &UserId) -> Result<Option<RestaurantDraft>, DizmenError> {
        self.get_record(DRAFTS, user.as_str())
    }

    fn save_draft(
        &mut self,
        mut draft: RestaurantDraft,
        expected_revision: Option<u64>,
    ) -> Result<RestaurantDraft, DizmenError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(DRAFTS).map_err(storage_err)?;
            let actual = match table.get(draft.user_id.as_str()).map_err(storage_err)? {
                Some(data) => decode::<RestaurantDraft>(data.value())?.revision,
                None => 0,
            };
            check_draft_revision(expected_revision, actual)?;
            draft.revision = actual.saturating_add(1);
            let bytes = encode(&draft)?;
            table
                .insert(draft.user_id.as_str(), bytes.as_slice())
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(draft)
    }

    fn clear_draft(&mut self, user: &UserId) -> Result<bool, DizmenError> {
        self.remove_record(DRAFTS, user.as_str())
    }
}

impl RestaurantStore for RedbStore {
    fn get_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, DizmenError> {
        self.get_record(RESTAURANTS, id.as_str())
    }

    fn restaurant_for_owner(&self, owner: &UserId) -> Result<Option<Restaurant>, DizmenError> {
        match self.get_index(OWNER_INDEX, owner.as_str())? {
            Some(id) => self.get_record(RESTAURANTS, &id),
            None => Ok(None),
        }
    }

    fn list_restaurants(&self) -> Result<Vec<Restaurant>, DizmenError> {
        let mut all = self.scan_records::<Restaurant>(RESTAURANTS, |_| true)?;
        sort_restaurants(&mut all);
        Ok(all)
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Restaurant>, DizmenError> {
        match self.get_index(IDEMPOTENCY, key)? {
            Some(id) => self.get_record(RESTAURANTS, &id),
            None => Ok(None),
        }
    }

    fn insert_restaurant(
        &mut self,
        mut restaurant: Restaurant,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        restaurant.revision = 1;
        let bytes = encode(&restaurant)?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut owners = write_txn.open_table(OWNER_INDEX).map_err(storage_err)?;
            let owned = owners
                .get(restaurant.owner_id.as_str())
                .map_err(storage_err)?
                .is_some();
            if owned {
                return Err(DizmenError::AlreadyOnboarded(restaurant.owner_id));
            }
            owners
                .insert(restaurant.owner_id.as_str(), restaurant.id.as_str())
                .map_err(storage_err)?;

            let mut table = write_txn.open_table(RESTAURANTS).map_err(storage_err)?;
            table
                .insert(restaurant.id.as_str(), bytes.as_slice())
                .map_err(storage_err)?;

            if let Some(key) = idempotency_key {
                let mut keys = write_txn.open_table(IDEMPOTENCY).map_err(storage_err)?;
                keys.insert(key, restaurant.id.as_str())
                    .map_err(storage_err)?;
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(restaurant)
    }

    fn update_restaurant(
        &mut self,
        mut restaurant: Restaurant,
        expected_revision: Option<u64>,
        idempotency_key: Option<&str>,
    ) -> Result<Restaurant, DizmenError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(RESTAURANTS).map_err(storage_err)?;
            let actual = match table.get(restaurant.id.as_str()).map_err(storage_err)? {
                Some(data) => decode::<Restaurant>(data.value())?.revision,
                None => return Err(DizmenError::not_found("restaurant", &restaurant.id)),
            };
            check_restaurant_revision(&restaurant.id, expected_revision, actual)?;
            restaurant.revision = actual.saturating_add(1);
            let bytes = encode(&restaurant)?;
            table
                .insert(restaurant.id.as_str(), bytes.as_slice())
                .map_err(storage_err)?;

            if let Some(key) = idempotency_key {
                let mut keys = write_txn.open_table(IDEMPOTENCY).map_err(storage_err)?;
                keys.insert(key, restaurant.id.as_str())
                    .map_err(storage_err)?;
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(restaurant)
    }
}

impl CatalogStore for RedbStore {
    fn get_menu(&self, id: &MenuId) -> Result<Option<Menu>, DizmenError> {
        self.get_record(MENUS, id.as_str())
    }

    fn menus_for_restaurant(&self, restaurant: &RestaurantId) -> Result<Vec<Menu>, DizmenError> {
        let mut menus = self.scan_records::<Menu>(MENUS, |m| &m.restaurant_id == restaurant)?;
        sort_menus(&mut menus);
        Ok(menus)
    }

    fn put_menu(&mut self, menu: Menu) -> Result<(), DizmenError> {
        self.put_record(MENUS, menu.id.as_str(), &menu)
    }

    fn delete_menu(&mut self, id: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        let removed = self.items_for_menu(id)?;
        let ids: Vec<MenuItemId> = removed.iter().map(|i| i.id.clone()).collect();
        self.delete_items_with_reviews(Some(id), &ids)?;
        Ok(removed)
    }

    fn get_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, DizmenError> {
        self.get_record(ITEMS, id.as_str())
    }

    fn items_for_menu(&self, menu: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        let mut items = self.scan_records::<MenuItem>(ITEMS, |i| &i.menu_id == menu)?;
        sort_items(&mut items);
        Ok(items)
    }

    fn put_item(&mut self, item: MenuItem) -> Result<(), DizmenError> {
        self.put_record(ITEMS, item.id.as_str(), &item)
    }

    fn delete_item(&mut self, id: &MenuItemId) -> Result<bool, DizmenError> {
        let existed = self.get_item(id)?.is_some();
        self.delete_items_with_reviews(None, std::slice::from_ref(id))?;
        Ok(existed)
    }

    fn append_review(&mut self, review: Review) -> Result<(), DizmenError> {
        self.put_record(REVIEWS, review.id.as_str(), &review)
    }

    fn reviews_for_item(&self, item: &MenuItemId) -> Result<Vec<Review>, DizmenError> {
        let mut reviews = self.scan_records::<Review>(REVIEWS, |r| &r.menu_item_id == item)?;
        sort_reviews(&mut reviews);
        Ok(reviews)
    }
}

impl DocumentStore for RedbStore {
    fn put_document(
        &mut self,
        owner: &UserId,
        id: &DocumentId,
        upload: &DocumentUpload,
    ) -> Result<String, DizmenError> {
        let stored = StoredDocument {
            owner: owner.clone(),
            upload: upload.clone(),
        };
        self.put_record(DOCUMENTS, id.as_str(), &stored)?;
        Ok(document_url(id))
    }

    fn load_document(&self, id: &DocumentId) -> Result<Option<StoredDocument>, DizmenError> {
        self.get_record(DOCUMENTS, id.as_str())
    }

    fn delete_document(&mut self, id: &DocumentId) -> Result<bool, DizmenError> {
        self.remove_record(DOCUMENTS, id.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
