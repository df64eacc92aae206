//! # Menu Catalog
//!
//! Owner-side management of menus, items and reviews, plus the public menu that
//! customers reach through the QR code.
//!
//! The public menu composes two gates:
//! 1. The restaurant must be `verified`.
//! 2. Each menu and item must pass the Availability Engine at the given time.

use crate::availability::{is_item_available_at, is_menu_available_at};
use crate::primitives::{MAX_ITEM_IMAGES, MAX_NAME_LENGTH, MAX_TEXT_LENGTH, MAX_TIME_RANGES};
use crate::store::{CatalogStore, RestaurantStore};
use crate::validation::{check_name, check_text};
use crate::{
    AverageRating, Clock, ClockTime, DizmenError, FieldErrors, Menu, MenuId, MenuItem,
    MenuItemId, Price, ProfileImage, Rating, Restaurant, RestaurantId, Review, ReviewId,
    SocialLink, TimeRange, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// INPUTS
// =============================================================================

/// Editable fields of a menu.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuInput {
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    /// Empty means "all day".
    pub time_ranges: Vec<TimeRange>,
}

impl MenuInput {
    fn validate(&self) -> Result<(), DizmenError> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name, 1);
        check_text(&mut errors, "description", &self.description);
        if self.time_ranges.len() > MAX_TIME_RANGES {
            errors.push(
                "time_ranges",
                format!("at most {MAX_TIME_RANGES} time ranges are allowed"),
            );
        }
        errors.into_result()
    }
}

/// Editable fields of a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub images: Vec<String>,
    pub category: String,
}

impl ItemInput {
    /// Image URLs with blank entries dropped.
    fn clean_images(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn validate(&self) -> Result<(), DizmenError> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name, 1);
        check_text(&mut errors, "description", &self.description);
        if self.category.trim().chars().count() > MAX_NAME_LENGTH {
            errors.push("category", "is too long");
        }
        if self.clean_images().len() > MAX_ITEM_IMAGES {
            errors.push(
                "images",
                format!("at most {MAX_ITEM_IMAGES} images are allowed"),
            );
        }
        errors.into_result()
    }
}

/// A customer's review of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub customer_name: String,
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// VIEWS
// =============================================================================

/// A menu as listed on the owner dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSummary {
    pub menu: Menu,
    pub item_count: usize,
    pub available_now: bool,
}

/// Reviews of one item with their average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReviews {
    pub menu_item_id: MenuItemId,
    pub average_rating: AverageRating,
    pub review_count: usize,
    pub reviews: Vec<Review>,
}

/// The customer-facing part of a restaurant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub id: RestaurantId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub google_location_url: String,
    pub social_media_links: Vec<SocialLink>,
    pub profile_image: Option<ProfileImage>,
}

impl From<&Restaurant> for RestaurantProfile {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            description: r.description.clone(),
            address: r.address.clone(),
            phone: r.phone.clone(),
            website: r.website.clone(),
            google_location_url: r.google_location_url.clone(),
            social_media_links: r.social_media_links.clone(),
            profile_image: r.profile_image.clone(),
        }
    }
}

/// One visible menu with its visible items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMenuSection {
    pub menu: Menu,
    pub items: Vec<MenuItem>,
}

/// What a customer sees after scanning the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMenu {
    pub restaurant: RestaurantProfile,
    pub evaluated_at: ClockTime,
    pub menus: Vec<PublicMenuSection>,
}

// =============================================================================
// READS
// =============================================================================

fn require_restaurant<S: RestaurantStore + ?Sized>(
    store: &S,
    id: &RestaurantId,
) -> Result<Restaurant, DizmenError> {
    store
        .get_restaurant(id)?
        .ok_or_else(|| DizmenError::not_found("restaurant", id))
}

/// Look up a menu or fail with `NotFound`.
pub fn require_menu<S: CatalogStore + ?Sized>(store: &S, id: &MenuId) -> Result<Menu, DizmenError> {
    store
        .get_menu(id)?
        .ok_or_else(|| DizmenError::not_found("menu", id))
}

/// Look up an item or fail with `NotFound`.
pub fn require_item<S: CatalogStore + ?Sized>(
    store: &S,
    id: &MenuItemId,
) -> Result<MenuItem, DizmenError> {
    store
        .get_item(id)?
        .ok_or_else(|| DizmenError::not_found("item", id))
}

/// Dashboard listing: menus in display order with item counts.
pub fn menus_for_restaurant<S: RestaurantStore + CatalogStore + ?Sized>(
    store: &S,
    restaurant: &RestaurantId,
    now: ClockTime,
) -> Result<Vec<MenuSummary>, DizmenError> {
    require_restaurant(store, restaurant)?;
    store
        .menus_for_restaurant(restaurant)?
        .into_iter()
        .map(|menu| {
            let item_count = store.items_for_menu(&menu.id)?.len();
            let available_now = is_menu_available_at(&menu, now);
            Ok(MenuSummary {
                menu,
                item_count,
                available_now,
            })
        })
        .collect()
}

/// Reviews of an item with the average rounded to one decimal.
pub fn item_reviews<S: CatalogStore + ?Sized>(
    store: &S,
    item: &MenuItemId,
) -> Result<ItemReviews, DizmenError> {
    require_item(store, item)?;
    let reviews = store.reviews_for_item(item)?;
    Ok(ItemReviews {
        menu_item_id: item.clone(),
        average_rating: AverageRating::from_ratings(reviews.iter().map(|r| r.rating)),
        review_count: reviews.len(),
        reviews,
    })
}

/// Reviews as customers see them.
///
/// Fails with `RestaurantUnavailable` unless the item's restaurant is verified.
pub fn public_item_reviews<S: RestaurantStore + CatalogStore + ?Sized>(
    store: &S,
    item: &MenuItemId,
) -> Result<ItemReviews, DizmenError> {
    let record = require_item(store, item)?;
    let restaurant = require_restaurant(store, &record.restaurant_id)?;
    if !restaurant.is_publicly_visible() {
        return Err(DizmenError::RestaurantUnavailable(restaurant.id));
    }
    item_reviews(store, item)
}

/// The customer view at time of day `now`.
///
/// Fails with `RestaurantUnavailable` unless the restaurant is verified.
pub fn public_menu<S: RestaurantStore + CatalogStore + ?Sized>(
    store: &S,
    restaurant: &RestaurantId,
    now: ClockTime,
) -> Result<PublicMenu, DizmenError> {
    let record = require_restaurant(store, restaurant)?;
    if !record.is_publicly_visible() {
        return Err(DizmenError::RestaurantUnavailable(record.id));
    }

    let mut menus = Vec::new();
    for menu in store.menus_for_restaurant(restaurant)? {
        if !is_menu_available_at(&menu, now) {
            continue;
        }
        let items = store
            .items_for_menu(&menu.id)?
            .into_iter()
            .filter(|item| is_item_available_at(item, &menu, now))
            .collect();
        menus.push(PublicMenuSection { menu, items });
    }

    Ok(PublicMenu {
        restaurant: RestaurantProfile::from(&record),
        evaluated_at: now,
        menus,
    })
}

// =============================================================================
// WRITES
// =============================================================================

/// Menu, item and review mutations over a store.
pub struct Catalog<'a, S> {
    store: &'a mut S,
    clock: &'a dyn Clock,
}

impl<'a, S> Catalog<'a, S>
where
    S: RestaurantStore + CatalogStore,
{
    pub fn new(store: &'a mut S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// New active menu placed after the existing ones.
    pub fn create_menu(
        &mut self,
        restaurant: &RestaurantId,
        input: MenuInput,
    ) -> Result<Menu, DizmenError> {
        require_restaurant(&*self.store, restaurant)?;
        input.validate()?;
        let order = self.store.menus_for_restaurant(restaurant)?.len() as u32 + 1;

        let menu = Menu {
            id: MenuId::generate(),
            restaurant_id: restaurant.clone(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            icon: input.icon.filter(|icon| !icon.trim().is_empty()),
            order,
            is_active: true,
            time_ranges: input.time_ranges,
            created_at: self.clock.now(),
        };
        self.store.put_menu(menu.clone())?;
        Ok(menu)
    }

    /// Replace a menu's editable fields. Order and active flag are kept.
    pub fn update_menu(&mut self, id: &MenuId, input: MenuInput) -> Result<Menu, DizmenError> {
        let mut menu = require_menu(&*self.store, id)?;
        input.validate()?;
        menu.name = input.name.trim().to_string();
        menu.description = input.description.trim().to_string();
        menu.icon = input.icon.filter(|icon| !icon.trim().is_empty());
        menu.time_ranges = input.time_ranges;
        self.store.put_menu(menu.clone())?;
        Ok(menu)
    }

    pub fn toggle_menu_active(&mut self, id: &MenuId) -> Result<Menu, DizmenError> {
        let mut menu = require_menu(&*self.store, id)?;
        menu.is_active = !menu.is_active;
        self.store.put_menu(menu.clone())?;
        Ok(menu)
    }

    /// Delete a menu and everything in it. Returns the removed items.
    pub fn delete_menu(&mut self, id: &MenuId) -> Result<Vec<MenuItem>, DizmenError> {
        require_menu(&*self.store, id)?;
        self.store.delete_menu(id)
    }

    /// New available item in `menu`.
    pub fn add_item(&mut self, menu: &MenuId, input: ItemInput) -> Result<MenuItem, DizmenError> {
        let parent = require_menu(&*self.store, menu)?;
        input.validate()?;
        let now = self.clock.now();

        let item = MenuItem {
            id: MenuItemId::generate(),
            restaurant_id: parent.restaurant_id,
            menu_id: parent.id,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            price: input.price,
            images: input.clean_images(),
            category: input.category.trim().to_string(),
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put_item(item.clone())?;
        Ok(item)
    }

    /// Replace an item's editable fields. Menu and availability are kept.
    pub fn update_item(
        &mut self,
        id: &MenuItemId,
        input: ItemInput,
    ) -> Result<MenuItem, DizmenError> {
        let mut item = require_item(&*self.store, id)?;
        input.validate()?;
        item.name = input.name.trim().to_string();
        item.description = input.description.trim().to_string();
        item.price = input.price;
        item.images = input.clean_images();
        item.category = input.category.trim().to_string();
        item.updated_at = self.clock.now();
        self.store.put_item(item.clone())?;
        Ok(item)
    }

    pub fn toggle_item_availability(&mut self, id: &MenuItemId) -> Result<MenuItem, DizmenError> {
        let mut item = require_item(&*self.store, id)?;
        item.is_available = !item.is_available;
        item.updated_at = self.clock.now();
        self.store.put_item(item.clone())?;
        Ok(item)
    }

    pub fn delete_item(&mut self, id: &MenuItemId) -> Result<(), DizmenError> {
        if self.store.delete_item(id)? {
            Ok(())
        } else {
            Err(DizmenError::not_found("item", id))
        }
    }

    /// Move an item to another active menu of the same restaurant.
    ///
    /// Only `menu_id` (and `updated_at`) change; the item now follows the target
    /// menu's schedule.
    pub fn move_item(
        &mut self,
        id: &MenuItemId,
        target: &MenuId,
    ) -> Result<MenuItem, DizmenError> {
        let mut item = require_item(&*self.store, id)?;
        let menu = require_menu(&*self.store, target)?;
        if menu.restaurant_id != item.restaurant_id {
            return Err(DizmenError::Forbidden(format!(
                "menu {} belongs to another restaurant",
                menu.id
            )));
        }
        if menu.id == item.menu_id {
            return Err(DizmenError::Validation(FieldErrors::single(
                "menu_id",
                "item is already in this menu",
            )));
        }
        if !menu.is_active {
            return Err(DizmenError::Validation(FieldErrors::single(
                "menu_id",
                "target menu is inactive",
            )));
        }
        item.menu_id = menu.id;
        item.updated_at = self.clock.now();
        self.store.put_item(item.clone())?;
        Ok(item)
    }

    /// Append a review. Reviews are never edited.
    pub fn add_review(
        &mut self,
        item: &MenuItemId,
        customer: &UserId,
        input: ReviewInput,
    ) -> Result<Review, DizmenError> {
        require_item(&*self.store, item)?;
        let rating = Rating::try_from(input.rating)?;
        if input.comment.trim().chars().count() > MAX_TEXT_LENGTH {
            return Err(DizmenError::Validation(FieldErrors::single(
                "comment",
                format!("must be at most {MAX_TEXT_LENGTH} characters"),
            )));
        }
        let customer_name = match input.customer_name.trim() {
            "" => "Anonymous".to_string(),
            name => name.to_string(),
        };

        let review = Review {
            id: ReviewId::generate(),
            menu_item_id: item.clone(),
            customer_id: customer.clone(),
            customer_name,
            rating,
            comment: input.comment.trim().to_string(),
            created_at: self.clock.now(),
        };
        self.store.append_review(review.clone())?;
        Ok(review)
    }
}

// =============================================================================
// TESTS
// =============================================================================
