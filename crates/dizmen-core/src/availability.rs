//! # Availability Engine
//!
//! Decides whether a menu, and through it each item, is shown to a customer.
//!
//! - A menu is available when it is active and the time of day falls inside at least
//!   one of its windows. No windows means "all day".
//! - An item is available when it is marked available and its menu is available.
//!   Items have no schedule of their own.
//!
//! Every check has an `_at` form taking an explicit [`ClockTime`] and a `_now` form
//! reading the host's local wall clock. Callers that serve a restaurant in another
//! time zone should convert first with [`ClockTime::now_in`] and use the `_at` form.

use crate::{ClockTime, Menu, MenuItem, TimeRange};

/// True when `ranges` is empty or any range contains `now` (ends inclusive).
#[must_use]
pub fn is_time_range_active(ranges: &[TimeRange], now: ClockTime) -> bool {
    ranges.is_empty() || ranges.iter().any(|range| range.contains(now))
}

/// Menu availability at a given time of day.
#[must_use]
pub fn is_menu_available_at(menu: &Menu, now: ClockTime) -> bool {
    menu.is_active && is_time_range_active(&menu.time_ranges, now)
}

/// Menu availability right now, on the local clock.
#[must_use]
pub fn is_menu_available_now(menu: &Menu) -> bool {
    is_menu_available_at(menu, ClockTime::now_local())
}

/// Item availability at a given time of day, inherited from `menu`.
#[must_use]
pub fn is_item_available_at(item: &MenuItem, menu: &Menu, now: ClockTime) -> bool {
    item.is_available && is_menu_available_at(menu, now)
}

/// Item availability right now, on the local clock.
#[must_use]
pub fn is_item_available_now(item: &MenuItem, menu: &Menu) -> bool {
    is_item_available_at(item, menu, ClockTime::now_local())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MenuId, MenuItemId, Price, RestaurantId};
    use chrono::Utc;

    fn at(s: &str) -> ClockTime {
        ClockTime::parse(s).expect("clock time")
    }

    fn range(s: &str) -> TimeRange {
        TimeRange::parse(s).expect("range")
    }

    fn menu(is_active: bool, time_ranges: Vec<TimeRange>) -> Menu {
        Menu {
            id: MenuId::new("menu-1"),
            restaurant_id: RestaurantId::new("rest-1"),
            name: "Breakfast".to_string(),
            description: String::new(),
            icon: None,
            order: 1,
            is_active,
            time_ranges,
            created_at: Utc::now(),
        }
    }

    fn item(is_available: bool) -> MenuItem {
        MenuItem {
            id: MenuItemId::new("item-1"),
            restaurant_id: RestaurantId::new("rest-1"),
            menu_id: MenuId::new("menu-1"),
            name: "Menemen".to_string(),
            description: String::new(),
            price: Price::from_cents(950),
            images: Vec::new(),
            category: "Mains".to_string(),
            is_available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn no_ranges_means_always_available() {
        assert!(is_time_range_active(&[], at("00:00")));
        assert!(is_time_range_active(&[], at("23:59")));
    }

    #[test]
    fn ranges_are_inclusive_at_both_ends() {
        let ranges = [range("09:00-17:00")];
        assert!(is_time_range_active(&ranges, at("09:00")));
        assert!(is_time_range_active(&ranges, at("17:00")));
        assert!(!is_time_range_active(&ranges, at("08:59")));
        assert!(!is_time_range_active(&ranges, at("17:01")));
    }

    #[test]
    fn multiple_ranges_are_a_union() {
        let ranges = [range("07:00-11:00"), range("18:00-22:00")];
        assert!(is_time_range_active(&ranges, at("10:30")));
        assert!(is_time_range_active(&ranges, at("19:15")));
        assert!(!is_time_range_active(&ranges, at("14:00")));
    }

    #[test]
    fn breakfast_menu_scenario() {
        let breakfast = menu(true, vec![range("07:00-11:00")]);
        assert!(is_menu_available_at(&breakfast, at("10:30")));
        assert!(!is_menu_available_at(&breakfast, at("12:00")));
    }

    #[test]
    fn inactive_menu_is_never_available() {
        let all_day = menu(false, Vec::new());
        assert!(!is_menu_available_at(&all_day, at("12:00")));
        assert!(!is_menu_available_now(&all_day));
    }

    #[test]
    fn unavailable_item_is_never_available() {
        let all_day = menu(true, Vec::new());
        assert!(!is_item_available_at(&item(false), &all_day, at("12:00")));
        assert!(!is_item_available_now(&item(false), &all_day));
    }

    #[test]
    fn item_inherits_menu_window() {
        let breakfast = menu(true, vec![range("07:00-11:00")]);
        let available = item(true);
        assert!(is_item_available_at(&available, &breakfast, at("08:00")));
        assert!(!is_item_available_at(&available, &breakfast, at("20:00")));
    }

    #[test]
    fn active_all_day_menu_is_available_now() {
        let all_day = menu(true, Vec::new());
        assert!(is_menu_available_now(&all_day));
        assert!(is_item_available_now(&item(true), &all_day));
    }
}
