//! # Property-Based Tests
//!
//! Invariants of the availability engine and the time-of-day types.

use dizmen_core::{
    ClockTime, MINUTES_PER_DAY, Menu, MenuId, RestaurantId, TimeRange, is_menu_available_at,
    is_time_range_active,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn clock_time() -> impl Strategy<Value = ClockTime> {
    (0..MINUTES_PER_DAY).prop_map(|m| ClockTime::from_minutes(m).expect("in range"))
}

fn time_range() -> impl Strategy<Value = TimeRange> {
    (clock_time(), clock_time()).prop_map(|(start, end)| TimeRange::new(start, end))
}

fn menu(is_active: bool, time_ranges: Vec<TimeRange>) -> Menu {
    Menu {
        id: MenuId::new("menu-1"),
        restaurant_id: RestaurantId::new("rest-1"),
        name: "Menu".to_string(),
        description: String::new(),
        icon: None,
        order: 1,
        is_active,
        time_ranges,
        created_at: chrono::Utc::now(),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any time formats as HH:mm and parses back to itself.
    #[test]
    fn clock_time_text_form_is_stable(t in clock_time()) {
        let text = t.to_string();
        prop_assert_eq!(text.len(), 5);
        prop_assert_eq!(ClockTime::parse(&text).expect("parse"), t);
    }

    /// Text order of HH:mm matches clock order.
    #[test]
    fn clock_time_order_matches_text_order(a in clock_time(), b in clock_time()) {
        prop_assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
    }

    /// No ranges means available at every minute.
    #[test]
    fn empty_ranges_always_active(t in clock_time()) {
        prop_assert!(is_time_range_active(&[], t));
    }

    /// Activity over several ranges is exactly the union of each range.
    #[test]
    fn ranges_are_a_union(ranges in vec(time_range(), 1..6), t in clock_time()) {
        let any_single = ranges.iter().any(|r| is_time_range_active(std::slice::from_ref(r), t));
        prop_assert_eq!(is_time_range_active(&ranges, t), any_single);
    }

    /// A range includes both of its endpoints unless it is reversed.
    #[test]
    fn endpoints_inclusive(range in time_range()) {
        let expected = !range.is_reversed();
        prop_assert_eq!(is_time_range_active(&[range], range.start_time), expected);
        prop_assert_eq!(is_time_range_active(&[range], range.end_time), expected);
    }

    /// Reversed ranges never match.
    #[test]
    fn reversed_ranges_never_match(a in clock_time(), b in clock_time(), t in clock_time()) {
        prop_assume!(a > b);
        prop_assert!(!is_time_range_active(&[TimeRange::new(a, b)], t));
    }

    /// A degenerate range matches exactly one minute.
    #[test]
    fn single_minute_range(a in clock_time(), t in clock_time()) {
        prop_assert_eq!(is_time_range_active(&[TimeRange::new(a, a)], t), a == t);
    }

    /// Inactive menus are unavailable whatever their windows.
    #[test]
    fn inactive_menu_never_available(ranges in vec(time_range(), 0..4), t in clock_time()) {
        prop_assert!(!is_menu_available_at(&menu(false, ranges), t));
    }

    /// Active menus follow their windows exactly.
    #[test]
    fn active_menu_follows_windows(ranges in vec(time_range(), 0..4), t in clock_time()) {
        let expected = is_time_range_active(&ranges, t);
        prop_assert_eq!(is_menu_available_at(&menu(true, ranges), t), expected);
    }

    /// Hours must be zero-padded.
    #[test]
    fn unpadded_hours_rejected(h in 0u8..10, m in 0u8..60) {
        let input = format!("{h}:{m:02}");
        prop_assert!(ClockTime::parse(&input).is_err());
    }

    /// Seconds are not accepted.
    #[test]
    fn seconds_rejected(h in 0u8..24, m in 0u8..60) {
        let input = format!("{h:02}:{m:02}:00");
        prop_assert!(ClockTime::parse(&input).is_err());
    }
}
