//! # Primitives
//!
//! Fixed limits of the Dizmen rules. These are compiled in and do not change at
//! runtime; deployments tune behaviour through `PlatformSettings` instead.

// =============================================================================
// RESTAURANT FORM LIMITS
// =============================================================================

/// Minimum length of a restaurant name, in characters.
pub const MIN_NAME_LENGTH: usize = 2;

/// Minimum length of a restaurant address, in characters.
pub const MIN_ADDRESS_LENGTH: usize = 5;

/// Maximum length for names (restaurants, menus, items, categories).
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length for free text (descriptions, addresses, comments, reasons).
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Maximum number of social media links on a restaurant.
pub const MAX_SOCIAL_LINKS: usize = 10;

// =============================================================================
// VERIFICATION DOCUMENTS
// =============================================================================

/// Maximum number of documents attached to one onboarding draft.
pub const MAX_DOCUMENTS: usize = 10;

/// Maximum size of a single verification document (10 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted for verification documents.
pub const ALLOWED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
];

// =============================================================================
// CATALOG LIMITS
// =============================================================================

/// Maximum number of time windows on a single menu.
pub const MAX_TIME_RANGES: usize = 24;

/// Maximum number of image URLs on a single item.
pub const MAX_ITEM_IMAGES: usize = 10;

// =============================================================================
// RETRY DEFAULTS
// =============================================================================

/// Attempts made for a draft save before giving up (first try included).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Delay before the first retry, in milliseconds. Doubles on each retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Upper bound for a single retry delay, in milliseconds.
pub const MAX_RETRY_BACKOFF_MS: u64 = 2_000;
