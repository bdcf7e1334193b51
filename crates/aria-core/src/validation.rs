//! # Validation Module
//!
//! Input validation for everything the back office and shop front submit.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: JSON extraction (axum)                                       │
//! │  └── Shape and types (missing fields, wrong types)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services                                                     │
//! │  └── THIS MODULE: business rules per field and across fields           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (slugs, emails, option combinations)           │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aria_core::validation::{validate_email, validate_percentage_bps};
//!
//! let email = validate_email("  Ola@Example.no ").unwrap();
//! assert_eq!(email, "ola@example.no");
//!
//! assert!(validate_percentage_bps(2500).is_ok());
//! assert!(validate_percentage_bps(0).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::FULL_PERCENTAGE_BPS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_SLUG_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_NOTE_LENGTH: usize = 10_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use aria_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", " Terrazzo ").unwrap(), "Terrazzo");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(name.to_string())
}

/// Validates a URL slug.
///
/// ## Rules
/// - Not empty, at most 255 characters
/// - Lowercase ASCII letters, digits and single hyphens
/// - No leading or trailing hyphen
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    if slug.is_empty() {
        return Err(ValidationError::Required {
            field: "slug".to_string(),
        });
    }

    if slug.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::TooLong {
            field: "slug".to_string(),
            max: MAX_SLUG_LENGTH,
        });
    }

    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if !valid_chars || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "must contain only lowercase letters, digits and single hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address and returns it trimmed and lowercased.
///
/// The check is structural only: one `@`, a non-empty local part and a
/// domain containing a dot.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(email)
}

/// Validates a new password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must not be entirely numeric".to_string(),
        });
    }

    Ok(())
}

/// Validates a `#rrggbb` color and returns it lowercased.
///
/// ## Example
/// ```rust
/// use aria_core::validation::validate_hex_color;
///
/// assert_eq!(validate_hex_color("#FFAA00").unwrap(), "#ffaa00");
/// assert!(validate_hex_color("ffaa00").is_err());
/// ```
pub fn validate_hex_color(color: &str) -> ValidationResult<String> {
    let color = color.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "colorHex".to_string(),
            reason: "must look like #rrggbb".to_string(),
        });
    }

    Ok(color.to_lowercase())
}

/// Validates note content and returns it trimmed.
pub fn validate_note_content(content: &str) -> ValidationResult<String> {
    let content = content.trim();

    if content.is_empty() {
        return Err(ValidationError::Required {
            field: "content".to_string(),
        });
    }

    if content.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "content".to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(content.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents. Zero is allowed.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount percentage in basis points (1 to 10000).
pub fn validate_percentage_bps(bps: i64) -> ValidationResult<()> {
    if !(1..=FULL_PERCENTAGE_BPS).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "discountPercentageBps".to_string(),
            min: 1,
            max: FULL_PERCENTAGE_BPS,
        });
    }

    Ok(())
}

/// Validates a VAT rate in basis points (0 to 10000).
pub fn validate_vat_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=FULL_PERCENTAGE_BPS).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "vatRateBps".to_string(),
            min: 0,
            max: FULL_PERCENTAGE_BPS,
        });
    }

    Ok(())
}

/// Validates the dimensions of a size, all in millimetres.
///
/// Width and height must be positive; depth and circumference are optional
/// but positive when given.
pub fn validate_size_dimensions(
    width: i64,
    height: i64,
    depth: Option<i64>,
    circumference: Option<i64>,
) -> ValidationResult<()> {
    let checks = [
        ("width", Some(width)),
        ("height", Some(height)),
        ("depth", depth),
        ("circumference", circumference),
    ];

    for (field, value) in checks {
        if let Some(value) = value {
            if value <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: field.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Validates that a min/max price range is ordered.
pub fn validate_price_range(
    min_cents: Option<i64>,
    max_cents: Option<i64>,
) -> ValidationResult<()> {
    if let Some(min) = min_cents {
        validate_price_cents("priceRangeMinCents", min)?;
    }
    if let Some(max) = max_cents {
        validate_price_cents("priceRangeMaxCents", max)?;
    }

    if let (Some(min), Some(max)) = (min_cents, max_cents) {
        if min > max {
            return Err(ValidationError::Inconsistent {
                field: "priceRangeMaxCents".to_string(),
                reason: "must not be below priceRangeMinCents".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Discount Validators
// =============================================================================

/// Validates the activity window of a discount.
pub fn validate_discount_window(
    active_at: DateTime<Utc>,
    active_until: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let Some(until) = active_until {
        if until <= active_at {
            return Err(ValidationError::Inconsistent {
                field: "activeUntil".to_string(),
                reason: "must be after activeAt".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates that a discount has exactly one price rule.
///
/// ## Rules
/// ```text
///   percentage  fixed price   result
///   ─────────── ───────────── ──────────────────────────
///   None        None          error: one is required
///   Some        Some          error: only one allowed
///   Some(bps)   None          bps must be 1..=10000
///   None        Some(cents)   cents must be >= 0
/// ```
pub fn validate_discount_kind(
    percentage_bps: Option<i64>,
    fixed_price_cents: Option<i64>,
) -> ValidationResult<()> {
    match (percentage_bps, fixed_price_cents) {
        (None, None) => Err(ValidationError::Inconsistent {
            field: "discountPercentageBps".to_string(),
            reason: "either a percentage or a fixed price is required".to_string(),
        }),
        (Some(_), Some(_)) => Err(ValidationError::Inconsistent {
            field: "fixedPriceCents".to_string(),
            reason: "cannot be combined with a percentage".to_string(),
        }),
        (Some(bps), None) => validate_percentage_bps(bps),
        (None, Some(cents)) => validate_price_cents("fixedPriceCents", cents),
    }
}

/// Validates a sold-quantity cap.
pub fn validate_maximum_sold_quantity(maximum: Option<i64>) -> ValidationResult<()> {
    match maximum {
        Some(value) if value <= 0 => Err(ValidationError::MustBePositive {
            field: "maximumSoldQuantity".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use aria_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Marmor  ").unwrap(), "Marmor");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
        assert_eq!(validate_name("firstName", "").unwrap_err().field(), "firstName");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hvit-flis-30x60").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Hvit").is_err());
        assert!(validate_slug("-hvit").is_err());
        assert!(validate_slug("hvit--flis").is_err());
        assert!(validate_slug("hvit flis").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("Kari@Flis.NO").unwrap(), "kari@flis.no");
        assert!(validate_email("").is_err());
        assert!(validate_email("kari").is_err());
        assert!(validate_email("kari@flis").is_err());
        assert!(validate_email("@flis.no").is_err());
        assert!(validate_email("ka ri@flis.no").is_err());
        assert!(validate_email("a@b@flis.no").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter22a").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn test_validate_hex_color() {
        assert_eq!(validate_hex_color("#A1B2C3").unwrap(), "#a1b2c3");
        assert!(validate_hex_color("#A1B2C").is_err());
        assert!(validate_hex_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_price_cents("grossPriceCents", 0).is_ok());
        assert!(validate_price_cents("grossPriceCents", -1).is_err());

        assert!(validate_percentage_bps(1).is_ok());
        assert!(validate_percentage_bps(10_000).is_ok());
        assert!(validate_percentage_bps(10_001).is_err());

        assert!(validate_vat_rate_bps(2500).is_ok());
        assert!(validate_vat_rate_bps(-1).is_err());
    }

    #[test]
    fn test_validate_size_dimensions() {
        assert!(validate_size_dimensions(300, 600, None, None).is_ok());
        assert!(validate_size_dimensions(300, 600, Some(12), None).is_ok());
        assert!(validate_size_dimensions(0, 600, None, None).is_err());
        let err = validate_size_dimensions(300, 600, None, Some(0)).unwrap_err();
        assert_eq!(err.field(), "circumference");
    }

    #[test]
    fn test_validate_price_range() {
        assert!(validate_price_range(Some(100), Some(200)).is_ok());
        assert!(validate_price_range(None, Some(200)).is_ok());
        assert!(validate_price_range(Some(300), Some(200)).is_err());
    }

    #[test]
    fn test_validate_discount_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(validate_discount_window(start, None).is_ok());
        assert!(validate_discount_window(start, Some(start + Duration::days(1))).is_ok());
        assert!(validate_discount_window(start, Some(start)).is_err());
    }

    #[test]
    fn test_validate_discount_kind() {
        assert!(validate_discount_kind(Some(2500), None).is_ok());
        assert!(validate_discount_kind(None, Some(19900)).is_ok());
        assert!(validate_discount_kind(None, None).is_err());
        assert!(validate_discount_kind(Some(2500), Some(19900)).is_err());
        assert!(validate_discount_kind(Some(0), None).is_err());
    }

    #[test]
    fn test_validate_maximum_sold_quantity() {
        assert!(validate_maximum_sold_quantity(None).is_ok());
        assert!(validate_maximum_sold_quantity(Some(5)).is_ok());
        assert!(validate_maximum_sold_quantity(Some(0)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
