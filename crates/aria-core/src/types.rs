//! # Domain Types
//!
//! Records shared by every layer of the Aria backend.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Catalogue                                       │
//! │                                                                         │
//! │  Supplier ◄──── Product ────► Category (m2m, tree via parent_id)       │
//! │                    │  └─────► Color / Shape (m2m)                       │
//! │                    ▼                                                    │
//! │              ProductOption = (Variant?, Size?) + gross price           │
//! │                    ▲                                                    │
//! │  Discount ─────────┴── attached to products and/or options (m2m)       │
//! │                                                                         │
//! │  Kitchen ──► Supplier                                                  │
//! │                                                                         │
//! │                         Back office                                     │
//! │                                                                         │
//! │  User (customer / employee / superuser) ── UserPermission              │
//! │  NoteEntry, LogEntry ── attached to any (resource_type, resource_id)   │
//! │  OutstandingToken ◄── BlacklistedToken                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ids are UUID v4 strings; all timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

/// Publication state of products, options and kitchens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Being prepared in the back office, invisible to customers.
    #[default]
    Draft,
    /// Visible and purchasable.
    Available,
    /// Kept for history, invisible to customers.
    Hidden,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Available => "available",
            ProductStatus::Hidden => "hidden",
        }
    }
}

/// Unit a product is sold in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductUnit {
    #[default]
    Piece,
    SquareMeter,
    Package,
}

/// What a log entry recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Create,
    Update,
    Delete,
}

/// Kinds of records notes and log entries can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Product,
    ProductOption,
    Variant,
    Size,
    Color,
    Shape,
    Category,
    Discount,
    Supplier,
    Kitchen,
    User,
    Note,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Product => "product",
            ResourceType::ProductOption => "product_option",
            ResourceType::Variant => "variant",
            ResourceType::Size => "size",
            ResourceType::Color => "color",
            ResourceType::Shape => "shape",
            ResourceType::Category => "category",
            ResourceType::Discount => "discount",
            ResourceType::Supplier => "supplier",
            ResourceType::Kitchen => "kitchen",
            ResourceType::User => "user",
            ResourceType::Note => "note",
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A customer, an employee (`is_staff`) or a superuser.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Always stored lowercase.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[ts(as = "Option<String>")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

// =============================================================================
// Suppliers & Categories
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub origin_country: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A node in the category tree. Roots have no `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    /// Sort key among siblings.
    pub ordering: i64,
    pub display_in_navbar: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product Attributes
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// Physical dimensions in millimetres. The combination is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Size {
    pub id: String,
    pub width: i64,
    pub height: i64,
    pub depth: Option<i64>,
    pub circumference: Option<i64>,
}

impl Size {
    /// Display name in centimetres, e.g. `30x60` or `30x60x1.2` or `Ø25`.
    ///
    /// ## Example
    /// ```rust
    /// use aria_core::Size;
    ///
    /// let size = Size { id: "s".into(), width: 300, height: 600, depth: Some(12), circumference: None };
    /// assert_eq!(size.name(), "30x60x1.2");
    /// ```
    pub fn name(&self) -> String {
        if let Some(circumference) = self.circumference {
            return format!("Ø{}", format_cm(circumference));
        }
        let mut name = format!("{}x{}", format_cm(self.width), format_cm(self.height));
        if let Some(depth) = self.depth {
            name.push('x');
            name.push_str(&format_cm(depth));
        }
        name
    }
}

fn format_cm(mm: i64) -> String {
    if mm % 10 == 0 {
        (mm / 10).to_string()
    } else {
        format!("{}.{}", mm / 10, (mm % 10).abs())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub id: String,
    pub name: String,
    /// `#rrggbb`
    pub color_hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub supplier_id: String,
    pub status: ProductStatus,
    pub description: Option<String>,
    /// Extra words matched by search but never displayed.
    pub search_keywords: Option<String>,
    pub unit: ProductUnit,
    /// VAT in basis points (2500 = 25%).
    pub vat_rate_bps: i64,
    /// Show prices in the storefront ("price on request" otherwise).
    pub display_price: bool,
    pub can_be_purchased_online: bool,
    pub can_be_picked_up: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A (variant, size) combination of a product with its own price.
///
/// At most one option exists per (product, variant, size).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub size_id: Option<String>,
    /// Price including VAT, in cents.
    pub gross_price_cents: i64,
    pub status: ProductStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductOption {
    #[inline]
    pub fn gross_price(&self) -> Money {
        Money::from_cents(self.gross_price_cents)
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// A time-windowed, optionally quantity-capped price reduction.
///
/// Exactly one of `discount_percentage_bps` and `fixed_price_cents` is
/// expected to be set; see [`crate::discount`] for how it is applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Percentage off in basis points (2500 = 25%).
    pub discount_percentage_bps: Option<i64>,
    /// Replacement gross price in cents.
    pub fixed_price_cents: Option<i64>,
    #[ts(as = "String")]
    pub active_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub active_until: Option<DateTime<Utc>>,
    /// Campaign stops once this many units have been sold.
    pub maximum_sold_quantity: Option<i64>,
    pub total_sold_quantity: i64,
    pub display_in_navbar: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Kitchens
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Kitchen {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub supplier_id: String,
    pub status: ProductStatus,
    pub description: Option<String>,
    pub extra_description: Option<String>,
    pub price_range_min_cents: Option<i64>,
    pub price_range_max_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Notes & Audit Log
// =============================================================================

/// Free-text note an employee left on a record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub id: String,
    pub author_id: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub content: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One audit log row written by a service on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub user_id: Option<String>,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub action: LogAction,
    pub change_message: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tokens
// =============================================================================

/// A refresh token that has been issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OutstandingToken {
    pub id: String,
    pub user_id: String,
    pub jti: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// An outstanding token that may no longer be used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BlacklistedToken {
    pub id: String,
    pub token_id: String,
    pub blacklisted_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: i64, height: i64, depth: Option<i64>, circumference: Option<i64>) -> Size {
        Size {
            id: "size".to_string(),
            width,
            height,
            depth,
            circumference,
        }
    }

    #[test]
    fn test_size_names() {
        assert_eq!(size(300, 600, None, None).name(), "30x60");
        assert_eq!(size(600, 600, Some(20), None).name(), "60x60x2");
        assert_eq!(size(300, 600, Some(12), None).name(), "30x60x1.2");
        assert_eq!(size(0, 0, None, Some(250)).name(), "Ø25");
    }

    #[test]
    fn test_status_default_is_draft() {
        assert_eq!(ProductStatus::default(), ProductStatus::Draft);
        assert_eq!(ProductStatus::Available.as_str(), "available");
    }

    #[test]
    fn test_resource_type_serde_matches_as_str() {
        let json = serde_json::to_string(&ResourceType::ProductOption).unwrap();
        assert_eq!(json, "\"product_option\"");
        let parsed: ResourceType = serde_json::from_str("\"supplier\"").unwrap();
        assert_eq!(parsed.as_str(), "supplier");
    }
}
