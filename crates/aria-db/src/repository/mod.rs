//! # Repository Module
//!
//! One repository per entity family.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  service (api)                                                         │
//! │       │                                                                 │
//! │       │  db.products().get_by_slug("hvit-flis")      ← reads: pool      │
//! │       │  db.products().insert(&mut *tx, &product)    ← writes: executor │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id / get_by_slug / list / count                            │
//! │  ├── insert / update / delete                                          │
//! │  └── options / joins / lowest_prices                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-statement writes accept any `Executor`, so the same method serves
//! the pool and an open transaction. Writes that replace join rows need
//! several statements and take `&mut SqliteConnection` instead.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Users and their permission codenames
//! - [`token::TokenRepository`] - Outstanding and blacklisted refresh tokens
//! - [`supplier::SupplierRepository`] - Suppliers
//! - [`category::CategoryRepository`] - Category tree and product links
//! - [`attribute::AttributeRepository`] - Variants, sizes, colors, shapes
//! - [`product::ProductRepository`] - Products, options, lowest prices
//! - [`discount::DiscountRepository`] - Discounts and their targets
//! - [`kitchen::KitchenRepository`] - Kitchens
//! - [`note::NoteRepository`] - Notes on any record
//! - [`log::LogRepository`] - Audit log

pub mod attribute;
pub mod category;
pub mod discount;
pub mod kitchen;
pub mod log;
pub mod note;
pub mod product;
pub mod supplier;
pub mod token;
pub mod user;

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// A case-insensitive `REGEXP` pattern matching `search` literally, or `None`
/// for a blank search.
///
/// The `regex` crate folds case across Unicode, so `Ø` matches `ø`. SQLite's
/// own `LOWER` and `LIKE` only know ASCII.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("(?i){}", regex::escape(s)))
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use aria_core::{
        Category, Discount, Product, ProductOption, ProductStatus, ProductUnit, Supplier, User,
    };
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn user(email: &str) -> User {
        User {
            id: id(),
            email: email.to_string(),
            first_name: "Kari".to_string(),
            last_name: "Nordmann".to_string(),
            phone: None,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn supplier(name: &str) -> Supplier {
        Supplier {
            id: id(),
            name: name.to_string(),
            contact_first_name: None,
            contact_last_name: None,
            email: None,
            phone: None,
            origin_country: Some("Italia".to_string()),
            website: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn category(slug: &str, parent_id: Option<&str>) -> Category {
        Category {
            id: id(),
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            parent_id: parent_id.map(str::to_string),
            ordering: 0,
            display_in_navbar: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn product(slug: &str, supplier_id: &str) -> Product {
        Product {
            id: id(),
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            supplier_id: supplier_id.to_string(),
            status: ProductStatus::Available,
            description: None,
            search_keywords: None,
            unit: ProductUnit::SquareMeter,
            vat_rate_bps: 2500,
            display_price: true,
            can_be_purchased_online: true,
            can_be_picked_up: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn option(product_id: &str, price_cents: i64, status: ProductStatus) -> ProductOption {
        ProductOption {
            id: id(),
            product_id: product_id.to_string(),
            variant_id: None,
            size_id: None,
            gross_price_cents: price_cents,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn discount(
        slug: &str,
        percentage_bps: Option<i64>,
        fixed_price_cents: Option<i64>,
    ) -> Discount {
        Discount {
            id: id(),
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            discount_percentage_bps: percentage_bps,
            fixed_price_cents,
            active_at: Utc::now() - Duration::days(1),
            active_until: Some(Utc::now() + Duration::days(30)),
            maximum_sold_quantity: None,
            total_sold_quantity: 0,
            display_in_navbar: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" Østfold ")).as_deref(), Some("(?i)Østfold"));
        assert_eq!(search_pattern(Some("a.b*")).as_deref(), Some(r"(?i)a\.b\*"));
        assert_eq!(search_pattern(Some("50%_")).as_deref(), Some("(?i)50%_"));
    }
}
