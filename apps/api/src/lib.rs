//! # Aria API
//!
//! JSON HTTP API for the Aria tile and kitchen shop: the public storefront
//! and the staff back office share one server.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Aria API                                     │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  routes        │  │  selectors     │  │  services                  ││
//! │  │                │  │                │  │                            ││
//! │  │ • extract      │─►│ • read-only    │  │ • validate                 ││
//! │  │ • permission   │  │ • pricing      │  │ • write + audit log        ││
//! │  │ • respond      │─►│                │  │ • one transaction          ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │ Redis/memory │  │    JWT Auth              ││  │
//! │  │  │  (aria-db)   │  │              │  │                          ││  │
//! │  │  │ Primary data │  │ Storefront   │  │ Access + refresh pairs   ││  │
//! │  │  │ store        │  │ cache        │  │ Refresh blacklist        ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Every key can be set as `ARIA_<KEY>`, e.g.
//! `ARIA_JWT_SECRET`, `ARIA_DATABASE_PATH`, `ARIA_REDIS_URL`.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod selectors;
pub mod services;

use std::sync::Arc;

use aria_db::Database;

pub use cache::AppCache;
pub use config::ApiConfig;
pub use error::{ApiResult, ApplicationError};
pub use routes::build_router;

use auth::JwtManager;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    pub cache: AppCache,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig, cache: AppCache) -> Self {
        let jwt = JwtManager::new(
            &config.jwt_secret,
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
        );

        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            cache,
        }
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use uuid::Uuid;

    use aria_core::password::hash_password;
    use aria_core::{
        Discount, Permission, Product, ProductOption, ProductStatus, ProductUnit, Supplier, User,
    };
    use aria_db::{Database, DbConfig};

    use super::*;
    use crate::auth::{AuthService, TokenPair};
    use crate::cache::MemoryCache;

    pub const TEST_PASSWORD: &str = "riktig-passord";

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn user(db: &Database, email: &str, is_staff: bool, is_superuser: bool) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "Bruker".to_string(),
            phone: None,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            is_active: true,
            is_staff,
            is_superuser,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        db.users().insert(db.pool(), &user).await.unwrap();
        user
    }

    pub async fn customer(db: &Database, email: &str) -> User {
        user(db, email, false, false).await
    }

    pub async fn superuser(db: &Database) -> User {
        user(db, "admin@aria.local", true, true).await
    }

    pub async fn staff(db: &Database, email: &str, permissions: &[Permission]) -> User {
        let user = user(db, email, true, false).await;
        for permission in permissions {
            db.users()
                .grant_permission(db.pool(), &user.id, permission.codename())
                .await
                .unwrap();
        }
        user
    }

    pub async fn supplier(db: &Database, name: &str) -> Supplier {
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            contact_first_name: None,
            contact_last_name: None,
            email: None,
            phone: None,
            origin_country: Some("Italia".to_string()),
            website: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.suppliers().insert(db.pool(), &supplier).await.unwrap();
        supplier
    }

    async fn product_with_status(
        db: &Database,
        slug: &str,
        supplier_id: &str,
        status: ProductStatus,
    ) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            supplier_id: supplier_id.to_string(),
            status,
            description: None,
            search_keywords: None,
            unit: ProductUnit::SquareMeter,
            vat_rate_bps: 2500,
            display_price: true,
            can_be_purchased_online: true,
            can_be_picked_up: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(db.pool(), &product).await.unwrap();
        product
    }

    /// An available product without options.
    pub async fn product(db: &Database, slug: &str, supplier_id: &str) -> Product {
        product_with_status(db, slug, supplier_id, ProductStatus::Available).await
    }

    pub async fn option(
        db: &Database,
        product_id: &str,
        gross_price_cents: i64,
        status: ProductStatus,
    ) -> ProductOption {
        let now = Utc::now();
        let option = ProductOption {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            variant_id: None,
            size_id: None,
            gross_price_cents,
            status,
            created_at: now,
            updated_at: now,
        };
        db.products().insert_option(db.pool(), &option).await.unwrap();
        option
    }

    /// A running discount with no targets.
    pub async fn discount(
        db: &Database,
        slug: &str,
        percentage_bps: Option<i64>,
        fixed_price_cents: Option<i64>,
    ) -> Discount {
        let now = Utc::now();
        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            discount_percentage_bps: percentage_bps,
            fixed_price_cents,
            active_at: now - chrono::Duration::hours(1),
            active_until: None,
            maximum_sold_quantity: None,
            total_sold_quantity: 0,
            display_in_navbar: false,
            created_at: now,
            updated_at: now,
        };
        db.discounts().insert(db.pool(), &discount).await.unwrap();
        discount
    }

    pub struct Fixture {
        pub supplier: Supplier,
        /// Available, one available and one hidden option.
        pub product: Product,
        /// Draft with an available option.
        pub draft: Product,
    }

    pub async fn seeded_db() -> (Database, Fixture) {
        let db = db().await;
        let supplier = supplier(&db, "Marazzi").await;

        let product = product(&db, "hvit-flis", &supplier.id).await;
        option(&db, &product.id, 49_900, ProductStatus::Available).await;
        option(&db, &product.id, 39_900, ProductStatus::Hidden).await;

        let draft =
            product_with_status(&db, "utkast-flis", &supplier.id, ProductStatus::Draft).await;
        option(&db, &draft.id, 29_900, ProductStatus::Available).await;

        (db, Fixture { supplier, product, draft })
    }

    pub async fn test_state_with(db: Database) -> AppState {
        let config = ApiConfig {
            jwt_secret: "test-secret".to_string(),
            public_base_url: "http://test.local/".to_string(),
            ..ApiConfig::default()
        };
        AppState::new(db, config, AppCache::Memory(MemoryCache::new()))
    }

    pub async fn test_state() -> AppState {
        test_state_with(db().await).await
    }

    pub async fn login(state: &AppState, email: &str) -> TokenPair {
        let (_, pair) = AuthService::new(&state.db, &state.jwt)
            .login(email, TEST_PASSWORD)
            .await
            .unwrap();
        pair
    }

    pub async fn bearer(state: &AppState, user: &User) -> String {
        format!("Bearer {}", login(state, &user.email).await.access)
    }
}
