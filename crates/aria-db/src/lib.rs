//! # aria-db: Database Layer for Aria
//!
//! SQLite persistence for the Aria backend, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Aria Data Flow                                 │
//! │                                                                         │
//! │  axum handler ─► selector / service                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aria-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ products()    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ discounts()   │    │ 001_initial  │  │   │
//! │  │   │ begin() → tx  │    │ users() ...   │    │  _schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reads and Writes
//!
//! Repository reads go through the pool. Writes take any sqlx executor so a
//! service can pass either the pool or an open transaction:
//!
//! ```rust,ignore
//! use aria_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("aria.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! db.products().insert(&mut *tx, &product).await?;
//! db.logs().insert(&mut *tx, &entry).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::attribute::AttributeRepository;
pub use repository::category::CategoryRepository;
pub use repository::discount::DiscountRepository;
pub use repository::kitchen::KitchenRepository;
pub use repository::log::LogRepository;
pub use repository::note::NoteRepository;
pub use repository::product::{ProductFilter, ProductRepository};
pub use repository::supplier::SupplierRepository;
pub use repository::token::TokenRepository;
pub use repository::user::{UserFilter, UserRepository};

/// A transaction on the Aria database.
pub type Tx = sqlx::Transaction<'static, sqlx::Sqlite>;
