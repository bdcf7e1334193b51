//! # Selectors
//!
//! Read-only functions returning response records. Selectors never write;
//! every mutation lives in [`crate::services`].
//!
//! ```text
//! route ──► selector ──► repositories ──► SQLite
//!              │
//!              └── aria_core::discount (pricing, in memory)
//! ```

pub mod catalogue;
pub mod discounts;
pub mod kitchens;
pub mod notes;
pub mod products;
pub mod suppliers;
pub mod users;

use aria_db::Database;

use crate::error::{ApiResult, ApplicationError};

/// Turns `Ok(None)` into a 404 for `entity`.
pub(crate) fn found<T>(value: Option<T>, entity: &str, id: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApplicationError::not_found(format!("{entity} not found: {id}")))
}

/// Reachability of the database, for the health endpoint.
pub async fn database_ok(db: &Database) -> bool {
    db.health_check().await
}
