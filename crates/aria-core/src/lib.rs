//! # aria-core: Pure Business Logic for Aria
//!
//! Everything the storefront and back office agree on that can be computed
//! without touching a database: money, discount resolution, pagination
//! links, validation rules and permission codenames.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Aria Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/api (axum routers → services/selectors)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ aria-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌────────────┐ ┌────────────────┐   │   │
//! │  │   │  money  │ │ discount │ │ pagination │ │ validation     │   │   │
//! │  │   │  Money  │ │ resolve  │ │ Page<T>    │ │ permission     │   │   │
//! │  │   └─────────┘ └──────────┘ └────────────┘ └────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aria-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, ProductOption, Discount, User, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`discount`] - Discount activity and price resolution
//! - [`pagination`] - Limit/offset pages with next/previous links
//! - [`permission`] - Permission codenames and checks
//! - [`password`] - argon2 password hashing
//! - [`slug`] - URL slugs from display names
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use aria_core::money::Money;
//!
//! let price = Money::from_cents(49900); // 499.00
//! let sale = price.apply_percentage_discount(2500); // 25% off
//! assert_eq!(sale.cents(), 37425);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod pagination;
pub mod password;
pub mod permission;
pub mod slug;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pagination::{Page, PageParams};
pub use permission::{Permission, PermissionSet};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Basis points representing 100%.
///
/// Discount percentages are stored as basis points: 2500 = 25%.
pub const FULL_PERCENTAGE_BPS: i64 = 10_000;

/// Default number of rows per page when the client does not ask.
pub const DEFAULT_PAGE_LIMIT: i64 = 25;

/// Upper bound for `limit` on every list endpoint.
pub const MAX_PAGE_LIMIT: i64 = 100;
