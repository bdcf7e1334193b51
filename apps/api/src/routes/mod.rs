//! # HTTP Routes
//!
//! One router per resource, all nested under `/api`.
//!
//! ```text
//! /api
//! ├── /auth        login, refresh, logout
//! ├── /core        health, audit log
//! ├── /categories  back-office categories
//! ├── /discounts   back-office discounts
//! ├── /employees   staff accounts and their permissions
//! ├── /front       cached storefront reads
//! ├── /kitchens    kitchens
//! ├── /notes       notes on any record
//! ├── /products    products, options and attributes
//! ├── /suppliers   suppliers
//! └── /users       registration, own profile, user lookup
//! ```
//!
//! Handlers stay thin: extract, check permission, call a selector or a
//! service, answer. Writes that change what the storefront shows drop the
//! `front:` cache before answering.

pub mod auth;
pub mod categories;
pub mod core;
pub mod discounts;
pub mod employees;
pub mod front;
pub mod kitchens;
pub mod notes;
pub mod products;
pub mod suppliers;
pub mod users;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::AppState;

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/core", self::core::router())
        .nest("/categories", categories::router())
        .nest("/discounts", discounts::router())
        .nest("/employees", employees::router())
        .nest("/front", front::router())
        .nest("/kitchens", kitchens::router())
        .nest("/notes", notes::router())
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/users", users::router());

    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(origins))
    }
}
