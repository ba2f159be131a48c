// src/server/mod.rs

//! Server-side components for Stockroom.
//!
//! This module contains:
//! - `database`    → SQLite store for products, sales, purchases and users
//! - `products`    → Axum handlers for the product catalog
//! - `movements`   → Axum handlers for sales and purchases
//! - `users`       → Registration, login and user listing
//! - `handlers`    → Shared state and the health probe
//! - `routes`      → Router builder and authentication policy
//! - `auth`        → JWT issuing/verification and password hashing
//! - `api_error`   → Error envelope returned by every endpoint
//! - `extract`     → JSON/path extractors that report rejections as `ApiError`
//! - `logging`     → Tracing setup, request logging and audit events
//! - `validation`  → Request validation utilities

pub mod api_error;
pub mod auth;
pub mod database;
pub mod extract;
pub mod handlers;
pub mod logging;
pub mod movements;
pub mod products;
pub mod routes;
pub mod users;
pub mod validation;

// Convenient re-exports so callers can do `stockroom::server::X`
// instead of digging into submodules.

pub use api_error::{ApiError, ErrorCode};
pub use auth::{
    hash_password, require_auth, verify_password, AuthError, AuthState, AuthenticatedUser, Claims,
    JwtValidator,
};
pub use database::{Database, MovementKind, Product, StockMovement, User};
pub use handlers::{health_handler, AppState, DeleteResponse};
pub use routes::build_router;

pub use validation::{
    validate_email, validate_length, validate_not_empty, validate_price, validate_product_name,
    NumericInput, ValidationError, ValidationResult,
};
