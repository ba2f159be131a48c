//! Stockroom - an inventory and sales backend.
//!
//! Stockroom keeps a product catalog together with the sales and purchases
//! recorded against it, and exposes them over a JSON HTTP API guarded by
//! bearer tokens.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockroom::config::init_config;
//! use stockroom::server::{build_router, AppState, AuthState, Database};
//!
//! let config = init_config()?;
//! let db = Database::connect(&config.database.url).await?;
//! db.migrate().await?;
//!
//! let state = AppState { db, auth: AuthState::from_config(&config.auth)? };
//! let app = build_router(state);
//! ```

pub mod config;
pub mod errors;

#[path = "server/mod.rs"]
pub mod server;
