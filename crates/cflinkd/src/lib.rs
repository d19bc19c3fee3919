//! # cflinkd
//!
//! HTTP API and scheduler for cflink. This crate is the integration layer:
//! it reads configuration, wires the store, provider, IP source and cipher
//! into `cflink_core::Services`, and exposes the record manager and
//! reconciler over a JSON API. Reconciliation and lifecycle rules live in
//! `cflink-core`.

pub mod auth;
pub mod cipher;
pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use cipher::AesGcmCipher;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
