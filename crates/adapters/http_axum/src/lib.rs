//! # switchyard-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the JSON console API under `/api` (device listing, manual switch
//!   and program commands, maintenance actions, system information)
//! - Map HTTP requests into [`ConsoleService`](switchyard_app::services::console_service::ConsoleService)
//!   calls and results back into JSON responses
//! - Guard `/api` with HTTP Basic authentication when users are configured
//!
//! ## Dependency rule
//! Depends on `switchyard-app` (ports and services) and `switchyard-domain`
//! (types used in request/response mapping). Never leaks axum types into the
//! domain.

pub mod api;
pub mod auth;
pub mod error;
pub mod router;
pub mod state;
