//! # relayhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the JSON API for device commands (`/api/control`,
//!   `/api/slave-request`) and response checks
//!   (`/api/devices/{deviceId}/base-responded`,
//!   `/api/devices/{deviceId}/sensors/{sensorIndex}/tank-responded`)
//! - Map HTTP requests into calls on the correlation service (driving adapter)
//! - Map results and errors into `{success, message, ...}` JSON bodies
//!
//! ## Dependency rule
//! Depends on `relayhub-app` (for port traits and services) and `relayhub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
