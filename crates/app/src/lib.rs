//! # relayhub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceDirectory`: read access to sensor metadata and the device hierarchy
//!   - `ResponseStore`: time-windowed lookups of device responses
//!   - `CommandPublisher`: hand a JSON payload to the messaging fabric
//!   - `TopicScheme`: derive a topic from a purpose and a target identity
//! - Define **driving/inbound** use-case services:
//!   - `IdentityResolver`: device id → target identity
//!   - `ResponsePoller`: bounded, fixed-interval polling of the response store
//!   - `CorrelationService`: publish a command and correlate the reply
//! - Orchestrate domain objects without knowing *how* storage or transport work
//!
//! ## Dependency rule
//! Depends on `relayhub-domain` only (plus `tokio::time` for suspension).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
