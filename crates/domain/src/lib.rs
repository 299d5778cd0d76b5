//! # relayhub-domain
//!
//! Pure domain model for the relayhub command/response correlation service.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **device records** and the space hierarchy, including the
//!   legacy target-identity aliases
//! - Define **commands** (control, setting, slave request) and their payloads
//! - Define **response documents** and the criteria used to match them
//! - **Normalize** documents into the canonical outward shape
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod device;
pub mod normalize;
pub mod response;
pub mod topic;
