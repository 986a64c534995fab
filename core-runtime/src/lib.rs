//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the billing console core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other core crate depends on this one for its `EventBus`, its
//! `CoreConfig` and its logging conventions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
