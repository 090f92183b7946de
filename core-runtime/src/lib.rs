//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the hymnal core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other core crate depends
//! on. It establishes the logging conventions, the bridge wiring performed by
//! [`config::CoreConfigBuilder`], and the broadcast channel used to publish
//! sync and catalogue events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
