//! Foundation module - small shared utilities
//!
//! - Math types and clip-space helpers
//! - Logging setup

pub mod logging;
pub mod math;
