//! Logging utilities
//!
//! The renderer logs through the `log` facade. Binaries pick the backend;
//! `init` wires up `env_logger` so `RUST_LOG` controls verbosity.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Initialize logging for tests, ignoring repeated initialization
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
