//! Logging initialization
//!
//! The core only emits `tracing` events; installing a subscriber is left to
//! the host (CLI, FFI shell, tests). This module provides a single
//! initialization point for hosts that want the default output.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "library_core=info";

/// Logging profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output honouring `RUST_LOG`
    Development,
    /// Debug output for the core, useful when chasing live query updates
    Verbose,
    /// Install nothing; events are dropped unless the host has a subscriber
    Quiet,
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Safe to call more than once; only the first call has an effect.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = match profile {
            Profile::Development => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            Profile::Verbose => EnvFilter::new("library_core=debug"),
            Profile::Quiet => return,
        };

        // A host may already have installed a global subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Quiet);
        init(Profile::Development);
        init(Profile::Verbose);
    }
}
