#![forbid(unsafe_code)]

//! Logging shim for the clock.
//!
//! With the `tracing` feature the `tracing` level macros are re-exported at the
//! crate root. Without it the same names expand to nothing, so `crate::debug!`
//! call sites in the clock compile either way and cost nothing.

#[cfg(feature = "tracing")]
pub use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Discards its arguments.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Discards its arguments.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// Discards its arguments.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Discards its arguments.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}

/// Install a JSON-lines subscriber on stderr, filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(all(test, feature = "tracing-json"))]
mod tests {
    use super::*;

    #[test]
    fn json_logging_installs_once() {
        init_json_logging();
        assert!(!init_json_logging());
    }
}
