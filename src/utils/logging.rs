//! Logging macros gated by a module-level `ENABLE_LOGS` flag, so a noisy
//! module (the periodic loops, mostly) can be silenced without touching
//! `RUST_LOG`.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info};
//!
//! log_info!("sampling loop shutting down");
//! ```

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::debug!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}
