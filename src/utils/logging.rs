//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The actuation workers log every cycle boundary they cross; a module can
//! silence that chatter without touching `RUST_LOG` for the rest of the crate.
//!
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_warn};
//!
//! log_debug!("pulse cycle {}", n);
//! ```

/// `log::debug!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

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
