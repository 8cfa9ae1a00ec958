//! Conditional logging macros gated on a module-level `ENABLE_LOGS` const.
//!
//! The decode sampler ticks twice a second; its per-tick logging is useful
//! when tuning but noise otherwise. Modules that want it declare
//! `const ENABLE_LOGS: bool = ...;` and use these macros (exported at the
//! crate root) instead of calling `log` directly.

/// Conditional `log::info!`. Requires `ENABLE_LOGS` in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional `log::warn!`. Requires `ENABLE_LOGS` in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional `log::error!`. Requires `ENABLE_LOGS` in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
