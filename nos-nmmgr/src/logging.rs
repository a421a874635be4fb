//! Unified logging support for nos-nmmgr
//!
//! Thin wrappers around the `log` facade so call sites do not need
//! `#[cfg(feature = "log")]` on every statement. With the feature disabled the
//! arguments are still evaluated as a tuple so nothing becomes unused.

/// Trace-level logging
macro_rules! nm_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = ($($arg)*); }
    }}
}

/// Debug-level logging
macro_rules! nm_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = ($($arg)*); }
    }}
}

/// Info-level logging
macro_rules! nm_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::info!($($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = ($($arg)*); }
    }}
}

/// Warn-level logging
macro_rules! nm_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = ($($arg)*); }
    }}
}

/// Error-level logging
macro_rules! nm_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::error!($($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = ($($arg)*); }
    }}
}

pub(crate) use {nm_debug, nm_error, nm_info, nm_trace, nm_warn};

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let name = "/dev/irq";
        let count = 3;
        nm_trace!("trace {} {}", name, count);
        nm_debug!("debug {}", name);
        nm_info!("info {}", count);
        nm_warn!("warn");
        nm_error!("error {} {}", name, count);
    }
}
