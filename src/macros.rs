/// Writes a single line to a `Logger`. Compiled out entirely with the
/// `no_logging` feature.
#[cfg(not(feature = "no_logging"))]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {{
        if let Some(w) = $logger.line_writer() {
            let _ = writeln!(w, $($arg)*);
        }
    }};
}

#[cfg(feature = "no_logging")]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {{
        let _ = &$logger;
    }};
}

/// Stage-local trace output. Each stage wraps this in its own `debug_log!`
/// with a fixed prefix and an on/off switch. Output only appears when the
/// crate is built with the `debug_print` feature. The executor's switch is on,
/// grouping and parsing are off until a stage needs tracing.
macro_rules! enabled_debug_print {
    (false, $name:literal, $format:literal) => {};
    (false, $name:literal, $format:literal, $($args:expr),*) => {};
    (true, $name:literal, $format:literal) => {
        if cfg!(feature = "debug_print") {
            println!("[{}] {}", $name, $format);
        }
    };
    (true, $name:literal, $format:literal, $($args:expr),*) => {
        if cfg!(feature = "debug_print") {
            println!("[{}] {}", $name, format!($format, $($args),*));
        }
    };
}
