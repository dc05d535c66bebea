//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system, honouring `RUST_LOG` when it is set
pub fn init() {
    init_with_default_filter("info");
}

/// Initialize the logging system with a fallback filter used when `RUST_LOG` is unset
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_default_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
