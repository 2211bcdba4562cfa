//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::Settings;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this twice is a no-op.
pub fn init(settings: &Settings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    let result = match settings.log_format.as_str() {
        "json" => fmt().json().with_env_filter(filter).try_init(),
        _ => fmt().with_env_filter(filter).try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
