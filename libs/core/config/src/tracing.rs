//! Tracing and error-report initialization for binaries.

use crate::Environment;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install color-eyre panic and error report handlers.
///
/// Call once, before any fallible startup work, so failures during boot
/// already produce readable reports.
pub fn install_color_eyre() {
    if let Err(e) = color_eyre::install() {
        eprintln!("color-eyre already installed: {e}");
    }
}

/// Initialize the global tracing subscriber.
///
/// Local development gets human-readable output; staging and production emit
/// JSON lines for the cluster log pipeline. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if environment.structured_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(ErrorLayer::default())
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(ErrorLayer::default())
            .with(fmt::layer().pretty())
            .init();
    }
}
