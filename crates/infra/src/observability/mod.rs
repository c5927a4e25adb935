//! Logging initialization
//!
//! Installs a global `tracing` subscriber: an `EnvFilter` (overridable with
//! `RUST_LOG`) and a fmt layer, compact or JSON. Connector code only emits
//! events; embedding applications may install their own subscriber instead.

use once_cell::sync::OnceCell;
use pricelink_domain::{ConnectorError, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and the caller has no preference.
pub const DEFAULT_LOG_FILTER: &str = "info";

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once
///
/// Later calls, or a subscriber already installed by the host application,
/// leave the existing one in place.
///
/// # Errors
/// Returns `ConnectorError::Config` if `default_filter` is not a valid
/// filter directive and `RUST_LOG` is unset.
pub fn init_tracing(default_filter: &str, json: bool) -> Result<()> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| ConnectorError::Config(format!("Failed to create log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_target(true).with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true).compact()).try_init()
    };

    if installed.is_ok() {
        tracing::debug!(json, "Tracing subscriber installed");
    }
    let _ = INITIALIZED.set(());
    Ok(())
}
