pub mod api;
pub mod backup;
pub mod cache;
pub mod config;
pub mod core_state;
pub mod dashboard;
pub mod detail;
pub mod models;
pub mod notify;
pub mod patients;
pub mod prescriptions;
pub mod search;
pub mod status;
pub mod validation;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use api::{ApiClient, ApiError};
use core_state::{CoreState, SessionStore};
use notify::Notifier;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Build the application context: restore the stored session and point a
/// gateway client at `base_url`.
pub fn start(base_url: &str, notifier: Arc<dyn Notifier>) -> Result<Arc<ApiClient>, ApiError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let core = Arc::new(CoreState::new(SessionStore::at_default_location()));
    core.init()?;

    let client = ApiClient::new(base_url, core, notifier)?;
    tracing::debug!(base_url = %client.base_url(), "Gateway client ready");
    Ok(Arc::new(client))
}
