use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "ClinicDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable selecting the backend API host.
pub const API_URL_ENV: &str = "CLINICDESK_API_URL";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CLINICDESK_DATA_DIR";

/// Backend used when no API URL is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Uniform per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Quiet period before a live search is issued.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet period before a detail fetch on cache miss.
pub const DETAIL_DEBOUNCE: Duration = Duration::from_millis(200);

/// Lifetime of a cached detail entry.
pub const DETAIL_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Page sizes offered by list views.
pub const PAGE_SIZE_OPTIONS: &[u32] = &[5, 10, 20, 50];

/// Default page size for list views.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Get the application data directory
/// ~/ClinicDesk/ unless overridden by `CLINICDESK_DATA_DIR`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Durable session file (bearer token + doctor profile).
pub fn session_file() -> PathBuf {
    app_data_dir().join("session.json")
}

/// Default directory for danger-zone exports.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinicdesk_lib=info,clinicdesk=info,warn"
}
