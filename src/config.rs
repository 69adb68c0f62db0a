use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Ledgera";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "ledgera=info"
}

/// Get the application data directory
/// ~/Ledgera/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Ledgera")
}

/// Get the receipt store directory
pub fn receipts_dir() -> PathBuf {
    app_data_dir().join("receipts")
}

/// Get the default database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("ledgera.db")
}

/// Runtime settings consumed by the pipeline, loaded from the environment.
///
/// The core never reads these on its own — the shell loads them once and
/// threads the values through constructors.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Extraction service credential (`LEDGERA_API_KEY`).
    pub api_key: Option<String>,
    /// Database location, overridable via `LEDGERA_DB_PATH`.
    pub database_path: PathBuf,
    /// Whether the vision fallback path is enabled (`LEDGERA_VISION_FALLBACK`).
    pub vision_fallback: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        let api_key = std::env::var("LEDGERA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let database_path = std::env::var("LEDGERA_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(database_path);

        let vision_fallback = match std::env::var("LEDGERA_VISION_FALLBACK") {
            Ok(v) => !matches!(v.trim(), "0" | "false" | "off"),
            Err(_) => true,
        };

        Self {
            api_key,
            database_path,
            vision_fallback,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            database_path: database_path(),
            vision_fallback: true,
        }
    }
}
