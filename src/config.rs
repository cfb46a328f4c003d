use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Status of config file loading
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// Created default config file (first run)
    Created,
    /// Error occurred during loading, using defaults.
    /// String is used in Debug output for logging.
    #[allow(dead_code)]
    Error(String),
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding snapshots. Empty means the platform data directory.
    pub dir: String,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            key: crate::store::STORAGE_KEY.to_string(),
        }
    }
}

/// Persistence timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub debounce_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

/// Share link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Page the share link points at (origin + path).
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173/".to_string(),
        }
    }
}

/// Appearance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Ambient color scheme the `system` theme resolves against:
    /// "light" or "dark".
    pub color_scheme: String,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            color_scheme: "light".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub share: ShareConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Expand `~` to home directory in a path string
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Get the expanded storage directory, if one is configured
    pub fn storage_dir(&self) -> Option<PathBuf> {
        if self.storage.dir.trim().is_empty() {
            None
        } else {
            Some(Self::expand_tilde(&self.storage.dir))
        }
    }

    pub fn persist_delay(&self) -> Duration {
        Duration::from_millis(self.persistence.debounce_ms)
    }

    /// Whether the ambient color scheme is dark. Unknown values mean light.
    pub fn prefers_dark(&self) -> bool {
        self.appearance.color_scheme.trim().eq_ignore_ascii_case("dark")
    }
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub status: ConfigLoadStatus,
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "kickoff", "kickoff").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load configuration from file, environment, and defaults
pub fn load_config() -> LoadedConfig {
    let config_path = match get_config_path() {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return LoadedConfig {
                config: apply_env_overrides(Config::default()),
                config_path: PathBuf::from("config.toml"),
                status: ConfigLoadStatus::Error("Could not determine config directory".to_string()),
            };
        }
    };

    debug!("Config path: {:?}", config_path);

    let (config, status) = load_or_create_config(&config_path);
    let config = apply_env_overrides(config);

    LoadedConfig {
        config,
        config_path,
        status,
    }
}

/// Load config from file, or create default if not exists
fn load_or_create_config(config_path: &PathBuf) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", config_path);
                (config, ConfigLoadStatus::Loaded)
            }
            Err(e) => {
                warn!(
                    "Config file malformed at {:?}: {}. Using defaults.",
                    config_path, e
                );
                (
                    Config::default(),
                    ConfigLoadStatus::Error(format!("Malformed TOML: {}", e)),
                )
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => create_default_config(config_path),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Permission denied reading config at {:?}. Using defaults.",
                config_path
            );
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            warn!(
                "Error reading config at {:?}: {}. Using defaults.",
                config_path, e
            );
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

/// Create the default config file
fn create_default_config(config_path: &PathBuf) -> (Config, ConfigLoadStatus) {
    let config = Config::default();

    if let Some(parent) = config_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(
            "Could not create config directory {:?}: {}. Continuing without file.",
            parent, e
        );
        return (
            config,
            ConfigLoadStatus::Error(format!("Could not create config directory: {}", e)),
        );
    }

    let toml_content = match toml::to_string_pretty(&config) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not serialize default config: {}", e);
            return (
                config,
                ConfigLoadStatus::Error(format!("Serialization error: {}", e)),
            );
        }
    };

    match fs::write(config_path, &toml_content) {
        Ok(()) => {
            info!("Created default config at {:?}", config_path);
            (config, ConfigLoadStatus::Created)
        }
        Err(e) => {
            warn!(
                "Could not write default config to {:?}: {}. Continuing without file.",
                config_path, e
            );
            (
                config,
                ConfigLoadStatus::Error(format!("Write error: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(dir) = env::var("KICKOFF_STORAGE_DIR") {
        debug!("Overriding storage.dir from KICKOFF_STORAGE_DIR");
        config.storage.dir = dir;
    }

    if let Ok(url) = env::var("KICKOFF_BASE_URL") {
        debug!("Overriding share.base_url from KICKOFF_BASE_URL");
        config.share.base_url = url;
    }

    if let Ok(scheme) = env::var("KICKOFF_COLOR_SCHEME") {
        debug!("Overriding appearance.color_scheme from KICKOFF_COLOR_SCHEME");
        config.appearance.color_scheme = scheme;
    }

    if let Ok(level) = env::var("KICKOFF_LOG") {
        debug!("Overriding logging.level from KICKOFF_LOG");
        config.logging.level = level;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.key, "app-state");
        assert!(config.storage_dir().is_none());
        assert_eq!(config.persist_delay(), Duration::from_millis(200));
        assert_eq!(config.share.base_url, "http://localhost:5173/");
        assert!(!config.prefers_dark());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = Config::expand_tilde("~/.local/share/kickoff");
        assert!(!expanded.to_string_lossy().starts_with('~'));

        let no_tilde = Config::expand_tilde("/absolute/path");
        assert_eq!(no_tilde, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[storage]
dir = "/tmp/kickoff"
key = "custom-state"

[persistence]
debounce_ms = 50

[share]
base_url = "https://tools.example.com/kickoff/"

[appearance]
color_scheme = "Dark"

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage_dir(), Some(PathBuf::from("/tmp/kickoff")));
        assert_eq!(config.storage.key, "custom-state");
        assert_eq!(config.persist_delay(), Duration::from_millis(50));
        assert_eq!(config.share.base_url, "https://tools.example.com/kickoff/");
        assert!(config.prefers_dark());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
[persistence]
debounce_ms = 0
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.persist_delay(), Duration::ZERO);
        assert_eq!(config.storage.key, "app-state");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let toml_str = r#"
[share]
base_url = "https://example.com/"
unknown_key = "should be ignored"

[unknown_section]
foo = "bar"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.share.base_url, "https://example.com/");
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let (config, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Created));
        assert_eq!(config.storage.key, "app-state");

        let (_, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Loaded));
    }

    #[test]
    fn test_load_malformed_falls_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[persistence\ndebounce_ms = ").unwrap();

        let (config, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Error(_)));
        assert_eq!(config.persistence.debounce_ms, 200);
    }
}
