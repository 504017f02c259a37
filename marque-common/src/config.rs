//! Bootstrap configuration
//!
//! Settings are resolved per field in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is normal; an unreadable or malformed one is
//! logged and ignored so the service still starts with defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MARQUE_ROOT_FOLDER";
/// Environment variable overriding the HTTP port
pub const PORT_ENV: &str = "MARQUE_PORT";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE: &str = "marquepage.db";
/// Cover image directory inside the root folder
pub const COVERS_DIR: &str = "covers";

/// Contents of `config.toml`
///
/// Every key is optional; absent keys fall through to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub covers: CoverConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// `[covers]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverConfig {
    /// Maximum accepted upload size in kilobytes
    #[serde(default)]
    pub max_upload_kb: Option<u64>,
}

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub max_cover_upload_kb: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("marquepage"))
            .unwrap_or_else(|| PathBuf::from("./marquepage_data"));

        Self {
            root_folder,
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
            log_level: "info".to_string(),
            max_cover_upload_kb: 5120,
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub max_cover_upload_kb: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI, environment, config file and defaults
    pub fn resolve(cli: &CliOverrides) -> Self {
        let config_path = cli.config_file.clone().or_else(default_config_file);

        let toml = config_path.and_then(|path| match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                None
            }
        });

        Self::resolve_with(cli, toml, CompiledDefaults::for_current_platform())
    }

    /// Resolution with an already-loaded config file (no file system access)
    pub fn resolve_with(
        cli: &CliOverrides,
        toml: Option<TomlConfig>,
        defaults: CompiledDefaults,
    ) -> Self {
        let toml = toml.unwrap_or_default();

        let env_root = std::env::var(ROOT_FOLDER_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let env_port = std::env::var(PORT_ENV).ok().and_then(|v| match v.trim().parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!("Ignoring invalid {} value: {:?}", PORT_ENV, v);
                None
            }
        });

        Self {
            root_folder: cli
                .root_folder
                .clone()
                .or(env_root)
                .or(toml.root_folder)
                .unwrap_or(defaults.root_folder),
            bind_address: cli
                .bind_address
                .clone()
                .or(toml.bind_address)
                .unwrap_or(defaults.bind_address),
            port: cli.port.or(env_port).or(toml.port).unwrap_or(defaults.port),
            log_level: cli
                .log_level
                .clone()
                .or(toml.logging.level)
                .unwrap_or(defaults.log_level),
            max_cover_upload_kb: toml
                .covers
                .max_upload_kb
                .unwrap_or(defaults.max_cover_upload_kb),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn covers_path(&self) -> PathBuf {
        self.root_folder.join(COVERS_DIR)
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Create the root and cover directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.covers_path())?;
        Ok(())
    }
}

/// Platform config file location, if one exists
///
/// Checks `<config_dir>/marquepage/config.toml`, then
/// `/etc/marquepage/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("marquepage").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc/marquepage/config.toml");
        if system.exists() {
            return Some(system);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}
