//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_SNIFFER";

/// Config file name
const CONFIG_FILE_NAME: &str = "sniffer.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_SNIFFER_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` path (the `--config` flag); must exist
    /// 2. `SERIAL_SNIFFER_CONFIG` environment variable
    /// 3. `./sniffer.toml` (current directory)
    /// 4. `sniffer.toml` in the platform config directory
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override values from the file.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = resolve_config_path();
                let mut config = match config_path {
                    Some(ref path) => load_from_file(path)?,
                    None => Config::default(),
                };
                apply_env_overrides(&mut config)?;
                Ok(Self {
                    config_path,
                    config,
                })
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Platform config directory for this application
/// (`~/.config/serial-sniffer` on Linux, `%APPDATA%\serial-sniffer\config` on Windows).
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "serial-sniffer").map(|d| d.config_dir().to_path_buf())
}

/// Default config file path inside [`get_default_config_dir`].
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_SNIFFER_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_SNIFFER_RELAY_HARDWARE_PORT=COM5`
/// - `SERIAL_SNIFFER_RELAY_BAUD_RATE=9600`
/// - `SERIAL_SNIFFER_TRACE_COLOR=false`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    apply_overrides(config, |var| std::env::var(var).ok())
}

/// Apply overrides from any variable source.
pub fn apply_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    let get = |key: &str| {
        let var = format!("{}_{}", ENV_PREFIX, key);
        lookup(&var).map(|val| (var, val))
    };

    // Relay overrides
    if let Some((_, val)) = get("RELAY_HARDWARE_PORT") {
        config.relay.hardware_port = Some(val);
    }
    if let Some((_, val)) = get("RELAY_SOFTWARE_PORT") {
        config.relay.software_port = Some(val);
    }
    if let Some((var, val)) = get("RELAY_BAUD_RATE") {
        config.relay.baud_rate = parse(&var, &val, "expected a whole number of bits per second")?;
    }
    if let Some((var, val)) = get("RELAY_IDLE_GAP_SECS") {
        config.relay.idle_gap_secs = parse(&var, &val, "expected a number of seconds")?;
    }
    if let Some((var, val)) = get("RELAY_CHANNEL_CAPACITY") {
        config.relay.channel_capacity = parse(&var, &val, "expected a whole number of chunks")?;
    }
    if let Some((var, val)) = get("RELAY_POLL_INTERVAL_MS") {
        config.relay.poll_interval_ms = parse(&var, &val, "expected a whole number of milliseconds")?;
    }
    if let Some((var, val)) = get("RELAY_SHUTDOWN_TIMEOUT_MS") {
        config.relay.shutdown_timeout_ms =
            parse(&var, &val, "expected a whole number of milliseconds")?;
    }

    // Trace overrides
    if let Some((var, val)) = get("TRACE_COLOR") {
        config.trace.color = parse_bool(&var, &val)?;
    }
    if let Some((var, val)) = get("TRACE_SHOW_TIMESTAMPS") {
        config.trace.show_timestamps = parse_bool(&var, &val)?;
    }

    // Logging overrides
    if let Some((_, val)) = get("LOGGING_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

fn parse<T: FromStr>(var: &str, val: &str, message: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::bad_override(var, message))
}

fn parse_bool(var: &str, val: &str) -> ConfigResult<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::bad_override(var, "expected true or false")),
    }
}
