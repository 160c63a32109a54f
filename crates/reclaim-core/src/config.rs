//! Configuration loaded from `~/.config/reclaim/config.toml`.
//!
//! Missing files and missing sections fall back to defaults thanks to
//! `#[serde(default)]`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;
use crate::service::ShutdownScope;

/// Longest command line `RegisterApplicationRestart` accepts
/// (`RESTART_MAX_CMD_LINE`), in UTF-16 units.
pub const RESTART_MAX_CMD_LINE: usize = 1024;

/// Top-level configuration for Reclaim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File logging settings.
    pub log: LogConfig,
    /// Shutdown pass defaults.
    pub shutdown: ShutdownConfig,
    /// Restart registration for the current process.
    pub restart: RestartConfig,
}

/// Defaults for the shutdown pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Only shut down processes that registered for restart. The safe
    /// default: anything else cannot be relaunched afterwards.
    pub only_registered: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            only_registered: true,
        }
    }
}

impl ShutdownConfig {
    pub fn scope(&self) -> ShutdownScope {
        if self.only_registered {
            ShutdownScope::RegisteredOnly
        } else {
            ShutdownScope::All
        }
    }
}

/// How the OS should relaunch this process after terminating it for
/// servicing. Explicit process-scoped state, passed to
/// `register_for_restart` at startup; an empty command line means the
/// process is relaunched with no arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Arguments handed back to the process on relaunch. Capped at
    /// [`RESTART_MAX_CMD_LINE`] UTF-16 units.
    pub command_line: String,
    /// Do not relaunch if the process crashed.
    pub no_crash: bool,
    /// Do not relaunch if the process hung.
    pub no_hang: bool,
    /// Do not relaunch after a servicing (patch) termination.
    pub no_patch: bool,
    /// Do not relaunch after a patch-triggered reboot.
    pub no_reboot: bool,
}

impl RestartConfig {
    /// Registration for a plain relaunch under every condition.
    pub fn with_command_line(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            ..Self::default()
        }
    }

    /// The `RESTART_NO_*` flag bits for `RegisterApplicationRestart`.
    pub fn flag_bits(&self) -> u32 {
        let mut bits = 0;
        if self.no_crash {
            bits |= 0x1;
        }
        if self.no_hang {
            bits |= 0x2;
        }
        if self.no_patch {
            bits |= 0x4;
        }
        if self.no_reboot {
            bits |= 0x8;
        }
        bits
    }
}

/// Returns the config directory: `~/.config/reclaim/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("reclaim"))
}

/// Returns the config file path: `~/.config/reclaim/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Tries to load and parse `config.toml`.
///
/// Returns an error string describing what went wrong (IO error,
/// parse error, etc.).
pub fn try_load() -> Result<Config, String> {
    let path = config_path().ok_or("could not determine config path")?;
    let content = std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    let config: Config =
        toml::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(config)
}

/// Loads the configuration from disk, falling back to defaults when
/// the file is missing or invalid.
pub fn load() -> Config {
    match try_load() {
        Ok(config) => config,
        Err(err) => {
            crate::log_debug!("using default config: {err}");
            Config::default()
        }
    }
}

/// The default configuration rendered as TOML, for `reclaim init`.
pub fn default_toml() -> String {
    toml::to_string_pretty(&Config::default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = Config::default();
        assert!(config.shutdown.only_registered);
        assert_eq!(config.shutdown.scope(), ShutdownScope::RegisteredOnly);
        assert!(!config.log.enabled);
        assert_eq!(config.restart.flag_bits(), 0);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[shutdown]\nonly_registered = false\n").unwrap();
        assert_eq!(config.shutdown.scope(), ShutdownScope::All);
        assert!(!config.log.enabled);
    }

    #[test]
    fn restart_flags_map_to_bits() {
        let config = RestartConfig {
            no_crash: true,
            no_reboot: true,
            ..RestartConfig::default()
        };
        assert_eq!(config.flag_bits(), 0x1 | 0x8);
    }

    #[test]
    fn default_toml_round_trips() {
        let rendered = default_toml();
        assert!(rendered.contains("only_registered"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert!(parsed.shutdown.only_registered);
    }
}
