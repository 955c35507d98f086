//! Configuration paths and the `settings` block of the store

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory name used under the user's config dir and home
pub const APP_DIR_NAME: &str = "WineProtonManager";

/// File name of the settings document
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Component installer looked up on `PATH` when nothing else is configured
pub const DEFAULT_COMPONENT_INSTALLER: &str = "winetricks";

/// Terminal emulator used to show installer output
pub const DEFAULT_TERMINAL: &str = "konsole";

pub const DEFAULT_WINDOW_SIZE: [u32; 2] = [900, 650];

/// Get the configuration directory (~/.config/WineProtonManager)
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| ManagerError::Config("Could not determine config directory".into()))?
        .join(APP_DIR_NAME))
}

/// Default location of the settings document
pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| ManagerError::Config("Could not determine home directory".into()))
}

/// Default root under which new prefixes are suggested (~/WineProtonManager)
pub fn default_prefix_root() -> Result<PathBuf> {
    Ok(home_dir()?.join(APP_DIR_NAME))
}

/// UI theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    #[serde(rename = "light")]
    Light,
    #[serde(rename = "dark")]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ManagerError::Validation(format!(
                "unknown theme '{}', use light or dark",
                s
            ))),
        }
    }
}

/// The `settings` block of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Component installer executable (older documents call it `winetricks_path`)
    #[serde(alias = "winetricks_path", default = "default_component_installer")]
    pub component_installer_path: String,

    /// Where the document itself lives
    #[serde(default)]
    pub config_path: PathBuf,

    /// Root directory for new prefixes
    #[serde(default)]
    pub prefix_path: PathBuf,

    #[serde(default)]
    pub theme: Theme,

    #[serde(default = "default_window_size")]
    pub window_size: [u32; 2],

    /// Terminal emulator override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,

    /// Keys written by other versions
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_component_installer() -> String {
    DEFAULT_COMPONENT_INSTALLER.to_string()
}

fn default_window_size() -> [u32; 2] {
    DEFAULT_WINDOW_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            component_installer_path: default_component_installer(),
            config_path: PathBuf::new(),
            prefix_path: PathBuf::new(),
            theme: Theme::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            terminal: None,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Terminal emulator to launch installers in
    pub fn terminal_program(&self) -> &str {
        self.terminal
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TERMINAL)
    }
}
