//! Environment descriptors: a named Wine or Proton runtime plus its prefix

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the descriptor that always exists and cannot be removed
pub const BUILTIN_ENVIRONMENT: &str = "Wine-System";

/// Runtime flavour of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentKind {
    #[serde(rename = "wine")]
    Wine,
    #[serde(rename = "proton")]
    Proton,
}

impl EnvironmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Wine => "wine",
            EnvironmentKind::Proton => "proton",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EnvironmentKind {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "wine" => Ok(EnvironmentKind::Wine),
            "proton" => Ok(EnvironmentKind::Proton),
            _ => Err(ManagerError::Validation(format!(
                "unknown environment type '{}', use wine or proton",
                s
            ))),
        }
    }
}

/// Windows architecture of a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Architecture {
    #[serde(rename = "win32")]
    Win32,
    #[default]
    #[serde(rename = "win64")]
    Win64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Win32 => "win32",
            Architecture::Win64 => "win64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "32" | "win32" => Ok(Architecture::Win32),
            "64" | "win64" => Ok(Architecture::Win64),
            _ => Err(ManagerError::Validation(format!(
                "invalid architecture '{}', use win32 or win64",
                s
            ))),
        }
    }
}

/// A named environment as stored under `configs` in the settings document.
///
/// The name is the key of the map it lives in, so it is not serialized with
/// the rest of the record. [`crate::Store::load`] fills it back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(skip)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EnvironmentKind,

    /// Root of the Windows environment
    pub prefix: PathBuf,

    #[serde(rename = "arch", default)]
    pub architecture: Architecture,

    /// Alternate Wine installation (wine only)
    #[serde(rename = "wine_dir", default, skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<PathBuf>,

    /// Proton distribution root (proton only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proton_dir: Option<PathBuf>,
}

impl Descriptor {
    /// Wine environment; `runtime_dir` of `None` means the system `wine`
    pub fn wine(
        name: impl Into<String>,
        prefix: impl Into<PathBuf>,
        architecture: Architecture,
        runtime_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EnvironmentKind::Wine,
            prefix: prefix.into(),
            architecture,
            runtime_dir: runtime_dir.filter(|dir| !dir.as_os_str().is_empty()),
            proton_dir: None,
        }
    }

    pub fn proton(
        name: impl Into<String>,
        prefix: impl Into<PathBuf>,
        architecture: Architecture,
        proton_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EnvironmentKind::Proton,
            prefix: prefix.into(),
            architecture,
            runtime_dir: None,
            proton_dir: Some(proton_dir.into()),
        }
    }

    /// The protected system Wine environment
    pub fn builtin(home: &Path) -> Self {
        Self::wine(
            BUILTIN_ENVIRONMENT,
            home.join(".wine"),
            Architecture::Win64,
            None,
        )
    }

    pub fn is_builtin(&self) -> bool {
        self.name == BUILTIN_ENVIRONMENT
    }

    /// Check the required fields for this descriptor's kind
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ManagerError::Validation(
                "environment name must not be empty".into(),
            ));
        }

        if self.prefix.as_os_str().is_empty() {
            return Err(ManagerError::Validation(format!(
                "environment '{}' has no prefix",
                self.name
            )));
        }

        match self.kind {
            EnvironmentKind::Proton => {
                match &self.proton_dir {
                    Some(dir) if !dir.as_os_str().is_empty() => {}
                    _ => {
                        return Err(ManagerError::Validation(format!(
                            "Proton environment '{}' requires a Proton directory",
                            self.name
                        )))
                    }
                }
                if self.runtime_dir.is_some() {
                    return Err(ManagerError::Validation(format!(
                        "Proton environment '{}' must not set a Wine directory",
                        self.name
                    )));
                }
            }
            EnvironmentKind::Wine => {
                if self.proton_dir.is_some() {
                    return Err(ManagerError::Validation(format!(
                        "Wine environment '{}' must not set a Proton directory",
                        self.name
                    )));
                }
                if matches!(&self.runtime_dir, Some(dir) if dir.as_os_str().is_empty()) {
                    return Err(ManagerError::Validation(format!(
                        "Wine environment '{}' has an empty Wine directory",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Directory holding `wine` and `wineserver`, or `None` for system Wine
    pub fn bin_dir(&self) -> Option<PathBuf> {
        match self.kind {
            EnvironmentKind::Proton => self
                .proton_dir
                .as_ref()
                .map(|dir| dir.join("files").join("bin")),
            EnvironmentKind::Wine => self.runtime_dir.as_ref().map(|dir| dir.join("bin")),
        }
    }
}
