//! Custom program entries remembered across sessions

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What a custom program entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProgramType {
    /// Windows installer file run directly under Wine/Proton
    #[serde(rename = "package", alias = "exe")]
    Package,
    /// Component name handed to the component installer
    #[default]
    #[serde(rename = "component", alias = "winetricks")]
    Component,
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramType::Package => f.pad("package"),
            ProgramType::Component => f.pad("component"),
        }
    }
}

/// A `{name, path, type}` entry in `custom_programs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProgram {
    pub name: String,

    /// Absolute installer path for packages, component name otherwise
    pub path: String,

    #[serde(rename = "type", default)]
    pub kind: ProgramType,
}

impl CustomProgram {
    /// Build an entry from user input.
    ///
    /// Paths ending in `.exe` or `.msi` are packages: the file must exist and
    /// is stored as an absolute path. Anything else is a component name.
    pub fn new(name: &str, path: &str) -> Result<Self> {
        let name = name.trim();
        let path = path.trim();

        if name.is_empty() {
            return Err(ManagerError::Validation(
                "a program needs a name".into(),
            ));
        }
        if path.is_empty() {
            return Err(ManagerError::Validation(format!(
                "program '{}' needs a path or component name",
                name
            )));
        }

        if is_installer_path(path) {
            let file = Path::new(path);
            if !file.exists() {
                return Err(ManagerError::MissingFile(file.to_path_buf()));
            }
            let absolute = absolutize(file)?;
            Ok(Self {
                name: name.to_string(),
                path: absolute.to_string_lossy().into_owned(),
                kind: ProgramType::Package,
            })
        } else {
            Ok(Self {
                name: name.to_string(),
                path: path.to_string(),
                kind: ProgramType::Component,
            })
        }
    }
}

/// Whether a path names a Windows installer (`.exe` / `.msi`, any case)
pub fn is_installer_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".exe") || lower.ends_with(".msi")
}

/// Make a path absolute against the current directory without touching symlinks
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_installer_is_rejected() {
        let err = CustomProgram::new("Setup", "/nonexistent/dir/setup.EXE").unwrap_err();
        assert!(matches!(err, ManagerError::MissingFile(_)));
    }

    #[test]
    fn existing_installer_becomes_package() {
        let dir = tempfile::tempdir().unwrap();
        let msi = dir.path().join("tool.msi");
        std::fs::write(&msi, b"").unwrap();

        let program = CustomProgram::new("Tool", msi.to_str().unwrap()).unwrap();
        assert_eq!(program.kind, ProgramType::Package);
        assert_eq!(program.path, msi.to_string_lossy());
    }

    #[test]
    fn other_paths_are_components() {
        let program = CustomProgram::new("  Fonts ", " corefonts ").unwrap();
        assert_eq!(program.name, "Fonts");
        assert_eq!(program.path, "corefonts");
        assert_eq!(program.kind, ProgramType::Component);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(CustomProgram::new(" ", "vcrun2019").is_err());
    }

    #[test]
    fn legacy_type_spellings_load() {
        let entries: Vec<CustomProgram> = serde_json::from_str(
            r#"[
                {"name": "a", "path": "/x/a.exe", "type": "exe"},
                {"name": "b", "path": "dxvk", "type": "winetricks"},
                {"name": "c", "path": "xact"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0].kind, ProgramType::Package);
        assert_eq!(entries[1].kind, ProgramType::Component);
        assert_eq!(entries[2].kind, ProgramType::Component);

        let value = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(value["type"], "package");
    }
}
