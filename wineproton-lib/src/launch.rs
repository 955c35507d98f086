//! Process environment derived from a descriptor

use crate::environment::{Descriptor, EnvironmentKind};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Variables layered over the inherited process environment when running
/// anything inside an environment. Recomputed for every run, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnvironment {
    name: String,
    prefix: PathBuf,
    vars: BTreeMap<String, String>,
    wine_version: Option<String>,
}

impl LaunchEnvironment {
    /// Resolve against the current process `PATH`
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        Self::with_base_path(descriptor, std::env::var_os("PATH"))
    }

    /// Resolve with an explicit inherited `PATH`
    pub fn with_base_path(descriptor: &Descriptor, base_path: Option<OsString>) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(
            "WINEPREFIX".to_string(),
            descriptor.prefix.to_string_lossy().into_owned(),
        );
        vars.insert(
            "WINEARCH".to_string(),
            descriptor.architecture.as_str().to_string(),
        );

        match descriptor.bin_dir() {
            Some(bin_dir) => {
                vars.insert(
                    "WINE".to_string(),
                    bin_dir.join("wine").to_string_lossy().into_owned(),
                );
                vars.insert(
                    "WINESERVER".to_string(),
                    bin_dir.join("wineserver").to_string_lossy().into_owned(),
                );

                let mut path = bin_dir.to_string_lossy().into_owned();
                if let Some(base) = base_path.filter(|base| !base.is_empty()) {
                    path.push(':');
                    path.push_str(&base.to_string_lossy());
                }
                vars.insert("PATH".to_string(), path);
            }
            None => {
                vars.insert("WINE".to_string(), "wine".to_string());
                vars.insert("WINESERVER".to_string(), "wineserver".to_string());
            }
        }

        if descriptor.kind == EnvironmentKind::Proton {
            if let Some(proton_dir) = &descriptor.proton_dir {
                vars.insert(
                    "PROTON_DIR".to_string(),
                    proton_dir.to_string_lossy().into_owned(),
                );
                if let Some(version) = read_proton_version(proton_dir) {
                    vars.insert("PROTON_VERSION".to_string(), version);
                }
            }
        }

        debug!("Resolved environment {}: {:?}", descriptor.name, vars);

        Self {
            name: descriptor.name.clone(),
            prefix: descriptor.prefix.clone(),
            vars,
            wine_version: None,
        }
    }

    /// Name of the descriptor this was resolved from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `wine` binary to invoke
    pub fn wine(&self) -> &str {
        self.var("WINE").unwrap_or("wine")
    }

    /// Output of `wine --version`, when it could be obtained
    pub fn wine_version(&self) -> Option<&str> {
        self.wine_version.as_deref()
    }

    pub fn set_wine_version(&mut self, version: Option<String>) {
        self.wine_version = version;
    }

    /// Layer the overrides onto a command
    pub fn apply<'c>(&self, cmd: &'c mut Command) -> &'c mut Command {
        cmd.envs(self.vars.iter())
    }
}

fn read_proton_version(proton_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(proton_dir.join("version")).ok()?;
    let version = content.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Architecture;

    #[test]
    fn proton_uses_bundled_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let proton_dir = dir.path().join("GE-Proton9-20");
        fs::create_dir_all(&proton_dir).unwrap();
        fs::write(proton_dir.join("version"), "1718000000 GE-Proton9-20\n").unwrap();

        let mut desc = Descriptor::proton("GE", "/pfx/ge", Architecture::Win64, &proton_dir);
        // Proton resolution must never look at a Wine directory
        desc.runtime_dir = Some("/opt/unrelated-wine".into());

        let env = LaunchEnvironment::with_base_path(&desc, Some("/usr/bin".into()));
        let bin = proton_dir.join("files/bin");
        assert_eq!(env.wine(), bin.join("wine").to_string_lossy());
        assert_eq!(
            env.var("WINESERVER").unwrap(),
            bin.join("wineserver").to_string_lossy()
        );
        assert_eq!(
            env.var("PATH").unwrap(),
            format!("{}:/usr/bin", bin.to_string_lossy())
        );
        assert_eq!(env.var("PROTON_DIR").unwrap(), proton_dir.to_string_lossy());
        assert_eq!(env.var("PROTON_VERSION"), Some("1718000000 GE-Proton9-20"));
        assert_eq!(env.var("WINEPREFIX"), Some("/pfx/ge"));
        assert_eq!(env.var("WINEARCH"), Some("win64"));
    }

    #[test]
    fn proton_without_version_file_omits_version() {
        let desc = Descriptor::proton("p", "/pfx", Architecture::Win32, "/nonexistent/proton");
        let env = LaunchEnvironment::with_base_path(&desc, None);
        assert_eq!(env.var("PROTON_VERSION"), None);
        assert_eq!(env.var("WINEARCH"), Some("win32"));
        assert_eq!(env.wine(), "/nonexistent/proton/files/bin/wine");
    }

    #[test]
    fn system_wine_uses_bare_names() {
        let desc = Descriptor::wine("Wine-System", "/home/u/.wine", Architecture::Win64, None);
        let env = LaunchEnvironment::with_base_path(&desc, Some("/usr/bin".into()));
        assert_eq!(env.wine(), "wine");
        assert_eq!(env.var("WINESERVER"), Some("wineserver"));
        assert_eq!(env.var("PATH"), None);
        assert_eq!(env.var("PROTON_DIR"), None);
    }

    #[test]
    fn custom_wine_prepends_bin_dir() {
        let desc = Descriptor::wine(
            "staging",
            "/pfx",
            Architecture::Win64,
            Some("/opt/wine-staging".into()),
        );
        let env = LaunchEnvironment::with_base_path(&desc, Some("/bin:/usr/bin".into()));
        assert_eq!(env.wine(), "/opt/wine-staging/bin/wine");
        assert_eq!(env.var("PATH"), Some("/opt/wine-staging/bin:/bin:/usr/bin"));
    }

    #[test]
    fn unset_or_empty_path_adds_no_empty_entry() {
        let desc = Descriptor::wine("w", "/pfx", Architecture::Win64, Some("/opt/wine".into()));

        let unset = LaunchEnvironment::with_base_path(&desc, None);
        assert_eq!(unset.var("PATH"), Some("/opt/wine/bin"));

        let empty = LaunchEnvironment::with_base_path(&desc, Some(OsString::new()));
        assert_eq!(empty.var("PATH"), Some("/opt/wine/bin"));
    }
}
