//! Environment registry over the persistent store

use crate::environment::{Descriptor, EnvironmentKind, BUILTIN_ENVIRONMENT};
use crate::error::{ManagerError, Result};
use crate::launch::LaunchEnvironment;
use crate::store::Store;
use crate::wine::Wine;
use tracing::info;

/// Named environments stored in a [`Store`].
///
/// Every mutation is written to disk before returning. When that write
/// fails the in-memory change stays and the `Persist` error is returned.
pub struct EnvironmentRegistry<'s> {
    store: &'s mut Store,
}

impl<'s> EnvironmentRegistry<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        Self { store }
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.store.document().configs.get(name)
    }

    /// All descriptors, ordered by name
    pub fn list(&self) -> impl Iterator<Item = &Descriptor> {
        self.store.document().configs.values()
    }

    /// Name of the last-used environment (may be empty)
    pub fn default_name(&self) -> &str {
        self.store.last_used()
    }

    /// The default environment, if it still exists
    pub fn default_descriptor(&self) -> Option<&Descriptor> {
        self.get(self.default_name())
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if self.get(name).is_none() {
            return Err(ManagerError::EnvironmentNotFound(name.to_string()));
        }
        self.store.document_mut().last_used = name.to_string();
        self.store.persist()
    }

    /// Validate and store a descriptor, replacing any with the same name
    pub fn upsert(&mut self, mut descriptor: Descriptor) -> Result<()> {
        descriptor.name = descriptor.name.trim().to_string();
        descriptor.validate()?;

        if descriptor.is_builtin()
            && (descriptor.kind != EnvironmentKind::Wine || descriptor.runtime_dir.is_some())
        {
            return Err(ManagerError::Validation(format!(
                "'{}' must stay a system Wine environment",
                BUILTIN_ENVIRONMENT
            )));
        }

        info!("Saving environment {} ({})", descriptor.name, descriptor.kind);
        self.store
            .document_mut()
            .configs
            .insert(descriptor.name.clone(), descriptor);
        self.store.persist()
    }

    /// Delete an environment. The built-in one is refused. Removing the
    /// default falls back to the built-in, or to no default at all.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == BUILTIN_ENVIRONMENT {
            return Err(ManagerError::ProtectedEnvironment(name.to_string()));
        }

        let doc = self.store.document_mut();
        if doc.configs.remove(name).is_none() {
            return Err(ManagerError::EnvironmentNotFound(name.to_string()));
        }

        if doc.last_used == name {
            doc.last_used = if doc.configs.contains_key(BUILTIN_ENVIRONMENT) {
                BUILTIN_ENVIRONMENT.to_string()
            } else {
                String::new()
            };
        }

        info!("Removed environment {}", name);
        self.store.persist()
    }

    /// Launch environment for `name`, with the Wine version filled in when
    /// the binary answers `--version`
    pub fn resolve_environment(&self, name: &str) -> Option<LaunchEnvironment> {
        let descriptor = self.get(name)?;
        let mut env = LaunchEnvironment::from_descriptor(descriptor);
        let version = Wine::from_environment(&env).probe_version(&env);
        env.set_wine_version(version);
        Some(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Architecture;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn scratch_store(dir: &Path) -> Store {
        let mut store = Store::load(dir.join("config.json")).unwrap();
        store.ensure_defaults().unwrap();
        store
    }

    #[test]
    fn builtin_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let before = store.clone();

        let mut registry = EnvironmentRegistry::new(&mut store);
        let err = registry.remove(BUILTIN_ENVIRONMENT).unwrap_err();
        assert!(matches!(err, ManagerError::ProtectedEnvironment(_)));
        assert!(registry.get(BUILTIN_ENVIRONMENT).is_some());

        assert_eq!(store, before);
        assert!(!store.path().exists());
    }

    #[test]
    fn invalid_descriptor_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);

        let mut broken = Descriptor::proton("GE", dir.path().join("pfx"), Architecture::Win64, "/o");
        broken.proton_dir = None;
        assert!(registry.upsert(broken).is_err());
        assert!(registry.get("GE").is_none());
        assert!(!dir.path().join("config.json").exists());
    }

    #[test]
    fn upsert_persists_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);

        registry
            .upsert(Descriptor::wine(" Games ", "/pfx/a", Architecture::Win32, None))
            .unwrap();
        registry
            .upsert(Descriptor::wine("Games", "/pfx/b", Architecture::Win64, None))
            .unwrap();

        let reloaded = Store::load(dir.path().join("config.json")).unwrap();
        let games = &reloaded.document().configs["Games"];
        assert_eq!(games.prefix, Path::new("/pfx/b"));
        assert_eq!(games.architecture, Architecture::Win64);
    }

    #[test]
    fn builtin_must_stay_system_wine() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);

        let proton = Descriptor::proton(BUILTIN_ENVIRONMENT, "/pfx", Architecture::Win64, "/o");
        assert!(registry.upsert(proton).is_err());

        let moved = Descriptor::wine(BUILTIN_ENVIRONMENT, "/other/pfx", Architecture::Win32, None);
        registry.upsert(moved).unwrap();
        assert_eq!(
            registry.get(BUILTIN_ENVIRONMENT).unwrap().prefix,
            Path::new("/other/pfx")
        );
    }

    #[test]
    fn removing_default_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);

        registry
            .upsert(Descriptor::proton("GE", "/pfx", Architecture::Win64, "/opt/ge"))
            .unwrap();
        registry.set_default("GE").unwrap();
        assert_eq!(registry.default_name(), "GE");

        registry.remove("GE").unwrap();
        assert_eq!(registry.default_name(), BUILTIN_ENVIRONMENT);
        assert!(matches!(
            registry.remove("GE"),
            Err(ManagerError::EnvironmentNotFound(_))
        ));
    }

    #[test]
    fn removing_default_without_builtin_clears_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(dir.path().join("config.json")).unwrap();
        let mut registry = EnvironmentRegistry::new(&mut store);

        registry
            .upsert(Descriptor::wine("Only", "/pfx", Architecture::Win64, None))
            .unwrap();
        registry.set_default("Only").unwrap();
        registry.remove("Only").unwrap();
        assert_eq!(registry.default_name(), "");
        assert!(registry.default_descriptor().is_none());
    }

    #[test]
    fn set_default_requires_existing_environment() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);
        assert!(matches!(
            registry.set_default("missing"),
            Err(ManagerError::EnvironmentNotFound(_))
        ));
    }

    #[test]
    fn resolve_fills_version_when_available() {
        let dir = tempfile::tempdir().unwrap();
        let proton = dir.path().join("proton");
        let bin = proton.join("files/bin");
        fs::create_dir_all(&bin).unwrap();
        let wine = bin.join("wine");
        fs::write(&wine, "#!/bin/sh\necho 'wine-9.0 (Proton)'\n").unwrap();
        fs::set_permissions(&wine, fs::Permissions::from_mode(0o755)).unwrap();

        let mut store = scratch_store(dir.path());
        let mut registry = EnvironmentRegistry::new(&mut store);
        registry
            .upsert(Descriptor::proton("P", dir.path().join("pfx"), Architecture::Win64, &proton))
            .unwrap();
        registry
            .upsert(Descriptor::proton(
                "Broken",
                dir.path().join("pfx2"),
                Architecture::Win64,
                dir.path().join("missing"),
            ))
            .unwrap();

        let env = registry.resolve_environment("P").unwrap();
        assert_eq!(env.wine_version(), Some("wine-9.0 (Proton)"));
        assert_eq!(env.wine(), wine.to_string_lossy());

        let broken = registry.resolve_environment("Broken").unwrap();
        assert_eq!(broken.wine_version(), None);

        assert!(registry.resolve_environment("nope").is_none());
    }
}
