//! JSON-backed persistent store
//!
//! One document holds every environment descriptor, the default environment,
//! the custom program list and the settings block. Every write rewrites the
//! whole file; nothing guards against another process editing it in between.

use crate::config::{self, Settings, Theme, DEFAULT_COMPONENT_INSTALLER};
use crate::environment::{Descriptor, BUILTIN_ENVIRONMENT};
use crate::error::{ManagerError, Result};
use crate::programs::CustomProgram;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use which::which;

/// On-disk layout of the settings document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub configs: BTreeMap<String, Descriptor>,

    #[serde(default = "default_last_used")]
    pub last_used: String,

    #[serde(default)]
    pub custom_programs: Vec<CustomProgram>,

    #[serde(default)]
    pub settings: Settings,

    /// Top-level keys written by other versions
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Environment records that could not be read, written back untouched
    #[serde(skip)]
    pub unreadable_configs: Map<String, Value>,

    /// Custom program records that could not be read, written back untouched
    #[serde(skip)]
    pub unreadable_programs: Vec<Value>,
}

fn default_last_used() -> String {
    BUILTIN_ENVIRONMENT.to_string()
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            configs: BTreeMap::new(),
            last_used: default_last_used(),
            custom_programs: Vec::new(),
            settings: Settings::default(),
            extra: Map::new(),
            unreadable_configs: Map::new(),
            unreadable_programs: Vec::new(),
        }
    }
}

/// The settings document plus the file it is persisted to
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    path: PathBuf,
    doc: StoreDocument,
    /// The file on disk could not be parsed and no backup of it exists
    keep_original: bool,
}

impl Store {
    /// Open the store at the default location and make sure it is usable
    pub fn open_default() -> Result<Self> {
        Self::open(config::default_config_file()?)
    }

    /// Load the document, add missing defaults, create the prefix root and
    /// write the result back. A file that could not be parsed or backed up is
    /// left as it is.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::load(path)?;
        store.ensure_defaults()?;

        let prefix_root = store.doc.settings.prefix_path.clone();
        if let Err(e) = fs::create_dir_all(&prefix_root) {
            warn!("Could not create prefix root {:?}: {}", prefix_root, e);
        }

        if store.keep_original {
            warn!("Not rewriting {:?} until it is fixed or a setting changes", store.path);
        } else if let Err(e) = store.save() {
            error!("Failed to save settings: {}", e);
        }
        Ok(store)
    }

    /// Read the document at `path`.
    ///
    /// Each section is merged over the defaults on its own: an invalid
    /// environment or program record is set aside and written back as it
    /// was, an invalid setting falls back to its default. A file that is not
    /// JSON at all is copied to `<name>.bak` and replaced by the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut keep_original = false;

        let mut doc = if path.exists() {
            match fs::read(&path).map_err(ManagerError::from).and_then(|bytes| {
                serde_json::from_slice::<Value>(&bytes).map_err(ManagerError::from)
            }) {
                Ok(value) => {
                    debug!("Loaded settings from {:?}", path);
                    merge_document(value)
                }
                Err(e) => {
                    warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                    keep_original = !back_up(&path);
                    StoreDocument::default()
                }
            }
        } else {
            info!("No settings file at {:?}, using defaults", path);
            StoreDocument::default()
        };

        if doc.settings.config_path.as_os_str().is_empty() {
            doc.settings.config_path = path.clone();
        }
        if doc.settings.prefix_path.as_os_str().is_empty() {
            doc.settings.prefix_path = config::default_prefix_root()?;
        }

        Ok(Self {
            path,
            doc,
            keep_original,
        })
    }

    /// Insert the built-in environment if the document lacks it
    pub fn ensure_defaults(&mut self) -> Result<()> {
        if !self.doc.configs.contains_key(BUILTIN_ENVIRONMENT) {
            let home = config::home_dir()?;
            self.doc
                .configs
                .insert(BUILTIN_ENVIRONMENT.to_string(), Descriptor::builtin(&home));
        }
        Ok(())
    }

    /// Rewrite the whole document
    pub fn save(&self) -> Result<()> {
        let mut value = serde_json::to_value(&self.doc)?;
        if let Some(Value::Object(configs)) = value.get_mut("configs") {
            for (name, raw) in &self.doc.unreadable_configs {
                if !configs.contains_key(name) {
                    configs.insert(name.clone(), raw.clone());
                }
            }
        }
        if let Some(Value::Array(programs)) = value.get_mut("custom_programs") {
            programs.extend(self.doc.unreadable_programs.iter().cloned());
        }
        let json = serde_json::to_string_pretty(&value)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ManagerError::Persist {
                path: self.path.clone(),
                source,
            })?;
        }

        fs::write(&self.path, json).map_err(|source| ManagerError::Persist {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved settings to {:?}", self.path);
        Ok(())
    }

    /// Save after a mutation. The in-memory change is kept even when the
    /// write fails; the failure is logged and handed back to the caller.
    pub(crate) fn persist(&self) -> Result<()> {
        match self.save() {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Settings changed in memory but not on disk: {}", e);
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &StoreDocument {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut StoreDocument {
        &mut self.doc
    }

    pub fn settings(&self) -> &Settings {
        &self.doc.settings
    }

    pub fn last_used(&self) -> &str {
        &self.doc.last_used
    }

    pub fn custom_programs(&self) -> &[CustomProgram] {
        &self.doc.custom_programs
    }

    pub fn custom_program(&self, name: &str) -> Option<&CustomProgram> {
        self.doc.custom_programs.iter().find(|p| p.name == name)
    }

    pub fn add_custom_program(&mut self, program: CustomProgram) -> Result<()> {
        info!("Adding custom program {} ({})", program.name, program.kind);
        self.doc.custom_programs.push(program);
        self.persist()
    }

    /// Remove every entry called `name`; returns whether anything was removed
    pub fn remove_custom_program(&mut self, name: &str) -> Result<bool> {
        let before = self.doc.custom_programs.len();
        self.doc.custom_programs.retain(|p| p.name != name);

        if self.doc.custom_programs.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.doc.settings.theme = theme;
        self.persist()
    }

    pub fn set_prefix_root(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ManagerError::Validation("prefix root must not be empty".into()));
        }
        self.doc.settings.prefix_path = path;
        self.persist()
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.doc.settings.window_size = [width, height];
        self.persist()
    }

    pub fn set_terminal(&mut self, terminal: Option<String>) -> Result<()> {
        self.doc.settings.terminal = terminal.filter(|t| !t.trim().is_empty());
        self.persist()
    }

    /// Configure the component installer. Accepts the bare default name or
    /// a path to an existing file.
    pub fn set_component_installer_path(&mut self, path: &str) -> Result<()> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ManagerError::Validation(
                "component installer path must not be empty".into(),
            ));
        }
        if path != DEFAULT_COMPONENT_INSTALLER && !Path::new(path).is_file() {
            return Err(ManagerError::Validation(format!(
                "component installer '{}' does not exist or is not a file",
                path
            )));
        }

        self.doc.settings.component_installer_path = path.to_string();
        self.persist()
    }

    /// Component installer to run: the one on `PATH`, then the configured
    /// file, then the bare command name.
    pub fn component_installer(&self) -> PathBuf {
        if let Ok(found) = which(DEFAULT_COMPONENT_INSTALLER) {
            return found;
        }

        let configured = Path::new(&self.doc.settings.component_installer_path);
        if configured.is_file() {
            return configured.to_path_buf();
        }

        PathBuf::from(DEFAULT_COMPONENT_INSTALLER)
    }
}

/// Copy an unparseable settings file aside; returns whether the copy exists
fn back_up(path: &Path) -> bool {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    let backup = PathBuf::from(name);

    match fs::copy(path, &backup) {
        Ok(_) => {
            warn!("Saved the unreadable settings file as {:?}", backup);
            true
        }
        Err(e) => {
            error!("Could not back up {:?} to {:?}: {}", path, backup, e);
            false
        }
    }
}

/// Take `key` out of `map` and deserialize it, logging and dropping a bad value
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let raw = map.remove(key)?;
    match serde_json::from_value(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring invalid value for {}: {}", key, e);
            None
        }
    }
}

fn merge_document(value: Value) -> StoreDocument {
    let mut doc = StoreDocument::default();
    let mut root = match value {
        Value::Object(root) => root,
        other => {
            warn!("Settings document is not an object ({}), using defaults", other);
            return doc;
        }
    };

    match root.remove("configs") {
        Some(Value::Object(entries)) => {
            for (name, raw) in entries {
                match serde_json::from_value::<Descriptor>(raw.clone()) {
                    Ok(mut descriptor) => {
                        descriptor.name = name.clone();
                        doc.configs.insert(name, descriptor);
                    }
                    Err(e) => {
                        warn!("Keeping unreadable environment {} aside: {}", name, e);
                        doc.unreadable_configs.insert(name, raw);
                    }
                }
            }
        }
        Some(other) => warn!("Ignoring invalid configs section: {}", other),
        None => {}
    }

    if let Some(last_used) = take_field::<String>(&mut root, "last_used") {
        doc.last_used = last_used;
    }

    match root.remove("custom_programs") {
        Some(Value::Array(entries)) => {
            for raw in entries {
                match serde_json::from_value::<CustomProgram>(raw.clone()) {
                    Ok(program) => doc.custom_programs.push(program),
                    Err(e) => {
                        warn!("Keeping unreadable custom program aside: {}", e);
                        doc.unreadable_programs.push(raw);
                    }
                }
            }
        }
        Some(other) => warn!("Ignoring invalid custom_programs section: {}", other),
        None => {}
    }

    match root.remove("settings") {
        Some(Value::Object(settings)) => doc.settings = merge_settings(settings),
        Some(other) => warn!("Ignoring invalid settings section: {}", other),
        None => {}
    }

    doc.extra = root;
    doc
}

fn merge_settings(mut map: Map<String, Value>) -> Settings {
    let mut settings = Settings::default();

    let installer = match take_field::<String>(&mut map, "component_installer_path") {
        Some(path) => {
            map.remove("winetricks_path");
            Some(path)
        }
        None => take_field(&mut map, "winetricks_path"),
    };
    if let Some(path) = installer {
        settings.component_installer_path = path;
    }
    if let Some(path) = take_field(&mut map, "config_path") {
        settings.config_path = path;
    }
    if let Some(path) = take_field(&mut map, "prefix_path") {
        settings.prefix_path = path;
    }
    if let Some(theme) = take_field(&mut map, "theme") {
        settings.theme = theme;
    }
    if let Some(size) = take_field(&mut map, "window_size") {
        settings.window_size = size;
    }
    settings.terminal = take_field::<Option<String>>(&mut map, "terminal").flatten();

    settings.extra = map;
    settings
}
