use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use smartdeploy_core::ProjectSettings;
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::paths::{set_permissions_0600, settings_path};

/// Where [`ProjectSettings`] are persisted.
pub trait SettingsStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ProjectSettings>, SettingsError>;

    fn save(&self, settings: &ProjectSettings) -> Result<(), SettingsError>;
}

/// Pretty-printed JSON file, readable only by its owner.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<project>/.smartdeploy/settings.json`.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(settings_path(project_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<ProjectSettings>, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SettingsError::io(&self.path, e)),
        };

        let settings = serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "settings loaded");
        Ok(Some(settings))
    }

    fn save(&self, settings: &ProjectSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| SettingsError::io(&self.path, e))?;
        set_permissions_0600(&self.path);

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Keeps settings in memory. Counts saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<ProjectSettings>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: ProjectSettings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
            saves: Mutex::new(0),
        }
    }

    pub fn saved(&self) -> Option<ProjectSettings> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<ProjectSettings>, SettingsError> {
        Ok(self.saved())
    }

    fn save(&self, settings: &ProjectSettings) -> Result<(), SettingsError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// Process-lifetime cache in front of a [`SettingsStore`].
///
/// The first access loads the stored settings, or creates and saves the
/// defaults when nothing is stored yet.
#[derive(Debug)]
pub struct Settings<S> {
    store: S,
    cache: Option<ProjectSettings>,
}

impl<S: SettingsStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store, cache: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&mut self) -> Result<&ProjectSettings, SettingsError> {
        self.get_mut().map(|s| &*s)
    }

    /// Mutable access to the cached settings. Call [`save`](Self::save)
    /// afterwards to persist.
    pub fn get_mut(&mut self) -> Result<&mut ProjectSettings, SettingsError> {
        if self.cache.is_none() {
            let loaded = match self.store.load()? {
                Some(settings) => settings,
                None => {
                    let defaults = ProjectSettings::default();
                    self.store.save(&defaults)?;
                    info!("created default settings");
                    defaults
                }
            };
            self.cache = Some(loaded);
        }
        Ok(self.cache.get_or_insert_with(ProjectSettings::default))
    }

    /// Writes the cached settings back to the store.
    pub fn save(&mut self) -> Result<(), SettingsError> {
        let settings = self.get_mut()?.clone();
        self.store.save(&settings)
    }

    /// Applies `f` to the settings and saves them.
    pub fn update<R>(
        &mut self,
        f: impl FnOnce(&mut ProjectSettings) -> R,
    ) -> Result<R, SettingsError> {
        let result = f(self.get_mut()?);
        self.save()?;
        Ok(result)
    }
}
