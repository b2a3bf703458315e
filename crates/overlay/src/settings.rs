//! Plugin settings persisted as a flat JSON object.

use overlay_plugin_api::SettingsStore;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings backed by a JSON file that is rewritten after every change.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Opens the settings file. A missing file starts out empty and is created
    /// on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        debug!("Loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        let io = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(values).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }

        // replace atomically
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: Value) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(name.to_string(), value);

        if let Err(e) = self.persist(&values) {
            error!("Setting {} was not saved: {}", name, e);
        }
    }
}
