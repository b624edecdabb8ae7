//! Process-wide annotation metadata cache.
//!
//! Annotation types (text boxes, images, shapes placed on the structure
//! canvas) describe their attributes with JSON descriptors. Some attributes
//! remember the last value a user picked, which becomes the default for the
//! next annotation of that type. The store is shared by the whole process:
//! it is created on first use (or explicitly via [`init`]) and written back
//! with [`flush`] at shutdown.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use serde_json::{Map, Value};

use crate::error::{Result, SluglineError};

/// Key holding the integer revision of a metadata document.
pub const REVISION_KEY: &str = "#revision";

/// Descriptors shipped with the application.
pub const BUNDLED_METADATA: &str = r##"{
    "#revision": 1,
    "text": [
        { "name": "text", "type": "text", "default": "", "cache": false },
        { "name": "color", "type": "color", "default": "#000000", "cache": true },
        { "name": "fontSize", "type": "number", "default": 12, "cache": true }
    ],
    "rectangle": [
        { "name": "color", "type": "color", "default": "#ffffff", "cache": true },
        { "name": "borderWidth", "type": "number", "default": 1, "cache": true }
    ],
    "image": [
        { "name": "image", "type": "image", "default": "", "cache": false },
        { "name": "fillBackground", "type": "boolean", "default": false, "cache": true }
    ]
}"##;

static GLOBAL: OnceLock<Mutex<MetaDataStore>> = OnceLock::new();

/// Annotation attribute descriptors keyed by annotation type.
#[derive(Debug, Clone)]
pub struct MetaDataStore {
    data: Map<String, Value>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl MetaDataStore {
    /// Build a store from the bundled descriptors and an optional on-disk copy.
    ///
    /// The bundled copy replaces the on-disk one when its revision is newer;
    /// otherwise the on-disk copy (with its cached defaults) wins.
    pub fn load(path: Option<&Path>, bundled: &str) -> Result<Self> {
        let bundled: Map<String, Value> = serde_json::from_str(bundled)?;
        let on_disk = match path {
            Some(p) if p.is_file() => {
                let raw = std::fs::read_to_string(p)?;
                serde_json::from_str::<Map<String, Value>>(&raw)?
            }
            _ => Map::new(),
        };

        let bundled_revision = revision_of(&bundled);
        let disk_revision = revision_of(&on_disk);

        let mut store = Self {
            data: on_disk,
            path: path.map(Path::to_path_buf),
            dirty: false,
        };

        if bundled_revision > disk_revision {
            tracing::debug!(
                bundled_revision,
                disk_revision,
                "replacing annotation metadata with bundled copy"
            );
            store.data = bundled;
            store.dirty = true;
            store.save()?;
        }

        Ok(store)
    }

    pub fn revision(&self) -> i64 {
        revision_of(&self.data)
    }

    /// Attribute descriptors for an annotation type (empty if unknown).
    pub fn get(&self, annotation_type: &str) -> Vec<Value> {
        self.data
            .get(annotation_type)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Remember attribute values as defaults for future annotations.
    ///
    /// Only descriptors flagged with `"cache": true` take the new value.
    /// Returns false when the annotation type is unknown.
    pub fn update(&mut self, annotation_type: &str, attributes: &Map<String, Value>) -> bool {
        let Some(Value::Array(info)) = self.data.get_mut(annotation_type) else {
            return false;
        };
        if info.is_empty() {
            return false;
        }

        for descriptor in info.iter_mut() {
            let Some(descriptor) = descriptor.as_object_mut() else {
                continue;
            };
            if !descriptor
                .get("cache")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                continue;
            }
            let Some(name) = descriptor.get("name").and_then(Value::as_str) else {
                continue;
            };
            match attributes.get(name) {
                None | Some(Value::Null) => continue,
                Some(value) => {
                    descriptor.insert("default".to_owned(), value.clone());
                    self.dirty = true;
                }
            }
        }

        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes to disk. A store without a path only clears its
    /// dirty flag.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&self.data)?)?;
        }
        self.dirty = false;
        Ok(())
    }
}

fn revision_of(map: &Map<String, Value>) -> i64 {
    map.get(REVISION_KEY).and_then(Value::as_i64).unwrap_or(0)
}

/// Explicitly initialize the process-wide store.
///
/// Fails if the store was already created, either by an earlier `init` or by
/// a call to [`global`].
pub fn init(path: Option<&Path>, bundled: &str) -> Result<()> {
    let store = MetaDataStore::load(path, bundled)?;
    GLOBAL
        .set(Mutex::new(store))
        .map_err(|_| SluglineError::Metadata("already initialized".into()))
}

/// Access the process-wide store, creating it from the bundled descriptors
/// on first use.
pub fn global() -> MutexGuard<'static, MetaDataStore> {
    let store = GLOBAL.get_or_init(|| {
        let store = MetaDataStore::load(None, BUNDLED_METADATA).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "bundled annotation metadata unreadable");
            MetaDataStore {
                data: Map::new(),
                path: None,
                dirty: false,
            }
        });
        Mutex::new(store)
    });
    // A poisoned lock still holds usable data.
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Flush the process-wide store, if it was ever created.
pub fn flush() -> Result<()> {
    match GLOBAL.get() {
        Some(store) => store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .save(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundled_copy_wins_over_older_disk_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations_metadata.json");
        std::fs::write(&path, r##"{ "#revision": 0, "text": [] }"##).unwrap();

        let store = MetaDataStore::load(Some(&path), BUNDLED_METADATA).unwrap();
        assert_eq!(store.revision(), 1);
        assert_eq!(store.get("text").len(), 3);

        // The newer bundled copy was written back.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("fontSize"));
    }

    #[test]
    fn test_update_only_touches_cached_attributes() {
        let mut store = MetaDataStore::load(None, BUNDLED_METADATA).unwrap();
        let attrs = json!({ "text": "hello", "color": "#ff0000" });

        assert!(store.update("text", attrs.as_object().unwrap()));
        let info = store.get("text");
        assert_eq!(info[0]["default"], json!(""));
        assert_eq!(info[1]["default"], json!("#ff0000"));
        assert!(store.is_dirty());

        assert!(!store.update("unknown", attrs.as_object().unwrap()));
    }

    #[test]
    fn test_disk_copy_with_same_revision_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let mut store = MetaDataStore::load(Some(&path), BUNDLED_METADATA).unwrap();
        store.update("rectangle", json!({ "borderWidth": 4 }).as_object().unwrap());
        store.save().unwrap();

        let reloaded = MetaDataStore::load(Some(&path), BUNDLED_METADATA).unwrap();
        assert_eq!(reloaded.get("rectangle")[1]["default"], json!(4));
    }

    #[test]
    fn test_global_store_is_created_on_first_use() {
        assert!(!global().get("image").is_empty());
        assert!(flush().is_ok());
    }
}
