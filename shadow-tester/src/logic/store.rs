use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shadow_game::SnapshotStore;

/// Errors from the on-disk profile store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed payloads kept in a single JSON object on disk, so a simulated
/// profile survives between tester runs.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let payload = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, payload).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileStore {
    type Error = StoreError;

    fn write(&self, key: &str, payload: &str) -> Result<(), Self::Error> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), payload.to_string());
        self.persist(&entries)
    }

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.load()?.remove(key))
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(label: &str) -> FileStore {
        FileStore::new(std::env::temp_dir().join(format!(
            "shadow-store-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        )))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = temp_store("missing");
        assert!(store.read("anything").unwrap().is_none());
        store.delete("anything").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn keys_are_kept_apart() {
        let store = temp_store("keys");
        store.write("a", "{\"x\":1}").unwrap();
        store.write("b", "two").unwrap();
        assert_eq!(store.read("a").unwrap().as_deref(), Some("{\"x\":1}"));
        store.delete("a").unwrap();
        assert!(store.read("a").unwrap().is_none());
        assert_eq!(store.read("b").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let store = temp_store("corrupt");
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(
            store.read("a"),
            Err(StoreError::Serialization(_))
        ));
    }
}
