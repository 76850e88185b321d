//! Small persistent key-value store for client-side UI state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::AppError;

/// Key under which the selected household id is kept.
pub const ACTIVE_HOUSEHOLD_KEY: &str = "active_household_id";

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_yaml::from_str(&text)
                .map_err(|e| AppError::State(format!("parse {} failed: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AppError::Io(e)),
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), AppError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn active_household(&self) -> Option<&str> {
        self.get(ACTIVE_HOUSEHOLD_KEY)
    }

    fn persist(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_yaml::to_string(&self.entries)
            .map_err(|e| AppError::State(format!("serialize state failed: {e}")))?;
        // Replace atomically
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.yaml")).unwrap();
        assert!(store.active_household().is_none());
    }

    #[test]
    fn values_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("state.yaml");
        let mut store = LocalStore::open(&path).unwrap();
        store.set(ACTIVE_HOUSEHOLD_KEY, "h-1").unwrap();

        let mut reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.active_household(), Some("h-1"));

        reopened.remove(ACTIVE_HOUSEHOLD_KEY).unwrap();
        let cleared = LocalStore::open(&path).unwrap();
        assert!(cleared.active_household().is_none());
    }

    #[test]
    fn corrupt_file_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        std::fs::write(&path, "- not\n- a map\n").unwrap();
        assert!(matches!(LocalStore::open(&path), Err(AppError::State(_))));
    }
}
