// ABOUTME: On-device key/value storage used as the fallback backend.
// ABOUTME: Defines the LocalBackend trait with in-memory and one-file-per-key implementations.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while reading or writing local storage.
#[derive(Debug, Error)]
pub enum LocalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("local storage lock poisoned")]
    Poisoned,
}

/// A key/value surface addressed by a single string key. Each call is
/// atomic for its key; there are no multi-key transactions.
pub trait LocalBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), LocalError>;
}

/// Process-local storage, lost on exit. Used for tests and `memory` mode.
#[derive(Debug, Default)]
pub struct MemoryLocal {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryLocal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalBackend for MemoryLocal {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalError> {
        let items = self.items.lock().map_err(|_| LocalError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError> {
        let mut items = self.items.lock().map_err(|_| LocalError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalError> {
        let mut items = self.items.lock().map_err(|_| LocalError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`. Writes go to a fresh temp file in
/// the same directory which is fsynced and renamed over the target.
#[derive(Debug, Clone)]
pub struct FileLocal {
    dir: PathBuf,
}

impl FileLocal {
    /// Open a file-backed store rooted at `dir`, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self, LocalError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> Result<PathBuf, LocalError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(LocalError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalBackend for FileLocal {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalError> {
        let path = self.item_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError> {
        let final_path = self.item_path(key)?;

        // Each writer gets its own temp file; concurrent writers race only
        // on the final rename, where the last one wins.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&final_path).map_err(|e| LocalError::Io(e.error))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalError> {
        let path = self.item_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(backend: &dyn LocalBackend) {
        assert_eq!(backend.get_item("pathwise-user-settings").unwrap(), None);

        backend.set_item("pathwise-user-settings", "[1]").unwrap();
        assert_eq!(
            backend.get_item("pathwise-user-settings").unwrap().as_deref(),
            Some("[1]")
        );

        backend.set_item("pathwise-user-settings", "[1,2]").unwrap();
        assert_eq!(
            backend.get_item("pathwise-user-settings").unwrap().as_deref(),
            Some("[1,2]")
        );

        backend.remove_item("pathwise-user-settings").unwrap();
        assert_eq!(backend.get_item("pathwise-user-settings").unwrap(), None);

        // Removing again is fine
        backend.remove_item("pathwise-user-settings").unwrap();
    }

    #[test]
    fn memory_backend_get_set_remove() {
        exercise(&MemoryLocal::new());
    }

    #[test]
    fn file_backend_get_set_remove() {
        let dir = TempDir::new().unwrap();
        exercise(&FileLocal::open(dir.path()).unwrap());
    }

    #[test]
    fn file_backend_creates_directory_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("local");
        let backend = FileLocal::open(&nested).unwrap();

        backend.set_item("pathwise-learning-paths", "[]").unwrap();

        assert!(nested.join("pathwise-learning-paths.json").exists());
        let names: Vec<_> = fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["pathwise-learning-paths.json".to_string()]);
    }

    #[test]
    fn file_backend_survives_concurrent_writers_on_one_key() {
        let dir = TempDir::new().unwrap();
        let backend = std::sync::Arc::new(FileLocal::open(dir.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let backend = backend.clone();
                std::thread::spawn(move || {
                    let mut failures = 0;
                    for round in 0..100 {
                        let value = format!("[{},{}]", writer, round);
                        if backend.set_item("pathwise-learning-paths", &value).is_err() {
                            failures += 1;
                        }
                    }
                    failures
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let stored = backend.get_item("pathwise-learning-paths").unwrap().unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.len(), 2);

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["pathwise-learning-paths.json".to_string()]);
    }

    #[test]
    fn file_backend_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FileLocal::open(dir.path()).unwrap();

        assert!(matches!(
            backend.set_item("../escape", "x"),
            Err(LocalError::InvalidKey(_))
        ));
        assert!(matches!(
            backend.get_item(".hidden"),
            Err(LocalError::InvalidKey(_))
        ));
        assert!(matches!(backend.get_item(""), Err(LocalError::InvalidKey(_))));
    }
}
