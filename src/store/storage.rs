use std::fs;
use std::path::PathBuf;

use crate::errors::StorageError;

/// Durable client-local key/value storage for serialized store state.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        // Readers never observe a partially written blob.
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use parking_lot::Mutex;

    use super::Storage;
    use crate::errors::StorageError;

    #[derive(Debug, Default)]
    pub struct MemoryStorage {
        items: Mutex<HashMap<String, String>>,
    }

    impl Storage for MemoryStorage {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.items.lock().get(key).cloned())
        }

        fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.items.lock().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}
