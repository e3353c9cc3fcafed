use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::Storage;
use crate::error::Error;

/// Storage persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every change (write to a sibling temp file,
/// then rename), so a crash never leaves a half-written file behind. The
/// in-memory map only changes once the file write has succeeded.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file starts empty. A file that is not a JSON object of
    /// strings is treated as empty too and is overwritten on the next write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt storage file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(Error::Storage(format!("{}: {e}", path.display())));
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("jwtToken", "abc").unwrap();
        storage.set("other", "x").unwrap();
        storage.remove("other").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("jwtToken").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("jwtToken").unwrap(), None);

        storage.set("jwtToken", "fresh").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("jwtToken").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn missing_file_is_not_created_until_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.remove("anything").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("jwtToken", "abc").unwrap();

        // a directory where the temp file goes makes every write fail
        std::fs::create_dir(dir.path().join("session.json.tmp")).unwrap();

        assert!(matches!(storage.set("jwtToken", "new"), Err(Error::Storage(_))));
        assert!(matches!(storage.set("other", "x"), Err(Error::Storage(_))));
        assert!(matches!(storage.remove("jwtToken"), Err(Error::Storage(_))));

        assert_eq!(storage.get("jwtToken").unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.get("other").unwrap(), None);
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("jwtToken").unwrap().as_deref(), Some("abc"));
    }
}
