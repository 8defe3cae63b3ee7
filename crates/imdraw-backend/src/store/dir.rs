use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{BlobStore, StoreError, validate_name};

const EXTENSION: &str = "cfg";

/// [`BlobStore`] keeping one `<name>.cfg` file per blob in a directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{EXTENSION}")))
    }

    fn ensure_root(&self, name: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| io_error(name, source))
    }
}

fn io_error(name: &str, source: io::Error) -> StoreError {
    StoreError::Io {
        name: name.to_string(),
        source,
    }
}

impl BlobStore for DirBlobStore {
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        self.ensure_root(name)?;
        fs::write(&path, bytes).map_err(|e| io_error(name, e))?;
        log::debug!("saved blob {name:?} ({} bytes)", bytes.len());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => io_error(name, e),
        })
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(name, e)),
        }
    }

    fn create(&mut self, name: &str) -> Result<(), StoreError> {
        self.save(name, &[])
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("", e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error("", e))?;
            if !entry.file_type().map_err(|e| io_error("", e))?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = DirBlobStore::new(dir.path().join("configs"));

        store.save("main", &[1, 2, 3]).unwrap();

        assert_eq!(store.load("main").unwrap(), vec![1, 2, 3]);
        assert!(dir.path().join("configs/main.cfg").is_file());
    }

    #[test]
    fn list_only_reports_cfg_files() {
        let dir = TempDir::new().unwrap();
        let mut store = DirBlobStore::new(dir.path());
        store.create("b").unwrap();
        store.save("a", b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        fs::create_dir(dir.path().join("sub.cfg")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn create_yields_empty_blob() {
        let dir = TempDir::new().unwrap();
        let mut store = DirBlobStore::new(dir.path());
        store.save("c", b"old").unwrap();
        store.create("c").unwrap();
        assert!(store.load("c").unwrap().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = DirBlobStore::new(dir.path());
        store.save("gone", b"x").unwrap();

        store.remove("gone").unwrap();
        store.remove("gone").unwrap();

        assert!(matches!(store.load("gone"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = DirBlobStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn traversal_names_are_refused() {
        let dir = TempDir::new().unwrap();
        let mut store = DirBlobStore::new(dir.path());
        assert!(matches!(store.save("../escape", b"x"), Err(StoreError::InvalidName(_))));
    }
}
