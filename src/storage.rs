use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Flat key/value file store rooted at a single directory.
///
/// Used for everything cinedex persists on its own: `config.yaml` and the
/// vector cache blob.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
}

#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(BackendLocal { base_dir })
    }

    pub fn path_of(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_of(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_of(ident))
    }

    /// Atomic write: temp file -> fsync -> rename.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_of(ident);
        let temp_path = self.path_of(&format!(
            "{}-{ident}.tmp",
            rusty_ulid::generate_ulid_string()
        ));

        let result = (|| {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()
        })();

        if let Err(err) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.path_of(ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();

        assert!(!store.exists("blob"));
        store.write("blob", b"hello").unwrap();
        assert!(store.exists("blob"));
        assert_eq!(store.read("blob").unwrap(), b"hello");

        store.write("blob", b"replaced").unwrap();
        assert_eq!(store.read("blob").unwrap(), b"replaced");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();
        store.write("vectors.bin", &[1, 2, 3]).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["vectors.bin".to_string()]);
    }

    #[test]
    fn test_write_into_missing_dir_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();
        std::fs::remove_dir_all(tmp.path()).unwrap();

        assert!(store.write("vectors.bin", b"data").is_err());
        assert!(!store.exists("vectors.bin"));
    }

    #[test]
    fn test_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path()).unwrap();
        store.write("config.yaml", b"a: 1").unwrap();
        store.delete("config.yaml").unwrap();
        assert!(!store.exists("config.yaml"));
        assert!(store.delete("config.yaml").is_err());
    }
}
