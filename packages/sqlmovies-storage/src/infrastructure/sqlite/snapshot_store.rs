//! Snapshot files on disk
//!
//! One SQLite file per stage, named `<stage>.<extension>` inside the
//! configured directory. Forking a stage copies the source file over the
//! destination; the source is never written.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::domain::StageId;
use crate::{Result, StorageError};

/// Files SQLite keeps next to a database while it is open
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    config: StoreConfig,
}

impl SnapshotStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn dir(&self) -> &Path {
        &self.config.snapshot_dir
    }

    pub fn path_for(&self, stage: StageId) -> PathBuf {
        self.config
            .snapshot_dir
            .join(format!("{}.{}", stage, self.config.extension))
    }

    pub fn exists(&self, stage: StageId) -> bool {
        self.path_for(stage).is_file()
    }

    /// Stages with a snapshot file, ascending. A missing directory holds no
    /// stages.
    pub fn list(&self) -> Result<Vec<StageId>> {
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut stages = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(self.config.extension.as_str()) {
                continue;
            }
            if let Some(stage) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<StageId>().ok())
            {
                stages.push(stage);
            }
        }
        stages.sort();
        Ok(stages)
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(self.dir()).map_err(|e| {
            StorageError::setup(format!(
                "Cannot create snapshot directory {}",
                self.dir().display()
            ))
            .with_source(e)
        })
    }

    /// Copy `source` to `dest`, replacing whatever `dest` held
    ///
    /// # Errors
    ///
    /// - `SnapshotNotFound` if `source` has no file
    /// - `Setup` if `source == dest` or the copy fails
    pub fn fork(&self, source: StageId, dest: StageId) -> Result<PathBuf> {
        if source == dest {
            return Err(StorageError::setup(format!(
                "Cannot fork stage {} onto itself",
                source
            )));
        }

        let from = self.path_for(source);
        if !from.is_file() {
            return Err(StorageError::snapshot_not_found(format!(
                "stage {} ({})",
                source,
                from.display()
            )));
        }

        self.ensure_dir()?;
        let to = self.path_for(dest);
        remove_sidecars(&to)?;

        let bytes = fs::copy(&from, &to).map_err(|e| {
            StorageError::setup(format!(
                "Failed to copy snapshot {} to {}",
                from.display(),
                to.display()
            ))
            .with_source(e)
        })?;

        tracing::info!("Forked snapshot {} -> {} ({} bytes)", source, dest, bytes);
        Ok(to)
    }

    /// Delete a stage's file and sidecars. Returns whether a file existed.
    pub fn remove(&self, stage: StageId) -> Result<bool> {
        let path = self.path_for(stage);
        remove_sidecars(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed snapshot {}", stage);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn remove_sidecars(db_path: &Path) -> Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        let mut name = OsString::from(db_path.as_os_str());
        name.push(suffix);
        match fs::remove_file(PathBuf::from(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    fn stage(token: &str) -> StageId {
        token.parse().unwrap()
    }

    fn store(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(StoreConfig::in_dir(dir.path())).unwrap()
    }

    #[test]
    fn test_path_for() {
        let store = SnapshotStore::new(StoreConfig::in_dir("/data/movies")).unwrap();
        assert_eq!(store.path_for(stage("06")), PathBuf::from("/data/movies/06.db"));
    }

    #[test]
    fn test_fork_copies_and_keeps_source() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path_for(stage("06")), b"stage six").unwrap();

        let path = store.fork(stage("06"), stage("07")).unwrap();

        assert_eq!(path, store.path_for(stage("07")));
        assert_eq!(fs::read(&path).unwrap(), b"stage six");
        assert!(store.exists(stage("06")));
    }

    #[test]
    fn test_fork_overwrites_destination_and_sidecars() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path_for(stage("06")), b"fresh").unwrap();
        fs::write(store.path_for(stage("07")), b"stale contents").unwrap();
        let journal = dir.path().join("07.db-journal");
        fs::write(&journal, b"hot journal").unwrap();

        store.fork(stage("06"), stage("07")).unwrap();

        assert_eq!(fs::read(store.path_for(stage("07"))).unwrap(), b"fresh");
        assert!(!journal.exists());
    }

    #[test]
    fn test_fork_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let err = store.fork(stage("06"), stage("07")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnapshotNotFound);
        assert!(err.message.contains("06"));
        assert!(!store.exists(stage("07")));
    }

    #[test]
    fn test_fork_onto_itself() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path_for(stage("06")), b"x").unwrap();

        let err = store.fork(stage("06"), stage("06")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Setup);
    }

    #[test]
    fn test_ensure_dir_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("fixtures").join("db");
        let store = SnapshotStore::new(StoreConfig::in_dir(&nested)).unwrap();

        store.ensure_dir().unwrap();
        store.ensure_dir().unwrap();

        assert!(nested.is_dir());
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for name in ["07.db", "01.db", "06.db", "notes.txt", "7.db", "06.db-journal"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("05.db")).unwrap();

        let stages = store.list().unwrap();
        assert_eq!(stages, vec![stage("01"), stage("06"), stage("07")]);
    }

    #[test]
    fn test_list_missing_dir() {
        let store = SnapshotStore::new(StoreConfig::in_dir("/nonexistent/sqlmovies")).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path_for(stage("07")), b"x").unwrap();

        assert!(store.remove(stage("07")).unwrap());
        assert!(!store.exists(stage("07")));
        assert!(!store.remove(stage("07")).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = StoreConfig::default();
        config.extension = String::new();
        assert!(SnapshotStore::new(config).is_err());
    }
}
