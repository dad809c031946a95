//! JSON snapshot persistence for the in-memory dataset. Writes go to a
//! temporary file first and are renamed into place, so a crash mid-save
//! never leaves a torn snapshot behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::CoreResult;

use super::memory::{Dataset, MemoryStore};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, store: &MemoryStore) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let dataset = store.export()?;
        let json = serde_json::to_string_pretty(&dataset)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Loads a store from disk, starting empty when no snapshot exists yet.
    pub fn load(&self) -> CoreResult<MemoryStore> {
        if !self.path.exists() {
            return Ok(MemoryStore::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let dataset: Dataset = serde_json::from_str(&data)?;
        Ok(MemoryStore::from_dataset(dataset))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".");
    tmp.push(TMP_SUFFIX);
    PathBuf::from(tmp)
}

fn write_atomic(path: &Path, contents: &str) -> CoreResult<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::storage::StorageBackend;
    use uuid::Uuid;

    #[test]
    fn snapshot_round_trips_the_dataset() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let snapshot = JsonSnapshot::new(dir.path().join("dataset.json"));

        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "pat@example.com".into(),
            timezone: Some("America/Chicago".into()),
        };
        store.upsert_user(user.clone()).unwrap();
        snapshot.save(&store).unwrap();

        let restored = snapshot.load().unwrap();
        let loaded = restored.user(user.id).unwrap().expect("user persisted");
        assert_eq!(loaded.email, "pat@example.com");
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let snapshot = JsonSnapshot::new(dir.path().join("absent.json"));
        let store = snapshot.load().unwrap();
        assert!(store.user(Uuid::new_v4()).unwrap().is_none());
    }
}
