//! Whole-document persistence backends.
//!
//! Every durable structure is loaded and saved as one value. A missing
//! document loads as `T::default()`; saves replace the document atomically.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

/// Load-or-default / atomic-overwrite persistence for a single value.
pub trait Storage<T>: Send + Sync {
    fn load(&self) -> anyhow::Result<T>;
    fn save(&self, value: &T) -> anyhow::Result<()>;
    /// Human readable location, used in log lines.
    fn describe(&self) -> String;

    /// Moves an unreadable document out of the way so the next save does not
    /// replace it. Returns the new location, if anything was moved.
    fn set_aside(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Pretty-printed JSON document on local disk.
///
/// Writes go to a temp file in the same directory which is then renamed
/// over the target, so readers never observe a partially written file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl<T> Storage<T> for JsonFile
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> anyhow::Result<T> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            },
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn save(&self, value: &T) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let json = serde_json::to_vec_pretty(value)
            .with_context(|| format!("Failed to serialize {}", self.path.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn set_aside(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
        let target = PathBuf::from(target);

        std::fs::rename(&self.path, &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                self.path.display(),
                target.display()
            )
        })?;

        Ok(Some(target.display().to_string()))
    }
}

/// In-process storage for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage<T> {
    value: Mutex<Option<T>>,
}

impl<T> MemoryStorage<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl<T> Storage<T> for MemoryStorage<T>
where
    T: Clone + Default + Send,
{
    fn load(&self) -> anyhow::Result<T> {
        let guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, value: &T) -> anyhow::Result<()> {
        let mut guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(value.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("absent.json"));

        let loaded: BTreeMap<String, f64> = file.load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_empty_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "\n").unwrap();

        let loaded: Vec<u32> = JsonFile::new(path).load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested").join("state.json"));

        let mut value = BTreeMap::new();
        value.insert("mint".to_string(), 61.5);
        file.save(&value).unwrap();

        let loaded: BTreeMap<String, f64> = file.load().unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_save_overwrites_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("list.json"));

        file.save(&vec![1, 2, 3]).unwrap();
        file.save(&vec![4]).unwrap();

        let loaded: Vec<i32> = file.load().unwrap();
        assert_eq!(loaded, vec![4]);
        // No temp files left next to the document
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result: anyhow::Result<Vec<u32>> = JsonFile::new(path).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_set_aside_moves_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let file = JsonFile::new(&path);

        let moved = Storage::<Vec<u32>>::set_aside(&file).unwrap().unwrap();

        assert!(!path.exists());
        assert!(moved.contains("bad.json.corrupt-"));
        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "{ not json");
        // Nothing left to move
        assert!(Storage::<Vec<u32>>::set_aside(&file).unwrap().is_none());
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(Storage::<Vec<u8>>::load(&storage).unwrap(), Vec::<u8>::new());

        storage.save(&vec![7u8]).unwrap();
        assert_eq!(storage.load().unwrap(), vec![7u8]);
    }
}
