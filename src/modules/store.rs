use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;

use crate::errors::{CustomResult, SerializationSnafu, StorageSnafu};

pub const LS_CURRENT_SCREEN: &str = "rcj-currentScreen";
pub const LS_DATA: &str = "rcj-data";
pub const LS_RUN_HISTORY: &str = "rcj-runHistory";

/// Synchronous key/value persistence, last write wins.
pub trait Store {
    fn get_data(&self, key: &str) -> CustomResult<Option<String>>;

    fn set_data(&mut self, key: &str, data: &str) -> CustomResult<()>;

    fn invalidate(&mut self, key: &str) -> CustomResult<()>;

    fn has_data(&self, key: &str) -> CustomResult<bool> {
        Ok(self.get_data(key)?.is_some())
    }
}

/// # read json
/// read a key and parse it, none if the key was never written
pub fn get_json<D: DeserializeOwned>(store: &dyn Store, key: &str) -> CustomResult<Option<D>> {
    match store.get_data(key)? {
        Some(data) => {
            let parsed = serde_json::from_str(&data).context(SerializationSnafu { what: key })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// # write json
pub fn set_json<D: Serialize>(store: &mut dyn Store, key: &str, data: &D) -> CustomResult<()> {
    let serialized = serde_json::to_string(data).context(SerializationSnafu { what: key })?;
    store.set_data(key, &serialized)
}

/// One json file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> CustomResult<FileStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir).context(StorageSnafu {
            key: dir.display().to_string(),
        })?;
        Ok(FileStore { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Store for FileStore {
    fn get_data(&self, key: &str) -> CustomResult<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => {
                error!(target: "store:get_data", "Error reading key {}: (error: {})", key, error);
                Err(error).context(StorageSnafu { key })
            }
        }
    }

    fn set_data(&mut self, key: &str, data: &str) -> CustomResult<()> {
        debug!(target: "store:set_data", "writing {} bytes to {}", data.len(), key);
        fs::write(self.path(key), data).context(StorageSnafu { key })
    }

    fn invalidate(&mut self, key: &str) -> CustomResult<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(StorageSnafu { key }),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl Store for MemoryStore {
    fn get_data(&self, key: &str) -> CustomResult<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set_data(&mut self, key: &str, data: &str) -> CustomResult<()> {
        self.data.insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn invalidate(&mut self, key: &str) -> CustomResult<()> {
        self.data.remove(key);
        Ok(())
    }
}
