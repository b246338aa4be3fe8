//! Key/value persistence that survives restarts, plus the saved-city list kept in it.

use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    ffi::OsString,
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;

pub const SAVED_CITIES_KEY: &str = "savedCities";
pub const DARK_MODE_KEY: &str = "isDark";
pub const ACCENT_COLOR_KEY: &str = "accentColor";

/// String values under fixed keys. A missing key (`None`) is not the same as
/// an empty value.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, used in tests and when no data directory is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten in full on every mutation.
///
/// The in-memory copy only changes after the write succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing or blank file is an empty store.
    ///
    /// A file that is not a JSON object of strings is moved aside to
    /// `<name>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values: BTreeMap<String, String> = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&contents) {
                    Ok(values) => values,
                    Err(err) => {
                        let aside = corrupt_path(&path);
                        warn!(
                            path = %path.display(),
                            moved_to = %aside.display(),
                            error = %err,
                            "preference store is unreadable; starting empty"
                        );
                        if let Err(err) = fs::rename(&path, &aside) {
                            warn!(error = %err, "could not move unreadable store aside");
                        }
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = values.len(), "opened preference store");
        Ok(Self { path, values: Mutex::new(values) })
    }

    /// Replaces the file through a temp file in the same directory, so a
    /// crash mid-write leaves the previous contents intact.
    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        let json = serde_json::to_string_pretty(values)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| io_error(dir, source))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| io_error(tmp.path(), source))?;
        tmp.persist(&self.path).map_err(|err| io_error(&self.path, err.error))?;
        Ok(())
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".corrupt");
    path.with_file_name(name)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.write(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.write(&next)?;
        *values = next;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}

/// Cities the user looked up, in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedCities {
    names: Vec<String>,
}

impl SavedCities {
    /// Reads the list from `store`. Unreadable or malformed data yields an
    /// empty list.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(SAVED_CITIES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(err) => {
                warn!(error = %err, "could not read saved cities");
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => {
                let mut names: Vec<String> = Vec::with_capacity(list.len());
                for name in list {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                Self { names }
            }
            Err(err) => {
                warn!(error = %err, "saved cities are not a JSON list of strings; starting empty");
                Self::default()
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Appends `name` unless already present. Returns whether the list changed.
    pub fn add(&mut self, store: &dyn KeyValueStore, name: &str) -> Result<bool, StoreError> {
        if self.contains(name) {
            return Ok(false);
        }
        let mut next = self.names.clone();
        next.push(name.to_string());
        persist(store, &next)?;
        self.names = next;
        Ok(true)
    }

    pub fn remove(&mut self, store: &dyn KeyValueStore, name: &str) -> Result<bool, StoreError> {
        if !self.contains(name) {
            return Ok(false);
        }
        let next: Vec<String> = self.names.iter().filter(|n| *n != name).cloned().collect();
        persist(store, &next)?;
        self.names = next;
        Ok(true)
    }

    /// Empties the list and drops the key from the store.
    pub fn clear(&mut self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.remove(SAVED_CITIES_KEY)?;
        self.names.clear();
        Ok(())
    }
}

fn persist(store: &dyn KeyValueStore, names: &[String]) -> Result<(), StoreError> {
    let json = serde_json::to_string(names)?;
    store.set(SAVED_CITIES_KEY, &json)
}
