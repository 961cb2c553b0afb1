use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

use crate::config::ANONYMOUS_COUNT_KEY;
use crate::error::ZakiError;

/// String key/value storage local to one client (browser `localStorage`).
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, ZakiError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), ZakiError>;
    fn remove_item(&self, key: &str) -> Result<(), ZakiError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, ZakiError> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ZakiError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), ZakiError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ZakiError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), ZakiError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, ZakiError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ZakiError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), ZakiError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// Question counter of a visitor without an account, kept under
/// [`ANONYMOUS_COUNT_KEY`]. It is never tied to an account: signing in simply
/// stops consulting it.
#[derive(Debug)]
pub struct AnonymousCounter<S> {
    store: S,
}

impl<S: LocalStore> AnonymousCounter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current count. Unreadable or unparsable values count as 0.
    pub fn get(&self) -> u32 {
        match self.store.get_item(ANONYMOUS_COUNT_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring malformed anonymous question count");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "anonymous question count unreadable");
                0
            }
        }
    }

    /// Persist `current + 1` and return it.
    pub fn increment(&self) -> Result<u32, ZakiError> {
        let next = self.get().saturating_add(1);
        self.store.set_item(ANONYMOUS_COUNT_KEY, &next.to_string())?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_zero_and_persists_as_string() {
        let counter = AnonymousCounter::new(MemoryStore::new());
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment().expect("increment"), 1);
        assert_eq!(counter.increment().expect("increment"), 2);
        assert_eq!(
            counter.store().get_item(ANONYMOUS_COUNT_KEY).expect("read"),
            Some("2".to_string())
        );
    }

    #[test]
    fn garbage_counts_as_zero() {
        let store = MemoryStore::new();
        store.set_item(ANONYMOUS_COUNT_KEY, "abc").expect("write");
        let counter = AnonymousCounter::new(store);
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment().expect("increment"), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let mut path = std::env::temp_dir();
        path.push(format!("zaki-local-store-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        {
            let counter = AnonymousCounter::new(FileStore::new(&path));
            counter.increment().expect("increment");
            counter.increment().expect("increment");
        }
        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get_item(ANONYMOUS_COUNT_KEY).expect("read"),
            Some("2".to_string())
        );
        reopened.remove_item(ANONYMOUS_COUNT_KEY).expect("remove");
        assert_eq!(AnonymousCounter::new(reopened).get(), 0);

        let _ = fs::remove_file(&path);
    }
}
