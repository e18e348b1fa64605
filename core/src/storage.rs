//! Browser-style key/value storage.
//!
//! The resolver reads and purges persisted overrides, and the session keeps
//! its token, through `KeyValueStore`. Hosts back it with `localStorage` /
//! `sessionStorage`; `MemoryStore` serves tests and headless hosts.

use std::cell::RefCell;
use std::collections::HashMap;

/// Persisted explicit base-URL override.
pub const API_BASE_URL_KEY: &str = "API_BASE_URL";
/// Persisted remote API override; also where a valid `?apiUrl=` is saved.
pub const REMOTE_API_URL_KEY: &str = "REMOTE_API_URL";
/// Persisted mode flag.
pub const USE_LOCAL_DB_KEY: &str = "USE_LOCAL_DB";
/// Session-scoped bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-process store with interior mutability, for a single-threaded host.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (k, v) in entries {
            store.set(k, v);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}
