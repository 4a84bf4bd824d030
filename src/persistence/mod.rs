//! Key/value string persistence
//!
//! Backed by LocalStorage on the web (see `platform`) and by an in-memory map
//! natively and in tests.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::RadiusResult;

/// String key/value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> RadiusResult<()>;
    fn remove(&self, key: &str) -> RadiusResult<()>;
}

/// Non-persistent store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> RadiusResult<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RadiusResult<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
