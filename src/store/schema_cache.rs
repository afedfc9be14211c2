use crate::error::Result;
use crate::model::SchemaDescription;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<Mutex<Option<Arc<SchemaDescription>>>>;

/// Per-type schema memo.
///
/// Each type gets its own slot; the slot lock is held while the describe
/// call runs so a schema is fetched at most once. Entries are never invalidated.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    slots: RwLock<HashMap<String, Slot>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, type_name: &str) -> Slot {
        let key = type_name.to_lowercase();
        if let Some(slot) = self.slots.read().get(&key) {
            return slot.clone();
        }
        self.slots.write().entry(key).or_default().clone()
    }

    /// Cached schema, if one was fetched or preloaded
    pub fn get(&self, type_name: &str) -> Option<Arc<SchemaDescription>> {
        self.slot(type_name).lock().clone()
    }

    /// Return the cached schema or run `fetch` once to fill the slot.
    ///
    /// A failed fetch leaves the slot empty so the next call retries.
    pub fn get_or_fetch<F>(&self, type_name: &str, fetch: F) -> Result<Arc<SchemaDescription>>
    where
        F: FnOnce() -> Result<SchemaDescription>,
    {
        let slot = self.slot(type_name);
        let mut entry = slot.lock();
        if let Some(schema) = entry.as_ref() {
            return Ok(schema.clone());
        }

        let schema = Arc::new(fetch()?);
        log::debug!(
            "cached schema for {} ({} fields)",
            type_name,
            schema.fields().len()
        );
        *entry = Some(schema.clone());
        Ok(schema)
    }

    /// Install a schema without a remote call
    pub fn preload(&self, schema: SchemaDescription) {
        let slot = self.slot(&schema.type_name);
        *slot.lock() = Some(Arc::new(schema));
    }

    pub fn is_cached(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }
}
