use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::FolioError;

pub type Fields = Map<String, Value>;

/// A stored document: store-assigned id plus its plain JSON fields.
///
/// Timestamps come back as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Fields to write, plus the names of fields the store stamps with its own
/// clock at commit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

pub trait CatalogStore: Send + Sync {
    /// Every document carrying `order_by`, ascending, ties in insertion order.
    fn list_ordered(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, FolioError>;
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FolioError>;
    fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, FolioError>;
    /// Merges `write` into an existing document; `NotFound` if absent.
    fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), FolioError>;
    /// Removing an absent document succeeds.
    fn delete(&self, collection: &str, id: &str) -> Result<(), FolioError>;
}

impl<S: CatalogStore + ?Sized> CatalogStore for Arc<S> {
    fn list_ordered(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, FolioError> {
        (**self).list_ordered(collection, order_by)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FolioError> {
        (**self).get(collection, id)
    }

    fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, FolioError> {
        (**self).create(collection, write)
    }

    fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), FolioError> {
        (**self).update(collection, id, write)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), FolioError> {
        (**self).delete(collection, id)
    }
}

/// Fresh opaque document id; ids are never reused.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    clock: Clock,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock: Box::new(clock),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every call fail as if the network were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), FolioError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FolioError::StoreUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, FolioError> {
        self.state
            .lock()
            .map_err(|_| FolioError::StoreUnavailable("memory store lock poisoned".to_string()))
    }

    fn stamp(&self, write: DocumentWrite) -> Fields {
        let DocumentWrite {
            mut fields,
            server_timestamps,
        } = write;
        if !server_timestamps.is_empty() {
            let now = format_timestamp((self.clock)());
            for name in server_timestamps {
                fields.insert(name, Value::String(now.clone()));
            }
        }
        fields
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for MemoryStore {
    fn list_ordered(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, FolioError> {
        self.check_available()?;
        let state = self.lock()?;
        let Some(documents) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut ordered = documents
            .iter()
            .filter(|doc| doc.fields.contains_key(order_by))
            .cloned()
            .collect::<Vec<_>>();
        // Vec is in insertion order and sort_by is stable.
        ordered.sort_by(|a, b| {
            let left = a.fields.get(order_by).and_then(Value::as_f64);
            let right = b.fields.get(order_by).and_then(Value::as_f64);
            match (left, right) {
                (Some(left), Some(right)) => left.total_cmp(&right),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        Ok(ordered)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FolioError> {
        self.check_available()?;
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, FolioError> {
        self.check_available()?;
        let fields = self.stamp(write);
        let id = new_document_id();
        let mut state = self.lock()?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), FolioError> {
        self.check_available()?;
        let fields = self.stamp(write);
        let mut state = self.lock()?;
        let document = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| FolioError::NotFound(id.to_string()))?;
        document.fields.extend(fields);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), FolioError> {
        self.check_available()?;
        let mut state = self.lock()?;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }
}
