//! In-memory document store.
//!
//! Documents live in named collections:
//! ```text
//! DocumentStore
//!   <collection>/
//!     <id> -> { data, created_at, updated_at }   (insertion ordered)
//! ```
//!
//! Collections are created lazily on first write and dropped again when their
//! last document is deleted; an unknown collection reads as empty. Each collection has its own lock, so writes to one collection
//! never block another. Mutations hold the collection's write lock for the
//! whole read-modify-write, which serialises updates to any single document.
//! Documents are stored as immutable snapshots behind `Arc`, so readers only
//! hold the lock long enough to clone the handles they return.
//!
//! Generated ids are never handed out while a document with the same id is
//! live. Once deleted, an id may be reused by a later create.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::StoreError;
use super::filter::TextQuery;
use super::ids::{IdGenerator, RandomIdGenerator};

/// Maximum length of a collection name or document id.
pub const MAX_NAME_LEN: usize = 128;

/// How many times a colliding generated id is re-drawn before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Document>,
    /// Number of documents matching the query, independent of paging.
    pub total: usize,
}

/// Listing parameters.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Free-text filter, see [`TextQuery`].
    pub q: Option<String>,
    /// Page size; the store default applies when absent.
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Name and size of a non-empty collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
}

/// Page size bounds for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl PageLimits {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            max_limit: max_limit.max(default_limit),
        }
    }

    /// Resolves a requested page size, clamping it to `max_limit`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(50, 500)
    }
}

type Collection = IndexMap<String, Arc<Document>>;

/// Collection-scoped document store.
pub struct DocumentStore {
    collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>,
    ids: Box<dyn IdGenerator>,
    limits: PageLimits,
}

impl DocumentStore {
    /// Creates an empty store with random ids and default page limits.
    pub fn new() -> Self {
        Self::with_id_generator(RandomIdGenerator)
    }

    /// Creates an empty store using the given id generator.
    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            ids: Box::new(ids),
            limits: PageLimits::default(),
        }
    }

    /// Replaces the page size bounds used by [`list`](Self::list).
    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Validates a collection name or document id.
    ///
    /// Names are 1 to [`MAX_NAME_LEN`] characters of `[A-Za-z0-9_.-]` and
    /// must not start with a dot.
    pub fn validate_name(what: &str, name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::BadRequest(format!("{} must not be empty", what)));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(StoreError::BadRequest(format!(
                "{} must be at most {} characters",
                what, MAX_NAME_LEN
            )));
        }
        if name.starts_with('.') {
            return Err(StoreError::BadRequest(format!(
                "{} must not start with '.': {}",
                what, name
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(StoreError::BadRequest(format!(
                "{} contains invalid characters: {}",
                what, name
            )));
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> Option<Arc<RwLock<Collection>>> {
        self.collections.read().get(name).cloned()
    }

    fn collection_or_create(&self, name: &str) -> Arc<RwLock<Collection>> {
        if let Some(existing) = self.collection(name) {
            return existing;
        }

        let mut collections = self.collections.write();
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating collection {}", name);
                Arc::new(RwLock::new(IndexMap::new()))
            })
            .clone()
    }

    fn is_registered(&self, name: &str, handle: &Arc<RwLock<Collection>>) -> bool {
        self.collections
            .read()
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    fn fresh_id(&self, docs: &Collection) -> Result<String, StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            if !docs.contains_key(&id) {
                return Ok(id);
            }
            tracing::warn!("Generated id {} collides with a live document", id);
        }
        Err(StoreError::Internal(format!(
            "could not generate a unique id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Creates a document, generating an id when none is given.
    ///
    /// Fails with [`StoreError::Conflict`] if an explicit id is already taken.
    pub fn create(
        &self,
        collection: &str,
        id: Option<String>,
        data: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        Self::validate_name("collection", collection)?;
        if let Some(id) = &id {
            Self::validate_name("id", id)?;
        }

        loop {
            let handle = self.collection_or_create(collection);
            let mut docs = handle.write();

            // Dropped by a delete of its last document while we waited.
            if !self.is_registered(collection, &handle) {
                continue;
            }

            let id = match id {
                Some(id) if docs.contains_key(&id) => {
                    return Err(StoreError::Conflict {
                        collection: collection.to_string(),
                        id,
                    });
                }
                Some(id) => id,
                None => self.fresh_id(&docs)?,
            };

            let now = Utc::now();
            let doc = Document {
                id: id.clone(),
                data,
                created_at: now,
                updated_at: now,
            };
            docs.insert(id, Arc::new(doc.clone()));

            tracing::debug!("Created {}/{}", collection, doc.id);
            return Ok(doc);
        }
    }

    /// Lists documents in insertion order, optionally filtered.
    pub fn list(&self, collection: &str, options: &ListOptions) -> Result<Page, StoreError> {
        Self::validate_name("collection", collection)?;
        let limit = self.limits.resolve(options.limit);

        let Some(handle) = self.collection(collection) else {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        };

        // Snapshot under the lock, filter outside it.
        let snapshot: Vec<Arc<Document>> = handle.read().values().cloned().collect();

        let matching: Vec<Arc<Document>> = match options.q.as_deref() {
            Some(q) => {
                let query = TextQuery::new(q);
                snapshot
                    .into_iter()
                    .filter(|doc| query.matches(&doc.data))
                    .collect()
            }
            None => snapshot,
        };

        let total = matching.len();
        let items = matching
            .iter()
            .skip(options.offset)
            .take(limit)
            .map(|doc| Document::clone(doc))
            .collect();

        Ok(Page { items, total })
    }

    /// Reads a single document.
    pub fn read(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        Self::validate_name("collection", collection)?;
        Self::validate_name("id", id)?;

        let handle = self
            .collection(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let doc = handle
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        Ok(Document::clone(&doc))
    }

    /// Replaces a document's data wholesale. Never creates.
    pub fn replace(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        self.update(collection, id, |_| data)
    }

    /// Shallow-merges `data` into a document.
    ///
    /// Top-level keys present in `data` overwrite stored keys; every other
    /// stored key is kept. Nested values are replaced, never merged.
    pub fn patch(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        self.update(collection, id, |current| {
            let mut merged = current.clone();
            for (key, value) in data {
                merged.insert(key, value);
            }
            merged
        })
    }

    fn update<F>(&self, collection: &str, id: &str, apply: F) -> Result<Document, StoreError>
    where
        F: FnOnce(&Map<String, Value>) -> Map<String, Value>,
    {
        Self::validate_name("collection", collection)?;
        Self::validate_name("id", id)?;

        let handle = self
            .collection(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut docs = handle.write();
        let slot = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let updated = Document {
            id: slot.id.clone(),
            data: apply(&slot.data),
            created_at: slot.created_at,
            updated_at: Utc::now(),
        };
        *slot = Arc::new(updated.clone());

        tracing::debug!("Updated {}/{}", collection, id);
        Ok(updated)
    }

    /// Deletes a document and returns its last value.
    pub fn delete(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        Self::validate_name("collection", collection)?;
        Self::validate_name("id", id)?;

        let handle = self
            .collection(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut docs = handle.write();
        let removed = docs
            .shift_remove(id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        tracing::debug!("Deleted {}/{}", collection, id);

        // Lock order is collection, then registry. Creates re-check
        // registration under the collection lock, so none can land in the
        // dropped map.
        if docs.is_empty() {
            let mut collections = self.collections.write();
            if collections
                .get(collection)
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                collections.remove(collection);
                tracing::debug!("Dropped empty collection {}", collection);
            }
        }

        Ok(Document::clone(&removed))
    }

    /// Returns every non-empty collection with its document count, by name.
    pub fn collections(&self) -> Vec<CollectionInfo> {
        let handles: Vec<(String, Arc<RwLock<Collection>>)> = self
            .collections
            .read()
            .iter()
            .map(|(name, handle)| (name.clone(), handle.clone()))
            .collect();

        let mut infos: Vec<CollectionInfo> = handles
            .into_iter()
            .map(|(name, handle)| {
                let count = handle.read().len();
                CollectionInfo { name, count }
            })
            .filter(|info| info.count > 0)
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
