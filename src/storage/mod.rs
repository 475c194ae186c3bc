//! Quote persistence.
//!
//! # Responsibilities
//! - Keyed storage of quotes by their hash
//! - At most one winning write per key under concurrent inserts
//! - Optional JSON snapshot, loaded at startup and written on shutdown
//!
//! # Design Decisions
//! - Writes are first-wins: a later put for a stored hash is a no-op
//! - Readers always get a full clone, never a partially written quote

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::observability::metrics;
use crate::quoting::types::{Quote, QuoteHash};

/// Errors raised by a quote store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is malformed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A different quote is already stored under this hash.
    #[error("conflicting quote already stored for {0}")]
    Conflict(QuoteHash),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed quote storage shared by all requests.
pub trait QuoteStore: Send + Sync {
    /// Store `quote` under `hash`; repeating an identical put is a no-op.
    fn put(&self, hash: QuoteHash, quote: Quote) -> StoreResult<()>;

    fn get(&self, hash: &QuoteHash) -> StoreResult<Option<Quote>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// DashMap-backed store with an optional JSON snapshot.
#[derive(Clone, Default)]
pub struct InMemoryQuoteStore {
    inner: Arc<DashMap<QuoteHash, Quote>>,
    persistence_path: Option<PathBuf>,
}

impl InMemoryQuoteStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Open a store, reading the snapshot at `path` if it exists.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<QuoteHash, Quote> = serde_json::from_reader(reader)?;
            for (hash, quote) in map {
                store.inner.insert(hash, quote);
            }
            metrics::record_store_size(store.inner.len());
            tracing::info!(count = store.inner.len(), path = %path.display(), "Loaded quotes from snapshot");
        }
        Ok(store)
    }

    /// Write the snapshot, if a path is configured.
    pub fn save_to_file(&self) -> StoreResult<()> {
        if let Some(path) = &self.persistence_path {
            let map: HashMap<QuoteHash, Quote> = self
                .inner
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect();

            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, &map)?;
            tracing::info!(count = map.len(), path = %path.display(), "Saved quotes to snapshot");
        }
        Ok(())
    }
}

impl QuoteStore for InMemoryQuoteStore {
    fn put(&self, hash: QuoteHash, quote: Quote) -> StoreResult<()> {
        match self.inner.entry(hash) {
            Entry::Occupied(existing) => {
                if *existing.get() != quote {
                    return Err(StoreError::Conflict(hash));
                }
                tracing::debug!(quote_hash = %hash, "Quote already stored");
            }
            Entry::Vacant(slot) => {
                slot.insert(quote);
                metrics::record_store_size(self.inner.len());
            }
        }
        Ok(())
    }

    fn get(&self, hash: &QuoteHash) -> StoreResult<Option<Quote>> {
        Ok(self.inner.get(hash).map(|r| r.value().clone()))
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl std::fmt::Debug for InMemoryQuoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQuoteStore")
            .field("len", &self.inner.len())
            .field("persistence_path", &self.persistence_path)
            .finish()
    }
}
