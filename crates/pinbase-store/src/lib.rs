//! # Pinbase Store
//!
//! Storage layer for the pinbase item/data model: immutable, content-addressed
//! root records (items) with typed, replaceable attachments (data records),
//! coordinated over an append-mostly pinning backend.
//!
//! This crate provides:
//! - **The storage contract**: the [`StorageStrategy`] trait every backend
//!   adapter must satisfy
//! - **The backend boundary**: the [`PinningBackend`] trait (pin, unpin,
//!   list with metadata predicates, metadata patch, gateway fetch)
//! - **The reference adapter**: [`PinningStrategy`], which emulates
//!   relational lookups over a flat content store via metadata tagging
//! - **An HTTP backend**: [`PinningServiceClient`] for Pinata-flavored
//!   pinning services
//! - **An in-memory backend**: [`MemoryPinningBackend`] for tests and
//!   embedding
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Facade (pinbase-client)       │
//! ├─────────────────────────────────────────┤
//! │         StorageStrategy Trait           │
//! ├─────────────────────────────────────────┤
//! │            PinningStrategy              │
//! ├────────────────────┬────────────────────┤
//! │ PinningServiceClient │ MemoryPinningBackend │
//! ├────────────────────┴────────────────────┤
//! │            Pinning service              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pinbase_store::{MemoryPinningBackend, PinningStrategy, StorageStrategy};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryPinningBackend::new());
//! let store = PinningStrategy::new(backend, "my-tenant");
//! let item_hash = store.create_item("blog", Some("alice")).await?;
//! ```

pub mod adapter;
pub mod error;
pub mod ids;
pub mod memory;
pub mod pinning;
pub mod query;
pub mod types;

pub use adapter::PinningStrategy;
pub use error::{Result, StoreError};
pub use ids::{generate_item_id, normalize_type, sub_id};
pub use memory::MemoryPinningBackend;
pub use pinning::{PinningServiceClient, PinningServiceConfig};
pub use query::{ItemQuery, Op, PinQuery, Predicate, DEFAULT_PAGE_LIMIT};
pub use types::{
    DataRecord, Item, Keyvalues, PinnedRecord, INDEX_DATA_TYPE, KEY_CLIENT, KEY_CREATED_AT,
    KEY_ITEM_ID, KEY_OWNER, KEY_SEARCH, KEY_SUB_ID, RESERVED_KEYS,
};

use async_trait::async_trait;
use serde_json::Value;

/// Options for [`StorageStrategy::add_item_data`]
#[derive(Clone, Debug, Default)]
pub struct AddDataOptions {
    /// Keep any existing record for the same `(item, dataType)` key instead
    /// of replacing it
    pub keep: bool,
    /// Extra metadata key/values to tag the record with
    pub keyvalues: Keyvalues,
    /// Optional free-text search tag
    pub search: Option<String>,
}

impl AddDataOptions {
    /// Default options: replace-on-write, no extra metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep existing records of the same type (append instead of replace)
    pub fn keep(mut self) -> Self {
        self.keep = true;
        self
    }

    /// Tag the record with an extra metadata key/value
    pub fn keyvalue(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyvalues.insert(key.into(), value.into());
        self
    }

    /// Set the search tag
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// The capability set a backend adapter must implement to act as a storage
/// strategy for the item/data model
///
/// Contracts common to every implementation:
/// - Absence is a value: lookups return `None`, removals return `false`,
///   listings return empty vectors. Errors are reserved for validation
///   failures, the parent-item precondition and backend failures.
/// - Every query is implicitly scoped to the strategy's tenant; callers
///   cannot widen or override that scope.
/// - By default at most one live data record exists per
///   `(item, dataType)` key; writes replace, they do not append.
#[async_trait]
pub trait StorageStrategy: Send + Sync {
    /// Create a new root item of the given type and return its content hash
    ///
    /// Never idempotent: every call creates a new item.
    async fn create_item(&self, item_type: &str, owner: Option<&str>) -> Result<String>;

    /// Look up an item by content hash, returning the raw backend record
    async fn get_item_raw(
        &self,
        item_hash: &str,
        item_type: Option<&str>,
    ) -> Result<Option<PinnedRecord>>;

    /// Look up an item by content hash, returning the parsed domain object
    async fn get_item(&self, item_hash: &str, item_type: Option<&str>) -> Result<Option<Item>>;

    /// Paginated listing of items of one type
    ///
    /// Page numbers and limits below 1 are clamped, never rejected.
    async fn get_items(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    /// Attach a data record to an item and return its content hash
    ///
    /// Fails with [`StoreError::ItemMissing`] if the parent item does not
    /// exist and with [`StoreError::Validation`] if `data` is not a JSON
    /// object. Unless `options.keep` is set, an existing record for the
    /// same `(item, dataType)` key is removed first.
    async fn add_item_data(
        &self,
        item_hash: &str,
        data_type: &str,
        data: Value,
        options: AddDataOptions,
    ) -> Result<String>;

    /// Look up the live data record for `(item, dataType)`, raw form
    async fn get_item_data_raw(
        &self,
        item_hash: &str,
        data_type: &str,
    ) -> Result<Option<PinnedRecord>>;

    /// Look up the live data record for `(item, dataType)` and dereference
    /// its body through the backend
    async fn get_item_data(&self, item_hash: &str, data_type: &str) -> Result<Option<DataRecord>>;

    /// Remove the live data record for `(item, dataType)` if present
    ///
    /// Returns whether something was removed; absence is not an error.
    async fn remove_item_data(&self, item_hash: &str, data_type: &str) -> Result<bool>;

    /// Remove an item and cascade to its data records
    ///
    /// With `data_types = None` all data records of the item are removed
    /// (enumerated, then unpinned concurrently); otherwise only the listed
    /// types. Returns whether the item existed.
    async fn remove_item(&self, item_hash: &str, data_types: Option<&[String]>) -> Result<bool>;

    /// Merge or replace the caller-managed metadata of an item
    ///
    /// Returns the updated metadata, or `None` if the item does not exist.
    /// Reserved identity keys are never touched or returned.
    async fn update_item_metadata(
        &self,
        item_hash: &str,
        keyvalues: Keyvalues,
        overwrite: bool,
    ) -> Result<Option<Keyvalues>>;

    /// Build and store the aggregate index of an item's data records
    ///
    /// Fans out one concurrent lookup per requested type, folds the live
    /// records into a `{dataType: contentHash}` mapping and stores it as a
    /// data record of the reserved type [`INDEX_DATA_TYPE`]. One failing
    /// lookup aborts the whole operation; no partial index is written.
    async fn index_item(
        &self,
        item_hash: &str,
        data_types: &[String],
        search: Option<&str>,
    ) -> Result<Option<DataRecord>>;

    /// Normalize a raw backend record into an [`Item`]
    fn parse_item(&self, record: &PinnedRecord) -> Result<Item>;

    /// Normalize a raw backend record into a [`DataRecord`], dereferencing
    /// its body through the backend
    async fn parse_item_data(&self, record: &PinnedRecord) -> Result<DataRecord>;
}

/// The boundary a concrete pinning backend must expose
///
/// Implementations are dumb: all domain policy (tenant scoping, uniqueness,
/// cascades) lives above this trait in [`PinningStrategy`].
#[async_trait]
pub trait PinningBackend: Send + Sync {
    /// Pin a JSON body with the given metadata, returning its content hash
    async fn pin_json(
        &self,
        body: &Value,
        name: Option<&str>,
        keyvalues: &Keyvalues,
    ) -> Result<String>;

    /// Unpin a content hash; unpinning an absent hash is not an error
    async fn unpin(&self, content_hash: &str) -> Result<()>;

    /// List pinned records matching the query
    async fn list_pins(&self, query: &PinQuery) -> Result<Vec<PinnedRecord>>;

    /// Replace the metadata of a pinned record wholesale
    async fn update_metadata(&self, content_hash: &str, keyvalues: &Keyvalues) -> Result<()>;

    /// Dereference a content hash into its JSON body
    async fn fetch_content(&self, content_hash: &str) -> Result<Value>;
}
