//! Domain types for the item/data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Arbitrary metadata key/value pairs attached to a pinned record
pub type Keyvalues = HashMap<String, Value>;

/// Reserved data type under which item indexes are stored
pub const INDEX_DATA_TYPE: &str = "index";

/// Metadata key carrying the tenant identifier
pub const KEY_CLIENT: &str = "client";
/// Metadata key carrying the composite item identifier (`"{type}:{hex}"`)
pub const KEY_ITEM_ID: &str = "itemId";
/// Metadata key carrying the owning principal
pub const KEY_OWNER: &str = "owner";
/// Metadata key carrying the creation timestamp (RFC 3339)
pub const KEY_CREATED_AT: &str = "createdAt";
/// Metadata key carrying the data record uniqueness token
/// (`"{itemHash}/{dataType}"`)
pub const KEY_SUB_ID: &str = "subId";
/// Metadata key carrying the free-text search tag of a data record
pub const KEY_SEARCH: &str = "search";

/// Identity keys managed by the store itself; callers can neither read them
/// back through metadata updates nor clobber them with an overwrite.
pub const RESERVED_KEYS: [&str; 6] = [
    KEY_CLIENT,
    KEY_ITEM_ID,
    KEY_OWNER,
    KEY_CREATED_AT,
    KEY_SUB_ID,
    KEY_SEARCH,
];

/// A raw record as returned by a pinning backend
///
/// This is the unparsed shape: the content hash assigned at pin time plus
/// the metadata the store tagged the pin with. [`crate::StorageStrategy`]
/// implementations translate these into [`Item`]s and [`DataRecord`]s.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinnedRecord {
    /// Content hash assigned by the backend
    pub content_hash: String,
    /// When the record was pinned
    pub created_at: DateTime<Utc>,
    /// Optional human-readable pin name
    pub name: Option<String>,
    /// Metadata key/values attached to the pin
    pub keyvalues: Keyvalues,
}

impl PinnedRecord {
    /// Read a metadata value as a string, if present and a string
    pub fn keyvalue_str(&self, key: &str) -> Option<&str> {
        self.keyvalues.get(key).and_then(Value::as_str)
    }
}

/// An immutable root record identified by its content hash
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Content hash assigned by the backend at creation time; the primary
    /// key for all subsequent operations
    pub content_hash: String,
    /// Composite identifier of the form `"{type}:{hex}"`
    pub item_id: String,
    /// Item classifier, lowercase `[a-z0-9_]+`
    pub item_type: String,
    /// Controlling principal, if any
    pub owner: Option<String>,
    /// Publishing tenant
    pub client: String,
    /// Creation timestamp, set once
    pub created_at: DateTime<Utc>,
    /// Caller-managed metadata (reserved identity keys excluded)
    pub keyvalues: Keyvalues,
}

/// A typed, content-addressed attachment to exactly one item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    /// Content hash assigned by the backend when the record was pinned
    pub content_hash: String,
    /// Uniqueness token `"{itemHash}/{dataType}"`
    pub sub_id: String,
    /// Content hash of the parent item
    pub item_hash: String,
    /// Data type tag (distinct namespace from item types)
    pub data_type: String,
    /// When the record was pinned
    pub created_at: DateTime<Utc>,
    /// Optional free-text search tag
    pub search: Option<String>,
    /// The stored body, dereferenced through the backend
    pub body: Value,
}
