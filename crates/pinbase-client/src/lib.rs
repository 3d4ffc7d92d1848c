//! # Pinbase Client
//!
//! Client facade for the pinbase item/data model: immutable content-addressed
//! items with typed, replaceable data records, stored through a pluggable
//! pinning backend.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pinbase_client::{Config, Pinbase};
//! use pinbase_store::{AddDataOptions, PinningServiceClient, PinningServiceConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(PinningServiceClient::new(PinningServiceConfig::new(
//!         "https://api.pinata.cloud",
//!         "your-token",
//!         "https://gateway.pinata.cloud/ipfs/{cid}",
//!     ))?);
//!     let store = Pinbase::with_backend(Config::new("my-tenant"), backend)?;
//!
//!     let item = store.create_item("blog", Some("alice")).await?;
//!     store
//!         .add_item_data(&item, "post", json!({"title": "hi"}), AddDataOptions::new())
//!         .await?;
//!     let index = store.index_item(&item, &["post".to_string()], None).await?;
//!     println!("indexed: {:?}", index);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::Pinbase;
pub use config::Config;
pub use error::{ClientError, Result};

// Re-export the storage-layer surface callers need to drive the facade
pub use pinbase_store::{
    AddDataOptions, DataRecord, Item, ItemQuery, Keyvalues, MemoryPinningBackend, Op,
    PinnedRecord, PinningBackend, PinningServiceClient, PinningServiceConfig, PinningStrategy,
    Predicate, StorageStrategy, StoreError, INDEX_DATA_TYPE,
};
