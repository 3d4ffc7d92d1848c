//! Main client implementation

use crate::{ClientError, Config, Result};
use pinbase_store::pinning::resolve_gateway;
use pinbase_store::{
    AddDataOptions, DataRecord, Item, ItemQuery, Keyvalues, PinnedRecord, PinningBackend,
    PinningStrategy, StorageStrategy,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Pinbase client facade
///
/// Holds the process-wide configuration (tenant, gateway templates) and the
/// configured storage strategy. Every data operation delegates to the
/// strategy; the facade itself only adds identifier generation and gateway
/// resolution.
#[derive(Clone)]
pub struct Pinbase {
    config: Config,
    strategy: Arc<dyn StorageStrategy>,
}

impl std::fmt::Debug for Pinbase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pinbase")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pinbase {
    /// Create a new facade over an already-built strategy
    ///
    /// Fails fast when the tenant identifier is missing.
    pub fn new(config: Config, strategy: Arc<dyn StorageStrategy>) -> Result<Self> {
        if config.client.trim().is_empty() {
            return Err(ClientError::Config(
                "a client (tenant) identifier is required".to_string(),
            ));
        }

        Ok(Self { config, strategy })
    }

    /// Create a facade wiring the reference [`PinningStrategy`] over the
    /// given backend, scoped to the config's tenant
    pub fn with_backend(config: Config, backend: Arc<dyn PinningBackend>) -> Result<Self> {
        let strategy = Arc::new(PinningStrategy::new(backend, config.client.clone()));
        Self::new(config, strategy)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate a fresh composite item identifier for the given type
    pub fn generate_item_id(&self, item_type: &str) -> Result<String> {
        let item_type = pinbase_store::normalize_type(item_type)?;
        Ok(pinbase_store::generate_item_id(&item_type))
    }

    /// Resolve a content hash through the public gateway
    pub fn resolve_public(&self, content_hash: &str) -> String {
        resolve_gateway(&self.config.public_gateway, content_hash)
    }

    /// Resolve a content hash through the private gateway
    pub fn resolve_private(&self, content_hash: &str) -> String {
        resolve_gateway(&self.config.private_gateway, content_hash)
    }

    // ==================== Item Operations ====================

    /// Create a new item, returning its content hash
    #[instrument(skip(self))]
    pub async fn create_item(&self, item_type: &str, owner: Option<&str>) -> Result<String> {
        Ok(self.strategy.create_item(item_type, owner).await?)
    }

    /// Look up an item by content hash
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_hash: &str, item_type: Option<&str>) -> Result<Option<Item>> {
        Ok(self.strategy.get_item(item_hash, item_type).await?)
    }

    /// Look up an item by content hash, returning the raw backend record
    #[instrument(skip(self))]
    pub async fn get_item_raw(
        &self,
        item_hash: &str,
        item_type: Option<&str>,
    ) -> Result<Option<PinnedRecord>> {
        Ok(self.strategy.get_item_raw(item_hash, item_type).await?)
    }

    /// Paginated listing of items of one type
    #[instrument(skip(self, query), fields(item_type = %query.item_type))]
    pub async fn get_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        Ok(self.strategy.get_items(query).await?)
    }

    /// Remove an item and cascade to its data records
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        item_hash: &str,
        data_types: Option<&[String]>,
    ) -> Result<bool> {
        Ok(self.strategy.remove_item(item_hash, data_types).await?)
    }

    /// Merge or replace an item's caller-managed metadata
    #[instrument(skip(self, keyvalues))]
    pub async fn update_item_metadata(
        &self,
        item_hash: &str,
        keyvalues: Keyvalues,
        overwrite: bool,
    ) -> Result<Option<Keyvalues>> {
        Ok(self
            .strategy
            .update_item_metadata(item_hash, keyvalues, overwrite)
            .await?)
    }

    // ==================== Data Operations ====================

    /// Attach a data record to an item, returning its content hash
    #[instrument(skip(self, data, options))]
    pub async fn add_item_data(
        &self,
        item_hash: &str,
        data_type: &str,
        data: Value,
        options: AddDataOptions,
    ) -> Result<String> {
        Ok(self
            .strategy
            .add_item_data(item_hash, data_type, data, options)
            .await?)
    }

    /// Look up and resolve the live data record for `(item, dataType)`
    #[instrument(skip(self))]
    pub async fn get_item_data(
        &self,
        item_hash: &str,
        data_type: &str,
    ) -> Result<Option<DataRecord>> {
        Ok(self.strategy.get_item_data(item_hash, data_type).await?)
    }

    /// Look up the live data record for `(item, dataType)`, raw form
    #[instrument(skip(self))]
    pub async fn get_item_data_raw(
        &self,
        item_hash: &str,
        data_type: &str,
    ) -> Result<Option<PinnedRecord>> {
        Ok(self.strategy.get_item_data_raw(item_hash, data_type).await?)
    }

    /// Remove the live data record for `(item, dataType)` if present
    #[instrument(skip(self))]
    pub async fn remove_item_data(&self, item_hash: &str, data_type: &str) -> Result<bool> {
        Ok(self.strategy.remove_item_data(item_hash, data_type).await?)
    }

    /// Build and store the aggregate index of an item's data records
    #[instrument(skip(self, data_types))]
    pub async fn index_item(
        &self,
        item_hash: &str,
        data_types: &[String],
        search: Option<&str>,
    ) -> Result<Option<DataRecord>> {
        Ok(self
            .strategy
            .index_item(item_hash, data_types, search)
            .await?)
    }
}
