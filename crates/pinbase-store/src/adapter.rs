//! Reference storage strategy over a pinning backend
//!
//! [`PinningStrategy`] is where the domain policy lives: it encodes item and
//! data identity into pin metadata so that a flat content store can answer
//! relational lookups, scopes every query to its tenant, enforces the
//! replace-on-write uniqueness rule and runs the indexing and cascade
//! fan-outs. The backend underneath stays dumb.

use crate::error::{Result, StoreError};
use crate::ids::{generate_item_id, normalize_type, sub_id};
use crate::query::{ItemQuery, PinQuery, Predicate};
use crate::types::{
    DataRecord, Item, Keyvalues, PinnedRecord, INDEX_DATA_TYPE, KEY_CLIENT, KEY_CREATED_AT,
    KEY_ITEM_ID, KEY_OWNER, KEY_SEARCH, KEY_SUB_ID, RESERVED_KEYS,
};
use crate::{AddDataOptions, PinningBackend, StorageStrategy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Page size used when enumerating an item's data records for cascades
const CASCADE_PAGE_LIMIT: u64 = 100;

/// Storage strategy backed by any [`PinningBackend`]
#[derive(Clone)]
pub struct PinningStrategy {
    backend: Arc<dyn PinningBackend>,
    client: String,
}

impl PinningStrategy {
    /// Create a strategy scoped to the given tenant
    pub fn new(backend: Arc<dyn PinningBackend>, client: impl Into<String>) -> Self {
        Self {
            backend,
            client: client.into(),
        }
    }

    /// The tenant this strategy is scoped to
    pub fn client(&self) -> &str {
        &self.client
    }

    /// A backend query pre-scoped to this tenant; callers cannot override
    /// the `client` predicate because it is inserted last
    fn scoped_query(&self, keyvalues: &std::collections::HashMap<String, Predicate>) -> PinQuery {
        let mut query = PinQuery::new();
        for (key, predicate) in keyvalues {
            query.keyvalues.insert(key.clone(), predicate.clone());
        }
        query
            .keyvalues
            .insert(KEY_CLIENT.to_string(), Predicate::eq(self.client.as_str()));
        query
    }

    fn require_hash(item_hash: &str) -> Result<()> {
        if item_hash.is_empty() {
            return Err(StoreError::MissingIdentifier("itemHash"));
        }
        Ok(())
    }

    /// Collect every data record belonging to an item, paging through the
    /// backend until the listing is exhausted
    async fn enumerate_item_data(&self, item_hash: &str) -> Result<Vec<PinnedRecord>> {
        let prefix = Predicate::starts_with(&format!("{}/", item_hash));
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let mut query = self.scoped_query(&Default::default());
            query
                .keyvalues
                .insert(KEY_SUB_ID.to_string(), prefix.clone());
            query = query.with_page(offset, CASCADE_PAGE_LIMIT);

            let batch = self.backend.list_pins(&query).await?;
            let batch_len = batch.len() as u64;
            records.extend(batch);

            if batch_len < CASCADE_PAGE_LIMIT {
                return Ok(records);
            }
            offset += batch_len;
        }
    }
}

#[async_trait]
impl StorageStrategy for PinningStrategy {
    #[instrument(skip(self))]
    async fn create_item(&self, item_type: &str, owner: Option<&str>) -> Result<String> {
        let item_type = normalize_type(item_type)?;
        let item_id = generate_item_id(&item_type);
        let created_at = Utc::now().to_rfc3339();

        let mut keyvalues = Keyvalues::new();
        keyvalues.insert(KEY_CLIENT.to_string(), json!(self.client));
        keyvalues.insert(KEY_ITEM_ID.to_string(), json!(item_id));
        if let Some(owner) = owner {
            keyvalues.insert(KEY_OWNER.to_string(), json!(owner));
        }
        keyvalues.insert(KEY_CREATED_AT.to_string(), json!(created_at));

        let mut body = Map::new();
        body.insert("itemId".to_string(), json!(item_id));
        body.insert("type".to_string(), json!(item_type));
        if let Some(owner) = owner {
            body.insert("owner".to_string(), json!(owner));
        }
        body.insert("createdAt".to_string(), json!(created_at));

        let hash = self
            .backend
            .pin_json(&Value::Object(body), Some(&item_id), &keyvalues)
            .await?;
        debug!(item_id = %item_id, hash = %hash, "created item");
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn get_item_raw(
        &self,
        item_hash: &str,
        item_type: Option<&str>,
    ) -> Result<Option<PinnedRecord>> {
        Self::require_hash(item_hash)?;

        let item_id_predicate = match item_type {
            Some(raw) => {
                let item_type = normalize_type(raw)?;
                Predicate::starts_with(&format!("{}:", item_type))
            }
            // any item record; data records carry subId, not itemId
            None => Predicate::pattern("^[a-z0-9_]+:"),
        };

        let mut query = self.scoped_query(&Default::default());
        query
            .keyvalues
            .insert(KEY_ITEM_ID.to_string(), item_id_predicate);
        query = query.with_hash(item_hash).with_page(0, 1);

        Ok(self.backend.list_pins(&query).await?.into_iter().next())
    }

    async fn get_item(&self, item_hash: &str, item_type: Option<&str>) -> Result<Option<Item>> {
        match self.get_item_raw(item_hash, item_type).await? {
            Some(record) => Ok(Some(self.parse_item(&record)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, query), fields(item_type = %query.item_type))]
    async fn get_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let item_type = normalize_type(&query.item_type)?;
        let page = query.normalized_page();
        let limit = query.normalized_limit();

        let mut pin_query = self.scoped_query(&query.keyvalues);
        pin_query.keyvalues.insert(
            KEY_ITEM_ID.to_string(),
            Predicate::starts_with(&format!("{}:", item_type)),
        );
        if let Some(owner) = &query.owner {
            pin_query
                .keyvalues
                .insert(KEY_OWNER.to_string(), Predicate::eq(owner.as_str()));
        }
        pin_query = pin_query.with_page((page - 1) * limit, limit);

        let rows = self.backend.list_pins(&pin_query).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.parse_item(row) {
                Ok(item) => items.push(item),
                Err(err) => warn!(hash = %row.content_hash, %err, "skipping malformed item record"),
            }
        }
        Ok(items)
    }

    #[instrument(skip(self, data, options))]
    async fn add_item_data(
        &self,
        item_hash: &str,
        data_type: &str,
        data: Value,
        options: AddDataOptions,
    ) -> Result<String> {
        Self::require_hash(item_hash)?;
        let data_type = normalize_type(data_type)?;

        let body = match data {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Validation(format!(
                    "data must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if self.get_item_raw(item_hash, None).await?.is_none() {
            return Err(StoreError::ItemMissing(item_hash.to_string()));
        }

        let sub = sub_id(item_hash, &data_type);

        // replace-on-write: remove-then-create, not atomic; concurrent
        // writers race and the last write the backend observes wins
        if !options.keep {
            self.remove_item_data(item_hash, &data_type).await?;
        }

        // stamp linkage fields
        let mut body = body;
        body.insert("itemHash".to_string(), json!(item_hash));
        body.insert("dataType".to_string(), json!(data_type));

        let mut keyvalues = options.keyvalues.clone();
        keyvalues.insert(KEY_CLIENT.to_string(), json!(self.client));
        keyvalues.insert(KEY_SUB_ID.to_string(), json!(sub));
        keyvalues.insert(KEY_CREATED_AT.to_string(), json!(Utc::now().to_rfc3339()));
        if let Some(search) = &options.search {
            keyvalues.insert(KEY_SEARCH.to_string(), json!(search));
        }

        let hash = self
            .backend
            .pin_json(&Value::Object(body), Some(&sub), &keyvalues)
            .await?;
        debug!(sub_id = %sub, hash = %hash, "stored data record");
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn get_item_data_raw(
        &self,
        item_hash: &str,
        data_type: &str,
    ) -> Result<Option<PinnedRecord>> {
        Self::require_hash(item_hash)?;
        let data_type = normalize_type(data_type)?;

        let mut query = self.scoped_query(&Default::default());
        query.keyvalues.insert(
            KEY_SUB_ID.to_string(),
            Predicate::eq(sub_id(item_hash, &data_type)),
        );
        query = query.with_page(0, 1);

        Ok(self.backend.list_pins(&query).await?.into_iter().next())
    }

    async fn get_item_data(&self, item_hash: &str, data_type: &str) -> Result<Option<DataRecord>> {
        match self.get_item_data_raw(item_hash, data_type).await? {
            Some(record) => Ok(Some(self.parse_item_data(&record).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn remove_item_data(&self, item_hash: &str, data_type: &str) -> Result<bool> {
        match self.get_item_data_raw(item_hash, data_type).await? {
            Some(record) => {
                self.backend.unpin(&record.content_hash).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, item_hash: &str, data_types: Option<&[String]>) -> Result<bool> {
        let root = match self.get_item_raw(item_hash, None).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        self.backend.unpin(&root.content_hash).await?;

        // already-removed records stay removed even if a sibling fails
        match data_types {
            None => {
                let records = self.enumerate_item_data(item_hash).await?;
                try_join_all(
                    records
                        .iter()
                        .map(|record| self.backend.unpin(&record.content_hash)),
                )
                .await?;
            }
            Some(types) => {
                try_join_all(
                    types
                        .iter()
                        .map(|data_type| self.remove_item_data(item_hash, data_type)),
                )
                .await?;
            }
        }

        Ok(true)
    }

    #[instrument(skip(self, keyvalues))]
    async fn update_item_metadata(
        &self,
        item_hash: &str,
        keyvalues: Keyvalues,
        overwrite: bool,
    ) -> Result<Option<Keyvalues>> {
        let root = match self.get_item_raw(item_hash, None).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        let updated: Keyvalues = if overwrite {
            keyvalues
        } else {
            let mut merged: Keyvalues = root
                .keyvalues
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            merged.extend(keyvalues);
            merged
        };

        // identity tags always survive, whatever the overwrite mode
        let mut full: Keyvalues = updated
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for key in RESERVED_KEYS {
            if let Some(value) = root.keyvalues.get(key) {
                full.insert(key.to_string(), value.clone());
            }
        }

        self.backend
            .update_metadata(&root.content_hash, &full)
            .await?;

        Ok(Some(
            full.into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .collect(),
        ))
    }

    #[instrument(skip(self, data_types))]
    async fn index_item(
        &self,
        item_hash: &str,
        data_types: &[String],
        search: Option<&str>,
    ) -> Result<Option<DataRecord>> {
        Self::require_hash(item_hash)?;

        // fan-out: one unordered lookup per type, hard join; the first
        // failure aborts the whole index build, no partial index is written
        let lookups = try_join_all(data_types.iter().map(|data_type| async move {
            let record = self.get_item_data_raw(item_hash, data_type).await?;
            Ok::<_, StoreError>((data_type, record))
        }))
        .await?;

        let mut mapping = Map::new();
        for (data_type, record) in lookups {
            if let Some(record) = record {
                mapping.insert(data_type.clone(), json!(record.content_hash));
            }
        }

        let mut options = AddDataOptions::new();
        if let Some(search) = search {
            options = options.search(search);
        }
        self.add_item_data(item_hash, INDEX_DATA_TYPE, Value::Object(mapping), options)
            .await?;

        self.get_item_data(item_hash, INDEX_DATA_TYPE).await
    }

    fn parse_item(&self, record: &PinnedRecord) -> Result<Item> {
        let item_id = record
            .keyvalue_str(KEY_ITEM_ID)
            .ok_or_else(|| malformed(record, "missing itemId"))?;
        let (item_type, _) = item_id
            .split_once(':')
            .ok_or_else(|| malformed(record, "itemId is not type:token"))?;
        let client = record
            .keyvalue_str(KEY_CLIENT)
            .ok_or_else(|| malformed(record, "missing client"))?;

        Ok(Item {
            content_hash: record.content_hash.clone(),
            item_id: item_id.to_string(),
            item_type: item_type.to_string(),
            owner: record.keyvalue_str(KEY_OWNER).map(String::from),
            client: client.to_string(),
            created_at: parse_created_at(record),
            keyvalues: record
                .keyvalues
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
    }

    async fn parse_item_data(&self, record: &PinnedRecord) -> Result<DataRecord> {
        let sub = record
            .keyvalue_str(KEY_SUB_ID)
            .ok_or_else(|| malformed(record, "missing subId"))?;
        let (item_hash, data_type) = sub
            .split_once('/')
            .ok_or_else(|| malformed(record, "subId is not itemHash/dataType"))?;

        let body = self.backend.fetch_content(&record.content_hash).await?;

        Ok(DataRecord {
            content_hash: record.content_hash.clone(),
            sub_id: sub.to_string(),
            item_hash: item_hash.to_string(),
            data_type: data_type.to_string(),
            created_at: parse_created_at(record),
            search: record.keyvalue_str(KEY_SEARCH).map(String::from),
            body,
        })
    }
}

fn malformed(record: &PinnedRecord, reason: &str) -> StoreError {
    StoreError::MalformedRecord {
        hash: record.content_hash.clone(),
        reason: reason.to_string(),
    }
}

fn parse_created_at(record: &PinnedRecord) -> DateTime<Utc> {
    record
        .keyvalue_str(KEY_CREATED_AT)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or(record.created_at)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
