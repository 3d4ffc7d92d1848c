//! Contract tests for the reference strategy over the in-memory backend

use pinbase_store::{
    AddDataOptions, ItemQuery, MemoryPinningBackend, PinningStrategy, StorageStrategy, StoreError,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Once};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn setup() -> (Arc<MemoryPinningBackend>, PinningStrategy) {
    init_tracing();
    let backend = Arc::new(MemoryPinningBackend::new());
    let strategy = PinningStrategy::new(backend.clone(), "tenant-a");
    (backend, strategy)
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let (_, store) = setup();

    let hash = store.create_item("Blog_Post", Some("alice")).await.unwrap();
    let item = store.get_item(&hash, None).await.unwrap().unwrap();

    assert_eq!(item.content_hash, hash);
    assert_eq!(item.item_type, "blog_post");
    assert!(item.item_id.starts_with("blog_post:"));
    assert_eq!(item.owner.as_deref(), Some("alice"));
    assert_eq!(item.client, "tenant-a");
    assert!(item.keyvalues.is_empty());
}

#[tokio::test]
async fn test_get_item_with_type_filter() {
    let (_, store) = setup();

    let hash = store.create_item("blog", None).await.unwrap();

    assert!(store.get_item(&hash, Some("blog")).await.unwrap().is_some());
    assert!(store.get_item(&hash, Some("news")).await.unwrap().is_none());
    assert!(store
        .get_item("QmDoesNotExist", None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_create_item_rejects_bad_type() {
    let (_, store) = setup();

    for bad in ["", "with space", "semi;colon", "dash-ed"] {
        let err = store.create_item(bad, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)), "type {:?}", bad);
    }
}

#[tokio::test]
async fn test_every_create_makes_a_new_item() {
    let (_, store) = setup();

    let a = store.create_item("blog", None).await.unwrap();
    let b = store.create_item("blog", None).await.unwrap();
    assert_ne!(a, b);

    let items = store.get_items(&ItemQuery::new("blog")).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_data_round_trip_with_linkage_stamp() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    let data_hash = store
        .add_item_data(
            &item,
            "post",
            json!({"title": "hello"}),
            AddDataOptions::new().search("greetings"),
        )
        .await
        .unwrap();

    let record = store.get_item_data(&item, "post").await.unwrap().unwrap();
    assert_eq!(record.content_hash, data_hash);
    assert_eq!(record.sub_id, format!("{}/post", item));
    assert_eq!(record.item_hash, item);
    assert_eq!(record.data_type, "post");
    assert_eq!(record.search.as_deref(), Some("greetings"));
    assert_eq!(record.body["title"], "hello");
    // linkage fields stamped into the stored body
    assert_eq!(record.body["itemHash"], json!(item));
    assert_eq!(record.body["dataType"], "post");
}

#[tokio::test]
async fn test_replace_on_write_uniqueness() {
    let (backend, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(&item, "post", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();
    store
        .add_item_data(&item, "post", json!({"v": 2}), AddDataOptions::new())
        .await
        .unwrap();

    // exactly one live record, body from the second write
    assert_eq!(backend.len(), 2); // root + one data record
    let record = store.get_item_data(&item, "post").await.unwrap().unwrap();
    assert_eq!(record.body["v"], 2);
}

#[tokio::test]
async fn test_keep_opts_out_of_replacement() {
    let (backend, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(&item, "post", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();
    store
        .add_item_data(&item, "post", json!({"v": 2}), AddDataOptions::new().keep())
        .await
        .unwrap();

    // both revisions stay pinned
    assert_eq!(backend.len(), 3);
}

#[tokio::test]
async fn test_remove_item_data_is_idempotent() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(&item, "post", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();

    assert!(store.remove_item_data(&item, "post").await.unwrap());
    assert!(!store.remove_item_data(&item, "post").await.unwrap());
    assert!(store.get_item_data(&item, "post").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tenant_isolation() {
    let backend = Arc::new(MemoryPinningBackend::new());
    let store_a = PinningStrategy::new(backend.clone(), "tenant-a");
    let store_b = PinningStrategy::new(backend.clone(), "tenant-b");

    let item_a = store_a.create_item("blog", None).await.unwrap();
    store_a
        .add_item_data(&item_a, "post", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();

    assert!(store_b.get_item(&item_a, None).await.unwrap().is_none());
    assert!(store_b
        .get_item_data(&item_a, "post")
        .await
        .unwrap()
        .is_none());
    assert!(store_b
        .get_items(&ItemQuery::new("blog"))
        .await
        .unwrap()
        .is_empty());

    // and the other direction still sees its own records
    assert!(store_a.get_item(&item_a, None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_get_items_filters_and_pagination() {
    let (_, store) = setup();

    for i in 0..12 {
        let owner = if i % 2 == 0 { Some("alice") } else { Some("bob") };
        let hash = store.create_item("blog", owner).await.unwrap();
        store
            .update_item_metadata(&hash, HashMap::from([("rank".to_string(), json!(i))]), false)
            .await
            .unwrap();
    }
    store.create_item("news", Some("alice")).await.unwrap();

    // clamped query behaves exactly like page 1 / limit 10
    let clamped = store
        .get_items(&ItemQuery::new("blog").page(0).limit(-5))
        .await
        .unwrap();
    let explicit = store
        .get_items(&ItemQuery::new("blog").page(1).limit(10))
        .await
        .unwrap();
    assert_eq!(clamped.len(), 10);
    assert_eq!(
        clamped.iter().map(|i| &i.item_id).collect::<Vec<_>>(),
        explicit.iter().map(|i| &i.item_id).collect::<Vec<_>>()
    );

    let page2 = store
        .get_items(&ItemQuery::new("blog").page(2).limit(10))
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);

    let alices = store
        .get_items(&ItemQuery::new("blog").limit(100).owner("alice"))
        .await
        .unwrap();
    assert_eq!(alices.len(), 6);
    assert!(alices.iter().all(|i| i.owner.as_deref() == Some("alice")));

    let ranked = store
        .get_items(&ItemQuery::new("blog").limit(100).keyvalue("rank", json!(3)))
        .await
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].owner.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_remove_item_cascades_all() {
    let (backend, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    for data_type in ["post", "comments", "stats"] {
        store
            .add_item_data(&item, data_type, json!({"t": data_type}), AddDataOptions::new())
            .await
            .unwrap();
    }

    assert!(store.remove_item(&item, None).await.unwrap());
    assert!(backend.is_empty());
    assert!(store.get_item(&item, None).await.unwrap().is_none());

    // removing an absent item is a value, not an error
    assert!(!store.remove_item(&item, None).await.unwrap());
}

#[tokio::test]
async fn test_remove_item_cascades_across_enumeration_pages() {
    let (backend, store) = setup();

    // enough data records to force the cascade enumeration through
    // several backend pages
    let item = store.create_item("blog", None).await.unwrap();
    for i in 0..205 {
        store
            .add_item_data(
                &item,
                &format!("type_{}", i),
                json!({ "i": i }),
                AddDataOptions::new(),
            )
            .await
            .unwrap();
    }
    assert_eq!(backend.len(), 206);

    assert!(store.remove_item(&item, None).await.unwrap());
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_remove_item_cascades_listed_types_only() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    for data_type in ["post", "comments"] {
        store
            .add_item_data(&item, data_type, json!({"t": data_type}), AddDataOptions::new())
            .await
            .unwrap();
    }

    assert!(store
        .remove_item(&item, Some(&["post".to_string()]))
        .await
        .unwrap());

    // the root is gone and so is the listed type; the rest survives.
    // orphaned records stay addressable by their uniqueness key.
    assert!(store.get_item(&item, None).await.unwrap().is_none());
    assert!(store.get_item_data(&item, "post").await.unwrap().is_none());
    assert!(store
        .get_item_data(&item, "comments")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_metadata_merge_and_overwrite() {
    let (_, store) = setup();

    let item = store.create_item("blog", Some("alice")).await.unwrap();

    let updated = store
        .update_item_metadata(&item, HashMap::from([("b".to_string(), json!(2))]), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated, HashMap::from([("b".to_string(), json!(2))]));

    let updated = store
        .update_item_metadata(&item, HashMap::from([("a".to_string(), json!(1))]), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        updated,
        HashMap::from([("a".to_string(), json!(1)), ("b".to_string(), json!(2))])
    );

    let updated = store
        .update_item_metadata(&item, HashMap::from([("a".to_string(), json!(1))]), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated, HashMap::from([("a".to_string(), json!(1))]));

    // identity survives a wholesale overwrite
    let parsed = store.get_item(&item, None).await.unwrap().unwrap();
    assert_eq!(parsed.client, "tenant-a");
    assert_eq!(parsed.item_type, "blog");
    assert_eq!(parsed.owner.as_deref(), Some("alice"));
    assert_eq!(parsed.keyvalues, HashMap::from([("a".to_string(), json!(1))]));
}

#[tokio::test]
async fn test_metadata_update_on_absent_item() {
    let (_, store) = setup();

    let updated = store
        .update_item_metadata("QmNope", HashMap::from([("a".to_string(), json!(1))]), false)
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn test_merge_keeps_conflicting_new_values() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .update_item_metadata(&item, HashMap::from([("a".to_string(), json!("old"))]), false)
        .await
        .unwrap();

    let updated = store
        .update_item_metadata(&item, HashMap::from([("a".to_string(), json!("new"))]), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated, HashMap::from([("a".to_string(), json!("new"))]));
}

#[tokio::test]
async fn test_index_contains_exactly_live_types() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    let hash_a = store
        .add_item_data(&item, "a", json!({"v": "a"}), AddDataOptions::new())
        .await
        .unwrap();
    let hash_c = store
        .add_item_data(&item, "c", json!({"v": "c"}), AddDataOptions::new())
        .await
        .unwrap();

    let types = ["a", "b", "c"].map(String::from);
    let index = store
        .index_item(&item, &types, Some("nightly"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(index.data_type, "index");
    assert_eq!(index.search.as_deref(), Some("nightly"));
    assert_eq!(index.body["a"], json!(hash_a));
    assert_eq!(index.body["c"], json!(hash_c));
    assert!(index.body.get("b").is_none());
}

#[tokio::test]
async fn test_reindex_replaces_prior_index() {
    let (backend, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(&item, "a", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();

    let types = ["a".to_string()];
    store.index_item(&item, &types, None).await.unwrap();
    let before = backend.len();
    store.index_item(&item, &types, None).await.unwrap();
    assert_eq!(backend.len(), before);

    // a stale index is not corrected automatically
    store.remove_item_data(&item, "a").await.unwrap();
    let index = store.get_item_data(&item, "index").await.unwrap().unwrap();
    assert!(index.body.get("a").is_some());
}

#[tokio::test]
async fn test_index_aborts_wholesale_on_bad_lookup() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(&item, "a", json!({"v": 1}), AddDataOptions::new())
        .await
        .unwrap();

    let types = ["a".to_string(), "bad-type".to_string()];
    let err = store.index_item(&item, &types, None).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // no partial index was written
    assert!(store.get_item_data(&item, "index").await.unwrap().is_none());
}

#[tokio::test]
async fn test_custom_keyvalues_cannot_clobber_identity_tags() {
    let (backend, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    let options = AddDataOptions::new()
        .keyvalue("client", "someone-else")
        .keyvalue("tag", "kept");
    store
        .add_item_data(&item, "post", json!({"v": 1}), options)
        .await
        .unwrap();

    // the record is still scoped to this strategy's tenant, not the
    // tenant the caller tried to smuggle in
    let record = store.get_item_data(&item, "post").await.unwrap().unwrap();
    assert_eq!(record.body["v"], 1);

    let other = PinningStrategy::new(backend, "someone-else");
    assert!(other
        .get_item_data(&item, "post")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_metadata_keyvalues_survive_on_data_records() {
    let (_, store) = setup();

    let item = store.create_item("blog", None).await.unwrap();
    store
        .add_item_data(
            &item,
            "post",
            json!({"v": 1}),
            AddDataOptions::new().keyvalue("lang", "en"),
        )
        .await
        .unwrap();

    let raw = store.get_item_data_raw(&item, "post").await.unwrap().unwrap();
    assert_eq!(raw.keyvalues.get("lang"), Some(&json!("en")));
    assert_eq!(raw.keyvalues.get("client"), Some(&json!("tenant-a")));
}
