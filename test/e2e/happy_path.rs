//! End-to-end happy path test.
//!
//! Drives a trove instance backed by the in-memory storage plugin through:
//!
//! 1. Initialize from configuration (plugin sources + storage roles)
//! 2. Create events with files and links
//! 3. Read events back with link reassembly
//! 4. Query by schema, producer and link
//! 5. Read file content
//! 6. Shut down and re-initialize
//!
//! ## Running
//!
//! ```bash
//! cargo test -p trove-e2e --test happy_path
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use trove_core::trove_events::LinkFilter;
use trove_core::{
    hook_fn, hook_names, CoreConfig, CoreError, EventCreationOptions, EventFile, EventLink,
    EventQuery, FileData, HookRegistration, LifecycleState, LinkStorageConfig, Plugin,
    StaticPluginLoader, StoragePluginConfig, Trove,
};
use trove_storage_memory::{MemoryStoragePlugin, PLUGIN_NAME};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trove_core=debug")
        .with_test_writer()
        .try_init();
}

/// Counts events seen by `event:stored` and tags every event while storing.
#[derive(Default)]
struct AuditPlugin {
    stored: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn hooks(&self) -> Vec<HookRegistration> {
        let stored = self.stored.clone();
        let started = self.started.clone();
        vec![
            HookRegistration::new(
                hook_names::SYSTEM_INITIALIZED,
                hook_fn(move |_| {
                    started.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }),
            ),
            HookRegistration::new(
                hook_names::EVENT_STORING,
                hook_fn(|ctx| {
                    if let Some(event) = ctx.event.as_mut() {
                        let metadata = event.metadata.get_or_insert_with(Default::default);
                        metadata.insert("audited".into(), json!(true));
                    }
                    Ok(Value::Null)
                }),
            )
            .with_priority(10),
            HookRegistration::new(
                hook_names::EVENT_STORED,
                hook_fn(move |ctx| {
                    stored.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(ctx.event.as_ref().map(|e| e.id.id.clone())))
                }),
            ),
        ]
    }
}

fn config() -> CoreConfig {
    let mut config = CoreConfig::with_event_storage(PLUGIN_NAME)
        .source(PLUGIN_NAME)
        .source("audit");
    config.storage.files = Some(StoragePluginConfig::new(PLUGIN_NAME));
    config.storage.links = Some(LinkStorageConfig::Plugin(StoragePluginConfig::new(
        PLUGIN_NAME,
    )));
    config
}

struct Setup {
    trove: Trove,
    stored: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

fn setup() -> Setup {
    let audit = Arc::new(AuditPlugin::default());
    let stored = audit.stored.clone();
    let started = audit.started.clone();

    let mut loader = StaticPluginLoader::new().with_plugin("audit", audit);
    loader.register(PLUGIN_NAME, || {
        Ok(Arc::new(MemoryStoragePlugin::new()) as Arc<dyn Plugin>)
    });

    Setup {
        trove: Trove::with_loader(config(), Arc::new(loader)),
        stored,
        started,
    }
}

fn order_schema() -> Value {
    json!({
        "$id": "urn:trove:order",
        "type": "object",
        "properties": {
            "sku": { "type": "string" },
            "quantity": { "type": "integer", "minimum": 1 }
        },
        "required": ["sku", "quantity"]
    })
}

fn shipment_schema() -> Value {
    json!({
        "$id": "urn:trove:shipment",
        "type": "object",
        "required": ["carrier"]
    })
}

#[tokio::test]
async fn test_happy_path() {
    init_tracing();
    let Setup {
        trove,
        stored,
        started,
    } = setup();

    // 1. Initialize
    trove.initialize().await.expect("initialize");
    assert_eq!(trove.state().await, LifecycleState::Ready);
    assert_eq!(started.load(Ordering::SeqCst), 1);

    let names: Vec<String> = trove.plugins().await.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec![PLUGIN_NAME.to_string(), "audit".to_string()]);

    // 2. Create events
    let order = trove
        .create_event(
            order_schema(),
            json!({"sku": "widget", "quantity": 3}),
            EventCreationOptions::default()
                .producer("shop")
                .file(EventFile::new("text/plain", "packing list").with_filename("list.txt")),
        )
        .await
        .expect("create order");

    assert_eq!(order.producer, "shop");
    assert!(order.files[0].is_persisted());
    assert_eq!(
        order.metadata.as_ref().and_then(|m| m.get("audited")),
        Some(&json!(true))
    );

    let shipment = trove
        .create_event(
            shipment_schema(),
            json!({"carrier": "post"}),
            EventCreationOptions::default()
                .producer("warehouse")
                .link(EventLink::new("fulfills", order.id.clone())),
        )
        .await
        .expect("create shipment");

    assert_eq!(stored.load(Ordering::SeqCst), 2);

    // Invalid payloads are rejected and never stored
    let err = trove
        .create_event(
            order_schema(),
            json!({"sku": "widget", "quantity": 0}),
            EventCreationOptions::default(),
        )
        .await
        .unwrap_err();
    let (_, issues) = err.validation_details().expect("validation failure");
    assert_eq!(issues[0].path, "/quantity");
    assert_eq!(stored.load(Ordering::SeqCst), 2);

    // 3. Read back
    let read = trove
        .get_event(&shipment.id)
        .await
        .unwrap()
        .expect("shipment stored");
    assert_eq!(read.links.len(), 1);
    assert_eq!(read.links[0].target_event.id, order.id.id);

    // 4. Query
    let orders = trove
        .query_events(&EventQuery::all().schema("urn:trove:order"))
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order.id);

    let linked = trove
        .query_events(&EventQuery::all().link(LinkFilter {
            link_type: Some("fulfills".into()),
            target_event: Some(order.id.clone()),
        }))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].producer, "warehouse");

    // 5. Files
    let file_id = &order.files[0].id;
    let file = trove.get_file(file_id).await.unwrap().expect("file stored");
    assert_eq!(file.filename.as_deref(), Some("list.txt"));
    assert_eq!(
        trove.get_file_data(file_id).await.unwrap(),
        FileData::Text("packing list".into())
    );

    // 6. Shutdown and re-initialize
    trove.shutdown().await;
    assert_eq!(trove.state().await, LifecycleState::Stopped);
    assert!(trove.plugins().await.is_empty());
    assert!(matches!(
        trove.get_event(&order.id).await,
        Err(CoreError::NotInitialized)
    ));

    trove.initialize().await.expect("re-initialize");
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert!(trove.get_event(&order.id).await.unwrap().is_none());

    trove.shutdown().await;
}

#[tokio::test]
async fn test_links_stored_with_events() {
    init_tracing();

    let mut config = CoreConfig::with_event_storage(PLUGIN_NAME);
    config.storage.links = Some(LinkStorageConfig::UseEventStorage);
    let trove = Trove::new(config);
    trove
        .register_plugin(Arc::new(MemoryStoragePlugin::new()))
        .await
        .unwrap();
    trove.initialize().await.unwrap();

    let event = trove
        .create_event(
            json!({"type": "object"}),
            json!({}),
            EventCreationOptions::default().link(EventLink::new("relates-to", "elsewhere")),
        )
        .await
        .unwrap();

    let read = trove.get_event(&event.id).await.unwrap().unwrap();
    assert_eq!(read.links, event.links);

    // No file storage configured
    assert!(matches!(
        trove.get_file("anything").await,
        Err(CoreError::FileStorageUnavailable)
    ));

    trove.shutdown().await;
}
