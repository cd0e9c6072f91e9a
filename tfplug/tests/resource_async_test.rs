//! Resources built on the retry runner against an eventually consistent store

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tfplug::retry::{self, RetryOutcome, RetryPolicy};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::{
    AttributeBuilder, AttributeType, Context, Resource, ResourceData, Schema, SchemaBuilder,
};

/// Store whose writes become visible only after a number of reads
#[derive(Default)]
struct LaggingStore {
    objects: Mutex<HashMap<String, (String, u32)>>,
}

impl LaggingStore {
    fn put(&self, id: &str, name: &str, lag: u32) {
        self.objects
            .lock()
            .unwrap()
            .insert(id.to_string(), (name.to_string(), lag));
    }

    fn get(&self, id: &str) -> Option<String> {
        let mut objects = self.objects.lock().unwrap();
        let (name, lag) = objects.get_mut(id)?;
        if *lag > 0 {
            *lag -= 1;
            return Some(format!("stale-{}", name));
        }
        Some(name.clone())
    }
}

struct NamedResource {
    store: Arc<LaggingStore>,
    lag: u32,
    policy: RetryPolicy,
}

fn schema() -> Schema {
    SchemaBuilder::new()
        .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
        .attribute(AttributeBuilder::new("name", AttributeType::String).required().build())
        .build()
}

#[async_trait]
impl Resource for NamedResource {
    fn type_name(&self) -> &str {
        "test_named"
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let name = data.get_string("name").unwrap();
        let id = format!("obj-{}", name);
        self.store.put(&id, &name, self.lag);
        data.set_id(id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let id = data.id().unwrap().to_string();
        let wanted = data
            .intent()
            .and_then(|intent| intent.to_json()["name"].as_str().map(str::to_string));
        let store = &self.store;
        let (id_ref, wanted) = (id.as_str(), wanted.as_deref());

        let result = retry::run(&ctx, self.policy, move || async move {
            match store.get(id_ref) {
                None => RetryOutcome::Done(None),
                Some(name) if wanted.is_some_and(|w| w != name) => {
                    RetryOutcome::retryable(format!("name is {}", name))
                }
                Some(name) => RetryOutcome::Done(Some(name)),
            }
        })
        .await;

        match result {
            Ok(Some(name)) => {
                data.set_string("name", name);
                vec![]
            }
            Ok(None) => {
                data.clear_id();
                vec![]
            }
            Err(err) => vec![Diagnostic::error(format!("Failed to read {}", id), err.to_string())],
        }
    }

    async fn update(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        self.create(ctx, data).await
    }

    async fn delete(&self, _ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        data.clear_id();
        vec![]
    }
}

fn resource(store: Arc<LaggingStore>, lag: u32, timeout_ms: u64) -> NamedResource {
    NamedResource {
        store,
        lag,
        policy: RetryPolicy::new(Duration::from_millis(timeout_ms))
            .with_backoff(Duration::from_millis(10)),
    }
}

fn planned(name: &str) -> ResourceData {
    ResourceData::for_create(DynamicValue::from_json(serde_json::json!({ "name": name })))
}

#[tokio::test]
async fn create_waits_for_the_store_to_converge() {
    let store = Arc::new(LaggingStore::default());
    let resource = resource(store, 3, 1000);
    let mut data = planned("alpha");

    let diags = resource.create(Context::new(), &mut data).await;

    assert!(diags.is_empty(), "{:?}", diags);
    assert_eq!(data.id(), Some("obj-alpha"));
    assert_eq!(data.get_string("name").as_deref(), Some("alpha"));
}

#[tokio::test]
async fn create_reports_timeout_when_store_never_converges() {
    let store = Arc::new(LaggingStore::default());
    let resource = resource(store, u32::MAX, 50);
    let mut data = planned("beta");

    let diags = resource.create(Context::new(), &mut data).await;

    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].summary, "Failed to read obj-beta");
    assert!(diags[0].detail.contains("timeout"), "{}", diags[0].detail);
    assert!(diags[0].detail.contains("stale-beta"), "{}", diags[0].detail);
}

#[tokio::test]
async fn refresh_of_missing_object_drops_state() {
    let store = Arc::new(LaggingStore::default());
    let resource = resource(store, 0, 100);
    let mut data = ResourceData::for_read(DynamicValue::from_json(serde_json::json!({
        "id": "obj-gone",
        "name": "gone"
    })));

    let diags = resource.read(Context::new(), &mut data).await;

    assert!(diags.is_empty());
    assert!(data.into_state().is_none());
}

#[tokio::test]
async fn independent_operations_run_concurrently() {
    let store = Arc::new(LaggingStore::default());
    let resource = Arc::new(resource(store, 5, 2000));
    let started = Instant::now();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let resource = resource.clone();
            tokio::spawn(async move {
                let mut data = planned(&format!("item{}", i));
                let diags = resource.create(Context::new(), &mut data).await;
                (diags, data.id().map(str::to_string))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (diags, id) = handle.await.unwrap();
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(id, Some(format!("obj-item{}", i)));
    }

    // Each create sleeps five backoffs; run serially they would take four times as long
    assert!(started.elapsed() < Duration::from_millis(150), "{:?}", started.elapsed());
}

#[tokio::test]
async fn cancelled_context_stops_the_read() {
    let store = Arc::new(LaggingStore::default());
    let resource = resource(store, u32::MAX, 5000);
    let ctx = Context::new();
    ctx.cancel();
    let mut data = planned("gamma");

    let diags = resource.create(ctx, &mut data).await;

    assert_eq!(diags.len(), 1);
    assert!(!diags[0].detail.contains("timeout"), "{}", diags[0].detail);
}
