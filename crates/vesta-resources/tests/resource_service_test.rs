// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use vesta_core::resource::{
    ErasedResource, ImportedResource, LoadingState, Resource, ResourceData, ResourceDataProvider,
    ResourceImporter, ResourceIndex, ResourceKey, ResourceLocation, ResourceOperation,
    ResourceType, TypeSupport,
};
use vesta_resources::{
    ResourceHandle, ResourceHandleFactory, ResourceService, ResourceServiceConfig,
    UntypedResourceHandle,
};

const TIMEOUT: Duration = Duration::from_secs(5);

// --- Test setup: a scripted text importer ---

/// Imports `.txt` resources as `String`s and records every call.
///
/// Keys starting with `broken/` fail, keys starting with `panic/` panic. A gated
/// importer reports each key it enters and blocks until released.
#[derive(Default)]
struct RecordingImporter {
    calls: Mutex<Vec<String>>,
    gate: Option<(Sender<String>, Receiver<()>)>,
}

impl RecordingImporter {
    fn gated() -> (Arc<Self>, Receiver<String>, Sender<()>) {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let importer = Self {
            calls: Mutex::default(),
            gate: Some((entered_tx, release_rx)),
        };
        (Arc::new(importer), entered_rx, release_tx)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResourceImporter for RecordingImporter {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_format_key_supported(&self, format_key: &str, operation: ResourceOperation) -> bool {
        format_key == "txt" && operation == ResourceOperation::Import
    }

    fn is_resource_type_supported(&self, resource_type: ResourceType, _: i32) -> TypeSupport {
        if resource_type == ResourceType::Text {
            TypeSupport::SubType
        } else {
            TypeSupport::None
        }
    }

    fn import_resource_data(
        &self,
        data: &ResourceData,
    ) -> Result<ImportedResource, Box<dyn Error + Send + Sync>> {
        let key = data.key.as_str();
        self.calls.lock().unwrap().push(key.to_string());
        if let Some((entered, release)) = &self.gate {
            entered.send(key.to_string())?;
            release.recv()?;
        }
        if key.starts_with("broken/") {
            return Err(format!("cannot parse {key}").into());
        }
        if key.starts_with("panic/") {
            panic!("importer bug while reading {key}");
        }
        Ok(Box::new(format!("contents of {key}")))
    }
}

fn text(key: &str) -> ResourceData {
    ResourceData::new(
        key,
        "txt",
        ResourceType::Text,
        ResourceLocation::Path(format!("{key}.txt").into()),
    )
}

fn key(key: &str) -> ResourceKey {
    ResourceKey::new(key)
}

fn text_factory() -> ResourceHandleFactory {
    let factory = ResourceHandleFactory::new();
    factory.register::<String>(ResourceType::Text, 0);
    factory
}

fn service_with(
    provider: Arc<dyn ResourceDataProvider>,
    importer: Arc<RecordingImporter>,
) -> ResourceService {
    let service = ResourceService::new(ResourceServiceConfig::default(), provider, text_factory());
    service.register_importer(importer);
    service
}

fn text_service(keys: &[&str], importer: Arc<RecordingImporter>) -> ResourceService {
    let index = ResourceIndex::from_entries(keys.iter().map(|k| text(k)));
    service_with(Arc::new(index), importer)
}

// ---

#[test]
fn test_handles_are_stable_per_key() {
    let service = text_service(&["a", "b"], Arc::default());

    let first = service.get_handle(&key("a")).unwrap();
    let second = service.get_handle(&key("a")).unwrap();
    let other = service.get_handle(&key("b")).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(*first == *second);
    assert!(*first != *other);
    assert_eq!(service.handle_count(), 2);
    assert!(service.get_handle(&key("missing")).is_none());
    assert!(!service.contains_handle(&key("missing")));
}

#[test]
fn test_concurrent_loads_import_once() {
    let importer = Arc::new(RecordingImporter::default());
    let service = text_service(&["shared"], Arc::clone(&importer));
    service.start().unwrap();
    let k = key("shared");

    thread::scope(|scope| {
        for i in 0..8 {
            let (service, k) = (&service, &k);
            scope.spawn(move || assert!(service.load(k, i % 2 == 0)));
        }
    });

    assert_eq!(service.load_async(&k).wait_timeout(TIMEOUT), Some(true));
    assert_eq!(importer.calls(), vec!["shared"]);
    assert!(service.get_handle(&k).unwrap().is_loaded());
}

#[test]
fn test_immediate_load_returns_loaded_resource() {
    let service = text_service(&["readme"], Arc::default());
    let handle = service.get_typed::<String>(&key("readme")).unwrap();
    assert!(handle.resource().is_none());

    assert!(service.load(&key("readme"), true));

    assert!(handle.is_loaded());
    assert_eq!(handle.resource().unwrap().as_str(), "contents of readme");
    assert_eq!(service.stats().inline_imports, 1);
    assert_eq!(service.stats().imports_succeeded, 1);
}

#[test]
fn test_failed_load_is_terminal() {
    let importer = Arc::new(RecordingImporter::default());
    let service = text_service(&["broken/config"], Arc::clone(&importer));
    let k = key("broken/config");

    assert!(!service.load(&k, true));
    let handle = service.get_handle(&k).unwrap();
    assert_eq!(handle.loading_state(), LoadingState::FailedToLoad);

    assert!(!service.load(&k, false));
    assert!(!service.load(&k, true));
    assert_eq!(service.load_async(&k).try_result(), Some(false));
    assert_eq!(importer.calls().len(), 1);
    assert_eq!(service.stats().imports_failed, 1);
}

#[test]
fn test_abort_removes_queued_load() {
    let service = text_service(&["queued"], Arc::default());
    let k = key("queued");

    let completion = service.load_async(&k);
    assert!(service.is_queued(&k));

    assert!(service.abort_loading(&k));

    assert!(!service.is_queued(&k));
    assert_eq!(completion.wait_timeout(TIMEOUT), Some(false));
    let handle = service.get_handle(&k).unwrap();
    assert_eq!(handle.loading_state(), LoadingState::NotLoaded);
    assert!(!service.abort_loading(&k));
    assert_eq!(service.stats().aborted, 1);

    service.start().unwrap();
    assert_eq!(service.load_async(&k).wait_timeout(TIMEOUT), Some(true));
}

#[test]
fn test_abort_does_not_interrupt_running_import() {
    let (importer, entered, release) = RecordingImporter::gated();
    let service = text_service(&["slow"], importer);
    service.start().unwrap();
    let k = key("slow");

    assert!(service.load(&k, false));
    assert_eq!(entered.recv_timeout(TIMEOUT).unwrap(), "slow");
    let completion = service.load_async(&k);

    assert!(!service.abort_loading(&k));
    service.unload(&k);
    assert_eq!(
        service.get_handle(&k).unwrap().loading_state(),
        LoadingState::Pending
    );

    release.send(()).unwrap();
    assert_eq!(completion.wait_timeout(TIMEOUT), Some(true));
    assert!(service.get_handle(&k).unwrap().is_loaded());
}

#[test]
fn test_immediate_load_waits_for_running_import() {
    let (importer, entered, release) = RecordingImporter::gated();
    let service = text_service(&["slow"], Arc::clone(&importer));
    service.start().unwrap();
    let k = key("slow");

    assert!(service.load(&k, false));
    assert_eq!(entered.recv_timeout(TIMEOUT).unwrap(), "slow");

    let loaded = thread::scope(|scope| {
        let waiter = scope.spawn(|| service.load(&k, true));
        thread::sleep(Duration::from_millis(30));
        release.send(()).unwrap();
        waiter.join().unwrap()
    });

    assert!(loaded);
    assert!(service.get_handle(&k).unwrap().is_loaded());
    assert_eq!(importer.calls(), vec!["slow"]);
    assert_eq!(service.stats().inline_imports, 0);
}

#[test]
fn test_immediate_load_gives_up_after_coalesce_timeout() {
    let (importer, entered, release) = RecordingImporter::gated();
    let config = ResourceServiceConfig {
        coalesce_timeout_ms: 20,
        ..ResourceServiceConfig::default()
    };
    let index = ResourceIndex::from_entries([text("slow")]);
    let service = ResourceService::new(config, Arc::new(index), text_factory());
    service.register_importer(importer);
    service.start().unwrap();
    let k = key("slow");

    let completion = service.load_async(&k);
    assert_eq!(entered.recv_timeout(TIMEOUT).unwrap(), "slow");

    assert!(!service.load(&k, true));
    assert_eq!(
        service.get_handle(&k).unwrap().loading_state(),
        LoadingState::Pending
    );

    release.send(()).unwrap();
    assert_eq!(completion.wait_timeout(TIMEOUT), Some(true));
    assert!(service.load(&k, true));
}

#[test]
fn test_result_of_disposed_handle_is_discarded() {
    let (importer, entered, release) = RecordingImporter::gated();
    let service = text_service(&["slow"], importer);
    service.start().unwrap();
    let k = key("slow");

    let completion = service.load_async(&k);
    assert_eq!(entered.recv_timeout(TIMEOUT).unwrap(), "slow");
    let handle = service.get_handle(&k).unwrap();
    assert!(service.dispose_handle(&k));

    release.send(()).unwrap();

    assert_eq!(completion.wait_timeout(TIMEOUT), Some(false));
    assert!(handle.is_disposed());
    assert!(!handle.is_loaded());
    // Joining the loader thread makes its bookkeeping visible.
    service.shutdown();
    let stats = service.stats();
    assert_eq!(stats.results_discarded, 1);
    assert_eq!(stats.imports_failed, 0);
    assert_eq!(stats.imports_succeeded, 0);
}

#[test]
fn test_queue_serves_lower_priority_first() {
    let importer = Arc::new(RecordingImporter::default());
    let service = text_service(&["five", "one", "three"], Arc::clone(&importer));

    assert!(service.load_with_priority(&key("five"), 5));
    assert!(service.load_with_priority(&key("one"), 1));
    assert!(service.load_with_priority(&key("three"), 3));
    assert_eq!(service.queued_count(), 3);
    let completions: Vec<_> = ["five", "one", "three"]
        .into_iter()
        .map(|k| service.load_async(&key(k)))
        .collect();

    service.start().unwrap();

    for completion in completions {
        assert_eq!(completion.wait_timeout(TIMEOUT), Some(true));
    }
    assert_eq!(importer.calls(), vec!["one", "three", "five"]);
    assert_eq!(service.stats().requests_queued, 3);
}

#[test]
fn test_immediate_load_promotes_queued_request() {
    let importer = Arc::new(RecordingImporter::default());
    let service = text_service(&["icon"], Arc::clone(&importer));
    let k = key("icon");

    let completion = service.load_async(&k);
    assert!(service.load(&k, true));

    assert!(!service.is_queued(&k));
    assert_eq!(completion.wait_timeout(TIMEOUT), Some(true));
    assert_eq!(importer.calls().len(), 1);
    assert_eq!(service.stats().inline_imports, 1);
}

#[test]
fn test_unload_of_queued_handle_aborts_it() {
    let service = text_service(&["music"], Arc::default());
    let k = key("music");
    assert!(service.load(&k, false));

    let handle = service.get_handle(&k).unwrap();
    handle.unload();

    assert!(!service.is_queued(&k));
    assert_eq!(handle.loading_state(), LoadingState::NotLoaded);
}

// --- Round trip with a resource that tracks its own release ---

struct Tracked {
    generation: usize,
    drops: Arc<AtomicUsize>,
}

impl Resource for Tracked {}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct TrackedImporter {
    imports: AtomicUsize,
    drops: Arc<AtomicUsize>,
}

impl ResourceImporter for TrackedImporter {
    fn name(&self) -> &str {
        "tracked"
    }

    fn is_format_key_supported(&self, format_key: &str, _: ResourceOperation) -> bool {
        format_key == "bin"
    }

    fn is_resource_type_supported(&self, _: ResourceType, _: i32) -> TypeSupport {
        TypeSupport::Type
    }

    fn import_resource_data(
        &self,
        _: &ResourceData,
    ) -> Result<ImportedResource, Box<dyn Error + Send + Sync>> {
        let generation = self.imports.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(Tracked {
            generation,
            drops: Arc::clone(&self.drops),
        }))
    }
}

fn binary(key: &str, resource_type: ResourceType, sub_type: i32) -> ResourceData {
    ResourceData::new(
        key,
        "bin",
        resource_type,
        ResourceLocation::Packed { offset: 0, size: 4 },
    )
    .with_sub_type(sub_type)
}

#[test]
fn test_unload_then_reload_produces_fresh_instance() {
    let importer = Arc::new(TrackedImporter::default());
    let drops = Arc::clone(&importer.drops);
    let factory = ResourceHandleFactory::new();
    factory.register::<Tracked>(ResourceType::Model, 0);
    let index = ResourceIndex::from_entries([binary("mesh", ResourceType::Model, 0)]);
    let service = ResourceService::new(ResourceServiceConfig::default(), Arc::new(index), factory);
    service.register_importer(importer);
    let k = key("mesh");

    let first = service.get_or_load_immediately::<Tracked>(&k).unwrap();
    assert_eq!(first.generation, 1);

    assert!(service.unload(&k));
    let handle = service.get_typed::<Tracked>(&k).unwrap();
    assert!(handle.resource().is_none());
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(first);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    let second = handle.get_or_load_immediately().unwrap();
    assert_eq!(second.generation, 2);
    assert!(handle.is_same_resource(&second));
}

#[test]
fn test_factory_fallbacks_through_the_service() {
    let factory = ResourceHandleFactory::new();
    factory.register::<Tracked>(ResourceType::Model, 0);
    let index = ResourceIndex::from_entries([
        binary("lod", ResourceType::Model, 4),
        binary("blob", ResourceType::Binary, 0),
    ]);
    let service = ResourceService::new(ResourceServiceConfig::default(), Arc::new(index), factory);
    service.register_importer(Arc::new(TrackedImporter::default()));

    assert!(service.get_typed::<Tracked>(&key("lod")).is_some());
    assert!(service.get_typed::<String>(&key("lod")).is_none());

    let blob = service.get_typed::<ErasedResource>(&key("blob")).unwrap();
    let erased = blob.get_or_load_immediately().unwrap();
    assert!(erased.is::<Tracked>());
}

#[test]
fn test_missing_importer_fails_the_load() {
    let index = ResourceIndex::from_entries([ResourceData::new(
        "theme",
        "ogg",
        ResourceType::Audio,
        ResourceLocation::Path("theme.ogg".into()),
    )]);
    let service = text_service_from(index);

    assert!(!service.load(&key("theme"), true));
    assert_eq!(
        service.get_handle(&key("theme")).unwrap().loading_state(),
        LoadingState::FailedToLoad
    );
}

fn text_service_from(index: ResourceIndex) -> ResourceService {
    service_with(Arc::new(index), Arc::default())
}

// --- Fault tolerance of the loader thread ---

/// A provider whose lookup of `explode` panics once the handle exists.
struct FlakyProvider {
    index: ResourceIndex,
    lookups: AtomicUsize,
}

impl ResourceDataProvider for FlakyProvider {
    fn resource_data(&self, key: &ResourceKey) -> Option<ResourceData> {
        if key.as_str() == "explode" && self.lookups.fetch_add(1, Ordering::SeqCst) > 0 {
            panic!("index corrupted");
        }
        self.index.resource_data(key)
    }

    fn all_resource_data(&self) -> Vec<ResourceData> {
        self.index.all_resource_data()
    }
}

#[test]
fn test_importer_panic_is_contained() {
    let service = text_service(&["panic/shader", "after"], Arc::default());
    service.start().unwrap();

    assert_eq!(
        service.load_async(&key("panic/shader")).wait_timeout(TIMEOUT),
        Some(false)
    );
    assert_eq!(
        service.get_handle(&key("panic/shader")).unwrap().loading_state(),
        LoadingState::FailedToLoad
    );
    assert_eq!(service.load_async(&key("after")).wait_timeout(TIMEOUT), Some(true));
    assert!(service.is_running());
}

#[test]
fn test_loader_thread_survives_a_fault() {
    let provider = FlakyProvider {
        index: ResourceIndex::from_entries([text("explode"), text("fine")]),
        lookups: AtomicUsize::new(0),
    };
    let service = service_with(Arc::new(provider), Arc::default());
    service.start().unwrap();

    assert_eq!(service.load_async(&key("explode")).wait_timeout(TIMEOUT), Some(false));
    assert_eq!(service.stats().worker_faults, 1);
    assert_eq!(service.load_async(&key("fine")).wait_timeout(TIMEOUT), Some(true));
}

#[test]
fn test_inline_fault_settles_the_load() {
    let provider = FlakyProvider {
        index: ResourceIndex::from_entries([text("explode")]),
        lookups: AtomicUsize::new(0),
    };
    let service = service_with(Arc::new(provider), Arc::default());
    let k = key("explode");
    let completion = service.load_async(&k);
    assert!(service.is_queued(&k));

    // The queued load is promoted and its metadata lookup panics on this thread.
    assert!(!service.load(&k, true));

    let handle = service.get_handle(&k).unwrap();
    assert_eq!(handle.loading_state(), LoadingState::FailedToLoad);
    assert!(!service.is_queued(&k));
    assert_eq!(completion.wait_timeout(TIMEOUT), Some(false));
    assert!(!service.load(&k, false));
    assert_eq!(service.load_async(&k).try_result(), Some(false));
    let stats = service.stats();
    assert_eq!(stats.imports_failed, 1);
    assert_eq!(stats.worker_faults, 0);
}

// --- Discovery, disposal and shutdown ---

#[test]
fn test_discovery_only_adds_new_keys() {
    let service = text_service(&["a", "b"], Arc::default());
    let a = service.get_handle(&key("a")).unwrap();

    assert_eq!(service.on_resource_data_discovered(&[text("a"), text("c")]), 1);
    assert!(Arc::ptr_eq(&a, &service.get_handle(&key("a")).unwrap()));
    assert_eq!(service.discover_all(), 1);
    assert_eq!(service.handle_count(), 3);

    // `c` was announced but the provider has no data for it.
    assert!(!service.load(&key("c"), true));
}

#[test]
fn test_disposed_handle_is_replaced() {
    let service = text_service(&["logo"], Arc::default());
    let k = key("logo");
    assert!(service.load(&k, true));
    let old = service.get_handle(&k).unwrap();

    assert!(service.dispose_handle(&k));

    assert!(old.is_disposed());
    assert!(!old.load(true));
    let fresh = service.get_handle(&k).unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_eq!(fresh.loading_state(), LoadingState::NotLoaded);
}

#[test]
fn test_shutdown_aborts_queued_loads() {
    let service = text_service(&["a", "b"], Arc::default());
    let first = service.load_async(&key("a"));
    let second = service.load_async(&key("b"));
    let handle = service.get_handle(&key("a")).unwrap();

    service.shutdown();

    assert_eq!(first.wait_timeout(TIMEOUT), Some(false));
    assert_eq!(second.wait_timeout(TIMEOUT), Some(false));
    assert!(handle.is_disposed());
    assert_eq!(service.stats().aborted, 2);
    assert!(!service.is_running());
    service.shutdown();
}

#[test]
#[should_panic(expected = "shut down")]
fn test_using_a_shut_down_service_panics() {
    let service = text_service(&["a"], Arc::default());
    service.shutdown();
    service.get_handle(&key("a"));
}

#[test]
fn test_loads_from_packed_index_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let index_path = dir.path().join("index.bin");
    let entries = vec![text("levels/intro"), text("levels/outro")];
    let bytes = bincode::serde::encode_to_vec(&entries, bincode::config::standard())?;
    std::fs::write(&index_path, bytes)?;

    let index = ResourceIndex::from_bincode(&std::fs::read(&index_path)?)?;
    let service = text_service_from(index);

    assert_eq!(service.discover_all(), 2);
    let intro = service.get_or_load_immediately::<String>(&key("levels/intro"));
    assert_eq!(intro.as_deref().map(String::as_str), Some("contents of levels/intro"));
    Ok(())
}

#[tokio::test]
async fn test_load_async_can_be_awaited() {
    let service = text_service(&["async"], Arc::default());
    service.start().unwrap();

    assert!(service.load_async(&key("async")).await);

    let handle: Arc<ResourceHandle<String>> = service.get_typed(&key("async")).unwrap();
    assert!(handle.load_async().await);
    assert_eq!(handle.resource().unwrap().as_str(), "contents of async");
}
