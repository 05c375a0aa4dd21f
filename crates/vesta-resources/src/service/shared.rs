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

use super::{dispatch, stats::StatsCounters};
use crate::config::ResourceServiceConfig;
use crate::factory::ResourceHandleFactory;
use crate::handle::{Claim, HandleCore, SharedResourceHandle};
use crate::load_handle::{LoadCompletion, ResourceLoadHandle};
use crate::queue::ResourceLoadQueue;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use vesta_core::resource::{
    ResourceData, ResourceDataProvider, ResourceError, ResourceImporter, ResourceKey,
};

/// The state shared between the service, its handles and the loader thread.
///
/// Lock order: a handle's state lock may be held while taking the queue lock,
/// never the other way around. The table and importer locks are never held
/// while calling into a handle.
pub(crate) struct ServiceShared {
    pub(crate) config: ResourceServiceConfig,
    provider: Arc<dyn ResourceDataProvider>,
    factory: ResourceHandleFactory,
    importers: RwLock<Vec<Arc<dyn ResourceImporter>>>,
    handles: RwLock<HashMap<ResourceKey, SharedResourceHandle>>,
    pub(crate) queue: ResourceLoadQueue,
    cancelled: AtomicBool,
    disposed: AtomicBool,
    pub(crate) stats: StatsCounters,
}

impl ServiceShared {
    pub(crate) fn new(
        config: ResourceServiceConfig,
        provider: Arc<dyn ResourceDataProvider>,
        factory: ResourceHandleFactory,
    ) -> Self {
        Self {
            config,
            provider,
            factory,
            importers: RwLock::new(Vec::new()),
            handles: RwLock::new(HashMap::new()),
            queue: ResourceLoadQueue::new(),
            cancelled: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            stats: StatsCounters::default(),
        }
    }

    pub(crate) fn ensure_alive(&self) {
        assert!(
            !self.disposed.load(Ordering::Acquire),
            "the resource service has been shut down"
        );
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Flags the service as cancelled. Returns `false` if it already was.
    pub(crate) fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    pub(crate) fn register_importer(&self, importer: Arc<dyn ResourceImporter>) {
        log::info!("Registered resource importer '{}'.", importer.name());
        self.importers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(importer);
    }

    fn importers(&self) -> Vec<Arc<dyn ResourceImporter>> {
        self.importers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn provider(&self) -> &dyn ResourceDataProvider {
        self.provider.as_ref()
    }

    // --- Handle table ---

    pub(crate) fn existing_handle(&self, key: &ResourceKey) -> Option<SharedResourceHandle> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns the handle of `key`, creating it from the provider's metadata on
    /// first use.
    pub(crate) fn handle(self: &Arc<Self>, key: &ResourceKey) -> Option<SharedResourceHandle> {
        if let Some(handle) = self.existing_handle(key) {
            return Some(handle);
        }
        let Some(data) = self.provider.resource_data(key) else {
            log::debug!("No resource data is known for '{key}'.");
            return None;
        };
        Some(self.insert_handle(&data).0)
    }

    /// Inserts a handle for `data` unless one exists. Returns the handle in the
    /// table and whether it was created by this call.
    fn insert_handle(self: &Arc<Self>, data: &ResourceData) -> (SharedResourceHandle, bool) {
        let created = self.factory.create_resource_handle(data);
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = handles.get(&data.key) {
            return (Arc::clone(existing), false);
        }
        created.core().bind(Arc::downgrade(self));
        handles.insert(data.key.clone(), Arc::clone(&created));
        (created, true)
    }

    pub(crate) fn discover(self: &Arc<Self>, discovered: &[ResourceData]) -> usize {
        let mut added = 0;
        for data in discovered {
            if self.existing_handle(&data.key).is_some() {
                continue;
            }
            if self.insert_handle(data).1 {
                added += 1;
            }
        }
        if added > 0 {
            log::debug!("Discovered {added} new resources.");
        }
        added
    }

    pub(crate) fn handle_count(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn remove_handle(&self, key: &ResourceKey) -> Option<SharedResourceHandle> {
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub(crate) fn take_all_handles(&self) -> Vec<SharedResourceHandle> {
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect()
    }

    /// Finds the table entry whose core is `core`.
    fn bound_handle(&self, core: &HandleCore) -> Option<SharedResourceHandle> {
        let handle = self
            .existing_handle(core.key())
            .filter(|handle| std::ptr::eq(handle.core(), core));
        if handle.is_none() {
            log::warn!(
                "Resource handle '{}' is no longer registered with its service.",
                core.key()
            );
        }
        handle
    }

    // --- Loading ---

    pub(crate) fn load_bound(
        &self,
        core: &HandleCore,
        immediate: bool,
        priority: Option<i32>,
    ) -> bool {
        self.bound_handle(core)
            .is_some_and(|handle| self.load(&handle, immediate, priority))
    }

    pub(crate) fn load_async_bound(&self, core: &HandleCore) -> LoadCompletion {
        match self.bound_handle(core) {
            Some(handle) => self.load_async(&handle),
            None => LoadCompletion::ready(false),
        }
    }

    pub(crate) fn load(
        &self,
        handle: &SharedResourceHandle,
        immediate: bool,
        priority: Option<i32>,
    ) -> bool {
        self.ensure_alive();
        if immediate {
            self.load_now(handle)
        } else {
            self.load_queued(handle, priority.unwrap_or(self.config.default_priority))
        }
    }

    fn load_now(&self, handle: &SharedResourceHandle) -> bool {
        let core = handle.core();
        match core.claim(handle, self.config.default_priority, |_| true) {
            Claim::Loaded => true,
            Claim::Unavailable => false,
            Claim::Claimed(load) => self.import_inline(&load),
            Claim::Pending(load) => {
                if self.queue.remove_exact(&load) {
                    log::debug!(
                        "Promoting queued load of '{}' to an immediate import.",
                        core.key()
                    );
                    return self.import_inline(&load);
                }
                let timeout = self.config.coalesce_timeout();
                if load.wait_timeout(timeout).is_none() {
                    log::warn!(
                        "Timed out after {timeout:?} waiting for the import of '{}'; it is still pending.",
                        core.key()
                    );
                }
                handle.is_loaded()
            }
        }
    }

    /// Claims the load of `handle` for the queue. The request is enqueued while
    /// the claim is held, so a `Pending` handle is always either queued or
    /// being imported.
    fn claim_queued(&self, handle: &SharedResourceHandle, priority: i32) -> Claim {
        let claim = handle.core().claim(handle, priority, |load| {
            let queued = self.queue.enqueue(Arc::clone(load));
            if !queued {
                log::warn!("A stale load of '{}' is still queued.", load.key());
            }
            queued
        });
        if let Claim::Claimed(load) = &claim {
            self.stats.queued();
            log::trace!("Queued '{}' with priority {}.", load.key(), load.priority());
        }
        claim
    }

    fn load_queued(&self, handle: &SharedResourceHandle, priority: i32) -> bool {
        !matches!(self.claim_queued(handle, priority), Claim::Unavailable)
    }

    pub(crate) fn load_async(&self, handle: &SharedResourceHandle) -> LoadCompletion {
        self.ensure_alive();
        match self.claim_queued(handle, self.config.default_priority) {
            Claim::Loaded => LoadCompletion::ready(true),
            Claim::Unavailable => LoadCompletion::ready(false),
            Claim::Pending(load) | Claim::Claimed(load) => load.completion(),
        }
    }

    /// Imports a load the caller owns on the calling thread.
    ///
    /// A panic anywhere in the import still settles the load as failed, so the
    /// handle never stays `Pending` without an owner.
    fn import_inline(&self, load: &ResourceLoadHandle) -> bool {
        self.stats.inline();
        match panic::catch_unwind(AssertUnwindSafe(|| self.import(load))) {
            Ok(loaded) => loaded,
            Err(payload) => {
                let message = dispatch::panic_message(payload.as_ref());
                log::error!(
                    "Recovered from a panic while importing '{}' inline: {message}",
                    load.key()
                );
                self.fail_with_panic(load, message);
                false
            }
        }
    }

    /// Runs the import for `load` on the calling thread and publishes the result.
    pub(crate) fn import(&self, load: &ResourceLoadHandle) -> bool {
        let outcome = dispatch::import(self.provider(), &self.importers(), load.key());
        let completion = load.finish(outcome);
        self.stats.imported(completion);
        completion.is_loaded()
    }

    /// Settles `load` as failed after its import panicked.
    pub(crate) fn fail_with_panic(&self, load: &ResourceLoadHandle, message: String) {
        let key = load.key().clone();
        let completion = load.finish(Err(ResourceError::ImporterPanicked { key, message }));
        self.stats.imported(completion);
    }

    // --- Abort ---

    pub(crate) fn abort_loading(&self, key: &ResourceKey) -> bool {
        self.queue
            .get_load_handle(key)
            .is_some_and(|load| self.abort_load(&load))
    }

    /// Aborts `load` if it is still queued. Returns `false` if it is already
    /// being imported, in which case the import runs to completion.
    pub(crate) fn abort_load(&self, load: &Arc<ResourceLoadHandle>) -> bool {
        if !self.queue.remove_exact(load) {
            return false;
        }
        self.abandon(load);
        self.stats.aborted();
        log::debug!("Aborted queued load of '{}'.", load.key());
        true
    }

    /// Returns the handle of a load taken off the queue to `NotLoaded` and
    /// resolves its awaiters as failed.
    pub(crate) fn abandon(&self, load: &ResourceLoadHandle) {
        load.handle().core().release(load);
        load.abort();
    }
}

impl std::fmt::Debug for ServiceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceShared")
            .field("config", &self.config)
            .field("handles", &self.handle_count())
            .field("queue", &self.queue)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
