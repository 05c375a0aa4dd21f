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

//! The resource service: handle table, load entry points and the loader thread.

mod dispatch;
mod shared;
mod stats;
mod worker;

pub(crate) use shared::ServiceShared;
pub use stats::ResourceServiceStats;

use crate::config::ResourceServiceConfig;
use crate::factory::ResourceHandleFactory;
use crate::handle::{ResourceHandle, SharedResourceHandle};
use crate::load_handle::LoadCompletion;
use crate::lock;
use std::sync::{Arc, Mutex};
use vesta_core::resource::{
    Resource, ResourceData, ResourceDataProvider, ResourceImporter, ResourceKey, ResourceResult,
};
use worker::WorkerHandle;

/// Orchestrates resource loading.
///
/// The service owns the table of every known [`ResourceHandle`] (one per key),
/// the [`ResourceLoadQueue`](crate::ResourceLoadQueue) and a single background
/// thread that imports queued loads serially, lowest priority value first.
///
/// There are three ways to load:
/// - [`load(key, true)`](Self::load) imports on the calling thread and returns
///   once the resource is loaded or the import failed.
/// - [`load(key, false)`](Self::load) and [`load_with_priority`](Self::load_with_priority)
///   queue the load and return as soon as it is queued.
/// - [`load_async`](Self::load_async) queues the load and returns a
///   [`LoadCompletion`] that resolves when the import finishes.
///
/// At most one load exists per handle at any time. Concurrent requests for a
/// pending handle attach to the existing load instead of starting another one;
/// an immediate request for a queued load takes it off the queue and imports it
/// inline.
///
/// Operational failures (unknown key, no importer, importer error) are logged
/// and reported as `false`. Using the service after [`shutdown`](Self::shutdown)
/// is a programmer error and panics.
pub struct ResourceService {
    shared: Arc<ServiceShared>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl ResourceService {
    /// Creates a service. The loader thread is not running until [`start`](Self::start).
    pub fn new(
        config: ResourceServiceConfig,
        provider: Arc<dyn ResourceDataProvider>,
        factory: ResourceHandleFactory,
    ) -> Self {
        Self {
            shared: Arc::new(ServiceShared::new(config, provider, factory)),
            worker: Mutex::new(None),
        }
    }

    /// Starts the background loader thread. Does nothing if it is already running.
    ///
    /// # Errors
    /// Returns [`ResourceError::WorkerSpawn`](vesta_core::resource::ResourceError::WorkerSpawn)
    /// if the thread cannot be spawned.
    pub fn start(&self) -> ResourceResult<()> {
        self.shared.ensure_alive();
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            log::debug!("Resource loader thread is already running.");
            return Ok(());
        }
        *worker = Some(WorkerHandle::spawn(Arc::clone(&self.shared))?);
        Ok(())
    }

    /// Returns `true` while the loader thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some() && !self.shared.is_cancelled()
    }

    /// The configuration the service was created with.
    pub fn config(&self) -> &ResourceServiceConfig {
        &self.shared.config
    }

    /// Adds an importer. Importers registered earlier win ties.
    pub fn register_importer(&self, importer: Arc<dyn ResourceImporter>) {
        self.shared.ensure_alive();
        self.shared.register_importer(importer);
    }

    /// Creates handles for newly discovered resources. Keys that already have a
    /// handle are left untouched. Returns the number of handles created.
    pub fn on_resource_data_discovered(&self, data: &[ResourceData]) -> usize {
        self.shared.ensure_alive();
        self.shared.discover(data)
    }

    /// Creates handles for every resource the provider knows.
    pub fn discover_all(&self) -> usize {
        self.shared.ensure_alive();
        let data = self.shared.provider().all_resource_data();
        self.shared.discover(&data)
    }

    /// Returns the handle of `key`, creating it on first use.
    ///
    /// Repeated calls return the same handle. Returns `None` if the provider
    /// has no data for `key`.
    pub fn get_handle(&self, key: &ResourceKey) -> Option<SharedResourceHandle> {
        self.shared.ensure_alive();
        self.shared.handle(key)
    }

    /// Returns the handle of `key` if it holds a `T`.
    pub fn get_typed<T: Resource>(&self, key: &ResourceKey) -> Option<Arc<ResourceHandle<T>>> {
        let handle = self.get_handle(key)?;
        let payload = handle.payload_type_name();
        match handle.into_any_arc().downcast::<ResourceHandle<T>>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                log::warn!(
                    "Resource '{key}' holds {payload}, not {}.",
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Returns `true` if a handle for `key` exists. Never creates one.
    pub fn contains_handle(&self, key: &ResourceKey) -> bool {
        self.shared.existing_handle(key).is_some()
    }

    /// The number of handles in the table.
    pub fn handle_count(&self) -> usize {
        self.shared.handle_count()
    }

    /// Loads `key`, on the calling thread if `immediate` is set, otherwise by
    /// queueing it at the default priority.
    ///
    /// Returns `true` if the resource is loaded or, for a queued load, was
    /// queued (or already pending).
    pub fn load(&self, key: &ResourceKey, immediate: bool) -> bool {
        match self.get_handle(key) {
            Some(handle) => self.shared.load(&handle, immediate, None),
            None => {
                log::error!("Cannot load '{key}': the resource is unknown.");
                false
            }
        }
    }

    /// Queues the load of `key` with an explicit priority. Lower is served first.
    pub fn load_with_priority(&self, key: &ResourceKey, priority: i32) -> bool {
        match self.get_handle(key) {
            Some(handle) => self.shared.load(&handle, false, Some(priority)),
            None => {
                log::error!("Cannot load '{key}': the resource is unknown.");
                false
            }
        }
    }

    /// Queues the load of `key` and returns a completion that resolves once the
    /// import has finished.
    pub fn load_async(&self, key: &ResourceKey) -> LoadCompletion {
        match self.get_handle(key) {
            Some(handle) => self.shared.load_async(&handle),
            None => {
                log::error!("Cannot load '{key}': the resource is unknown.");
                LoadCompletion::ready(false)
            }
        }
    }

    /// Loads `key` on the calling thread if necessary and returns the resource.
    pub fn get_or_load_immediately<T: Resource>(&self, key: &ResourceKey) -> Option<Arc<T>> {
        self.get_typed::<T>(key)?.get_or_load_immediately()
    }

    /// Unloads `key`. Returns `false` if there is no handle for it.
    pub fn unload(&self, key: &ResourceKey) -> bool {
        match self.shared.existing_handle(key) {
            Some(handle) => {
                handle.unload();
                true
            }
            None => false,
        }
    }

    /// Removes the queued load of `key`, returning its handle to `NotLoaded`.
    ///
    /// Returns `false` if nothing is queued for `key`. An import that is
    /// already running is not interrupted.
    pub fn abort_loading(&self, key: &ResourceKey) -> bool {
        self.shared.abort_loading(key)
    }

    /// Returns `true` if a load for `key` is waiting in the queue.
    pub fn is_queued(&self, key: &ResourceKey) -> bool {
        self.shared.queue.contains(key)
    }

    /// The number of loads waiting in the queue.
    pub fn queued_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Disposes the handle of `key` and removes it from the table.
    ///
    /// The next [`get_handle`](Self::get_handle) creates a fresh handle.
    pub fn dispose_handle(&self, key: &ResourceKey) -> bool {
        match self.shared.remove_handle(key) {
            Some(handle) => {
                handle.dispose();
                true
            }
            None => false,
        }
    }

    /// A snapshot of the service's counters.
    pub fn stats(&self) -> ResourceServiceStats {
        self.shared.stats.snapshot()
    }

    /// Stops the service.
    ///
    /// Queued loads are aborted, the loader thread is given
    /// `shutdown_timeout_ms` to exit and every handle is disposed. A loader
    /// thread that is still importing after the timeout is detached and exits
    /// once that import finishes. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if !self.shared.cancel() {
            return;
        }
        log::info!("Shutting down resource service.");

        let drained = self.shared.queue.drain();
        for load in &drained {
            self.shared.abandon(load);
            self.shared.stats.aborted();
        }
        if !drained.is_empty() {
            log::debug!("Aborted {} queued loads.", drained.len());
        }
        self.shared.queue.wake_all();

        if let Some(worker) = lock(&self.worker).take() {
            worker.stop(self.shared.config.shutdown_timeout());
        }

        for handle in self.shared.take_all_handles() {
            handle.dispose();
        }
        self.shared.mark_disposed();
    }
}

impl Drop for ResourceService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("shared", &self.shared)
            .field("running", &self.is_running())
            .finish()
    }
}
