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

//! Resource handles.
//!
//! A handle is the stateful reference to one logical resource. Its identity is
//! its [`ResourceKey`]; its loading lifecycle is
//! `NotLoaded -> Pending -> {Loaded | FailedToLoad}`, with `unload` returning a
//! loaded handle to `NotLoaded` and `FailedToLoad` being final.

mod core;
mod typed;

pub use self::core::HandleCore;
pub(crate) use self::core::{Claim, Completion, Unload};
pub use typed::ResourceHandle;

use crate::load_handle::{LoadCompletion, ResourceLoadHandle};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use vesta_core::resource::{
    ImportedResource, LoadingState, ResourceId, ResourceKey, ResourceResult, ResourceType,
};

/// A handle shared between the service table, the queue and callers.
pub type SharedResourceHandle = Arc<dyn UntypedResourceHandle>;

/// The payload-agnostic face of a [`ResourceHandle`].
///
/// The service, the queue and the factory only ever see handles through this
/// trait. Everything except the payload conversion is provided on top of the
/// [`HandleCore`].
pub trait UntypedResourceHandle: Send + Sync + fmt::Debug {
    /// The shared identity and state.
    fn core(&self) -> &HandleCore;

    /// The Rust type name of the payload this handle holds.
    fn payload_type_name(&self) -> &'static str;

    /// Converts what an importer produced into this handle's payload.
    ///
    /// # Errors
    /// Returns [`ResourceError::TypeMismatch`](vesta_core::resource::ResourceError::TypeMismatch)
    /// if the import is not of the payload type.
    fn accept_import(
        &self,
        imported: ImportedResource,
    ) -> ResourceResult<Arc<dyn Any + Send + Sync>>;

    /// Upcasts to `Any` for downcasting to the concrete handle type.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts a shared handle for downcasting to the concrete handle type.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// The key of the resource.
    fn key(&self) -> &ResourceKey {
        self.core().key()
    }

    /// The id of the resource.
    fn id(&self) -> ResourceId {
        self.core().id()
    }

    /// The resource type.
    fn resource_type(&self) -> ResourceType {
        self.core().resource_type()
    }

    /// The resource sub-type.
    fn sub_type(&self) -> i32 {
        self.core().sub_type()
    }

    /// The current loading state.
    fn loading_state(&self) -> LoadingState {
        self.core().loading_state()
    }

    /// Returns `true` if the resource is available.
    fn is_loaded(&self) -> bool {
        self.core().is_loaded()
    }

    /// Returns `true` once the handle has been disposed.
    fn is_disposed(&self) -> bool {
        self.core().is_disposed()
    }

    /// Loads the resource.
    ///
    /// With `immediate` set the import runs on the calling thread (or the call
    /// waits for the import already running) and `true` means the resource is
    /// loaded. Otherwise the load is queued for the background thread and `true`
    /// only means the request is queued; check [`is_loaded`](Self::is_loaded).
    ///
    /// Returns `false` if the handle is disposed, failed to load before, or is
    /// not attached to a service.
    fn load(&self, immediate: bool) -> bool {
        let core = self.core();
        if core.is_loaded() {
            return true;
        }
        if core.is_disposed() {
            return false;
        }
        match core.service() {
            Some(service) => service.load_bound(core, immediate, None),
            None => {
                log::error!(
                    "Cannot load '{}': the handle is not attached to a resource service.",
                    core.key()
                );
                false
            }
        }
    }

    /// Queues the load and returns a completion that resolves when the import
    /// finishes, successfully or not.
    fn load_async(&self) -> LoadCompletion {
        let core = self.core();
        if core.is_loaded() {
            return LoadCompletion::ready(true);
        }
        match core.service() {
            Some(service) => service.load_async_bound(core),
            None => LoadCompletion::ready(false),
        }
    }

    /// Drops the resource and returns the handle to `NotLoaded`.
    ///
    /// A load that is still queued is aborted instead. An import that is already
    /// running is not interrupted.
    fn unload(&self) {
        let core = self.core();
        match core.take_for_unload() {
            Unload::Released(payload) => {
                log::debug!("Unloaded resource '{}'.", core.key());
                drop(payload);
            }
            Unload::Pending(load) => abort_pending(core, &load),
            Unload::Nothing => {}
        }
    }

    /// Disposes the handle. A disposed handle never loads again.
    fn dispose(&self) {
        let core = self.core();
        let Some((payload, pending)) = core.take_for_dispose() else {
            return;
        };
        drop(payload);
        if let Some(load) = pending {
            abort_pending(core, &load);
        }
        log::trace!("Disposed resource handle '{}'.", core.key());
    }
}

fn abort_pending(core: &HandleCore, load: &Arc<ResourceLoadHandle>) {
    match core.service() {
        Some(service) => {
            if !service.abort_load(load) {
                log::debug!(
                    "Load of '{}' is already importing and will run to completion.",
                    core.key()
                );
            }
        }
        None => {
            if core.release(load) {
                load.abort();
            }
        }
    }
}

impl PartialEq for dyn UntypedResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for dyn UntypedResourceHandle {}
