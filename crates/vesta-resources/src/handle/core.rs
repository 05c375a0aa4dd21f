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

use crate::{load_handle::ResourceLoadHandle, lock, service::ServiceShared};
use std::any::Any;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use vesta_core::resource::{
    LoadingState, ResourceData, ResourceId, ResourceKey, ResourceResult, ResourceType,
};

use super::SharedResourceHandle;

pub(crate) type ErasedPayload = Arc<dyn Any + Send + Sync>;

/// The identity and loading state shared by every kind of resource handle.
///
/// All state transitions happen under one lock, and the resource itself is
/// published under that same lock, so a thread that observes `Loaded` always
/// observes the resource too.
pub struct HandleCore {
    key: ResourceKey,
    id: ResourceId,
    resource_type: ResourceType,
    sub_type: i32,
    state: Mutex<CoreState>,
    service: OnceLock<Weak<ServiceShared>>,
}

#[derive(Default)]
struct CoreState {
    loading: LoadingState,
    disposed: bool,
    payload: Option<ErasedPayload>,
    pending: Option<Arc<ResourceLoadHandle>>,
}

/// The result of trying to claim the load of a handle.
pub(crate) enum Claim {
    /// Nothing to do, the resource is available.
    Loaded,
    /// The handle is disposed or failed; it cannot be loaded.
    Unavailable,
    /// Someone else owns the outstanding load.
    Pending(Arc<ResourceLoadHandle>),
    /// The caller now owns the load.
    Claimed(Arc<ResourceLoadHandle>),
}

/// What became of a finished import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// The resource was published and the handle is `Loaded`.
    Loaded,
    /// The handle is now `FailedToLoad`.
    Failed,
    /// The load no longer owned the handle, or the handle was disposed; the
    /// result was dropped.
    Discarded,
}

impl Completion {
    pub(crate) fn is_loaded(self) -> bool {
        self == Completion::Loaded
    }
}

/// What an unload left behind for the caller to finish outside the lock.
pub(crate) enum Unload {
    Nothing,
    Released(ErasedPayload),
    Pending(Arc<ResourceLoadHandle>),
}

impl HandleCore {
    /// Creates the core of a handle for `data`, in the `NotLoaded` state.
    pub fn new(data: &ResourceData) -> Self {
        Self {
            key: data.key.clone(),
            id: data.id(),
            resource_type: data.resource_type,
            sub_type: data.sub_type,
            state: Mutex::new(CoreState::default()),
            service: OnceLock::new(),
        }
    }

    /// The key of the resource.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The id derived from the key and type.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The resource type.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// The resource sub-type.
    pub fn sub_type(&self) -> i32 {
        self.sub_type
    }

    /// The current loading state.
    pub fn loading_state(&self) -> LoadingState {
        lock(&self.state).loading
    }

    /// Returns `true` once the handle has been disposed.
    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }

    /// Returns `true` if the resource is loaded and the handle not disposed.
    pub fn is_loaded(&self) -> bool {
        let state = lock(&self.state);
        state.loading == LoadingState::Loaded && !state.disposed
    }

    pub(crate) fn payload(&self) -> Option<ErasedPayload> {
        let state = lock(&self.state);
        if state.disposed {
            return None;
        }
        state.payload.clone()
    }

    pub(crate) fn bind(&self, service: Weak<ServiceShared>) {
        if self.service.set(service).is_err() {
            log::warn!(
                "Resource handle '{}' is already attached to a resource service.",
                self.key
            );
        }
    }

    pub(crate) fn service(&self) -> Option<Arc<ServiceShared>> {
        self.service.get().and_then(Weak::upgrade)
    }

    /// Claims the load of the handle if it is `NotLoaded`.
    ///
    /// `on_claimed` runs under the state lock with the new load handle; if it
    /// returns `false` the claim is abandoned. This is the only way a handle
    /// enters `Pending`, which makes it the single point enforcing that at most
    /// one load exists per handle.
    pub(crate) fn claim(
        &self,
        owner: &SharedResourceHandle,
        priority: i32,
        on_claimed: impl FnOnce(&Arc<ResourceLoadHandle>) -> bool,
    ) -> Claim {
        let mut state = lock(&self.state);
        if state.disposed {
            return Claim::Unavailable;
        }
        match state.loading {
            LoadingState::Loaded => Claim::Loaded,
            LoadingState::FailedToLoad => Claim::Unavailable,
            LoadingState::Pending => match &state.pending {
                Some(load) => Claim::Pending(Arc::clone(load)),
                None => Claim::Unavailable,
            },
            LoadingState::NotLoaded => {
                let load = ResourceLoadHandle::new(Arc::clone(owner), priority);
                if !on_claimed(&load) {
                    return Claim::Unavailable;
                }
                state.loading = LoadingState::Pending;
                state.pending = Some(Arc::clone(&load));
                Claim::Claimed(load)
            }
        }
    }

    /// Records the outcome of `load`.
    ///
    /// Outcomes of loads that no longer own the handle (aborted, or the handle
    /// was disposed meanwhile) are dropped.
    pub(crate) fn complete(
        &self,
        load: &ResourceLoadHandle,
        outcome: ResourceResult<ErasedPayload>,
    ) -> Completion {
        let mut state = lock(&self.state);
        let owns = state
            .pending
            .as_ref()
            .is_some_and(|pending| std::ptr::eq(pending.as_ref(), load));
        if !owns {
            log::debug!("Discarding the result of a stale load of '{}'.", self.key);
            return Completion::Discarded;
        }
        state.pending = None;
        if state.disposed {
            state.loading = LoadingState::NotLoaded;
            return Completion::Discarded;
        }
        match outcome {
            Ok(payload) => {
                state.payload = Some(payload);
                state.loading = LoadingState::Loaded;
                Completion::Loaded
            }
            Err(_) => {
                state.loading = LoadingState::FailedToLoad;
                Completion::Failed
            }
        }
    }

    /// Returns the handle to `NotLoaded` if `load` is its outstanding load.
    pub(crate) fn release(&self, load: &ResourceLoadHandle) -> bool {
        let mut state = lock(&self.state);
        let owns = state
            .pending
            .as_ref()
            .is_some_and(|pending| std::ptr::eq(pending.as_ref(), load));
        if owns {
            state.pending = None;
            if state.loading == LoadingState::Pending {
                state.loading = LoadingState::NotLoaded;
            }
        }
        owns
    }

    pub(crate) fn take_for_unload(&self) -> Unload {
        let mut state = lock(&self.state);
        match state.loading {
            LoadingState::Loaded => {
                state.loading = LoadingState::NotLoaded;
                state.payload.take().map_or(Unload::Nothing, Unload::Released)
            }
            LoadingState::Pending => state
                .pending
                .clone()
                .map_or(Unload::Nothing, Unload::Pending),
            LoadingState::NotLoaded | LoadingState::FailedToLoad => Unload::Nothing,
        }
    }

    /// Marks the handle disposed. Returns the payload and outstanding load, if any.
    pub(crate) fn take_for_dispose(
        &self,
    ) -> Option<(Option<ErasedPayload>, Option<Arc<ResourceLoadHandle>>)> {
        let mut state = lock(&self.state);
        if state.disposed {
            return None;
        }
        state.disposed = true;
        if state.loading == LoadingState::Loaded {
            state.loading = LoadingState::NotLoaded;
        }
        Some((state.payload.take(), state.pending.clone()))
    }
}

impl std::fmt::Debug for HandleCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("HandleCore")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("resource_type", &self.resource_type)
            .field("sub_type", &self.sub_type)
            .field("loading", &state.loading)
            .field("disposed", &state.disposed)
            .finish()
    }
}
