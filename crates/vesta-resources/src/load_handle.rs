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

//! The ticket of a single load attempt.

use crate::handle::{Completion, SharedResourceHandle};
use crate::lock;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vesta_core::resource::{ImportedResource, LoadingState, ResourceKey, ResourceResult};

/// One in-flight (or queued) load request for a resource handle.
///
/// A load handle is created when a caller claims the load of a `NotLoaded`
/// handle, and lives until the import has finished and its result has been
/// published to the resource handle and to every awaiter. A new attempt after an
/// unload creates a new load handle; at most one exists per resource handle at
/// any time.
pub struct ResourceLoadHandle {
    handle: SharedResourceHandle,
    priority: i32,
    state: Mutex<LoadTicket>,
}

struct LoadTicket {
    loading: LoadingState,
    waiters: Vec<flume::Sender<bool>>,
}

impl ResourceLoadHandle {
    pub(crate) fn new(handle: SharedResourceHandle, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            handle,
            priority,
            state: Mutex::new(LoadTicket {
                loading: LoadingState::Pending,
                waiters: Vec::new(),
            }),
        })
    }

    /// The resource handle this load is for.
    pub fn handle(&self) -> &SharedResourceHandle {
        &self.handle
    }

    /// The key of the resource being loaded.
    pub fn key(&self) -> &ResourceKey {
        self.handle.key()
    }

    /// The queue priority. Lower values are served first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// `Pending` until the attempt resolves, then `Loaded` or `FailedToLoad`.
    pub fn loading_state(&self) -> LoadingState {
        lock(&self.state).loading
    }

    /// Returns a completion that resolves when this attempt does.
    pub fn completion(&self) -> LoadCompletion {
        let mut ticket = lock(&self.state);
        if ticket.loading.is_resolved() {
            return LoadCompletion::ready(ticket.loading == LoadingState::Loaded);
        }
        let (sender, receiver) = flume::bounded(1);
        ticket.waiters.push(sender);
        LoadCompletion { receiver }
    }

    /// Blocks until the attempt resolves or `timeout` elapses.
    ///
    /// Returns `None` on timeout, otherwise whether the resource was loaded.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        self.completion().wait_timeout(timeout)
    }

    /// Publishes the outcome of the import.
    ///
    /// A successful import is handed to the resource handle, which checks it
    /// against its payload type and stores it. The result is visible to every
    /// thread once this returns. Awaiters see `true` only if the resource is
    /// now loaded.
    pub(crate) fn finish(&self, outcome: ResourceResult<ImportedResource>) -> Completion {
        let key = self.key();
        let payload = outcome.and_then(|imported| self.handle.accept_import(imported));
        if let Err(e) = &payload {
            log::error!("Failed to load resource '{key}': {e}");
        }
        let completion = self.handle.core().complete(self, payload);
        self.resolve(if completion.is_loaded() {
            LoadingState::Loaded
        } else {
            LoadingState::FailedToLoad
        });
        completion
    }

    /// Resolves the attempt as failed without touching the resource handle.
    pub(crate) fn abort(&self) {
        self.resolve(LoadingState::FailedToLoad);
    }

    fn resolve(&self, outcome: LoadingState) {
        let waiters = {
            let mut ticket = lock(&self.state);
            if ticket.loading.is_resolved() {
                return;
            }
            ticket.loading = outcome;
            std::mem::take(&mut ticket.waiters)
        };
        let loaded = outcome == LoadingState::Loaded;
        for waiter in waiters {
            // The awaiter may have given up; that is fine.
            let _ = waiter.send(loaded);
        }
    }
}

impl std::fmt::Debug for ResourceLoadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoadHandle")
            .field("key", self.key())
            .field("priority", &self.priority)
            .field("state", &self.loading_state())
            .finish()
    }
}

/// Resolves when a load attempt finishes.
///
/// A completion can be waited on synchronously ([`wait`](Self::wait),
/// [`wait_timeout`](Self::wait_timeout)) or awaited:
///
/// ```no_run
/// # async fn demo(handle: vesta_resources::SharedResourceHandle) {
/// let loaded: bool = handle.load_async().await;
/// # }
/// ```
///
/// The output is `true` if the resource was loaded, `false` if the import failed
/// or the load was aborted.
#[derive(Debug)]
pub struct LoadCompletion {
    receiver: flume::Receiver<bool>,
}

impl LoadCompletion {
    /// A completion that has already resolved.
    pub(crate) fn ready(loaded: bool) -> Self {
        let (sender, receiver) = flume::bounded(1);
        let _ = sender.send(loaded);
        Self { receiver }
    }

    /// Returns the result if the attempt has already resolved.
    pub fn try_result(&self) -> Option<bool> {
        self.receiver.try_recv().ok()
    }

    /// Blocks the current thread until the attempt resolves.
    pub fn wait(self) -> bool {
        self.receiver.recv().unwrap_or(false)
    }

    /// Blocks until the attempt resolves or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        match self.receiver.recv_timeout(timeout) {
            Ok(loaded) => Some(loaded),
            Err(flume::RecvTimeoutError::Timeout) => None,
            Err(flume::RecvTimeoutError::Disconnected) => Some(false),
        }
    }
}

impl IntoFuture for LoadCompletion {
    type Output = bool;
    type IntoFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.receiver.into_recv_async().await.unwrap_or(false) })
    }
}
