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

//! # Vesta Resources
//!
//! The asynchronous resource-loading core of the engine.
//!
//! Callers obtain a [`ResourceHandle`] from the [`ResourceService`] and ask it to
//! load. The service either imports the resource inline on the calling thread or
//! queues a [`ResourceLoadHandle`] on the [`ResourceLoadQueue`], which a single
//! background thread drains in priority order. Import work is dispatched to the
//! registered [`ResourceImporter`](vesta_core::resource::ResourceImporter)s, and
//! the typed handle a resource lives behind is chosen by the
//! [`ResourceHandleFactory`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use vesta_core::resource::{ResourceIndex, ResourceType};
//! use vesta_resources::{
//!     ResourceHandleFactory, ResourceService, ResourceServiceConfig, UntypedResourceHandle,
//! };
//!
//! let factory = ResourceHandleFactory::new();
//! factory.register::<String>(ResourceType::Text, 0);
//!
//! let index = Arc::new(ResourceIndex::new());
//! let service = ResourceService::new(ResourceServiceConfig::default(), index, factory);
//! service.start().expect("loader thread");
//!
//! if let Some(handle) = service.get_typed::<String>(&"docs/readme".into()) {
//!     handle.load(false);
//! }
//! ```

#![warn(missing_docs)]

mod config;
mod factory;
mod handle;
mod load_handle;
mod queue;
mod service;

pub use config::{ConfigError, ResourceServiceConfig};
pub use factory::{HandleConstructor, ResourceHandleFactory};
pub use handle::{HandleCore, ResourceHandle, SharedResourceHandle, UntypedResourceHandle};
pub use load_handle::{LoadCompletion, ResourceLoadHandle};
pub use queue::ResourceLoadQueue;
pub use service::{ResourceService, ResourceServiceStats};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// Importer panics are contained on the loader thread, so a poisoned lock only
/// means an unrelated thread unwound while holding it; the protected data is
/// always left in a consistent state between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
