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

//! Provides the foundational traits and primitive types for Vesta's resource system.
//!
//! This module defines the "common language" for every resource-related operation
//! in the engine. It contains the contracts that other crates implement or consume,
//! but it knows nothing about how or when resources are loaded.
//!
//! The key components are:
//! - The [`Resource`] trait: a marker for every type that can live behind a handle.
//! - [`ResourceKey`] and [`ResourceId`]: stable identifiers for a logical resource.
//! - [`ResourceData`]: the metadata describing where a resource lives and what it is.
//! - [`ResourceImporter`] and [`ResourceDataProvider`]: the pluggable services the
//!   loading core dispatches to.

mod data;
mod error;
mod importer;
mod index;
mod key;
mod state;
mod types;

pub use data::*;
pub use error::*;
pub use importer::*;
pub use index::*;
pub use key::*;
pub use state::*;
pub use types::*;

use std::any::Any;
use std::fmt;

/// A marker trait for types that can be held by a resource handle.
///
/// The supertraits enforce the guarantees background loading relies on:
/// - `Send` + `Sync`: the resource is produced on the loader thread and read
///   from arbitrary caller threads.
/// - `'static`: the resource owns all of its data.
///
/// Releasing a resource is tied to `Drop`. When the last handle or caller
/// reference goes away, the value is dropped deterministically.
///
/// # Examples
///
/// ```
/// use vesta_core::resource::Resource;
///
/// struct Shader {
///     source: String,
/// }
///
/// impl Resource for Shader {}
/// ```
pub trait Resource: Any + Send + Sync + 'static {}

impl Resource for String {}
impl Resource for Vec<u8> {}

/// The raw output of an importer, before it is matched against a handle's type.
pub type ImportedResource = Box<dyn Any + Send + Sync>;

/// A resource whose concrete type is not known to the handle that owns it.
///
/// Handles created for unregistered resource types hold their payload as an
/// `ErasedResource`, so the pipeline keeps working with a degraded, untyped view.
pub struct ErasedResource(ImportedResource);

impl ErasedResource {
    /// Wraps an imported value.
    pub fn new(inner: ImportedResource) -> Self {
        Self(inner)
    }

    /// Returns a reference to the inner value if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns `true` if the inner value is of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for ErasedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErasedResource(..)")
    }
}

impl Resource for ErasedResource {}
