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

//! A registry translating resource metadata into typed handles.

use crate::handle::{ResourceHandle, SharedResourceHandle};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use vesta_core::resource::{
    ErasedResource, Resource, ResourceData, ResourceType, DEFAULT_SUB_TYPE,
};

/// Builds the handle for one resource.
pub type HandleConstructor = Arc<dyn Fn(&ResourceData) -> SharedResourceHandle + Send + Sync>;

/// Maps `(ResourceType, sub-type)` to the constructor of the handle a resource
/// of that kind lives behind.
///
/// All type-specific construction is registered once at startup; the loading
/// core only ever asks the factory for "a handle for this data".
#[derive(Default)]
pub struct ResourceHandleFactory {
    constructors: RwLock<HashMap<(ResourceType, i32), HandleConstructor>>,
}

impl ResourceHandleFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` for `(resource_type, sub_type)`.
    ///
    /// Returns `false` without registering if the type is
    /// [`ResourceType::Unknown`], the sub-type is negative, or an entry exists
    /// and `override_existing` is not set.
    pub fn register_resource_type(
        &self,
        resource_type: ResourceType,
        sub_type: i32,
        constructor: HandleConstructor,
        override_existing: bool,
    ) -> bool {
        if resource_type.is_unknown() {
            log::error!("Cannot register a handle constructor for the unknown resource type.");
            return false;
        }
        if sub_type < 0 {
            log::error!("Cannot register {resource_type} with negative sub-type {sub_type}.");
            return false;
        }
        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = (resource_type, sub_type);
        if constructors.contains_key(&slot) && !override_existing {
            log::warn!("A handle constructor for {resource_type}/{sub_type} is already registered.");
            return false;
        }
        constructors.insert(slot, constructor);
        log::debug!("Registered handle constructor for {resource_type}/{sub_type}.");
        true
    }

    /// Registers [`ResourceHandle<T>`] for `(resource_type, sub_type)`.
    pub fn register<T: Resource>(&self, resource_type: ResourceType, sub_type: i32) -> bool {
        self.register_resource_type(
            resource_type,
            sub_type,
            Arc::new(|data: &ResourceData| ResourceHandle::<T>::shared(data)),
            false,
        )
    }

    /// Returns `true` if a constructor is registered for exactly this slot.
    #[must_use]
    pub fn is_registered(&self, resource_type: ResourceType, sub_type: i32) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(resource_type, sub_type))
    }

    /// Creates the handle for `data`.
    ///
    /// Falls back to the type's default sub-type, then to an untyped
    /// [`ErasedResource`] handle.
    ///
    /// # Panics
    /// Panics if `data` has [`ResourceType::Unknown`].
    pub fn create_resource_handle(&self, data: &ResourceData) -> SharedResourceHandle {
        assert!(
            !data.resource_type.is_unknown(),
            "cannot create a handle for '{}': its resource type is unknown",
            data.key
        );
        let constructor = {
            let constructors = self
                .constructors
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            constructors
                .get(&(data.resource_type, data.sub_type))
                .or_else(|| constructors.get(&(data.resource_type, DEFAULT_SUB_TYPE)))
                .cloned()
        };
        match constructor {
            Some(constructor) => constructor(data),
            None => {
                log::warn!(
                    "No handle registered for {}/{}; '{}' gets an untyped handle.",
                    data.resource_type,
                    data.sub_type,
                    data.key
                );
                ResourceHandle::<ErasedResource>::shared(data)
            }
        }
    }
}

impl std::fmt::Debug for ResourceHandleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let constructors = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut slots: Vec<_> = constructors.keys().collect();
        slots.sort();
        f.debug_struct("ResourceHandleFactory")
            .field("registered", &slots)
            .finish()
    }
}
