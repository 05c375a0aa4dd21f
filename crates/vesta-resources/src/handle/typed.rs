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

use super::{HandleCore, SharedResourceHandle, UntypedResourceHandle};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use vesta_core::resource::{
    ErasedResource, ImportedResource, Resource, ResourceData, ResourceError, ResourceResult,
};

/// A typed handle to a resource of type `T`.
///
/// The resource is only present while the handle is `Loaded`, and is handed out
/// as an `Arc<T>` so callers can keep using it after an unload.
pub struct ResourceHandle<T: Resource> {
    core: HandleCore,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceHandle<T> {
    /// Creates a `NotLoaded` handle for `data`.
    pub fn new(data: &ResourceData) -> Self {
        Self {
            core: HandleCore::new(data),
            _marker: PhantomData,
        }
    }

    /// Creates a handle behind the shared, untyped pointer the service stores.
    pub fn shared(data: &ResourceData) -> SharedResourceHandle {
        Arc::new(Self::new(data))
    }

    /// The resource, if loaded.
    pub fn resource(&self) -> Option<Arc<T>> {
        self.core
            .payload()
            .and_then(|payload| payload.downcast::<T>().ok())
    }

    /// Loads the resource on the calling thread if necessary and returns it.
    pub fn get_or_load_immediately(&self) -> Option<Arc<T>> {
        if self.load(true) {
            self.resource()
        } else {
            None
        }
    }

    /// Returns `true` if `resource` is the very instance this handle holds.
    pub fn is_same_resource(&self, resource: &Arc<T>) -> bool {
        self.resource()
            .is_some_and(|current| Arc::ptr_eq(&current, resource))
    }
}

impl<T: Resource> UntypedResourceHandle for ResourceHandle<T> {
    fn core(&self) -> &HandleCore {
        &self.core
    }

    fn payload_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn accept_import(
        &self,
        imported: ImportedResource,
    ) -> ResourceResult<Arc<dyn Any + Send + Sync>> {
        let imported: ImportedResource = if TypeId::of::<T>() == TypeId::of::<ErasedResource>()
            && !imported.is::<ErasedResource>()
        {
            Box::new(ErasedResource::new(imported))
        } else {
            imported
        };
        match imported.downcast::<T>() {
            Ok(resource) => {
                let resource: Arc<T> = Arc::from(resource);
                Ok(resource)
            }
            Err(_) => Err(ResourceError::TypeMismatch {
                key: self.core.key().clone(),
                expected: type_name::<T>(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T: Resource> PartialEq for ResourceHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.core.key() == other.core.key()
    }
}

impl<T: Resource> Eq for ResourceHandle<T> {}

impl<T: Resource> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("payload", &type_name::<T>())
            .field("core", &self.core)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Claim, Completion};
    use vesta_core::resource::{LoadingState, ResourceLocation, ResourceType};

    fn data(key: &str) -> ResourceData {
        ResourceData::new(
            key,
            "txt",
            ResourceType::Text,
            ResourceLocation::Path(key.into()),
        )
    }

    fn claim(handle: &Arc<ResourceHandle<String>>) -> Arc<crate::ResourceLoadHandle> {
        let shared: SharedResourceHandle = handle.clone();
        match handle.core().claim(&shared, 5, |_| true) {
            Claim::Claimed(load) => load,
            _ => panic!("expected to claim the load"),
        }
    }

    #[test]
    fn test_finished_load_publishes_the_resource() {
        let handle = Arc::new(ResourceHandle::<String>::new(&data("greeting")));
        let load = claim(&handle);
        assert_eq!(handle.loading_state(), LoadingState::Pending);

        assert_eq!(load.finish(Ok(Box::new("hello".to_string()))), Completion::Loaded);

        assert!(handle.is_loaded());
        assert_eq!(handle.resource().as_deref().map(String::as_str), Some("hello"));
        let resource = handle.resource().unwrap();
        assert!(handle.is_same_resource(&resource));
        assert!(!handle.is_same_resource(&Arc::new("hello".to_string())));
    }

    #[test]
    fn test_wrong_payload_type_fails_the_load() {
        let handle = Arc::new(ResourceHandle::<String>::new(&data("numbers")));
        let load = claim(&handle);

        assert_eq!(load.finish(Ok(Box::new(42_u32))), Completion::Failed);

        assert_eq!(handle.loading_state(), LoadingState::FailedToLoad);
        assert!(handle.resource().is_none());
    }

    #[test]
    fn test_erased_handle_accepts_any_payload() {
        let handle = ResourceHandle::<ErasedResource>::new(&data("anything"));
        let payload = handle.accept_import(Box::new(7_u64)).unwrap();
        let erased = payload.downcast::<ErasedResource>().unwrap();
        assert_eq!(erased.downcast_ref::<u64>(), Some(&7));
    }

    #[test]
    fn test_unload_drops_the_resource() {
        let handle = Arc::new(ResourceHandle::<String>::new(&data("a")));
        claim(&handle).finish(Ok(Box::new("a".to_string())));

        handle.unload();

        assert_eq!(handle.loading_state(), LoadingState::NotLoaded);
        assert!(handle.resource().is_none());
    }

    #[test]
    fn test_unload_of_an_unattached_pending_handle_aborts_it() {
        let handle = Arc::new(ResourceHandle::<String>::new(&data("b")));
        let load = claim(&handle);
        let completion = load.completion();

        handle.unload();

        assert_eq!(handle.loading_state(), LoadingState::NotLoaded);
        assert!(!completion.wait());
    }

    #[test]
    fn test_disposed_handle_is_terminal() {
        let handle = Arc::new(ResourceHandle::<String>::new(&data("c")));
        claim(&handle).finish(Ok(Box::new("c".to_string())));

        handle.dispose();

        assert!(handle.is_disposed());
        assert!(!handle.is_loaded());
        assert!(handle.resource().is_none());
        assert!(!handle.load(true));
    }

    #[test]
    fn test_unattached_handle_cannot_load() {
        let handle = ResourceHandle::<String>::new(&data("d"));
        assert!(!handle.load(false));
        assert!(handle.get_or_load_immediately().is_none());
        assert_eq!(handle.load_async().try_result(), Some(false));
    }

    #[test]
    fn test_handles_compare_by_key() {
        let a = ResourceHandle::<String>::new(&data("same"));
        let b = ResourceHandle::<String>::new(&data("same"));
        let c = ResourceHandle::<String>::new(&data("other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
