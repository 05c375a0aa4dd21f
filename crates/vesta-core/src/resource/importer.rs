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

use super::{ImportedResource, ResourceData, ResourceKey, ResourceOperation, ResourceType, TypeSupport};
use std::error::Error;

/// A service that turns resource metadata into an in-memory object.
///
/// This is the "data plane" of resource loading. Importers do the potentially
/// expensive work of reading and decoding bytes; the loading core only decides
/// which importer to call and when. Importers may be invoked concurrently from
/// several threads (the background loader and callers requesting immediate
/// loads), so they must be `Send + Sync`.
pub trait ResourceImporter: Send + Sync {
    /// A human-readable name used in logs.
    fn name(&self) -> &str;

    /// Returns `true` if the importer understands `format_key` for `operation`.
    fn is_format_key_supported(&self, format_key: &str, operation: ResourceOperation) -> bool;

    /// Reports how well the importer supports a type and sub-type.
    fn is_resource_type_supported(&self, resource_type: ResourceType, sub_type: i32)
        -> TypeSupport;

    /// Imports the resource described by `data`.
    ///
    /// # Returns
    /// The imported object on success, or a thread-safe error describing why the
    /// import failed.
    fn import_resource_data(
        &self,
        data: &ResourceData,
    ) -> Result<ImportedResource, Box<dyn Error + Send + Sync>>;
}

/// The source of truth for resource metadata.
///
/// The loading core asks the provider which file backs a key; how that
/// information is discovered is up to the implementation.
pub trait ResourceDataProvider: Send + Sync {
    /// Returns the metadata of `key`, if known.
    fn resource_data(&self, key: &ResourceKey) -> Option<ResourceData>;

    /// Returns the metadata of every known resource.
    fn all_resource_data(&self) -> Vec<ResourceData>;
}
