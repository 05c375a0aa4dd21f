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

use super::{ResourceId, ResourceKey, ResourceType, DEFAULT_SUB_TYPE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the bytes of a resource can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceLocation {
    /// A file on disk (or any path the importer understands).
    Path(PathBuf),
    /// A slice of a pack file.
    Packed {
        /// Byte offset from the start of the pack.
        offset: u64,
        /// Length of the resource in bytes.
        size: u64,
    },
}

/// Serializable metadata describing a single resource.
///
/// This is the "identity card" the loading core works from: it names the
/// resource, says what kind of object it becomes, which importer format it is
/// stored in, and where its bytes live. It never contains the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// The unique key of the resource.
    pub key: ResourceKey,
    /// Identifies the storage format (e.g. `"png"`, `"gltf"`, `"wgsl"`).
    pub format_key: String,
    /// The broad category of the resource.
    pub resource_type: ResourceType,
    /// A refinement of the type; `0` is the type-wide default.
    #[serde(default)]
    pub sub_type: i32,
    /// Where the resource's bytes live.
    pub location: ResourceLocation,
}

impl ResourceData {
    /// Creates metadata with the default sub-type.
    pub fn new(
        key: impl Into<ResourceKey>,
        format_key: impl Into<String>,
        resource_type: ResourceType,
        location: ResourceLocation,
    ) -> Self {
        Self {
            key: key.into(),
            format_key: format_key.into(),
            resource_type,
            sub_type: DEFAULT_SUB_TYPE,
            location,
        }
    }

    /// Sets the sub-type.
    pub fn with_sub_type(mut self, sub_type: i32) -> Self {
        self.sub_type = sub_type;
        self
    }

    /// The derived numeric id of the resource.
    pub fn id(&self) -> ResourceId {
        ResourceId::derive(&self.key, self.resource_type)
    }
}
