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

use serde::{Deserialize, Serialize};
use std::fmt;

/// The sub-type used as the default, type-wide entry.
pub const DEFAULT_SUB_TYPE: i32 = 0;

/// The broad category of a resource.
///
/// Together with an integer sub-type, the resource type selects the handle
/// constructor and the importer used for a resource. `Unknown` is reserved: no
/// handle can be registered or created for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Reserved marker for resources whose type could not be determined.
    Unknown,
    /// Images and other sampled data.
    Texture,
    /// Shader source or bytecode.
    Shader,
    /// Meshes and scene hierarchies.
    Model,
    /// Material definitions.
    Material,
    /// Sound clips and streams.
    Audio,
    /// Font faces.
    Font,
    /// Plain text documents.
    Text,
    /// Raw binary blobs.
    Binary,
    /// A project-defined category.
    Custom(u32),
}

impl ResourceType {
    /// Returns `true` for the reserved [`ResourceType::Unknown`].
    pub fn is_unknown(self) -> bool {
        matches!(self, ResourceType::Unknown)
    }

    /// A short, stable textual tag for the type.
    pub fn tag(self) -> String {
        match self {
            ResourceType::Unknown => "unknown".to_string(),
            ResourceType::Texture => "texture".to_string(),
            ResourceType::Shader => "shader".to_string(),
            ResourceType::Model => "model".to_string(),
            ResourceType::Material => "material".to_string(),
            ResourceType::Audio => "audio".to_string(),
            ResourceType::Font => "font".to_string(),
            ResourceType::Text => "text".to_string(),
            ResourceType::Binary => "binary".to_string(),
            ResourceType::Custom(id) => format!("custom{id}"),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// How well an importer supports a given type and sub-type.
///
/// Variants are ordered by strength, so `SubType > Type > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeSupport {
    /// The importer cannot produce this resource.
    None,
    /// The importer handles the resource type generically.
    Type,
    /// The importer explicitly supports the exact sub-type.
    SubType,
}

/// The operation an importer is queried about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Turning stored data into an in-memory object.
    Import,
    /// Writing an in-memory object back to storage.
    Export,
}
