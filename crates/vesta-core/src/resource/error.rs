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

use super::{ResourceKey, ResourceType};
use std::error::Error as StdError;
use thiserror::Error;

/// A specialized `Result` type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// An operational failure of the resource pipeline.
///
/// These are expected at runtime (missing files, unsupported formats, broken
/// data) and are reported, never panicked on. Programmer errors such as blank
/// keys are not represented here.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No metadata is known for the key.
    #[error("no resource data is registered for '{0}'")]
    NotFound(ResourceKey),

    /// No registered importer accepts the resource's format and type.
    #[error("no importer supports format '{format_key}' for {resource_type}/{sub_type} ('{key}')")]
    NoImporter {
        /// The resource being imported.
        key: ResourceKey,
        /// Its storage format.
        format_key: String,
        /// Its type.
        resource_type: ResourceType,
        /// Its sub-type.
        sub_type: i32,
    },

    /// The importer reported a failure.
    #[error("importer '{importer}' failed to import '{key}': {source}")]
    ImportFailed {
        /// The resource being imported.
        key: ResourceKey,
        /// The name of the importer.
        importer: String,
        /// The importer's error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The importer panicked; the panic was contained.
    #[error("importer panicked while importing '{key}': {message}")]
    ImporterPanicked {
        /// The resource being imported.
        key: ResourceKey,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The importer produced an object of a different type than the handle holds.
    #[error("'{key}' was imported as a different type than {expected}")]
    TypeMismatch {
        /// The resource being imported.
        key: ResourceKey,
        /// The type name the handle expected.
        expected: &'static str,
    },

    /// A resource index could not be decoded.
    #[error("failed to decode resource index: {0}")]
    InvalidIndex(#[from] bincode::error::DecodeError),

    /// The background loader thread could not be started.
    #[error("failed to spawn the resource loader thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}
