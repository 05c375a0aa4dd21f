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

//! An in-memory resource metadata index.
//!
//! [`ResourceIndex`] is the default [`ResourceDataProvider`]: it holds the
//! metadata of every known resource in a hash map for O(1) lookups, can be
//! decoded from a packed binary index, and accepts newly discovered entries at
//! runtime.

use super::{ResourceData, ResourceDataProvider, ResourceError, ResourceKey};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// The runtime representation of a resource index.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    entries: RwLock<HashMap<ResourceKey, ResourceData>>,
}

impl ResourceIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a list of entries. Later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = ResourceData>) -> Self {
        let entries = entries
            .into_iter()
            .map(|data| (data.key.clone(), data))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Decodes an index from the raw bytes of a packed index file.
    ///
    /// # Errors
    /// Returns [`ResourceError::InvalidIndex`] if the bytes are not a valid,
    /// bincode-encoded list of [`ResourceData`].
    pub fn from_bincode(bytes: &[u8]) -> Result<Self, ResourceError> {
        let config = bincode::config::standard();
        let (entries, _): (Vec<ResourceData>, _) =
            bincode::serde::decode_from_slice(bytes, config)?;
        log::debug!("Decoded resource index with {} entries.", entries.len());
        Ok(Self::from_entries(entries))
    }

    /// Inserts or replaces an entry. Returns `true` if the key was not known before.
    pub fn insert(&self, data: ResourceData) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(data.key.clone(), data)
            .is_none()
    }

    /// Returns `true` if the index knows `key`.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceDataProvider for ResourceIndex {
    fn resource_data(&self, key: &ResourceKey) -> Option<ResourceData> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn all_resource_data(&self) -> Vec<ResourceData> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
