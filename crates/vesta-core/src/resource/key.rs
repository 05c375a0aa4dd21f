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

use super::ResourceType;
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt, sync::Arc};
use uuid::Uuid;

/// The globally unique, immutable name of a logical resource.
///
/// Keys are cheap to clone (the string is shared) and are the identity of a
/// resource handle: two handles with the same key refer to the same resource.
///
/// A key can never be blank. Constructing one from an empty or whitespace-only
/// string is a programmer error and panics; use [`ResourceKey::try_new`] when the
/// input comes from untrusted data.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(Arc<str>);

impl ResourceKey {
    /// Creates a key from a non-blank string.
    ///
    /// # Panics
    /// Panics if `key` is empty or only contains whitespace.
    pub fn new(key: impl Into<String>) -> Self {
        match Self::try_new(key) {
            Some(key) => key,
            None => panic!("resource keys must not be blank"),
        }
    }

    /// Creates a key, returning `None` if `key` is blank.
    pub fn try_new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(Arc::from(key)))
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = BlankKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or(BlankKeyError)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0.to_string()
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for ResourceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({:?})", &*self.0)
    }
}

/// Returned when a blank string is deserialized or converted into a [`ResourceKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankKeyError;

impl fmt::Display for BlankKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("resource keys must not be blank")
    }
}

impl std::error::Error for BlankKeyError {}

/// A compact numeric identifier derived from a resource's key and type.
///
/// The value is the folded form of a name-based (version 5) UUID, so the same
/// key and type always produce the same id across runs and machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Derives the id of a resource from its key and type.
    pub fn derive(key: &ResourceKey, resource_type: ResourceType) -> Self {
        let name = format!("{}:{}", resource_type.tag(), key.as_str());
        let (high, low) = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).as_u64_pair();
        Self(high ^ low)
    }

    /// Returns the raw value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_compare_by_content() {
        let a = ResourceKey::new("textures/stone.png");
        let b = ResourceKey::from("textures/stone.png");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "textures/stone.png");
    }

    #[test]
    #[should_panic(expected = "must not be blank")]
    fn test_blank_key_panics() {
        let _ = ResourceKey::new("   ");
    }

    #[test]
    fn test_try_new_rejects_blank_keys() {
        assert!(ResourceKey::try_new("").is_none());
        assert!(ResourceKey::try_new("\t").is_none());
        assert!(ResourceKey::try_new("a").is_some());
    }

    #[test]
    fn test_id_is_stable_and_type_dependent() {
        let key = ResourceKey::new("shaders/lit.wgsl");
        let first = ResourceId::derive(&key, ResourceType::Shader);
        let second = ResourceId::derive(&key, ResourceType::Shader);
        let other = ResourceId::derive(&key, ResourceType::Text);

        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
