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

use std::fmt;

/// The loading lifecycle of a resource handle.
///
/// A handle moves `NotLoaded → Pending → Loaded | FailedToLoad`. Unloading takes a
/// `Loaded` handle back to `NotLoaded`; `FailedToLoad` is sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadingState {
    /// No resource is held and no load is outstanding.
    #[default]
    NotLoaded,
    /// A load has been claimed and is queued or being imported.
    Pending,
    /// The resource is available.
    Loaded,
    /// The import failed; no further attempts are made for this handle.
    FailedToLoad,
}

impl LoadingState {
    /// Returns `true` once a load attempt has resolved.
    pub fn is_resolved(self) -> bool {
        matches!(self, LoadingState::Loaded | LoadingState::FailedToLoad)
    }
}

impl fmt::Display for LoadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadingState::NotLoaded => "not loaded",
            LoadingState::Pending => "pending",
            LoadingState::Loaded => "loaded",
            LoadingState::FailedToLoad => "failed to load",
        };
        f.write_str(name)
    }
}
