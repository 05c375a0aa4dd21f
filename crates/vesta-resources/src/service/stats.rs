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

use crate::handle::Completion;
use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of the service's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceServiceStats {
    /// Loads handed to the background queue.
    pub requests_queued: u64,
    /// Imports that produced a resource.
    pub imports_succeeded: u64,
    /// Imports that failed, including type mismatches and panics.
    pub imports_failed: u64,
    /// Imports whose result was dropped because the handle was disposed or the
    /// load no longer owned it.
    pub results_discarded: u64,
    /// Imports run on a caller thread instead of the loader thread.
    pub inline_imports: u64,
    /// Queued loads removed before they were imported.
    pub aborted: u64,
    /// Panics caught on the loader thread.
    pub worker_faults: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    requests_queued: AtomicU64,
    imports_succeeded: AtomicU64,
    imports_failed: AtomicU64,
    results_discarded: AtomicU64,
    inline_imports: AtomicU64,
    aborted: AtomicU64,
    worker_faults: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn queued(&self) {
        self.requests_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn imported(&self, completion: Completion) {
        let counter = match completion {
            Completion::Loaded => &self.imports_succeeded,
            Completion::Failed => &self.imports_failed,
            Completion::Discarded => &self.results_discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inline(&self) {
        self.inline_imports.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_fault(&self) {
        self.worker_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ResourceServiceStats {
        ResourceServiceStats {
            requests_queued: self.requests_queued.load(Ordering::Relaxed),
            imports_succeeded: self.imports_succeeded.load(Ordering::Relaxed),
            imports_failed: self.imports_failed.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
            inline_imports: self.inline_imports.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            worker_faults: self.worker_faults.load(Ordering::Relaxed),
        }
    }
}
