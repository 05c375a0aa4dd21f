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

//! The priority queue of pending loads.

use crate::{load_handle::ResourceLoadHandle, lock};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use vesta_core::resource::ResourceKey;

/// Pending loads ordered by ascending priority, ties served in arrival order.
///
/// Besides the ordering, the queue keeps an index from resource key to the
/// queued [`ResourceLoadHandle`] so membership checks and removal by resource
/// are O(1). Both structures live behind one lock. Removal only touches the
/// index; the heap entry goes stale and is skipped when it reaches the top.
#[derive(Default)]
pub struct ResourceLoadQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

#[derive(Default)]
struct QueueInner {
    heap: BinaryHeap<QueueEntry>,
    index: HashMap<ResourceKey, Arc<ResourceLoadHandle>>,
    next_sequence: u64,
}

struct QueueEntry {
    priority: i32,
    sequence: u64,
    load: Arc<ResourceLoadHandle>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // `BinaryHeap` is a max-heap: the smallest priority, then the oldest entry,
    // must compare greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl QueueInner {
    fn is_live(&self, entry: &QueueEntry) -> bool {
        self.index
            .get(entry.load.key())
            .is_some_and(|queued| Arc::ptr_eq(queued, &entry.load))
    }

    fn pop(&mut self) -> Option<Arc<ResourceLoadHandle>> {
        while let Some(entry) = self.heap.pop() {
            if self.is_live(&entry) {
                self.index.remove(entry.load.key());
                return Some(entry.load);
            }
        }
        None
    }

    fn compact_if_sparse(&mut self) {
        if self.heap.len() > self.index.len() * 2 + 32 {
            let heap = std::mem::take(&mut self.heap);
            self.heap = heap
                .into_iter()
                .filter(|entry| self.is_live(entry))
                .collect();
        }
    }
}

impl ResourceLoadQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `load`. Returns `false` if a load for the same resource is already queued.
    pub fn enqueue(&self, load: Arc<ResourceLoadHandle>) -> bool {
        let mut inner = lock(&self.inner);
        if inner.index.contains_key(load.key()) {
            return false;
        }
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.index.insert(load.key().clone(), Arc::clone(&load));
        inner.heap.push(QueueEntry {
            priority: load.priority(),
            sequence,
            load,
        });
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Takes the next load, or `None` if the queue is empty.
    pub fn try_dequeue(&self) -> Option<Arc<ResourceLoadHandle>> {
        lock(&self.inner).pop()
    }

    /// Takes the next load, blocking for up to `timeout` while the queue is empty.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Arc<ResourceLoadHandle>> {
        let mut inner = lock(&self.inner);
        if inner.index.is_empty() {
            inner = self
                .available
                .wait_timeout_while(inner, timeout, |inner| inner.index.is_empty())
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        inner.pop()
    }

    /// Returns `true` if a load for `key` is queued.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        lock(&self.inner).index.contains_key(key)
    }

    /// The queued load for `key`, if any.
    pub fn get_load_handle(&self, key: &ResourceKey) -> Option<Arc<ResourceLoadHandle>> {
        lock(&self.inner).index.get(key).cloned()
    }

    /// Removes and returns the queued load for `key`.
    pub fn remove(&self, key: &ResourceKey) -> Option<Arc<ResourceLoadHandle>> {
        let mut inner = lock(&self.inner);
        let removed = inner.index.remove(key);
        if removed.is_some() {
            inner.compact_if_sparse();
        }
        removed
    }

    /// Removes `load` if it is the load queued for its resource.
    pub(crate) fn remove_exact(&self, load: &Arc<ResourceLoadHandle>) -> bool {
        let mut inner = lock(&self.inner);
        let queued = inner
            .index
            .get(load.key())
            .is_some_and(|queued| Arc::ptr_eq(queued, load));
        if queued {
            inner.index.remove(load.key());
            inner.compact_if_sparse();
        }
        queued
    }

    /// The number of queued loads.
    pub fn len(&self) -> usize {
        lock(&self.inner).index.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the queue, returning the loads in the order they would have run.
    pub fn drain(&self) -> Vec<Arc<ResourceLoadHandle>> {
        let mut inner = lock(&self.inner);
        let mut drained = Vec::with_capacity(inner.index.len());
        while let Some(load) = inner.pop() {
            drained.push(load);
        }
        inner.heap.clear();
        drained
    }

    /// Wakes every thread blocked in [`dequeue_timeout`](Self::dequeue_timeout).
    pub(crate) fn wake_all(&self) {
        self.available.notify_all();
    }
}

impl std::fmt::Debug for ResourceLoadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoadQueue")
            .field("len", &self.len())
            .finish()
    }
}
