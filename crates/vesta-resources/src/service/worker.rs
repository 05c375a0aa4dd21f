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

//! The background loader thread.

use super::{dispatch::panic_message, shared::ServiceShared};
use crate::load_handle::ResourceLoadHandle;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sends on drop, so the owner learns the thread has exited even if it unwound.
struct ExitSignal(flume::Sender<()>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

/// The owner's side of the loader thread.
pub(crate) struct WorkerHandle {
    thread: JoinHandle<()>,
    exited: flume::Receiver<()>,
}

impl WorkerHandle {
    /// Starts the loader thread.
    pub(crate) fn spawn(shared: Arc<ServiceShared>) -> std::io::Result<Self> {
        let (exit_tx, exited) = flume::bounded(1);
        let thread = thread::Builder::new()
            .name(shared.config.worker_thread_name.clone())
            .spawn(move || {
                let _signal = ExitSignal(exit_tx);
                run(&shared);
            })?;
        Ok(Self { thread, exited })
    }

    /// Waits up to `timeout` for the thread to exit, then joins it.
    ///
    /// If the thread is still busy with an import when the timeout elapses it is
    /// detached: it finishes that import, publishes the result and exits on its
    /// own. Returns `true` if the thread was joined.
    pub(crate) fn stop(self, timeout: Duration) -> bool {
        if self.thread.thread().id() == thread::current().id() {
            log::warn!("Resource service shut down from its own loader thread; not joining it.");
            return false;
        }
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    log::error!("Resource loader thread terminated with a panic.");
                }
                true
            }
            Err(flume::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Resource loader thread did not stop within {timeout:?}; detaching it. \
                     It exits after its current import."
                );
                false
            }
        }
    }
}

fn run(shared: &ServiceShared) {
    log::info!("Resource loader thread started.");
    let idle = shared.config.idle_wait();
    while !shared.is_cancelled() {
        let Some(load) = shared.queue.dequeue_timeout(idle) else {
            continue;
        };
        if shared.is_cancelled() {
            shared.abandon(&load);
            break;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| shared.import(&load))) {
            recover(shared, &load, panic_message(payload.as_ref()));
        }
    }
    log::info!("Resource loader thread stopped.");
}

fn recover(shared: &ServiceShared, load: &ResourceLoadHandle, message: String) {
    log::error!(
        "Resource loader thread recovered from a panic while loading '{}': {message}",
        load.key()
    );
    shared.stats.worker_fault();
    shared.fail_with_panic(load, message);
}
