//! Registry of dynamically spawned agent threads.
//!
//! Cells spawn agents while the run is live, so the set of agent
//! threads grows from many threads at once. The registry collects their
//! join handles so shutdown can wait for every one of them.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Outcome of [`TaskRegistry::join_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct JoinCounts {
    pub joined: usize,
    pub panicked: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct TaskRegistry {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    reaped: Arc<AtomicUsize>,
    panicked: Arc<AtomicUsize>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a named thread and remember its handle.
    pub(crate) fn spawn<F>(&self, name: String, f: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name).spawn(f)?;
        let finished = {
            let mut handles = self.lock();
            let (done, live): (Vec<_>, Vec<_>) =
                handles.drain(..).partition(JoinHandle::is_finished);
            *handles = live;
            handles.push(handle);
            done
        };
        // Long runs spawn many short-lived agents; reap the finished ones.
        for h in finished {
            self.record(h.join().is_ok());
        }
        Ok(())
    }

    fn record(&self, ok: bool) {
        if ok {
            self.reaped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of handles still held.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Join every registered thread, including ones registered while
    /// joining.
    ///
    /// Counts include threads reaped earlier by [`spawn`](Self::spawn).
    pub(crate) fn join_all(&self) -> JoinCounts {
        loop {
            let batch: Vec<_> = self.lock().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            for handle in batch {
                self.record(handle.join().is_ok());
            }
        }
        let panicked = self.panicked.load(Ordering::Relaxed);
        JoinCounts {
            joined: self.reaped.load(Ordering::Relaxed) + panicked,
            panicked,
        }
    }
}
