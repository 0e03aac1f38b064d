//! Worker pool shared by leaf generation and layer reduction.
//!
//! Every phase of the build is a fixed number of independent tasks, one per output
//! slot. `WorkerPool::try_fill` hands each task exclusive ownership of its slot in a
//! pre-sized buffer, so the writes need no lock; the parallel call returning is the
//! barrier between phases.
use crate::errors::Error;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_enabled", serde(default))]
pub struct BuildConfig {
    /// Number of worker threads. `0` uses one worker per available processing unit.
    pub threads: usize,
}

impl BuildConfig {
    /// Configuration running every task on a single worker.
    pub fn single_threaded() -> Self {
        BuildConfig { threads: 1 }
    }

    /// Configuration with an explicit number of workers.
    pub fn with_threads(threads: usize) -> Self {
        BuildConfig { threads }
    }
}

/// Bounded pool of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Start the workers described by `config`.
    ///
    /// # Errors
    /// Returns `Error::WorkerPool` if the threads cannot be spawned.
    pub fn new(config: &BuildConfig) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("ots-merkle-{}", i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        Ok(WorkerPool { pool })
    }

    /// Number of workers in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task(i)` for every `i` in `0..len` and collect the results in index order.
    ///
    /// Once a task fails, tasks for higher indices are skipped; tasks already
    /// running finish and their results are dropped. The error returned is the one
    /// of the lowest failing index, whatever order the workers ran in.
    pub fn try_fill<T, E, F>(&self, len: usize, task: F) -> Result<Vec<T>, E>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync,
    {
        let lowest_failure = AtomicUsize::new(usize::MAX);
        let mut slots: Vec<Option<Result<T, E>>> = Vec::with_capacity(len);
        slots.resize_with(len, || None);

        self.pool.install(|| {
            slots.par_iter_mut().enumerate().for_each(|(i, slot)| {
                if i > lowest_failure.load(Ordering::Acquire) {
                    return;
                }
                let result = task(i);
                if result.is_err() {
                    lowest_failure.fetch_min(i, Ordering::AcqRel);
                }
                *slot = Some(result);
            })
        });

        // Every slot below the lowest failure was filled: skipping only ever
        // happens above a failing index, and that bound only decreases.
        let out = slots
            .into_iter()
            .map_while(|slot| slot)
            .collect::<Result<Vec<T>, E>>()?;
        debug_assert_eq!(out.len(), len);
        Ok(out)
    }
}
