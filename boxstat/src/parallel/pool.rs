//! Fixed-size worker pool for bulk parallel-for passes

use std::ops::AddAssign;

use anyhow::Result;
use log::debug;
use num::Zero;

use crate::error::invalid_argument;

use super::{IndexRange, ThreadStorage};

/// Default number of workers: one per available hardware thread
pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Dedicated thread pool owned by one analysis instance.
///
/// Every pass blocks the calling thread until all workers are done.
pub struct WorkerPool {
    thread_pool: rayon::ThreadPool,
    num_workers: usize,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(invalid_argument!("Worker pool requires at least one worker"));
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build()?;
        debug!("Created worker pool with {} threads", num_workers);
        Ok(Self { thread_pool, num_workers })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Split `0..n` into one contiguous chunk per partition of `storage` and run `f`
    /// on every chunk together with the buffer of its partition.
    ///
    /// Each spawned task owns its partition exclusively, partitions without a chunk
    /// stay unallocated. Returns once all tasks are done.
    pub fn for_each_partition<T, F>(&self, n: usize, storage: &mut ThreadStorage<T>, f: F)
        where T: Copy + Zero + AddAssign + Send,
              F: Fn(IndexRange, &mut [T]) + Sync
    {
        let chunks = IndexRange::new(0, n).split(storage.num_partitions());
        let work = chunks.into_iter()
            .zip(storage.partitions_mut())
            .collect::<Vec<_>>();
        let f = &f;
        self.thread_pool.scope(|s| {
            for (chunk, mut partition) in work {
                s.spawn(move |_| f(chunk, partition.buffer()));
            }
        });
    }

    /// Run `op` inside the pool (parallel iterators used by `op` run on these workers)
    pub fn install<OP, R>(&self, op: OP) -> R
        where OP: FnOnce() -> R + Send, R: Send
    {
        self.thread_pool.install(op)
    }
}
