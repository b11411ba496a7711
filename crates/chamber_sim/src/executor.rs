use bevy::log::warn;
use chamber_core::Parallelism;
use rayon::prelude::*;

use crate::pool::WorkerPool;

/// Runs a per-shard closure under one of the three threading strategies.
///
/// All strategies see the same shards and callers merge shard results in
/// shard order, so the outcome does not depend on the strategy.
#[derive(Debug)]
pub enum Executor {
    Sequential,
    DataParallel(rayon::ThreadPool),
    WorkerPool(WorkerPool),
}

impl Executor {
    /// Build the requested strategy with `workers` threads, falling back to
    /// sequential execution if the threads cannot be created.
    pub fn new(parallelism: Parallelism, workers: usize) -> Self {
        match parallelism {
            Parallelism::Sequential => Self::Sequential,
            Parallelism::DataParallel => match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("chamber-rayon-{}", i))
                .build()
            {
                Ok(pool) => Self::DataParallel(pool),
                Err(e) => {
                    warn!("Rayon pool unavailable ({}), running sequentially", e);
                    Self::Sequential
                }
            },
            Parallelism::WorkerPool => match WorkerPool::new(workers) {
                Ok(pool) => Self::WorkerPool(pool),
                Err(e) => {
                    warn!("Worker pool unavailable ({}), running sequentially", e);
                    Self::Sequential
                }
            },
        }
    }

    pub fn parallelism(&self) -> Parallelism {
        match self {
            Self::Sequential => Parallelism::Sequential,
            Self::DataParallel(_) => Parallelism::DataParallel,
            Self::WorkerPool(_) => Parallelism::WorkerPool,
        }
    }

    /// Apply `f` to every item; returns once all items are done.
    pub fn for_each_mut<T, F>(&mut self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        match self {
            Self::Sequential => items.iter_mut().for_each(f),
            Self::DataParallel(pool) => pool.install(|| items.par_iter_mut().for_each(f)),
            Self::WorkerPool(pool) => pool.for_each_mut(items, f),
        }
    }
}
