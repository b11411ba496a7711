use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::barrier::CyclicBarrier;

/// Job as seen by a worker: called once with the worker's index
type Job = &'static (dyn Fn(usize) + Sync);

type PanicSlot = Arc<Mutex<Option<Box<dyn Any + Send>>>>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Fixed set of worker threads reused across ticks.
///
/// Every dispatch sends one job to each worker, then waits on a barrier shared
/// by the workers and the dispatching thread. The barrier is the only thing
/// that ends a dispatch, so borrowed data in the job outlives every use.
pub struct WorkerPool {
    senders: Vec<Sender<Message>>,
    handles: Vec<JoinHandle<()>>,
    barrier: Arc<CyclicBarrier>,
    panic: PanicSlot,
}

/// # Safety
/// The caller must not let the returned reference be used once `job`'s
/// borrow has ended.
unsafe fn erase_lifetime<'a>(job: &'a (dyn Fn(usize) + Sync + 'a)) -> Job {
    unsafe { std::mem::transmute::<&'a (dyn Fn(usize) + Sync + 'a), Job>(job) }
}

/// Waits on the pool barrier when dropped
struct RoundGuard<'a>(&'a CyclicBarrier);

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}

fn worker_loop(index: usize, jobs: Receiver<Message>, barrier: Arc<CyclicBarrier>, slot: PanicSlot) {
    while let Ok(Message::Run(job)) = jobs.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(index))) {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.get_or_insert(payload);
        }
        // Reached even after a panic, so the dispatcher is never stranded.
        barrier.wait();
    }
}

impl WorkerPool {
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let barrier = Arc::new(CyclicBarrier::new(workers + 1));
        let panic: PanicSlot = Arc::new(Mutex::new(None));

        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let (tx, rx) = crossbeam_channel::unbounded();
            let barrier = Arc::clone(&barrier);
            let slot = Arc::clone(&panic);
            let handle = thread::Builder::new()
                .name(format!("chamber-worker-{}", index))
                .spawn(move || worker_loop(index, rx, barrier, slot))?;
            senders.push(tx);
            handles.push(handle);
        }

        Ok(Self {
            senders,
            handles,
            barrier,
            panic,
        })
    }

    pub fn workers(&self) -> usize {
        self.senders.len()
    }

    /// Run `job(worker)` once on every worker and return when all are done.
    /// A panic in any worker is re-raised here after the round completes.
    pub fn dispatch(&mut self, job: &(dyn Fn(usize) + Sync)) {
        // Created before the job goes out: any exit from this scope, unwinding
        // included, first waits for every worker to finish the round.
        let round = RoundGuard(&self.barrier);
        // SAFETY: every worker finishes with the job before it reaches the
        // barrier, and `round` holds this frame until the barrier trips.
        let job = unsafe { erase_lifetime(job) };
        for tx in &self.senders {
            // Workers hold their receiver until Shutdown, which only Drop sends.
            tx.send(Message::Run(job)).ok();
        }
        drop(round);

        let payload = self
            .panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
    }

    /// Apply `f` to every item. Item `k` goes to worker `k % workers`.
    pub fn for_each_mut<T, F>(&mut self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        let workers = self.workers();
        let mut buckets: Vec<Vec<&mut T>> = (0..workers).map(|_| Vec::new()).collect();
        for (k, item) in items.iter_mut().enumerate() {
            buckets[k % workers].push(item);
        }
        // Each worker locks only its own bucket.
        let buckets: Vec<Mutex<Vec<&mut T>>> = buckets.into_iter().map(Mutex::new).collect();

        self.dispatch(&|worker| {
            let mut bucket = buckets[worker]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for item in bucket.iter_mut() {
                f(&mut **item);
            }
        });
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for tx in &self.senders {
            tx.send(Message::Shutdown).ok();
        }
        for handle in self.handles.drain(..) {
            handle.join().ok();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers())
            .finish()
    }
}
