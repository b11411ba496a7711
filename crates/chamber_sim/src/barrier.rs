use std::sync::{Condvar, Mutex, PoisonError};

/// Reusable rendezvous for a fixed number of threads.
///
/// The generation counter is bumped each time the barrier trips, so a thread
/// that wakes late (or spuriously) can tell its round has already completed
/// even if other threads have started waiting on the next one.
#[derive(Debug)]
pub struct CyclicBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

#[derive(Debug, Default)]
struct BarrierState {
    waiting: usize,
    generation: u64,
}

impl CyclicBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until `parties` threads have called `wait` in this round.
    /// Returns true for exactly one thread per round: the one that arrived last.
    pub fn wait(&self) -> bool {
        // The counters stay consistent even if a holder panicked.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = state.generation;
        state.waiting += 1;
        if state.waiting == self.parties {
            state.waiting = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return true;
        }
        while state.generation == generation {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_single_party_never_blocks() {
        let barrier = CyclicBarrier::new(1);
        assert!(barrier.wait());
        assert!(barrier.wait());
        assert_eq!(CyclicBarrier::new(0).parties(), 1);
    }

    #[test]
    fn test_one_leader_per_round_and_no_overtaking() {
        let parties = 4;
        let rounds = 200;
        let barrier = Arc::new(CyclicBarrier::new(parties));
        let arrived = Arc::new(AtomicUsize::new(0));
        let leaders = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..parties)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let arrived = Arc::clone(&arrived);
                let leaders = Arc::clone(&leaders);
                thread::spawn(move || {
                    for round in 0..rounds {
                        arrived.fetch_add(1, Ordering::SeqCst);
                        if barrier.wait() {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                        // Nobody leaves a round before everyone has entered it.
                        assert!(arrived.load(Ordering::SeqCst) >= (round + 1) * parties);
                        barrier.wait();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(leaders.load(Ordering::SeqCst), rounds);
        assert_eq!(arrived.load(Ordering::SeqCst), rounds * parties);
    }
}
