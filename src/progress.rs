//! Out-of-band progress counter, per Design Note "Progress reporting".
//! The core only increments it; a printing collaborator (the CLI) polls
//! it. The core itself never logs progress.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ProgressCounter {
    done: AtomicU64,
    total: AtomicU64,
}

impl ProgressCounter {
    pub fn new(total: u64) -> Self {
        ProgressCounter {
            done: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    pub fn increment(&self, n: u64) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64) {
        (self.done.load(Ordering::Relaxed), self.total.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate() {
        let counter = ProgressCounter::new(10);
        counter.increment(3);
        counter.increment(4);
        assert_eq!(counter.snapshot(), (7, 10));
    }
}
