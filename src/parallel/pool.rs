//! Rayon thread pool configuration for scoring candidate teams.
//!
//! Scoring is CPU-bound and each candidate is independent, so large candidate sets can be
//! spread across cores. Results are collected in input order either way.

use rayon::ThreadPoolBuilder;

/// Configures how many worker threads score candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use the global Rayon pool (all cores).
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Run `f` on a pool with this worker count. If a dedicated pool cannot be built, `f` runs
    /// on the global pool instead.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return f();
        }
        match ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(f),
            Err(err) => {
                tracing::warn!(workers = self.workers, %err, "falling back to global rayon pool");
                f()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::WorkerPool;

    #[test]
    fn install_preserves_result_order() {
        let pool = WorkerPool::with_workers(2);
        let squares: Vec<u64> = pool.install(|| (0..100u64).into_par_iter().map(|x| x * x).collect());
        assert_eq!(squares[10], 100);
        assert_eq!(squares.len(), 100);
    }
}
