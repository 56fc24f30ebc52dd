//! Noise Floor
//!
//! Benchmarks a fixed, trivially small task to see how much sd the machine
//! produces on its own. Results are cached per config so a batch of tasks
//! sharing a config pays for the probe once.

use crate::config::BenchmarkConfig;
use crate::stats::Stats;
use fxhash::FxHashMap;
use std::hint::black_box;
use std::sync::RwLock;

/// The probe task: a handful of dependent multiply-adds
#[inline(never)]
pub fn noise_probe() -> u64 {
    let mut acc = 0u64;
    for i in 0..16u64 {
        acc = acc.wrapping_mul(31).wrapping_add(black_box(i));
    }
    acc
}

/// Noise-floor block statistics keyed by the task config that requested them
#[derive(Debug, Default)]
pub struct NoiseFloorCache {
    entries: RwLock<FxHashMap<BenchmarkConfig, Stats>>,
}

impl NoiseFloorCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached noise floor for `config`
    pub fn get(&self, config: &BenchmarkConfig) -> Option<Stats> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(config).cloned()
    }

    /// Store `stats` unless another thread got there first; returns the
    /// cached value either way
    pub fn insert(&self, config: BenchmarkConfig, stats: Stats) -> Stats {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(config).or_insert(stats).clone()
    }

    /// Cached value for `config`, computing it with `compute` on a miss.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_try_insert_with<E>(
        &self,
        config: &BenchmarkConfig,
        compute: impl FnOnce() -> Result<Stats, E>,
    ) -> Result<Stats, E> {
        if let Some(stats) = self.get(config) {
            tracing::debug!("noise floor cache hit");
            return Ok(stats);
        }
        let stats = compute()?;
        Ok(self.insert(config.clone(), stats))
    }

    /// Number of cached configs
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached noise floor
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    fn stats(mean: f64) -> Stats {
        Stats::new(mean, mean, mean, 0.0, 0.0, 0.0, None).unwrap()
    }

    #[test]
    fn test_computes_once_per_config() {
        let cache = NoiseFloorCache::new();
        let config = BenchmarkConfig::quick();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_try_insert_with(&config, || {
                    calls.set(calls.get() + 1);
                    Ok::<_, ()>(stats(1.0))
                })
                .unwrap();
            assert_eq!(got.mean(), 1.0);
        }
        assert_eq!(calls.get(), 1);

        let other = config.clone().with_cpu_time(true);
        cache
            .get_or_try_insert_with(&other, || Ok::<_, ()>(stats(2.0)))
            .unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_compute_is_not_cached() {
        let cache = NoiseFloorCache::new();
        let config = BenchmarkConfig::quick();

        assert!(cache.get_or_try_insert_with(&config, || Err("boom")).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_first_insert_wins_across_threads() {
        let cache = Arc::new(NoiseFloorCache::new());
        let config = BenchmarkConfig::quick();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let config = config.clone();
                std::thread::spawn(move || cache.insert(config, stats(i as f64 + 1.0)).mean())
            })
            .collect();
        let seen: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winner = cache.get(&config).unwrap().mean();
        assert!(seen.iter().all(|&m| m == winner));
    }

    #[test]
    fn test_probe_is_deterministic() {
        assert_eq!(noise_probe(), noise_probe());
    }
}
