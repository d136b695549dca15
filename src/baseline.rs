use std::collections::VecDeque;

use dashmap::DashMap;

use crate::types::{Baseline, CollectionStats};

/// Supplies the "normal" recent behaviour a collection is compared against.
/// Always returns a value.
pub trait BaselineProvider: Send + Sync {
    fn baseline(&self, current: &CollectionStats) -> Baseline;

    /// Feed an observed snapshot back so later baselines can include it.
    fn record(&self, _stats: &CollectionStats) {}
}

/// Averages the last `window` snapshots observed for each collection.
/// A never-seen collection gets its own current stats as baseline.
pub struct RollingBaselineProvider {
    window: usize,
    /// collection slug → most recent samples, oldest first
    samples: DashMap<String, VecDeque<Baseline>>,
}

impl RollingBaselineProvider {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: DashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn sample_count(&self, collection: &str) -> usize {
        self.samples.get(collection).map(|s| s.len()).unwrap_or(0)
    }
}

impl BaselineProvider for RollingBaselineProvider {
    fn baseline(&self, current: &CollectionStats) -> Baseline {
        let Some(samples) = self.samples.get(&current.collection) else {
            return Baseline::from_stats(current);
        };
        if samples.is_empty() {
            return Baseline::from_stats(current);
        }

        let n = samples.len() as f64;
        let (volume, floor, sales) = samples.iter().fold((0.0, 0.0, 0.0), |acc, s| {
            (acc.0 + s.avg_volume, acc.1 + s.avg_floor_price, acc.2 + s.avg_sales)
        });
        Baseline {
            avg_volume: volume / n,
            avg_floor_price: floor / n,
            avg_sales: sales / n,
        }
    }

    fn record(&self, stats: &CollectionStats) {
        let mut entry = self.samples.entry(stats.collection.clone()).or_default();
        entry.push_back(Baseline::from_stats(stats));
        while entry.len() > self.window {
            entry.pop_front();
        }
    }
}

/// Fixed baselines for tests. Unknown collections fall back to their current
/// stats.
#[cfg(test)]
#[derive(Default)]
pub struct StaticBaselineProvider {
    baselines: DashMap<String, Baseline>,
}

#[cfg(test)]
impl StaticBaselineProvider {
    pub fn with(self, collection: &str, baseline: Baseline) -> Self {
        self.baselines.insert(collection.to_string(), baseline);
        self
    }
}

#[cfg(test)]
impl BaselineProvider for StaticBaselineProvider {
    fn baseline(&self, current: &CollectionStats) -> Baseline {
        self.baselines
            .get(&current.collection)
            .map(|b| *b)
            .unwrap_or_else(|| Baseline::from_stats(current))
    }
}
