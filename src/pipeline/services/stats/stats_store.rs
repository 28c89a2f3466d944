use crate::pipeline::{domain::LiveStats, services::stats::aggregator::aggregate};
use parking_lot::RwLock;

/// Owner of the single current `LiveStats` record. Writers replace the
/// whole record under the lock, so readers never see a mixed state.
#[derive(Debug)]
pub struct StatsStore {
    current: RwLock<LiveStats>,
    water_ml: f64,
}

impl StatsStore {
    pub fn new(water_ml: f64) -> Self {
        Self {
            current: RwLock::new(LiveStats::initial(water_ml)),
            water_ml,
        }
    }

    pub fn water_ml(&self) -> f64 {
        self.water_ml
    }

    pub fn snapshot(&self) -> LiveStats {
        *self.current.read()
    }

    pub fn publish(&self, stats: LiveStats) {
        *self.current.write() = stats;
    }

    /// Aggregates `count` against the reference volume and publishes it.
    pub fn record(&self, count: usize) -> LiveStats {
        let stats = aggregate(count, self.water_ml);
        self.publish(stats);
        stats
    }
}
