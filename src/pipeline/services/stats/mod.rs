pub mod aggregator;
pub mod stats_store;

pub use aggregator::aggregate;
pub use stats_store::StatsStore;
