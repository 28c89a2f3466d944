use crate::{
    error::StatsError,
    pipeline::domain::{round_to, LiveStats},
};
use tracing::debug;

/// Derives the reported ratios from a particle count and the reference
/// sample volume. Degenerate volumes fall back to zero ratios.
pub fn aggregate(count: usize, water_ml: f64) -> LiveStats {
    match compute_ratios(count, water_ml) {
        Ok(stats) => stats,
        Err(e) => {
            debug!("{}; reporting zero ratios", e);
            LiveStats {
                objects: count,
                ..LiveStats::initial(water_ml)
            }
        }
    }
}

fn compute_ratios(count: usize, water_ml: f64) -> Result<LiveStats, StatsError> {
    if !(water_ml > 0.0) {
        return Err(StatsError::NonPositiveVolume(water_ml));
    }
    let objects = count as f64;
    let grams_per_ml = objects / water_ml;
    let percent_plastic = 100.0 * objects / (objects + water_ml);
    // derived from the unrounded share so the pair always sums to 100
    let percent_water = 100.0 - percent_plastic;

    Ok(LiveStats {
        objects: count,
        grams_per_ml: round_to(grams_per_ml, 3),
        percent_plastic: round_to(percent_plastic, 2),
        percent_water: round_to(percent_water, 2),
        water_ml,
    })
}
