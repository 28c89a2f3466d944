use serde::Serialize;

/// Latest derived telemetry. Always replaced as a whole, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveStats {
    pub objects: usize,
    pub grams_per_ml: f64,
    pub percent_plastic: f64,
    pub percent_water: f64,
    pub water_ml: f64,
}

impl LiveStats {
    /// State before any frame has been processed.
    pub fn initial(water_ml: f64) -> Self {
        Self {
            objects: 0,
            grams_per_ml: 0.0,
            percent_plastic: 0.0,
            percent_water: 100.0,
            water_ml,
        }
    }
}
