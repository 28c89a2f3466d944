use crate::pipeline::domain::LiveStats;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

pub const LOG_HEADER: [&str; 6] = [
    "timestamp",
    "objects",
    "grams_per_ml",
    "percent_plastic",
    "percent_water",
    "water_ml",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Immutable copy of the live stats at the moment it was logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub timestamp: String,
    pub objects: usize,
    pub grams_per_ml: f64,
    pub percent_plastic: f64,
    pub percent_water: f64,
    pub water_ml: f64,
}

impl LogRow {
    pub fn capture<Tz: TimeZone>(at: DateTime<Tz>, stats: LiveStats) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            objects: stats.objects,
            grams_per_ml: stats.grams_per_ml,
            percent_plastic: stats.percent_plastic,
            percent_water: stats.percent_water,
            water_ml: stats.water_ml,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::stats::aggregate;
    use chrono::Utc;

    #[test]
    fn captures_stats_with_formatted_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let row = LogRow::capture(at, aggregate(50, 100.0));
        assert_eq!(row.timestamp, "2024-03-09 14:05:07");
        assert_eq!(row.objects, 50);
        assert_eq!(row.percent_plastic, 33.33);
        assert_eq!(row.percent_water, 66.67);
        assert_eq!(row.water_ml, 100.0);
    }
}
