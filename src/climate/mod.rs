pub mod series;

use serde::{Deserialize, Serialize};

pub use series::{ClimateParams, ClimateSample, ClimateSeries};

/// Season selector. Shapes the synthetic climate series once, after upsampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Monsoon,
    Winter,
}

impl Season {
    pub fn all() -> &'static [Season] {
        &[Season::Summer, Season::Monsoon, Season::Winter]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Monsoon => "monsoon",
            Season::Winter => "winter",
        }
    }

    pub fn parse(name: &str) -> Option<Season> {
        Season::all()
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Upper bound for wind speed (m/s) after seasonal adjustment.
    pub fn wind_cap(&self) -> f64 {
        match self {
            Season::Summer => 20.0,
            Season::Monsoon | Season::Winter => 15.0,
        }
    }
}
