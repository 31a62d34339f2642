use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::climate::Season;
use crate::sky::SkyParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 0 picks a random seed at startup
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_total_ticks")]
    pub total_ticks: u64,
    #[serde(default = "default_ticks_per_hour")]
    pub ticks_per_hour: u32,
    #[serde(default)]
    pub start_hour: f64,
    #[serde(default = "default_domain_size")]
    pub domain_size: f64,
    #[serde(default = "default_max_clouds")]
    pub max_clouds: u32,
    #[serde(default = "default_season")]
    pub season: Season,
    #[serde(default)]
    pub random_initial_pattern: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_snapshot_directory")]
    pub snapshot_directory: String,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
}

fn default_total_ticks() -> u64 {
    288
}
fn default_ticks_per_hour() -> u32 {
    12
}
fn default_domain_size() -> f64 {
    5000.0
}
fn default_max_clouds() -> u32 {
    20
}
fn default_season() -> Season {
    Season::Summer
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_snapshot_directory() -> String {
    "./snapshots".to_string()
}
fn default_max_snapshots() -> u32 {
    10
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: 0,
            total_ticks: default_total_ticks(),
            ticks_per_hour: default_ticks_per_hour(),
            start_hour: 0.0,
            domain_size: default_domain_size(),
            max_clouds: default_max_clouds(),
            season: default_season(),
            random_initial_pattern: false,
            log_level: default_log_level(),
            snapshot_directory: default_snapshot_directory(),
            max_snapshots: default_max_snapshots(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.total_ticks == 0 {
            errors.push(format!(
                "total_ticks must be > 0, got {}. Example: total_ticks = 288",
                self.total_ticks
            ));
        }

        if self.ticks_per_hour == 0 {
            errors.push(format!(
                "ticks_per_hour must be > 0, got {}. Example: ticks_per_hour = 12",
                self.ticks_per_hour
            ));
        }

        if !(0.0..24.0).contains(&self.start_hour) {
            errors.push(format!(
                "start_hour must be in [0, 24), got {}. Example: start_hour = 6.0",
                self.start_hour
            ));
        }

        if !(self.domain_size > 0.0 && self.domain_size.is_finite()) {
            errors.push(format!(
                "domain_size must be > 0.0, got {}. Example: domain_size = 5000.0",
                self.domain_size
            ));
        }

        if self.max_clouds == 0 {
            errors.push(format!(
                "max_clouds must be > 0, got {}. Example: max_clouds = 20",
                self.max_clouds
            ));
        }

        if self.max_snapshots == 0 {
            errors.push(format!(
                "max_snapshots must be > 0, got {}. Example: max_snapshots = 10",
                self.max_snapshots
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }

    /// Copy with a concrete seed; a zero seed is replaced by a random one.
    pub fn with_resolved_seed(&self) -> Self {
        let seed = if self.seed == 0 {
            rand::random::<u64>().max(1)
        } else {
            self.seed
        };
        SimulationConfig {
            seed,
            ..self.clone()
        }
    }

    /// Hours of climate data needed to cover every tick.
    pub fn climate_hours(&self) -> usize {
        let tph = self.ticks_per_hour.max(1) as u64;
        self.total_ticks.div_ceil(tph).max(1) as usize
    }

    pub fn sky_params(&self) -> SkyParams {
        SkyParams {
            domain_size: self.domain_size,
            max_clouds: self.max_clouds,
            ticks_per_hour: self.ticks_per_hour,
            start_hour: self.start_hour,
        }
    }
}
