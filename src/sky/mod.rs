pub mod cloud;
pub mod pattern;

use serde::{Deserialize, Serialize};

pub use cloud::{Cloud, CloudView, SizeClass, SpawnRequest};
pub use pattern::{Pattern, PatternState};

/// Fixed per-run parameters of the simulated sky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyParams {
    /// Side length of the square visible domain
    pub domain_size: f64,
    /// Hard cap on concurrent clouds
    pub max_clouds: u32,
    pub ticks_per_hour: u32,
    /// Hour of day at tick 0
    pub start_hour: f64,
}

impl SkyParams {
    /// Hour of day in [0, 24) at `tick`.
    pub fn hour_of_day(&self, tick: u64) -> f64 {
        (self.start_hour + tick as f64 / self.ticks_per_hour.max(1) as f64).rem_euclid(24.0)
    }

    /// Simulated seconds per tick.
    pub fn seconds_per_tick(&self) -> f64 {
        3600.0 / self.ticks_per_hour.max(1) as f64
    }
}

/// Mutable simulation state carried from one tick to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyState {
    /// Next tick to be simulated
    pub tick: u64,
    pub pattern: PatternState,
    /// Atmospheric stability, 0.0-1.0
    pub stability: f64,
    /// Cloud list in insertion order
    pub clouds: Vec<Cloud>,
    pub next_id: u64,
}

impl SkyState {
    pub fn new(pattern: PatternState, stability: f64) -> Self {
        SkyState {
            tick: 0,
            pattern,
            stability: stability.clamp(0.0, 1.0),
            clouds: Vec::new(),
            next_id: 1,
        }
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Clouds currently flagged active (inside the domain plus margin).
    pub fn active_count(&self) -> usize {
        self.clouds.iter().filter(|c| c.active).count()
    }
}
