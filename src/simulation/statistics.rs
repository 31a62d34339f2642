use serde::Serialize;

use crate::sky::{Pattern, SkyState};

/// What a single tick did, for logging and degenerate-state detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickCounters {
    pub pattern_changed: bool,
    pub spawned: u32,
    pub merged: u32,
    pub aged_out: u32,
    pub population_culled: u32,
}

/// Per-tick aggregate metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickStatistics {
    pub tick: u64,
    pub hour: f64,
    pub pattern: Pattern,
    pub target_count: u32,
    pub stability: f64,
    pub cloud_count: u32,
    pub active_count: u32,
    pub mean_opacity: f64,
    pub pattern_changed: bool,
    pub spawned: u32,
    pub merged: u32,
    pub aged_out: u32,
    pub population_culled: u32,
}

/// Statistics for the sky state right after `tick` was simulated.
pub fn compute_statistics(sky: &SkyState, tick: u64, hour: f64, counters: TickCounters) -> TickStatistics {
    let cloud_count = sky.clouds.len();
    let mean_opacity = if cloud_count == 0 {
        0.0
    } else {
        sky.clouds.iter().map(|c| c.opacity).sum::<f64>() / cloud_count as f64
    };

    TickStatistics {
        tick,
        hour,
        pattern: sky.pattern.pattern,
        target_count: sky.pattern.target_count,
        stability: sky.stability,
        cloud_count: cloud_count as u32,
        active_count: sky.active_count() as u32,
        mean_opacity,
        pattern_changed: counters.pattern_changed,
        spawned: counters.spawned,
        merged: counters.merged,
        aged_out: counters.aged_out,
        population_culled: counters.population_culled,
    }
}
