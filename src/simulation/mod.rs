pub mod advection;
pub mod field;
pub mod irradiance;
pub mod lifecycle;
pub mod stability;
pub mod statistics;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::climate::{ClimateParams, ClimateSeries};
use crate::config::simulation::SimulationConfig;
use crate::sky::{CloudView, Pattern, PatternState, SkyParams, SkyState};
use crate::simulation::field::Trajectory;
use crate::simulation::statistics::{TickCounters, TickStatistics};

/// Stability at tick 0, before any relaxation.
pub const INITIAL_STABILITY: f64 = 0.5;

/// Weather as seen by the renderer and the estimator for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub tick: u64,
    pub hour: f64,
    pub cloud_cover: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub pattern: Pattern,
    pub stability: f64,
    /// Percent of the domain under active clouds, from cloud areas
    pub field_cover: f64,
    /// Mean cloud drift; `None` while the sky is empty
    pub trajectory: Option<Trajectory>,
}

/// The cloud-field controller: fixed parameters, precomputed climate and the
/// evolving sky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub params: SkyParams,
    pub climate: ClimateSeries,
    pub sky: SkyState,
}

impl Simulation {
    /// Build the climate series and the initial sky. Draws from `rng` in that order.
    pub fn new<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Self {
        let climate = ClimateSeries::generate(
            config.climate_hours(),
            config.ticks_per_hour,
            config.season,
            &ClimateParams::default(),
            rng,
        );
        let pattern = PatternState::initial(config.random_initial_pattern, INITIAL_STABILITY, rng);
        Simulation {
            params: config.sky_params(),
            climate,
            sky: SkyState::new(pattern, INITIAL_STABILITY),
        }
    }

    /// Simulate the next tick.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickStatistics {
        execute_tick(&mut self.sky, &self.params, &self.climate, rng)
    }

    /// Every cloud in the current list, in list order.
    pub fn active_clouds(&self) -> Vec<CloudView> {
        self.sky.clouds.iter().map(|c| c.view()).collect()
    }

    pub fn current_weather(&self, tick: u64) -> WeatherSnapshot {
        let sample = self.climate.sample(tick);
        WeatherSnapshot {
            tick,
            hour: self.params.hour_of_day(tick),
            cloud_cover: sample.cloud_cover,
            wind_speed: sample.wind_speed,
            wind_direction: sample.wind_direction,
            pattern: self.sky.pattern.pattern,
            stability: self.sky.stability,
            field_cover: field::area_cover_pct(&self.sky.clouds, self.params.domain_size),
            trajectory: field::field_trajectory(&self.sky.clouds, &self.params),
        }
    }
}

/// Execute a single tick on the sky.
///
/// Order matters: stability → pattern check → spawn → time-of-day effects →
/// merge → age cull → population cull → advection. The tick counter advances last.
pub fn execute_tick<R: Rng + ?Sized>(
    sky: &mut SkyState,
    params: &SkyParams,
    climate: &ClimateSeries,
    rng: &mut R,
) -> TickStatistics {
    let tick = sky.tick;
    let hour = params.hour_of_day(tick);
    let mut counters = TickCounters::default();

    // 1. Stability
    sky.stability = stability::relax_stability(sky.stability, stability::target_stability(hour));

    // 2. Pattern
    if sky.pattern.is_due(tick) {
        let previous = sky.pattern.pattern;
        sky.pattern = sky.pattern.transition(tick, sky.stability, rng);
        counters.pattern_changed = true;
        debug!(
            tick,
            from = previous.name(),
            to = sky.pattern.pattern.name(),
            target = sky.pattern.target_count,
            duration = sky.pattern.duration,
            stability = sky.stability,
            "Pattern change"
        );
    }

    // 3. Spawn
    if lifecycle::spawn_cloud(sky, params, rng).is_some() {
        counters.spawned = 1;
    }

    // 4. Time of day
    let clouds = std::mem::take(&mut sky.clouds);
    let clouds = lifecycle::apply_time_of_day(clouds, hour, rng);

    // 5. Merge
    let (clouds, merged) = lifecycle::merge_clouds(clouds, rng);
    counters.merged = merged;

    // 6-7. Cull
    let (clouds, aged_out) = lifecycle::cull_aged(clouds);
    counters.aged_out = aged_out;
    let (clouds, culled) = lifecycle::cull_population(clouds, sky.pattern.target_count as usize);
    counters.population_culled = culled;

    // 8. Advection
    let sample = climate.sample(tick);
    sky.clouds = advection::advect_all(&clouds, &sample, tick, params);

    if let Some(bad) = sky.clouds.iter().find(|c| !c.is_valid()) {
        warn!(
            tick,
            id = bad.id,
            opacity = bad.opacity,
            width = bad.width,
            height = bad.height,
            "Cloud invariant violated"
        );
    }

    sky.tick += 1;
    statistics::compute_statistics(sky, tick, hour, counters)
}
