//! Synthetic climate series: hourly cloud cover, wind speed and wind direction
//! built from smooth periodic curves plus Gaussian noise, upsampled to the
//! simulation tick rate and shaped by the selected season.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::Season;

/// Standard deviations of the noise added to each hourly base curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateParams {
    pub cover_noise: f64,
    pub wind_noise: f64,
    pub direction_noise: f64,
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self {
            cover_noise: 10.0,
            wind_noise: 1.0,
            direction_noise: 15.0,
        }
    }
}

impl ClimateParams {
    /// Base curves only. The RNG is still advanced so the stream stays aligned.
    pub fn noiseless() -> Self {
        Self {
            cover_noise: 0.0,
            wind_noise: 0.0,
            direction_noise: 0.0,
        }
    }
}

/// One tick's worth of climate input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateSample {
    /// Percent, 0-100
    pub cloud_cover: f64,
    /// m/s
    pub wind_speed: f64,
    /// Degrees, 0-360
    pub wind_direction: f64,
}

/// Hourly series before upsampling.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub cloud_cover: Vec<f64>,
    pub wind_speed: Vec<f64>,
    pub wind_direction: Vec<f64>,
}

/// Precomputed per-tick climate. Immutable once built; read by tick index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSeries {
    pub season: Season,
    pub ticks_per_hour: u32,
    cloud_cover: Vec<f64>,
    wind_speed: Vec<f64>,
    wind_direction: Vec<f64>,
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * sigma
}

/// Base curves plus noise, one sample per hour, clamped to physical ranges.
pub fn generate_hourly<R: Rng + ?Sized>(
    hours: usize,
    params: &ClimateParams,
    rng: &mut R,
) -> HourlySeries {
    let mut cloud_cover = Vec::with_capacity(hours);
    let mut wind_speed = Vec::with_capacity(hours);
    let mut wind_direction = Vec::with_capacity(hours);

    for h in 0..hours {
        let h = h as f64;
        // Cloudiest mid-afternoon, clearest around midnight
        let cover = 50.0 + 25.0 * (2.0 * PI * h / 24.0 - PI / 2.0).sin();
        let wind = 5.0 + 2.0 * (2.0 * PI * h / 24.0).sin();
        let direction = 225.0 + 30.0 * (2.0 * PI * h / 48.0).sin();

        cloud_cover.push((cover + gaussian(rng, params.cover_noise)).clamp(0.0, 100.0));
        wind_speed.push((wind + gaussian(rng, params.wind_noise)).max(0.0));
        wind_direction.push((direction + gaussian(rng, params.direction_noise)).rem_euclid(360.0));
    }

    HourlySeries {
        cloud_cover,
        wind_speed,
        wind_direction,
    }
}

/// Piecewise-linear resampling of an hourly series to `ticks_per_hour` samples per hour.
///
/// Sample `k` sits at hour `k / ticks_per_hour`, so every hour boundary reproduces the
/// hourly value exactly. Positions past the last hour hold the last value.
pub fn upsample(hourly: &[f64], ticks_per_hour: usize) -> Vec<f64> {
    if hourly.is_empty() || ticks_per_hour == 0 {
        return Vec::new();
    }
    let last = hourly.len() - 1;
    (0..hourly.len() * ticks_per_hour)
        .map(|k| {
            let x = (k as f64 / ticks_per_hour as f64).min(last as f64);
            let i0 = x.floor() as usize;
            let i1 = (i0 + 1).min(last);
            let t = x - i0 as f64;
            hourly[i0] + (hourly[i1] - hourly[i0]) * t
        })
        .collect()
}

/// Seasonal shaping, applied once in place after upsampling, then re-clamped.
pub fn apply_season(
    season: Season,
    ticks_per_hour: usize,
    cloud_cover: &mut [f64],
    wind_speed: &mut [f64],
    wind_direction: &mut [f64],
) {
    let tph = ticks_per_hour.max(1) as f64;
    for (i, cover) in cloud_cover.iter_mut().enumerate() {
        let t_hours = i as f64 / tph;
        let long_wave = (2.0 * PI * t_hours / 36.0).sin();
        *cover = match season {
            Season::Summer => *cover * 0.6,
            Season::Monsoon => *cover + 15.0 * long_wave,
            Season::Winter => *cover + 8.0 * long_wave,
        }
        .clamp(0.0, 100.0);
    }

    let cap = season.wind_cap();
    for wind in wind_speed.iter_mut() {
        if season == Season::Summer {
            *wind *= 1.3;
        }
        *wind = wind.clamp(0.0, cap);
    }

    for direction in wind_direction.iter_mut() {
        *direction = direction.rem_euclid(360.0);
    }
}

impl ClimateSeries {
    /// Build the full per-tick series for `hours` hours (at least one).
    pub fn generate<R: Rng + ?Sized>(
        hours: usize,
        ticks_per_hour: u32,
        season: Season,
        params: &ClimateParams,
        rng: &mut R,
    ) -> Self {
        let tph = ticks_per_hour.max(1) as usize;
        let hourly = generate_hourly(hours.max(1), params, rng);

        let mut cloud_cover = upsample(&hourly.cloud_cover, tph);
        let mut wind_speed = upsample(&hourly.wind_speed, tph);
        let mut wind_direction = upsample(&hourly.wind_direction, tph);
        apply_season(
            season,
            tph,
            &mut cloud_cover,
            &mut wind_speed,
            &mut wind_direction,
        );

        ClimateSeries {
            season,
            ticks_per_hour: tph as u32,
            cloud_cover,
            wind_speed,
            wind_direction,
        }
    }

    pub fn len(&self) -> usize {
        self.cloud_cover.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud_cover.is_empty()
    }

    /// True when all three series share one length and hold in-range values.
    pub fn is_consistent(&self) -> bool {
        let n = self.cloud_cover.len();
        n > 0
            && self.wind_speed.len() == n
            && self.wind_direction.len() == n
            && self.cloud_cover.iter().all(|c| (0.0..=100.0).contains(c))
            && self.wind_speed.iter().all(|w| *w >= 0.0)
            && self.wind_direction.iter().all(|d| (0.0..360.0).contains(d))
    }

    pub fn cloud_cover(&self) -> &[f64] {
        &self.cloud_cover
    }

    pub fn wind_speed(&self) -> &[f64] {
        &self.wind_speed
    }

    pub fn wind_direction(&self) -> &[f64] {
        &self.wind_direction
    }

    /// Climate at `tick`, clamped to the last valid sample.
    pub fn sample(&self, tick: u64) -> ClimateSample {
        let idx = (tick.min(usize::MAX as u64) as usize).min(self.len().saturating_sub(1));
        ClimateSample {
            cloud_cover: self.cloud_cover.get(idx).copied().unwrap_or(0.0),
            wind_speed: self.wind_speed.get(idx).copied().unwrap_or(0.0),
            wind_direction: self.wind_direction.get(idx).copied().unwrap_or(0.0),
        }
    }
}
