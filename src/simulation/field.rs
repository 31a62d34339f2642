//! Whole-field summaries derived from the cloud list rather than the climate series.

use serde::Serialize;

use crate::sky::{Cloud, SkyParams};
use crate::simulation::advection::SPEED_SCALE;

/// Mean drift of the cloud field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trajectory {
    /// km/h, converted back from domain units per tick
    pub speed_kmh: f64,
    /// Degrees in [0, 360), same convention as the climate wind direction
    pub direction: f64,
    /// 1.0 when every cloud moves the same way, toward 0.0 as motions cancel out
    pub confidence: f64,
}

/// Mean velocity of all clouds turned into speed, direction and a coherence score.
/// `None` for an empty sky.
pub fn field_trajectory(clouds: &[Cloud], params: &SkyParams) -> Option<Trajectory> {
    if clouds.is_empty() {
        return None;
    }
    let n = clouds.len() as f64;
    let (sum_x, sum_y, sum_len) = clouds.iter().fold((0.0, 0.0, 0.0), |(sx, sy, sl), c| {
        let (vx, vy) = c.velocity;
        (sx + vx, sy + vy, sl + (vx * vx + vy * vy).sqrt())
    });
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);
    let mean_len = (mean_x * mean_x + mean_y * mean_y).sqrt();

    let units_per_ms = params.seconds_per_tick() * SPEED_SCALE;
    let confidence = if sum_len > 0.0 {
        (mean_len / (sum_len / n)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(Trajectory {
        speed_kmh: mean_len / units_per_ms * 3.6,
        // Screen y points down, so flip it back to a math angle
        direction: (-mean_y).atan2(mean_x).to_degrees().rem_euclid(360.0),
        confidence,
    })
}

/// Percentage of the visible domain covered by active cloud ellipses, capped at 100.
pub fn area_cover_pct(clouds: &[Cloud], domain_size: f64) -> f64 {
    if domain_size <= 0.0 {
        return 0.0;
    }
    let area: f64 = clouds
        .iter()
        .filter(|c| c.active)
        .map(|c| std::f64::consts::FRAC_PI_4 * c.width * c.height)
        .sum();
    (area / (domain_size * domain_size) * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::{SizeClass, SpawnRequest};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> SkyParams {
        SkyParams {
            domain_size: 5000.0,
            max_clouds: 20,
            ticks_per_hour: 12,
            start_hour: 0.0,
        }
    }

    fn cloud(id: u64, velocity: (f64, f64), width: f64, height: f64, active: bool) -> Cloud {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        let request = SpawnRequest {
            id,
            birth_tick: 0,
            size_class: Some(SizeClass::Small),
            size_factor: 1.0,
            anchor: None,
        };
        let mut c = Cloud::spawn(&request, 5000.0, &mut rng);
        c.velocity = velocity;
        c.width = width;
        c.height = height;
        c.active = active;
        c
    }

    #[test]
    fn empty_sky_has_no_trajectory() {
        assert_eq!(field_trajectory(&[], &params()), None);
        assert_eq!(area_cover_pct(&[], 5000.0), 0.0);
    }

    #[test]
    fn uniform_drift_is_fully_confident() {
        // 5 m/s due east at 300 s/tick and 0.1 scale is 150 units per tick
        let clouds = [
            cloud(1, (150.0, 0.0), 500.0, 300.0, true),
            cloud(2, (150.0, 0.0), 500.0, 300.0, false),
        ];
        let t = field_trajectory(&clouds, &params()).unwrap();
        assert!((t.speed_kmh - 18.0).abs() < 1e-9);
        assert!(t.direction.abs() < 1e-9);
        assert!((t.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn direction_undoes_screen_flip() {
        // Moving up the screen is a 90 degree math angle
        let clouds = [cloud(1, (0.0, -60.0), 500.0, 300.0, true)];
        let t = field_trajectory(&clouds, &params()).unwrap();
        assert!((t.direction - 90.0).abs() < 1e-9);
        assert!((t.speed_kmh - 7.2).abs() < 1e-9);
    }

    #[test]
    fn opposing_motion_lowers_confidence() {
        let clouds = [
            cloud(1, (100.0, 0.0), 500.0, 300.0, true),
            cloud(2, (-100.0, 0.0), 500.0, 300.0, true),
        ];
        let t = field_trajectory(&clouds, &params()).unwrap();
        assert!(t.speed_kmh.abs() < 1e-9);
        assert!(t.confidence.abs() < 1e-12);

        let still = [cloud(3, (0.0, 0.0), 500.0, 300.0, true)];
        assert_eq!(field_trajectory(&still, &params()).unwrap().confidence, 0.0);
    }

    #[test]
    fn area_cover_counts_active_ellipses() {
        let clouds = [
            cloud(1, (0.0, 0.0), 1000.0, 1000.0, true),
            cloud(2, (0.0, 0.0), 1000.0, 1000.0, false),
        ];
        let expected = std::f64::consts::FRAC_PI_4 * 1e6 / 25e6 * 100.0;
        assert!((area_cover_pct(&clouds, 5000.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn area_cover_caps_at_full() {
        let clouds: Vec<Cloud> = (0..20)
            .map(|id| cloud(id, (0.0, 0.0), 3000.0, 1800.0, true))
            .collect();
        assert_eq!(area_cover_pct(&clouds, 5000.0), 100.0);
    }
}
