use crate::climate::ClimateSample;
use crate::sky::{Cloud, SkyParams};

/// Visual scale applied to the physical drift distance.
pub const SPEED_SCALE: f64 = 0.1;

/// Shared per-tick displacement for a wind sample.
///
/// Speed (m/s) is converted to domain units per tick; direction is a math angle
/// in degrees, mapped to screen space with y pointing down.
pub fn wind_displacement(sample: &ClimateSample, params: &SkyParams) -> (f64, f64) {
    let distance = sample.wind_speed * params.seconds_per_tick() * SPEED_SCALE;
    let theta = sample.wind_direction.to_radians();
    (distance * theta.cos(), -distance * theta.sin())
}

/// Move every cloud by the shared displacement and apply per-cloud wind deformation.
pub fn advect_all(
    clouds: &[Cloud],
    sample: &ClimateSample,
    tick: u64,
    params: &SkyParams,
) -> Vec<Cloud> {
    let (dx, dy) = wind_displacement(sample, params);
    clouds
        .iter()
        .map(|c| c.advanced(dx, dy, tick, sample.wind_speed, params.domain_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SkyParams {
        SkyParams {
            domain_size: 5000.0,
            max_clouds: 20,
            ticks_per_hour: 12,
            start_hour: 0.0,
        }
    }

    fn sample(speed: f64, direction: f64) -> ClimateSample {
        ClimateSample {
            cloud_cover: 50.0,
            wind_speed: speed,
            wind_direction: direction,
        }
    }

    #[test]
    fn east_wind_moves_right() {
        let (dx, dy) = wind_displacement(&sample(5.0, 0.0), &params());
        assert!((dx - 150.0).abs() < 1e-9);
        assert!(dy.abs() < 1e-9);
    }

    #[test]
    fn y_axis_is_inverted() {
        let (dx, dy) = wind_displacement(&sample(2.0, 90.0), &params());
        assert!(dx.abs() < 1e-9);
        assert!((dy + 60.0).abs() < 1e-9);
    }

    #[test]
    fn calm_air_does_not_move() {
        assert_eq!(wind_displacement(&sample(0.0, 225.0), &params()), (0.0, -0.0));
    }
}
