/// Maximum change in stability per tick.
pub const STABILITY_STEP: f64 = 0.01;

/// Target stability for an hour of day: convective midday air is unstable,
/// night air is stable.
pub fn target_stability(hour: f64) -> f64 {
    if (11.0..15.0).contains(&hour) {
        0.3
    } else if !(6.0..20.0).contains(&hour) {
        0.8
    } else {
        0.5
    }
}

/// Move `current` toward `target` by at most one step, without overshooting.
pub fn relax_stability(current: f64, target: f64) -> f64 {
    let delta = (target - current).clamp(-STABILITY_STEP, STABILITY_STEP);
    (current + delta).clamp(0.0, 1.0)
}
