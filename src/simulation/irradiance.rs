//! Per-point shading, irradiance and generation from the current cloud field.

use std::f64::consts::PI;

use serde::Serialize;

use crate::panels::Panel;
use crate::sky::CloudView;

/// Clouds thinner than this cast no shade.
pub const MIN_SHADING_OPACITY: f64 = 0.05;
/// Clear-sky irradiance at solar noon, W/m².
pub const PEAK_IRRADIANCE: f64 = 1000.0;
/// Panel conversion efficiency.
pub const PANEL_EFFICIENCY: f64 = 0.18;
const SUNRISE_HOUR: f64 = 6.0;
const SUNSET_HOUR: f64 = 18.0;
const SHADOW_RADIUS_FACTOR: f64 = 0.6;

/// Shading and output at one panel location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PanelReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub x: f64,
    pub y: f64,
    /// 0.0 (clear) to 1.0 (fully shaded)
    pub shading: f64,
    /// W/m²
    pub irradiance: f64,
    /// kW/m²
    pub generation: f64,
}

/// Shading factor in [0, 1] at `(x, y)`, scaled by the overall cloud cover percentage.
pub fn shading_at(x: f64, y: f64, clouds: &[CloudView], cloud_cover: f64) -> f64 {
    let total: f64 = clouds
        .iter()
        .filter(|c| c.active && c.opacity > MIN_SHADING_OPACITY)
        .map(|c| {
            let max_radius = SHADOW_RADIUS_FACTOR * c.width.max(c.height);
            let distance = ((x - c.x).powi(2) + (y - c.y).powi(2)).sqrt();
            (1.0 - distance / max_radius).clamp(0.0, 1.0) * c.opacity
        })
        .sum();
    (total * cloud_cover / 100.0).clamp(0.0, 1.0)
}

/// Clear-sky irradiance: a half sine between sunrise and sunset, zero at night.
pub fn clear_sky_irradiance(hour: f64) -> f64 {
    if hour <= SUNRISE_HOUR || hour >= SUNSET_HOUR {
        return 0.0;
    }
    PEAK_IRRADIANCE * (PI * (hour - SUNRISE_HOUR) / (SUNSET_HOUR - SUNRISE_HOUR)).sin()
}

pub fn irradiance(hour: f64, shading: f64) -> f64 {
    clear_sky_irradiance(hour) * (1.0 - shading.clamp(0.0, 1.0))
}

/// Electrical output in kW per m² of panel.
pub fn generation_kw(irradiance: f64) -> f64 {
    irradiance * PANEL_EFFICIENCY / 1000.0
}

pub fn estimate_panels(
    panels: &[Panel],
    clouds: &[CloudView],
    cloud_cover: f64,
    hour: f64,
) -> Vec<PanelReading> {
    panels
        .iter()
        .map(|p| {
            let shading = shading_at(p.x, p.y, clouds, cloud_cover);
            let irradiance = irradiance(hour, shading);
            PanelReading {
                id: p.id,
                x: p.x,
                y: p.y,
                shading,
                irradiance,
                generation: generation_kw(irradiance),
            }
        })
        .collect()
}
