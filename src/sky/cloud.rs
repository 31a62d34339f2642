use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opacity ceiling for a fully faded-in cloud.
pub const OPACITY_MAX: f64 = 0.7;
/// Fraction of the remaining opacity gap closed per tick.
pub const FADE_FRACTION: f64 = 0.15;
/// Clouds within this distance of the visible domain count as active.
pub const ACTIVE_MARGIN: f64 = 1200.0;
/// Number of puffs the renderer draws per cloud.
pub const PUFF_COUNT: usize = 6;
/// Maximum per-axis offset of a grouped spawn from its parent, before size scaling.
pub const GROUP_SPREAD: f64 = 800.0;
pub const MAX_CLOUD_WIDTH: f64 = 3000.0;
pub const MAX_CLOUD_HEIGHT: f64 = 1800.0;
/// Extents never drop below this.
pub const MIN_EXTENT: f64 = 1.0;
/// Past positions kept per cloud; the oldest is evicted first.
pub const TRAIL_LENGTH: usize = 15;

const WIND_STRETCH_THRESHOLD: f64 = 8.0;
const WIND_STRETCH_PER_MS: f64 = 0.05;
const RELAX_FRACTION: f64 = 0.05;
const RELAX_NOISE_FLOOR: f64 = 1.0;

const MORNING_DIM_STEP: f64 = 0.02;
const AFTERNOON_GROWTH: f64 = 1.02;
const MERGE_GROWTH: f64 = 1.1;

/// Size class of a cloud, determining its extent range and puff scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

/// Extent ranges and render scale for one size class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRange {
    pub width: (f64, f64),
    pub height: (f64, f64),
    pub scale: f64,
}

/// Ordered cumulative draw table: the first class whose threshold is >= the draw wins.
const SIZE_CLASS_TABLE: [(SizeClass, f64); 3] = [
    (SizeClass::Small, 0.5),
    (SizeClass::Medium, 0.85),
    (SizeClass::Large, 1.0),
];

impl SizeClass {
    pub fn all() -> &'static [SizeClass] {
        &[SizeClass::Small, SizeClass::Medium, SizeClass::Large]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        }
    }

    pub fn range(&self) -> SizeRange {
        match self {
            SizeClass::Small => SizeRange {
                width: (400.0, 700.0),
                height: (250.0, 450.0),
                scale: 0.8,
            },
            SizeClass::Medium => SizeRange {
                width: (900.0, 1300.0),
                height: (500.0, 750.0),
                scale: 1.0,
            },
            SizeClass::Large => SizeRange {
                width: (1500.0, 2200.0),
                height: (800.0, 1200.0),
                scale: 1.2,
            },
        }
    }

    /// Class for a uniform draw in [0, 1). Falls back to `Small` if rounding leaves
    /// the draw above every threshold.
    pub fn from_draw(r: f64) -> SizeClass {
        SIZE_CLASS_TABLE
            .iter()
            .find(|(_, cumulative)| *cumulative >= r)
            .map(|(class, _)| *class)
            .unwrap_or(SizeClass::Small)
    }

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> SizeClass {
        SizeClass::from_draw(rng.r#gen::<f64>())
    }
}

/// Everything needed to create a cloud apart from the RNG and the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub id: u64,
    pub birth_tick: u64,
    /// `None` draws a class from the catalog.
    pub size_class: Option<SizeClass>,
    pub size_factor: f64,
    /// Parent position for grouped spawns.
    pub anchor: Option<(f64, f64)>,
}

/// One cloud mass. Replaced wholesale every tick by [`Cloud::advanced`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Extent before wind deformation
    pub original_width: f64,
    pub original_height: f64,
    /// 0.0 to OPACITY_MAX
    pub opacity: f64,
    pub active: bool,
    pub birth_tick: u64,
    pub age: u64,
    /// Radians, [0, 2π)
    pub rotation: f64,
    pub puff_scales: [f64; PUFF_COUNT],
    pub size_class: SizeClass,
    /// Displacement applied by the last advance, domain units per tick
    pub velocity: (f64, f64),
    /// Positions before each advance, oldest first
    pub trail: VecDeque<(f64, f64)>,
}

/// What the renderer and the irradiance estimator see of a cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudView {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub rotation: f64,
    pub active: bool,
    pub trail: Vec<(f64, f64)>,
}

/// Wrap a coordinate into [0, domain + 2 * extent).
pub fn wrap_axis(position: f64, domain_size: f64, extent: f64) -> f64 {
    position.rem_euclid(domain_size + 2.0 * extent)
}

fn within_margin(position: f64, domain_size: f64) -> bool {
    (-ACTIVE_MARGIN..=domain_size + ACTIVE_MARGIN).contains(&position)
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

impl Cloud {
    /// Create a faded-out, inactive cloud.
    pub fn spawn<R: Rng + ?Sized>(request: &SpawnRequest, domain_size: f64, rng: &mut R) -> Self {
        let size_class = match request.size_class {
            Some(class) => class,
            None => SizeClass::draw(rng),
        };
        let range = size_class.range();
        let factor = request.size_factor.max(0.0);

        let width = (uniform(rng, range.width) * factor).clamp(MIN_EXTENT, MAX_CLOUD_WIDTH);
        let height = (uniform(rng, range.height) * factor).clamp(MIN_EXTENT, MAX_CLOUD_HEIGHT);

        let (x, y) = match request.anchor {
            Some((ax, ay)) => {
                let spread = GROUP_SPREAD * factor;
                let ox = rng.gen_range(-1.0..=1.0) * spread;
                let oy = rng.gen_range(-1.0..=1.0) * spread;
                (
                    wrap_axis(ax + ox, domain_size, width),
                    wrap_axis(ay + oy, domain_size, height),
                )
            }
            None => (
                uniform(rng, (0.0, domain_size + 2.0 * width)),
                uniform(rng, (0.0, domain_size + 2.0 * height)),
            ),
        };

        let rotation = rng.gen_range(0.0..2.0 * PI);
        let mut puff_scales = [0.0; PUFF_COUNT];
        for scale in puff_scales.iter_mut() {
            *scale = rng.gen_range(0.8..1.2) * range.scale;
        }

        Cloud {
            id: request.id,
            x,
            y,
            width,
            height,
            original_width: width,
            original_height: height,
            opacity: 0.0,
            active: false,
            birth_tick: request.birth_tick,
            age: 0,
            rotation,
            puff_scales,
            size_class,
            velocity: (0.0, 0.0),
            trail: VecDeque::with_capacity(TRAIL_LENGTH),
        }
    }

    /// State after one tick of drift by `(dx, dy)` under `wind_speed` m/s.
    pub fn advanced(
        &self,
        dx: f64,
        dy: f64,
        tick: u64,
        wind_speed: f64,
        domain_size: f64,
    ) -> Cloud {
        let mut next = self.clone();

        next.trail.push_back((self.x, self.y));
        while next.trail.len() > TRAIL_LENGTH {
            next.trail.pop_front();
        }
        next.velocity = (dx, dy);
        next.x = wrap_axis(self.x + dx, domain_size, self.width);
        next.y = wrap_axis(self.y + dy, domain_size, self.height);
        next.age = tick.saturating_sub(self.birth_tick);
        next.active = within_margin(next.x, domain_size) && within_margin(next.y, domain_size);

        let target = if next.active { OPACITY_MAX } else { 0.0 };
        next.opacity = (self.opacity + (target - self.opacity) * FADE_FRACTION).clamp(0.0, OPACITY_MAX);

        if wind_speed > WIND_STRETCH_THRESHOLD {
            let excess = wind_speed - WIND_STRETCH_THRESHOLD;
            next.width = (self.original_width * (1.0 + excess * WIND_STRETCH_PER_MS)).min(MAX_CLOUD_WIDTH);
            if next.width > 2.0 * next.height {
                next.height = next.width / 2.0;
            }
        } else {
            if (self.width - self.original_width).abs() > RELAX_NOISE_FLOOR {
                next.width += (self.original_width - self.width) * RELAX_FRACTION;
            }
            if (self.height - self.original_height).abs() > RELAX_NOISE_FLOOR {
                next.height += (self.original_height - self.height) * RELAX_FRACTION;
            }
        }
        next.width = next.width.clamp(MIN_EXTENT, MAX_CLOUD_WIDTH);
        next.height = next.height.clamp(MIN_EXTENT, MAX_CLOUD_HEIGHT);

        next
    }

    /// Morning thinning.
    pub fn dimmed(&self) -> Cloud {
        Cloud {
            opacity: (self.opacity - MORNING_DIM_STEP).clamp(0.0, OPACITY_MAX),
            ..self.clone()
        }
    }

    /// Afternoon convective growth.
    pub fn enlarged(&self) -> Cloud {
        Cloud {
            width: (self.width * AFTERNOON_GROWTH).min(MAX_CLOUD_WIDTH),
            height: (self.height * AFTERNOON_GROWTH).min(MAX_CLOUD_HEIGHT),
            ..self.clone()
        }
    }

    /// This cloud after absorbing `other`. Never smaller than either input.
    pub fn merged_with(&self, other: &Cloud) -> Cloud {
        let w = self.width.max(other.width);
        let h = self.height.max(other.height);
        let width = (w * MERGE_GROWTH).min(MAX_CLOUD_WIDTH).max(w);
        let height = (h * MERGE_GROWTH).min(MAX_CLOUD_HEIGHT).max(h);
        Cloud {
            width,
            height,
            original_width: width,
            original_height: height,
            opacity: self.opacity.max(other.opacity),
            ..self.clone()
        }
    }

    pub fn distance_to(&self, other: &Cloud) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn view(&self) -> CloudView {
        CloudView {
            id: self.id,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            opacity: self.opacity,
            rotation: self.rotation,
            active: self.active,
            trail: self.trail.iter().copied().collect(),
        }
    }

    /// Opacity and extent invariants hold.
    pub fn is_valid(&self) -> bool {
        (0.0..=OPACITY_MAX).contains(&self.opacity)
            && self.width > 0.0
            && self.height > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.trail.len() <= TRAIL_LENGTH
    }
}
