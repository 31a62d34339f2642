//! Cloud population rules: spawning, time-of-day effects, merging and culling.
//!
//! Every pass that removes clouds builds a new list instead of mutating the one
//! it is scanning.

use rand::Rng;
use tracing::debug;

use crate::sky::{Cloud, SkyParams, SkyState, SpawnRequest};

/// Clouds older than this many ticks are removed.
pub const MAX_LIFETIME: u64 = 240;
/// Chance that two overlapping clouds merge on a given tick. Tuned by hand.
pub const MERGE_PROBABILITY: f64 = 0.3;
/// Merge when centers are closer than combined width divided by this. Tuned by hand.
pub const MERGE_DISTANCE_DIVISOR: f64 = 3.0;

const MORNING_WINDOW: (f64, f64) = (6.0, 10.0);
const AFTERNOON_WINDOW: (f64, f64) = (13.0, 17.0);
const MORNING_DIM_CHANCE: f64 = 0.02;
const AFTERNOON_GROWTH_CHANCE: f64 = 0.03;

fn in_window(hour: f64, (start, end): (f64, f64)) -> bool {
    (start..end).contains(&hour)
}

/// Spawn at most one cloud while the list is below both the pattern target and
/// the hard cap. Returns the new cloud's id.
pub fn spawn_cloud<R: Rng + ?Sized>(
    sky: &mut SkyState,
    params: &SkyParams,
    rng: &mut R,
) -> Option<u64> {
    let count = sky.clouds.len();
    if count >= sky.pattern.target_count as usize || count >= params.max_clouds as usize {
        return None;
    }

    let spec = sky.pattern.spec();
    let grouped = rng.r#gen::<f64>() < spec.grouping;
    let anchor = if grouped && !sky.clouds.is_empty() {
        let parent = &sky.clouds[rng.gen_range(0..sky.clouds.len())];
        Some((parent.x, parent.y))
    } else {
        None
    };

    let request = SpawnRequest {
        id: sky.allocate_id(),
        birth_tick: sky.tick,
        size_class: None,
        size_factor: spec.size_factor,
        anchor,
    };
    let cloud = Cloud::spawn(&request, params.domain_size, rng);
    debug!(
        id = cloud.id,
        tick = sky.tick,
        size_class = cloud.size_class.name(),
        grouped = anchor.is_some(),
        x = cloud.x,
        y = cloud.y,
        "Cloud spawned"
    );
    let id = cloud.id;
    sky.clouds.push(cloud);
    Some(id)
}

/// Morning thinning and afternoon growth, for active clouds only.
pub fn apply_time_of_day<R: Rng + ?Sized>(clouds: Vec<Cloud>, hour: f64, rng: &mut R) -> Vec<Cloud> {
    let morning = in_window(hour, MORNING_WINDOW);
    let afternoon = in_window(hour, AFTERNOON_WINDOW);
    if !morning && !afternoon {
        return clouds;
    }

    clouds
        .into_iter()
        .map(|cloud| {
            if !cloud.active {
                cloud
            } else if morning && rng.r#gen::<f64>() < MORNING_DIM_CHANCE {
                cloud.dimmed()
            } else if afternoon && rng.r#gen::<f64>() < AFTERNOON_GROWTH_CHANCE {
                cloud.enlarged()
            } else {
                cloud
            }
        })
        .collect()
}

/// Single pairwise pass over active clouds in list order. A merging pair keeps
/// the earlier cloud (enlarged) and drops the later one; each cloud takes part in
/// at most one merge per pass. Returns the new list and the number of merges.
pub fn merge_clouds<R: Rng + ?Sized>(clouds: Vec<Cloud>, rng: &mut R) -> (Vec<Cloud>, u32) {
    let n = clouds.len();
    let mut absorbed = vec![false; n];
    let mut survivors: Vec<Option<Cloud>> = vec![None; n];
    let mut merges = 0;

    for i in 0..n {
        if absorbed[i] || !clouds[i].active {
            continue;
        }
        for j in (i + 1)..n {
            if absorbed[j] || !clouds[j].active {
                continue;
            }
            let (a, b) = (&clouds[i], &clouds[j]);
            let threshold = (a.width + b.width) / MERGE_DISTANCE_DIVISOR;
            if a.distance_to(b) < threshold && rng.r#gen::<f64>() < MERGE_PROBABILITY {
                debug!(survivor = a.id, absorbed = b.id, "Clouds merged");
                survivors[i] = Some(a.merged_with(b));
                absorbed[j] = true;
                merges += 1;
                break;
            }
        }
    }

    let merged = clouds
        .into_iter()
        .zip(survivors)
        .zip(absorbed)
        .filter_map(|((cloud, survivor), gone)| {
            if gone {
                None
            } else {
                Some(survivor.unwrap_or(cloud))
            }
        })
        .collect();

    (merged, merges)
}

/// Drop clouds past their lifetime. Returns the new list and the number removed.
pub fn cull_aged(clouds: Vec<Cloud>) -> (Vec<Cloud>, u32) {
    let before = clouds.len();
    let kept: Vec<Cloud> = clouds.into_iter().filter(|c| c.age <= MAX_LIFETIME).collect();
    let removed = (before - kept.len()) as u32;
    (kept, removed)
}

/// Remove the oldest clouds until at most `target` remain. Equal ages go in list
/// order, matching a repeated linear scan for the first maximum.
pub fn cull_population(clouds: Vec<Cloud>, target: usize) -> (Vec<Cloud>, u32) {
    let excess = clouds.len().saturating_sub(target);
    if excess == 0 {
        return (clouds, 0);
    }

    let mut order: Vec<usize> = (0..clouds.len()).collect();
    order.sort_by(|&a, &b| clouds[b].age.cmp(&clouds[a].age).then(a.cmp(&b)));

    let mut doomed = vec![false; clouds.len()];
    for &idx in &order[..excess] {
        doomed[idx] = true;
    }

    let kept = clouds
        .into_iter()
        .zip(doomed)
        .filter_map(|(cloud, gone)| if gone { None } else { Some(cloud) })
        .collect();
    (kept, excess as u32)
}
