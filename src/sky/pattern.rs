use rand::Rng;
use serde::{Deserialize, Serialize};

/// Below this stability, pattern durations are shortened.
pub const LOW_STABILITY_THRESHOLD: f64 = 0.4;

const LOW_STABILITY_MIN_SHIFT: u64 = 12;
const LOW_STABILITY_MAX_SHIFT: u64 = 24;
const MIN_DURATION_FLOOR: u64 = 6;
const MAX_DURATION_FLOOR: u64 = 12;

/// Named spawn pattern, governing cloud count and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Scattered,
    Clustered,
    Isolated,
}

/// Catalog entry for a pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSpec {
    /// Weight for the initial draw only; later changes use the transition table.
    pub probability: f64,
    /// Inclusive target cloud count range
    pub count: (u32, u32),
    /// Probability a new cloud spawns next to an existing one
    pub grouping: f64,
    /// Inclusive duration range in ticks
    pub duration: (u64, u64),
    /// Size factor passed to new clouds
    pub size_factor: f64,
}

/// Cumulative thresholds for the initial draw, in catalog order.
const INITIAL_TABLE: [(Pattern, f64); 3] = [
    (Pattern::Scattered, 0.5),
    (Pattern::Clustered, 0.8),
    (Pattern::Isolated, 1.0),
];

impl Pattern {
    pub const DEFAULT: Pattern = Pattern::Scattered;

    pub fn all() -> &'static [Pattern] {
        &[Pattern::Scattered, Pattern::Clustered, Pattern::Isolated]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::Scattered => "scattered",
            Pattern::Clustered => "clustered",
            Pattern::Isolated => "isolated",
        }
    }

    pub fn spec(&self) -> PatternSpec {
        match self {
            Pattern::Scattered => PatternSpec {
                probability: 0.5,
                count: (6, 12),
                grouping: 0.2,
                duration: (36, 96),
                size_factor: 1.0,
            },
            Pattern::Clustered => PatternSpec {
                probability: 0.3,
                count: (8, 15),
                grouping: 0.7,
                duration: (24, 72),
                size_factor: 0.9,
            },
            Pattern::Isolated => PatternSpec {
                probability: 0.2,
                count: (2, 5),
                grouping: 0.05,
                duration: (48, 120),
                size_factor: 1.2,
            },
        }
    }

    /// Cumulative next-pattern thresholds, keyed by the current pattern.
    /// Tuned by hand; staying put or moving to a neighbouring pattern is favoured.
    pub fn transition_table(&self) -> [(Pattern, f64); 3] {
        match self {
            Pattern::Scattered => [
                (Pattern::Scattered, 0.5),
                (Pattern::Clustered, 0.8),
                (Pattern::Isolated, 1.0),
            ],
            Pattern::Clustered => [
                (Pattern::Scattered, 0.45),
                (Pattern::Clustered, 0.85),
                (Pattern::Isolated, 1.0),
            ],
            Pattern::Isolated => [
                (Pattern::Scattered, 0.4),
                (Pattern::Clustered, 0.5),
                (Pattern::Isolated, 1.0),
            ],
        }
    }

    /// Duration range, shortened in unstable air.
    pub fn duration_range(&self, stability: f64) -> (u64, u64) {
        let (lo, hi) = self.spec().duration;
        if stability < LOW_STABILITY_THRESHOLD {
            (
                lo.saturating_sub(LOW_STABILITY_MIN_SHIFT).max(MIN_DURATION_FLOOR),
                hi.saturating_sub(LOW_STABILITY_MAX_SHIFT).max(MAX_DURATION_FLOOR),
            )
        } else {
            (lo, hi)
        }
    }
}

fn pick(table: &[(Pattern, f64)], r: f64) -> Pattern {
    table
        .iter()
        .find(|(_, cumulative)| *cumulative >= r)
        .map(|(pattern, _)| *pattern)
        .unwrap_or(Pattern::DEFAULT)
}

/// Current pattern plus its drawn target count and duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternState {
    pub pattern: Pattern,
    /// Tick of the last change
    pub changed_at: u64,
    /// Ticks until the next re-evaluation, counted from `changed_at`
    pub duration: u64,
    pub target_count: u32,
}

impl PatternState {
    /// Enter `pattern` at `tick`, drawing its target count and duration.
    pub fn enter<R: Rng + ?Sized>(pattern: Pattern, tick: u64, stability: f64, rng: &mut R) -> Self {
        let (count_lo, count_hi) = pattern.spec().count;
        let target_count = rng.gen_range(count_lo..=count_hi.max(count_lo));
        let (dur_lo, dur_hi) = pattern.duration_range(stability);
        let duration = rng.gen_range(dur_lo..=dur_hi.max(dur_lo));
        PatternState {
            pattern,
            changed_at: tick,
            duration,
            target_count,
        }
    }

    /// Starting state: the default pattern, or a catalog-weighted draw.
    pub fn initial<R: Rng + ?Sized>(randomize: bool, stability: f64, rng: &mut R) -> Self {
        let pattern = if randomize {
            pick(&INITIAL_TABLE, rng.r#gen::<f64>())
        } else {
            Pattern::DEFAULT
        };
        PatternState::enter(pattern, 0, stability, rng)
    }

    pub fn is_due(&self, tick: u64) -> bool {
        tick.saturating_sub(self.changed_at) >= self.duration
    }

    /// Next state drawn from the current pattern's transition table.
    pub fn transition<R: Rng + ?Sized>(&self, tick: u64, stability: f64, rng: &mut R) -> Self {
        let next = pick(&self.pattern.transition_table(), rng.r#gen::<f64>());
        PatternState::enter(next, tick, stability, rng)
    }

    pub fn spec(&self) -> PatternSpec {
        self.pattern.spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    #[test]
    fn tables_are_cumulative_and_complete() {
        let mut tables: Vec<Vec<(Pattern, f64)>> = vec![INITIAL_TABLE.to_vec()];
        for p in Pattern::all() {
            tables.push(p.transition_table().to_vec());
        }
        for table in tables {
            let mut prev = 0.0;
            for (_, c) in &table {
                assert!(*c >= prev);
                prev = *c;
            }
            assert_eq!(prev, 1.0);
        }
    }

    #[test]
    fn initial_table_matches_catalog_probabilities() {
        let mut cumulative = 0.0;
        for (pattern, threshold) in INITIAL_TABLE {
            cumulative += pattern.spec().probability;
            assert!((cumulative - threshold).abs() < 1e-12);
        }
    }

    #[test]
    fn default_initial_pattern_is_fixed() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            let state = PatternState::initial(false, 0.5, &mut rng);
            assert_eq!(state.pattern, Pattern::Scattered);
            assert_eq!(state.changed_at, 0);
        }
    }

    #[test]
    fn entered_state_draws_within_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for pattern in Pattern::all() {
            for _ in 0..200 {
                let s = PatternState::enter(*pattern, 10, 0.6, &mut rng);
                let spec = pattern.spec();
                assert!(s.target_count >= spec.count.0 && s.target_count <= spec.count.1);
                assert!(s.duration >= spec.duration.0 && s.duration <= spec.duration.1);
                assert_eq!(s.changed_at, 10);
            }
        }
    }

    #[test]
    fn low_stability_shortens_durations() {
        assert_eq!(Pattern::Scattered.duration_range(0.2), (24, 72));
        assert_eq!(Pattern::Clustered.duration_range(0.2), (12, 48));
        assert_eq!(Pattern::Isolated.duration_range(0.39), (36, 96));
        assert_eq!(Pattern::Isolated.duration_range(0.4), (48, 120));
    }

    #[test]
    fn low_stability_floors_hold() {
        for pattern in Pattern::all() {
            let (lo, hi) = pattern.duration_range(0.0);
            assert!(lo >= MIN_DURATION_FLOOR);
            assert!(hi >= MAX_DURATION_FLOOR);
            assert!(lo <= hi);
        }
    }

    #[test]
    fn is_due_after_duration() {
        let state = PatternState {
            pattern: Pattern::Isolated,
            changed_at: 100,
            duration: 30,
            target_count: 3,
        };
        assert!(!state.is_due(100));
        assert!(!state.is_due(129));
        assert!(state.is_due(130));
    }

    #[test]
    fn transitions_follow_current_pattern_table() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let from = PatternState::enter(Pattern::Isolated, 0, 0.6, &mut rng);
        let mut counts: HashMap<Pattern, u32> = HashMap::new();
        let n = 10_000;
        for _ in 0..n {
            *counts.entry(from.transition(50, 0.6, &mut rng).pattern).or_default() += 1;
        }
        let frac = |p: Pattern| *counts.get(&p).unwrap_or(&0) as f64 / n as f64;
        assert!((frac(Pattern::Isolated) - 0.5).abs() < 0.03);
        assert!((frac(Pattern::Scattered) - 0.4).abs() < 0.03);
        assert!((frac(Pattern::Clustered) - 0.1).abs() < 0.02);
    }

    #[test]
    fn pick_falls_back_to_default() {
        assert_eq!(pick(&INITIAL_TABLE, 2.0), Pattern::DEFAULT);
        assert_eq!(pick(&INITIAL_TABLE, 0.79), Pattern::Clustered);
    }
}
