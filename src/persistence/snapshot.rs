use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::config::simulation::SimulationConfig;
use crate::simulation::Simulation;

const FILE_PREFIX: &str = "sky-tick";
const FILE_SUFFIX: &str = ".bin";

/// A resumable run: the config it was started with, the controller state and the
/// exact position of its random stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub config: SimulationConfig,
    pub simulation: Simulation,
    pub rng: ChaCha8Rng,
}

/// A snapshot file found on disk, described by its name and size only.
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    /// Next tick the stored simulation would run
    pub tick: u64,
    /// Unix seconds at save time
    pub timestamp: u64,
    pub file_size: u64,
}

#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    Serialize(String),
    Deserialize(String),
    /// Decoded fine but the stored sky breaks an invariant
    Corrupt { path: PathBuf, reason: &'static str },
    NoValidSnapshots,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "snapshot I/O failed: {}", e),
            SnapshotError::Serialize(e) => write!(f, "cannot encode snapshot: {}", e),
            SnapshotError::Deserialize(e) => write!(f, "cannot decode snapshot: {}", e),
            SnapshotError::Corrupt { path, reason } => {
                write!(f, "{} is corrupt: {}", path.display(), reason)
            }
            SnapshotError::NoValidSnapshots => write!(
                f,
                "No valid snapshots found. Start a new run with: cloudfield run"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

fn snapshot_filename(tick: u64, timestamp: u64) -> String {
    format!("{}{}-{}{}", FILE_PREFIX, tick, timestamp, FILE_SUFFIX)
}

/// `(tick, timestamp)` from `sky-tick{N}-{unix_secs}.bin`; `None` for anything else.
fn parse_snapshot_filename(filename: &str) -> Option<(u64, u64)> {
    let (tick, timestamp) = filename
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .split_once('-')?;
    Some((tick.parse().ok()?, timestamp.parse().ok()?))
}

fn unix_timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Write `bytes` next to `target` under a dot-prefixed name, then rename over it.
/// The partial file is removed if either step fails.
fn write_then_rename(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    let staging = target.with_file_name(format!(".{}.tmp", name));
    fs::write(&staging, bytes)
        .and_then(|_| fs::rename(&staging, target))
        .inspect_err(|_| {
            let _ = fs::remove_file(&staging);
        })
}

/// Encode `snapshot` with bincode into `snapshot_dir`, creating the directory if needed.
pub fn save_snapshot(
    snapshot: &SimulationSnapshot,
    snapshot_dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    let bytes =
        bincode::serialize(snapshot).map_err(|e| SnapshotError::Serialize(e.to_string()))?;
    fs::create_dir_all(snapshot_dir)?;

    let target = snapshot_dir.join(snapshot_filename(
        snapshot.simulation.sky.tick,
        unix_timestamp_now(),
    ));
    write_then_rename(&target, &bytes)?;
    Ok(target)
}

fn invariant_violation(snapshot: &SimulationSnapshot) -> Option<&'static str> {
    let sim = &snapshot.simulation;
    if !sim.climate.is_consistent() {
        Some("climate series lengths or ranges disagree")
    } else if !sim.sky.clouds.iter().all(|c| c.is_valid()) {
        Some("cloud opacity or extent out of range")
    } else {
        None
    }
}

/// Decode a snapshot and check the climate series and every cloud before handing it out.
pub fn load_snapshot(path: &Path) -> Result<SimulationSnapshot, SnapshotError> {
    let bytes = fs::read(path)?;
    let snapshot: SimulationSnapshot =
        bincode::deserialize(&bytes).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;

    match invariant_violation(&snapshot) {
        Some(reason) => Err(SnapshotError::Corrupt {
            path: path.to_path_buf(),
            reason,
        }),
        None => Ok(snapshot),
    }
}

/// Snapshot files in `snapshot_dir`, newest save first. A missing directory is empty.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    if !snapshot_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(snapshot_dir)? {
        let entry = entry?;
        let path = entry.path();
        // Staging files start with a dot and never parse
        let parsed = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_snapshot_filename);
        let Some((tick, timestamp)) = parsed else {
            continue;
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_file() {
            snapshots.push(SnapshotMetadata {
                path,
                tick,
                timestamp,
                file_size: meta.len(),
            });
        }
    }

    snapshots.sort_by(|a, b| (b.timestamp, b.tick).cmp(&(a.timestamp, a.tick)));
    Ok(snapshots)
}

/// Delete all but the `keep` newest snapshots, returning what was removed.
pub fn prune_snapshots(snapshot_dir: &Path, keep: usize) -> Result<Vec<PathBuf>, SnapshotError> {
    let mut removed = Vec::new();
    for stale in list_snapshots(snapshot_dir)?.into_iter().skip(keep) {
        fs::remove_file(&stale.path)?;
        removed.push(stale.path);
    }
    Ok(removed)
}

/// Newest snapshot that decodes and passes validation. Bad files are logged and skipped.
pub fn load_latest_valid_snapshot(
    snapshot_dir: &Path,
) -> Result<SimulationSnapshot, SnapshotError> {
    list_snapshots(snapshot_dir)?
        .iter()
        .find_map(|meta| match load_snapshot(&meta.path) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %meta.path.display(), error = %e, "Skipping unusable snapshot");
                None
            }
        })
        .ok_or(SnapshotError::NoValidSnapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    fn make_snapshot(seed: u64, ticks: u64) -> SimulationSnapshot {
        let config = SimulationConfig {
            seed,
            total_ticks: 48,
            ..SimulationConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut simulation = Simulation::new(&config, &mut rng);
        for _ in 0..ticks {
            simulation.step(&mut rng);
        }
        SimulationSnapshot {
            config,
            simulation,
            rng,
        }
    }

    #[test]
    fn save_and_load_round_trip_identical() {
        let dir = TempDir::new().unwrap();
        let snapshot = make_snapshot(42, 20);

        let path = save_snapshot(&snapshot, dir.path()).unwrap();
        let restored = load_snapshot(&path).unwrap();

        assert_eq!(snapshot, restored);
    }

    #[test]
    fn resumed_run_continues_identically() {
        let dir = TempDir::new().unwrap();
        let mut original = make_snapshot(7, 10);
        let path = save_snapshot(&original, dir.path()).unwrap();
        let mut resumed = load_snapshot(&path).unwrap();

        for _ in 0..20 {
            let a = original.simulation.step(&mut original.rng);
            let b = resumed.simulation.step(&mut resumed.rng);
            assert_eq!(a, b);
        }
        assert_eq!(original.simulation, resumed.simulation);
        assert_eq!(original.rng.r#gen::<u64>(), resumed.rng.r#gen::<u64>());
    }

    #[test]
    fn filename_encodes_tick() {
        let dir = TempDir::new().unwrap();
        let path = save_snapshot(&make_snapshot(1, 5), dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sky-tick5-"));
        assert_eq!(parse_snapshot_filename(name).map(|(t, _)| t), Some(5));
    }

    #[test]
    fn parse_rejects_foreign_files() {
        assert_eq!(parse_snapshot_filename("sky-tick12-1700000000.bin"), Some((12, 1700000000)));
        assert_eq!(parse_snapshot_filename("world-tick12-1700000000.bin"), None);
        assert_eq!(parse_snapshot_filename("sky-tick12.bin"), None);
        assert_eq!(parse_snapshot_filename("notes.txt"), None);
    }

    #[test]
    fn garbage_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sky-tick1-1.bin");
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(SnapshotError::Deserialize(_))
        ));
    }

    #[test]
    fn invalid_cloud_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut snapshot = make_snapshot(3, 10);
        assert!(!snapshot.simulation.sky.clouds.is_empty());
        snapshot.simulation.sky.clouds[0].opacity = 2.0;
        let path = save_snapshot(&snapshot, dir.path()).unwrap();
        assert!(matches!(load_snapshot(&path), Err(SnapshotError::Corrupt { .. })));
    }

    #[test]
    fn failed_rename_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory where the snapshot should land blocks the rename
        let target = dir.path().join("sky-tick1-1.bin");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        assert!(write_then_rename(&target, b"payload").is_err());
        assert!(!dir.path().join(".sky-tick1-1.bin.tmp").exists());
        assert!(list_snapshots(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn list_skips_temp_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sky-tick3-100.bin"), b"x").unwrap();
        fs::write(dir.path().join("sky-tick9-200.bin"), b"x").unwrap();
        fs::write(dir.path().join(".sky-tick9-300.bin.tmp"), b"x").unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let listed = list_snapshots(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].tick, 9);
        assert_eq!(listed[1].tick, 3);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let listed = list_snapshots(Path::new("/nonexistent/snapshots")).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for ts in 1..=5 {
            fs::write(dir.path().join(snapshot_filename(ts, ts)), b"x").unwrap();
        }
        let deleted = prune_snapshots(dir.path(), 2).unwrap();
        assert_eq!(deleted.len(), 3);
        let remaining: Vec<u64> = list_snapshots(dir.path())
            .unwrap()
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(remaining, vec![5, 4]);
    }

    #[test]
    fn latest_valid_skips_corrupt() {
        let dir = TempDir::new().unwrap();
        let good = make_snapshot(11, 4);
        let good_path = save_snapshot(&good, dir.path()).unwrap();
        // A newer but unreadable file
        let (_, ts) = parse_snapshot_filename(good_path.file_name().unwrap().to_str().unwrap()).unwrap();
        fs::write(dir.path().join(snapshot_filename(99, ts + 10)), b"garbage").unwrap();

        let loaded = load_latest_valid_snapshot(dir.path()).unwrap();
        assert_eq!(loaded, good);
    }

    #[test]
    fn latest_valid_with_nothing_usable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sky-tick1-1.bin"), b"garbage").unwrap();
        assert!(matches!(
            load_latest_valid_snapshot(dir.path()),
            Err(SnapshotError::NoValidSnapshots)
        ));
    }
}
