use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::simulation::SimulationConfig;
use crate::panels::{self, Panel};
use crate::persistence::{self, SimulationSnapshot};
use crate::simulation::irradiance::{self, PanelReading};
use crate::simulation::{Simulation, WeatherSnapshot};
use crate::sky::CloudView;

/// One output line: the weather, the cloud field and the panel estimates for a tick.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub weather: WeatherSnapshot,
    pub clouds: Vec<CloudView>,
    pub panels: Vec<PanelReading>,
}

impl FrameRecord {
    pub fn capture(simulation: &Simulation, tick: u64, panels: &[Panel]) -> Self {
        let weather = simulation.current_weather(tick);
        let clouds = simulation.active_clouds();
        let panels = irradiance::estimate_panels(panels, &clouds, weather.cloud_cover, weather.hour);
        FrameRecord {
            weather,
            clouds,
            panels,
        }
    }
}

/// Run the simulation to `total_ticks`, writing one frame record per tick.
pub fn run_simulation(
    config: &SimulationConfig,
    panels_path: Option<&str>,
    output: Option<&str>,
    resume: Option<&str>,
) -> Result<(), String> {
    // 1. Start fresh or resume
    let snapshot = match resume {
        Some(path) => {
            info!(path, "Resuming from snapshot");
            persistence::load_snapshot(Path::new(path))
                .map_err(|e| format!("Failed to load snapshot: {}", e))?
        }
        None => {
            let config = config.with_resolved_seed();
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            let simulation = Simulation::new(&config, &mut rng);
            SimulationSnapshot {
                config,
                simulation,
                rng,
            }
        }
    };
    let SimulationSnapshot {
        config: run_config,
        mut simulation,
        mut rng,
    } = snapshot;

    info!(
        seed = run_config.seed,
        season = run_config.season.name(),
        total_ticks = run_config.total_ticks,
        start_tick = simulation.sky.tick,
        pattern = simulation.sky.pattern.pattern.name(),
        "Simulation ready"
    );

    // 2. Panels
    let panels = match panels_path {
        Some(path) => {
            let panels = panels::load_panels(Path::new(path))?;
            info!(path, count = panels.len(), "Panels loaded");
            panels
        }
        None => Vec::new(),
    };

    // 3. Output sink
    let mut out: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| format!("Cannot create {}: {}", path, e))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    // 4. Tick loop
    let ticks_per_hour = u64::from(simulation.params.ticks_per_hour.max(1));
    while simulation.sky.tick < run_config.total_ticks {
        let stats = simulation.step(&mut rng);

        let frame = FrameRecord::capture(&simulation, stats.tick, &panels);
        serde_json::to_writer(&mut out, &frame)
            .map_err(|e| format!("Cannot write frame {}: {}", stats.tick, e))?;
        writeln!(out).map_err(|e| format!("Cannot write frame {}: {}", stats.tick, e))?;

        if (stats.tick + 1) % ticks_per_hour == 0 {
            info!(
                tick = stats.tick,
                hour = stats.hour,
                pattern = stats.pattern.name(),
                clouds = stats.cloud_count,
                active = stats.active_count,
                stability = stats.stability,
                "Hourly milestone"
            );
        }
    }
    out.flush().map_err(|e| format!("Cannot flush output: {}", e))?;

    // 5. Final snapshot
    let snapshot_dir = PathBuf::from(&run_config.snapshot_directory);
    let max_snapshots = run_config.max_snapshots as usize;
    let final_tick = simulation.sky.tick;
    let snapshot = SimulationSnapshot {
        config: run_config,
        simulation,
        rng,
    };
    match persistence::save_snapshot(&snapshot, &snapshot_dir) {
        Ok(path) => {
            info!(path = %path.display(), tick = final_tick, "Snapshot saved");
            if let Err(e) = persistence::prune_snapshots(&snapshot_dir, max_snapshots) {
                warn!(error = %e, "Snapshot pruning failed");
            }
        }
        Err(e) => warn!(error = %e, "Final snapshot save failed"),
    }

    info!(tick = final_tick, "Simulation stopped");
    Ok(())
}

/// Print the weather and cloud field of a snapshot (the latest valid one by default).
pub fn inspect(config: &SimulationConfig, snapshot_path: Option<&str>) -> Result<(), String> {
    let snapshot = match snapshot_path {
        Some(path) => persistence::load_snapshot(Path::new(path)),
        None => persistence::load_latest_valid_snapshot(Path::new(&config.snapshot_directory)),
    }
    .map_err(|e| format!("Failed to load snapshot: {}", e))?;

    print_summary(&snapshot);
    Ok(())
}

fn print_summary(snapshot: &SimulationSnapshot) {
    let sim = &snapshot.simulation;
    // The most recent tick that has been simulated
    let tick = sim.sky.tick.saturating_sub(1);
    let weather = sim.current_weather(tick);

    println!("=== Sky at tick {} ===", sim.sky.tick);
    println!("Seed: {}", snapshot.config.seed);
    println!("Season: {}", snapshot.config.season.name());
    println!(
        "Domain: {:.0} units, max {} clouds, {} ticks/hour",
        sim.params.domain_size, sim.params.max_clouds, sim.params.ticks_per_hour
    );
    println!();
    println!("--- Weather ---");
    println!("  Hour: {:.2}", weather.hour);
    println!("  Cloud cover: {:.1}%", weather.cloud_cover);
    println!("  Wind: {:.1} m/s @ {:.0}°", weather.wind_speed, weather.wind_direction);
    println!("  Stability: {:.2}", weather.stability);
    println!("  Field cover (cloud area): {:.1}%", weather.field_cover);
    match weather.trajectory {
        Some(t) => println!(
            "  Field drift: {:.1} km/h @ {:.0}° (confidence {:.2})",
            t.speed_kmh, t.direction, t.confidence
        ),
        None => println!("  Field drift: (no clouds)"),
    }
    println!();
    println!("--- Pattern ---");
    let pattern = &sim.sky.pattern;
    println!("  Type: {}", pattern.pattern.name());
    println!("  Target count: {}", pattern.target_count);
    println!(
        "  Since tick {} for {} ticks",
        pattern.changed_at, pattern.duration
    );
    println!();
    println!("--- Clouds ({}) ---", sim.sky.clouds.len());
    if sim.sky.clouds.is_empty() {
        println!("  (none)");
    } else {
        println!(
            "  {:>5} {:>8} {:>9} {:>9} {:>7} {:>7} {:>6} {:>5} {:>6}",
            "id", "class", "x", "y", "width", "height", "alpha", "age", "active"
        );
        for c in &sim.sky.clouds {
            println!(
                "  {:>5} {:>8} {:>9.1} {:>9.1} {:>7.0} {:>7.0} {:>6.3} {:>5} {:>6}",
                c.id,
                c.size_class.name(),
                c.x,
                c.y,
                c.width,
                c.height,
                c.opacity,
                c.age,
                c.active
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::{NamedTempFile, TempDir};

    fn config(dir: &TempDir) -> SimulationConfig {
        SimulationConfig {
            seed: 5,
            total_ticks: 24,
            snapshot_directory: dir.path().join("snaps").display().to_string(),
            max_snapshots: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn frame_record_serializes_panels() {
        let cfg = SimulationConfig {
            seed: 3,
            start_hour: 12.0,
            ..SimulationConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut sim = Simulation::new(&cfg, &mut rng);
        let stats = sim.step(&mut rng);
        let panels = [Panel {
            id: Some(1),
            x: 10.0,
            y: 10.0,
        }];
        let frame = FrameRecord::capture(&sim, stats.tick, &panels);
        assert_eq!(frame.clouds.len(), 1);
        assert_eq!(frame.panels.len(), 1);

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["weather"]["tick"], 0);
        assert_eq!(json["weather"]["pattern"], "scattered");
        assert!(json["panels"][0]["irradiance"].as_f64().unwrap() > 0.0);
        assert!(json["weather"]["field_cover"].is_number());
        assert!(json["weather"]["trajectory"]["speed_kmh"].is_number());
        assert_eq!(json["clouds"][0]["trail"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn run_writes_frames_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let mut panels_file = NamedTempFile::new().unwrap();
        writeln!(panels_file, "x,y\n100,100\n2500,2500").unwrap();
        let output = dir.path().join("frames.jsonl");

        run_simulation(
            &cfg,
            Some(panels_file.path().to_str().unwrap()),
            Some(output.to_str().unwrap()),
            None,
        )
        .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 24);
        let last: serde_json::Value = serde_json::from_str(lines[23]).unwrap();
        assert_eq!(last["weather"]["tick"], 23);
        assert_eq!(last["panels"].as_array().unwrap().len(), 2);

        let snaps = persistence::list_snapshots(Path::new(&cfg.snapshot_directory)).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].tick, 24);
    }

    #[test]
    fn resume_continues_to_new_total() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let output = dir.path().join("frames.jsonl");
        run_simulation(&cfg, None, Some(output.to_str().unwrap()), None).unwrap();

        // Extend the saved run by editing its config
        let snaps = persistence::list_snapshots(Path::new(&cfg.snapshot_directory)).unwrap();
        let mut snapshot = persistence::load_snapshot(&snaps[0].path).unwrap();
        snapshot.config.total_ticks = 36;
        let extended = persistence::save_snapshot(&snapshot, &dir.path().join("extended")).unwrap();

        let resumed_out = dir.path().join("resumed.jsonl");
        run_simulation(
            &cfg,
            None,
            Some(resumed_out.to_str().unwrap()),
            Some(extended.to_str().unwrap()),
        )
        .unwrap();

        let content = std::fs::read_to_string(&resumed_out).unwrap();
        let first: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(content.lines().count(), 12);
        assert_eq!(first["weather"]["tick"], 24);
    }

    #[test]
    fn repeated_runs_prune_to_limit() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("frames.jsonl");
        for total_ticks in [24, 25, 26] {
            let cfg = SimulationConfig {
                total_ticks,
                ..config(&dir)
            };
            run_simulation(&cfg, None, Some(output.to_str().unwrap()), None).unwrap();
        }
        let snaps = persistence::list_snapshots(&dir.path().join("snaps")).unwrap();
        let ticks: Vec<u64> = snaps.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![26, 25]);
    }

    #[test]
    fn missing_panels_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let output = dir.path().join("frames.jsonl");
        let err = run_simulation(
            &cfg,
            Some("/nonexistent/panels.csv"),
            Some(output.to_str().unwrap()),
            None,
        )
        .unwrap_err();
        assert!(err.contains("Cannot read"));
    }

    #[test]
    fn inspect_without_snapshots_fails() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let err = inspect(&cfg, None).unwrap_err();
        assert!(err.contains("No valid snapshots"));
    }

    #[test]
    fn inspect_latest_after_run() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let output = dir.path().join("frames.jsonl");
        run_simulation(&cfg, None, Some(output.to_str().unwrap()), None).unwrap();
        assert!(inspect(&cfg, None).is_ok());
    }
}
