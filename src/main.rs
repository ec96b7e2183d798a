use anyhow::Result;
use clap::Parser;
use log::{info, warn, error, debug, trace};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use aggregation_common::{PopulationSnapshot, SimulationConfig, StatisticsRow};
use aggregation_engine::{EngineError, PopulationVisitor, StatisticsVisitor, World};

/// Command-line arguments for the aggregation engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulation configuration (.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the random generator seed from the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of steps from the configuration
    #[arg(long)]
    steps: Option<u64>,
}

/// Everything recorded during a run, as written to the snapshot file.
#[derive(Serialize)]
struct RunRecord<'a> {
    population: &'a [PopulationSnapshot],
    statistics: &'a [StatisticsRow],
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Aggregation Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.initial_conditions.seed = seed;
    }
    if let Some(steps) = args.steps {
        config.run.total_steps = steps;
    }

    // The lattice dimension is a compile-time parameter of the engine.
    match config.lattice.dimension {
        1 => run::<1>(&config),
        2 => run::<2>(&config),
        3 => run::<3>(&config),
        4 => run::<4>(&config),
        d => Err(EngineError::UnsupportedDimension(d).into()),
    }
}

fn run<const D: usize>(config: &SimulationConfig) -> Result<()> {
    // --- Initialize World ---
    let params = config.get_sim_params();
    debug!("Simulation Parameters: {:#?}", params);
    let mut world = World::<D>::new(&params)?;

    let mut statistics = StatisticsVisitor::<D>::from_config(&config.statistics);
    let mut population = PopulationVisitor::new();

    let total_steps = config.run.total_steps;
    let record_interval_steps = config.run.record_interval_steps;
    let wall_clock_limit = config.run.max_wall_clock_secs.map(Duration::from_secs_f64);
    info!("Recording statistics every {} steps.", record_interval_steps);

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Record (step 0) ---
    world.accept(&mut population)?;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        let report = match world.step() {
            Ok(report) => report,
            Err(e) => {
                error!("Error during simulation step {}: {}", step + 1, e);
                anyhow::bail!("Simulation step failed.");
            }
        };
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let print_interval_secs = 5.0;
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let out_of_time = wall_clock_limit.is_some_and(|limit| start_time.elapsed() >= limit);
        let is_last_step = step + 1 == total_steps || out_of_time;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "Step [{}/{}] | Free: {} | Clusters: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                world.particles().len(),
                world.clusters().len(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_step || is_last_step {
                world.accept(&mut population)?;
                world.accept(&mut statistics)?;
            }
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms: {:?}",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0,
                report
            );
        }

        if out_of_time {
            warn!("Wall-clock limit reached after {} steps; stopping early.", step + 1);
            break;
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished {} steps in {:.3} seconds.",
        world.step_count(),
        total_duration.as_secs_f64()
    );

    // --- Save Recorded Data ---
    let base = &config.output.base_filename;
    if config.output.save_stats {
        let table_name = format!("{}_statistics.tsv", base);
        statistics.write_table(BufWriter::new(File::create(&table_name)?))?;
        info!("Statistics table saved to {}", table_name);

        let record = RunRecord {
            population: population.snapshots(),
            statistics: statistics.rows(),
        };
        save_record(&record, base, config.output.format.as_deref().unwrap_or("json"))?;
    } else {
        info!("Skipping saving statistics as per config (save_stats is false).");
    }

    if config.output.save_positions {
        save_positions(&world, base)?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Serializes the run record in the configured format.
fn save_record(record: &RunRecord<'_>, base: &str, format: &str) -> Result<()> {
    match format {
        "json" => {
            let filename = format!("{}_snapshots.json", base);
            let mut file = BufWriter::new(File::create(&filename)?);
            serde_json::to_writer(&mut file, record)?;
            file.flush()?;
            info!("Snapshots saved to {}", filename);
        }
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base);
            bincode::serialize_into(BufWriter::new(File::create(&filename)?), record)?;
            info!("Snapshots saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base);
            let mut file = BufWriter::new(File::create(&filename)?);
            rmp_serde::encode::write(&mut file, record)?;
            file.flush()?;
            info!("Snapshots saved to {} (MessagePack format)", filename);
        }
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            save_record(record, base, "json")?;
        }
    }
    Ok(())
}

/// Writes every occupied site, free particles first, as CSV.
fn save_positions<const D: usize>(world: &World<D>, base: &str) -> Result<()> {
    let filename = format!("{}_final_positions.csv", base);
    let mut writer = csv::Writer::from_path(&filename)?;

    let mut header = vec!["kind".to_string(), "cluster".to_string(), "score".to_string()];
    header.extend((0..D).map(|axis| format!("x{}", axis)));
    writer.write_record(&header)?;

    for p in world.particles() {
        let mut record = vec!["free".to_string(), String::new(), format!("{}", p.score)];
        record.extend(p.position.coords().iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    for (n, cluster) in world.clusters().iter().enumerate() {
        for member in cluster.particles() {
            let mut record = vec!["cluster".to_string(), n.to_string(), format!("{}", member.score)];
            record.extend(cluster.abs_position(member).coords().iter().map(|c| c.to_string()));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    info!("Final positions saved to {}", filename);
    Ok(())
}
