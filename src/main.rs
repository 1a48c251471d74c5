use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, LevelFilter};
use potts_common::SimulationConfig;
use potts_engine::matrix_io::load_state;
use potts_engine::{FileRecorder, Hamiltonian, PottsSimulation};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

/// Command-line arguments for the Potts engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a Monte Carlo simulation
    Run {
        /// Path to the config.toml file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Override the random seed from the config
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of steps from the config
        #[arg(long)]
        steps: Option<u64>,

        /// Override the output directory from the config
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Print the Hamiltonian of a spin matrix and its spin -> type mapping
    Energy {
        /// Path to the config.toml file (energy and boundary parameters)
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Spin-id matrix file
        #[arg(long)]
        spins: PathBuf,

        /// Spin -> type id file
        #[arg(long)]
        types: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let result = match args.command {
        Command::Run { config, seed, steps, output_dir, no_progress } => {
            run(config, seed, steps, output_dir, no_progress)
        }
        Command::Energy { config, spins, types } => energy(config, spins, types),
    };

    report(result)
}

/// Logs a failed run once and replaces it with a short exit message.
fn report(result: Result<()>) -> Result<()> {
    if let Err(e) = result {
        error!("{:#}", e);
        anyhow::bail!("Potts engine stopped with an error.");
    }
    Ok(())
}

fn run(
    config_path: PathBuf,
    seed: Option<u64>,
    steps: Option<u64>,
    output_dir: Option<PathBuf>,
    no_progress: bool,
) -> Result<()> {
    info!("Starting Potts Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&config_path)?;
    if let Some(seed) = seed {
        config.sampling.seed = Some(seed);
    }
    if let Some(steps) = steps {
        config.schedule.steps = steps;
    }
    if let Some(dir) = output_dir {
        config.output.directory = dir.display().to_string();
    }
    info!(
        "Lattice {}x{} with {} spins, {} steps, snapshot every {} steps.",
        config.lattice.world_x,
        config.lattice.world_y,
        config.lattice.total_spins,
        config.schedule.steps,
        config.output.save_every
    );

    // --- Initialize Simulation ---
    let mut sim = PottsSimulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());
    info!("Random seed: {}", sim.seed());
    let mut recorder = FileRecorder::create(&sim.config().output)?;

    // --- Simulation Loop ---
    let total_steps = sim.params().steps + 1;
    let progress_bar = if no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_steps)
    };
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({percent}%) [{eta}] {msg}")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let summary = sim.run_with_progress(&mut recorder, |record| {
        if record.step % 1000 == 0 {
            progress_bar.set_message(format!("E={:.2} best={:.2}", record.current_energy, record.best_energy));
            progress_bar.set_position(record.step + 1);
        }
    })?;
    progress_bar.finish_and_clear();

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({:.0} steps/s).",
        total_duration.as_secs_f64(),
        total_steps as f64 / total_duration.as_secs_f64().max(1e-9)
    );
    info!(
        "Best energy {:.6} (initial {:.6}), acceptance ratio {:.4}.",
        summary.best_energy,
        summary.initial_energy,
        summary.acceptance_ratio()
    );

    let summary_path = recorder.directory().join(format!("{}_run_summary.json", sim.config().output.base_filename));
    let file = File::create(&summary_path)
        .with_context(|| format!("Failed to create run summary file: {}", summary_path.display()))?;
    serde_json::to_writer_pretty(file, &summary).context("Failed to serialize run summary")?;
    info!("Results written to {}", recorder.directory().display());
    Ok(())
}

fn energy(config_path: PathBuf, spins: PathBuf, types: PathBuf) -> Result<()> {
    info!("Running in hamiltonian check mode, use `run` for simulations.");
    let config = SimulationConfig::load(&config_path)?;
    let params = config.get_sim_params();
    let state = load_state(&spins, &types)?;
    let hamiltonian = Hamiltonian::new(&params);
    let breakdown = hamiltonian.breakdown(&state);
    debug!("Surface term {:.6}, area term {:.6}", breakdown.surface, breakdown.area);
    println!("Hamiltonian of given configuration: {:.6}", breakdown.total());
    Ok(())
}
