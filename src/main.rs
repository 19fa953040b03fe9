//! BIOSIM - CLI Entry Point
//!
//! Headless island ecosystem simulator.

use biosim::checkpoint::{Checkpoint, CheckpointManager};
use biosim::population::{self, PopulationEntry};
use biosim::{benchmark, BioSim, Config, Species, Stats, DEFAULT_MAP};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "biosim")]
#[command(version)]
#[command(about = "Island ecosystem simulator: herbivores and carnivores over yearly cycles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Island map file; the classic island is used when omitted
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Initial population (JSON or YAML); the classic population is used when omitted
        #[arg(short, long)]
        population: Option<PathBuf>,

        /// Number of years to simulate (overrides the configuration)
        #[arg(short, long)]
        years: Option<u32>,

        /// Output directory for checkpoints and statistics
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed (overrides the configuration)
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume simulation from checkpoint
    Resume {
        /// Checkpoint file to resume from
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Number of additional years
        #[arg(short, long, default_value = "100")]
        years: u32,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Years between checkpoints
        #[arg(long, default_value = "50")]
        checkpoint_interval: u32,
    },

    /// Run performance benchmark on the classic island
    Benchmark {
        /// Number of years
        #[arg(short, long, default_value = "100")]
        years: u32,

        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },
}

fn main() -> CliResult {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            map,
            population,
            years,
            output,
            seed,
            quiet,
        } => run_simulation(config, map, population, years, output, seed, quiet),

        Commands::Resume {
            checkpoint,
            years,
            output,
            checkpoint_interval,
        } => resume_simulation(checkpoint, years, output, checkpoint_interval),

        Commands::Benchmark { years, seed } => run_benchmark(years, seed),

        Commands::Init { output } => generate_config(output),

        Commands::Analyze { checkpoint } => analyze_checkpoint(checkpoint),
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_population(path: &Path) -> Result<Vec<PopulationEntry>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let entries = if is_json {
        population::parse_json(&text)?
    } else {
        population::parse_yaml(&text)?
    };
    Ok(entries)
}

fn run_simulation(
    config_path: PathBuf,
    map_path: Option<PathBuf>,
    population_path: Option<PathBuf>,
    years: Option<u32>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> CliResult {
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    init_logging(&config.logging.log_level);
    if config_path.exists() {
        println!("Loaded config from: {:?}", config_path);
    } else {
        println!("Using default configuration");
    }

    if let Some(s) = seed {
        config.simulation.seed = s;
    }
    let years = years.unwrap_or(config.simulation.years);

    let map = match &map_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEFAULT_MAP.to_string(),
    };
    let population = match &population_path {
        Some(path) => load_population(path)?,
        None => population::default_population(),
    };

    std::fs::create_dir_all(&output)?;

    let mut sim = BioSim::from_config(&map, &population, &config)?;
    sim.set_stop_on_extinction(true);

    let (rows, cols) = sim.island().shape();
    println!("Starting simulation");
    println!("  Island: {}x{}", rows, cols);
    println!("  Seed: {}", config.simulation.seed);
    println!("  Initial animals: {}", sim.num_animals());
    println!("  Years: {}", years);
    println!();

    let mut checkpoint_mgr = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        config.logging.checkpoint_interval,
        10, // Keep last 10 checkpoints
    )?;

    let start = Instant::now();
    let stats_interval = config.simulation.stats_interval.max(1);

    sim.simulate_with_callback(years, |sim, stats| {
        report_year(stats, stats_interval, quiet);
        save_checkpoint(&mut checkpoint_mgr, sim, quiet);
    })?;

    finish(&sim, &output, start.elapsed().as_secs_f64())
}

fn resume_simulation(
    checkpoint_path: PathBuf,
    years: u32,
    output: PathBuf,
    checkpoint_interval: u32,
) -> CliResult {
    init_logging("info");
    println!("Loading checkpoint: {:?}", checkpoint_path);

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let mut sim = BioSim::from_checkpoint(checkpoint);
    sim.set_stop_on_extinction(true);

    println!("Resumed at year {}", sim.year());
    println!("Animals: {}", sim.num_animals());
    println!("Running {} additional years", years);
    println!();

    std::fs::create_dir_all(&output)?;

    let mut checkpoint_mgr =
        CheckpointManager::new(output.to_string_lossy().to_string(), checkpoint_interval, 10)?;
    let stats_interval = sim.stats_history().interval;

    let start = Instant::now();
    sim.simulate_with_callback(years, |sim, stats| {
        report_year(stats, stats_interval, false);
        save_checkpoint(&mut checkpoint_mgr, sim, false);
    })?;

    finish(&sim, &output, start.elapsed().as_secs_f64())
}

fn report_year(stats: &Stats, interval: u32, quiet: bool) {
    if !quiet && stats.year % interval == 0 {
        println!("{}", stats.summary());
    }
}

fn save_checkpoint(manager: &mut CheckpointManager, sim: &BioSim, quiet: bool) {
    if manager.should_save(sim.year()) {
        match manager.save(&sim.create_checkpoint()) {
            Ok(path) => {
                if !quiet {
                    println!("  Checkpoint saved: {}", path);
                }
            }
            Err(e) => eprintln!("  Checkpoint error: {}", e),
        }
    }
}

fn finish(sim: &BioSim, output: &Path, elapsed: f64) -> CliResult {
    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed);
    println!("Year: {}", sim.year());
    for (species, count) in sim.num_animals_per_species() {
        println!("{}: {}", species, count);
    }
    if sim.num_animals() == 0 {
        println!("All animals died out");
    }

    let final_path = output.join("checkpoint_final.bin");
    sim.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    let stats_path = output.join("stats_history.json");
    sim.stats_history().save(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);

    Ok(())
}

fn run_benchmark(years: u32, seed: u64) -> CliResult {
    init_logging("warn");
    println!("=== BIOSIM Benchmark ===");
    println!("Years: {}", years);
    println!();

    let result = benchmark(years, seed)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> CliResult {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> CliResult {
    init_logging("info");
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let island = &checkpoint.island;

    println!("Year: {}", island.year());
    println!("Seed: {}", island.seed());
    println!();

    let stats = Stats::from_island(island);
    for species in Species::ALL {
        let s = stats.species(species);
        println!(
            "{:<10} count {:6} | fitness {:.3} | age {:.1} | weight {:.1}",
            species.name(),
            s.count,
            s.fitness_mean,
            s.age_mean,
            s.weight_mean
        );
    }

    // Terrain map with the busiest cell highlighted
    println!();
    let (rows, _) = island.shape();
    let busiest = island
        .animal_distribution()
        .into_iter()
        .max_by_key(|c| c.total())
        .filter(|c| c.total() > 0);
    for row in 1..=rows {
        let line: String = island
            .cells()
            .filter(|((r, _), _)| *r == row)
            .map(|(loc, cell)| {
                let symbol = if busiest.is_some_and(|b| b.loc == *loc) {
                    '*'
                } else {
                    cell.terrain().code()
                };
                format!("{}{}", cell.terrain().color_code(), symbol)
            })
            .collect();
        println!("{}\x1b[0m", line);
    }
    if let Some(b) = busiest {
        println!(
            "Busiest cell {:?}: {} herbivores, {} carnivores",
            b.loc, b.herbivores, b.carnivores
        );
    }

    println!();
    println!(
        "Checkpoint size: {:.2} MB",
        checkpoint.size_bytes() as f64 / 1_000_000.0
    );

    Ok(())
}
