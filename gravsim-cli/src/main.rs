use clap::{Parser, Subcommand, ValueEnum};
use gravsim_core::{
    read_snapshot, run_simulation, Body, SceneConfig, SimConfig, SnapshotFormat, StepDiagnostics,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gravsim")]
#[command(about = "gravsim - parallel all-pairs gravity simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation, writing one snapshot per step
    Run {
        /// YAML configuration file; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Number of bodies
        #[arg(short, long)]
        bodies: Option<usize>,

        /// Number of steps
        #[arg(short, long)]
        steps: Option<u64>,

        /// Snapshot directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Snapshot encoding
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Scene seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Decode one snapshot file and print a summary
    Inspect {
        /// Path to a snapshot file
        file: PathBuf,

        /// Snapshot encoding; guessed from the extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Print the default configuration as YAML
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Binary,
    Json,
}

impl From<FormatArg> for SnapshotFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Binary => SnapshotFormat::Binary,
            FormatArg::Json => SnapshotFormat::Json,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            workers,
            bodies,
            steps,
            output,
            format,
            seed,
        } => load_config(config.as_deref()).and_then(|mut cfg| {
            if let Some(w) = workers {
                cfg.worker_count = w;
            }
            if let Some(n) = bodies {
                cfg.body_count = n;
            }
            if let Some(s) = steps {
                cfg.step_count = s;
            }
            if let Some(dir) = output {
                cfg.snapshot.directory = dir;
            }
            if let Some(f) = format {
                cfg.snapshot.format = f.into();
            }
            if let Some(s) = seed {
                apply_seed(&mut cfg.scene, s);
            }
            run(cfg)
        }),
        Commands::Inspect { file, format } => inspect(&file, format.map(Into::into)),
        Commands::Config => print_default_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<SimConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
        None => Ok(SimConfig::default()),
    }
}

fn apply_seed(scene: &mut SceneConfig, seed: u64) {
    match scene {
        SceneConfig::RotatingDisc(disc) => disc.seed = seed,
        SceneConfig::DoubleDisc { first, second } => {
            first.seed = seed;
            second.seed = seed.wrapping_add(1);
        }
        SceneConfig::Grid(_) | SceneConfig::Explicit { .. } => {
            log::warn!("--seed has no effect on deterministic scenes");
        }
    }
}

fn run(cfg: SimConfig) -> Result<(), Box<dyn std::error::Error>> {
    let summary = run_simulation(cfg)?;
    println!(
        "{} steps, {} bodies, {} snapshots",
        summary.steps, summary.bodies, summary.snapshots
    );
    println!("{}", summary.last);
    Ok(())
}

fn inspect(file: &Path, format: Option<SnapshotFormat>) -> Result<(), Box<dyn std::error::Error>> {
    let format = match format {
        Some(f) => f,
        None => match file.extension().and_then(|e| e.to_str()) {
            Some("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Binary,
        },
    };

    let records = read_snapshot(file, format)?;
    let bodies: Vec<Body> = records.iter().map(Body::from).collect();
    if bodies.is_empty() {
        println!("{}: empty snapshot", file.display());
        return Ok(());
    }

    let (min, max) = bodies.iter().fold(
        (bodies[0].pos, bodies[0].pos),
        |(lo, hi), b| (lo.min(b.pos), hi.max(b.pos)),
    );

    println!("{}: {} bodies", file.display(), bodies.len());
    println!(
        "bounds x [{:.4}, {:.4}] y [{:.4}, {:.4}]",
        min.x, max.x, min.y, max.y
    );
    let step = file
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    println!("{}", StepDiagnostics::measure(step, &bodies));
    Ok(())
}

fn print_default_config() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", serde_yaml::to_string(&SimConfig::default())?);
    Ok(())
}
