use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use graphbsp::algorithms::Algorithm;
use graphbsp::config::Config;

#[derive(Parser)]
#[command(name = "graphbsp", about = "Vertex-centric BSP graph analytics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an algorithm over an adjacency-list graph.
    Run(RunArgs),
    /// Generate a random adjacency-list graph.
    Generate(GenerateArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(value_enum)]
    algorithm: Algorithm,
    /// Adjacency-list input: one `id n1 n2 ...` line per vertex.
    input: PathBuf,
    output: PathBuf,
    #[arg(short, long, default_value_t = 8)]
    workers: usize,
    /// TOML file feeding the flat configuration surface.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// KEY=VALUE overrides applied on top of the config file.
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Args)]
struct GenerateArgs {
    output: PathBuf,
    #[arg(short = 'n', long, default_value_t = 1000)]
    vertices: i64,
    /// Edges attempted per vertex; duplicates and self-loops are dropped.
    #[arg(short, long, default_value_t = 8)]
    degree: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    graphbsp::init_logger_info();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Generate(args) => generate(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_toml_str(&fs::read_to_string(path)?)?,
        None => Config::new(),
    };
    for spec in &args.overrides {
        config.apply_override(spec)?;
    }

    args.algorithm
        .run(&args.input, &args.output, args.workers, config)?;
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut writer = BufWriter::new(fs::File::create(&args.output)?);

    for id in 0..args.vertices {
        let mut targets = BTreeSet::new();
        for _ in 0..args.degree {
            let target = rng.gen_range(0..args.vertices);
            if target != id {
                targets.insert(target);
            }
        }

        write!(writer, "{id}")?;
        for target in targets {
            write!(writer, "\t{target}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
