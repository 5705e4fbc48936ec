use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use log::{debug, info};
use rand::rngs::SmallRng;

use mc_moments::clt::CltValidator;
use mc_moments::distributions::{Distribution, Normal, Uniform};
use mc_moments::functions::{Expr, Function};
use mc_moments::io::{load_function, write_csv, ParseMode};
use mc_moments::random::{create_rng, DEFAULT_SEED};
use mc_moments::stats::{moment_order, MomentMode, MonteCarloApproximator, Statistic};

/// Largest input or output dimension accepted on the command line.
const MAX_DIM: usize = 4;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DistKind {
    /// Standard normal N(0, 1) in every input dimension.
    Normal,
    /// Standard uniform U(0, 1) in every input dimension.
    Uniform,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Monte Carlo estimation of moments of f(X)")]
struct Cli {
    /// Function definition file.
    #[arg(long, value_name = "PATH", value_parser = existing_file)]
    function: PathBuf,

    /// Statistic to estimate (moment, mean, variance, var, std, skewness,
    /// kurtosis, hyperskewness, hypertailedness).
    #[arg(long, value_name = "STAT", default_value = "moment")]
    stat: Statistic,

    /// Moment order, required for `--stat moment`.
    #[arg(short = 'k', value_name = "INT", allow_negative_numbers = true)]
    k: Option<i64>,

    /// Moment type (raw, central, standardized).
    #[arg(long, value_name = "MODE", default_value = "standardized")]
    mode: MomentMode,

    /// Input distribution.
    #[arg(long, value_enum, default_value = "normal")]
    dist: DistKind,

    /// Number of samples.
    #[arg(short = 'n', long = "n", value_name = "INT", default_value_t = 1000)]
    n: usize,

    /// Directory for CSV output.
    #[arg(long, value_name = "DIR", value_parser = existing_dir)]
    output: Option<PathBuf>,

    /// Write inputs.csv and outputs.csv (0 or 1).
    #[arg(long, value_name = "0|1", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    plot: u8,

    /// Run the central limit theorem check (0 or 1).
    #[arg(long, value_name = "0|1", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    clt: u8,

    /// Random seed.
    #[arg(long, value_name = "INT", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Fail on malformed coefficients instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("Could not find file \"{s}\""))
    }
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("Could not find directory \"{s}\""))
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    debug!("args = {:?}", cli);

    let order = match (cli.stat, cli.k) {
        (_, Some(k)) => moment_order(k)?,
        (Statistic::Moment, None) => return Err(eyre!("Moment order (-k) has to be passed")),
        (_, None) => 0,
    };

    let mode = if cli.strict { ParseMode::Strict } else { ParseMode::Lenient };
    let f = load_function(&cli.function, mode)?;
    let (dim_inp, dim_out) = (f.dim_inp(), f.dim_out());
    if !(1..=MAX_DIM).contains(&dim_inp) || !(1..=MAX_DIM).contains(&dim_out) {
        return Err(eyre!(
            "Dimensions of the function are not supported ({dim_inp} -> {dim_out}, at most {MAX_DIM})"
        ));
    }
    info!("Function {f}: {dim_inp} -> {dim_out}");

    let mut rng = create_rng(cli.seed);
    match cli.dist {
        DistKind::Normal => run(&cli, &f, &Normal::isotropic(dim_inp, 0.0, 1.0)?, order, &mut rng),
        DistKind::Uniform => run(&cli, &f, &Uniform::broadcast(dim_inp, 0.0, 1.0)?, order, &mut rng),
    }
}

fn run<D: Distribution>(cli: &Cli, f: &Expr, dist: &D, order: u32, rng: &mut SmallRng) -> color_eyre::Result<()> {
    info!("{:?} distribution, {} samples", cli.dist, cli.n);

    let time_total = std::time::Instant::now();

    let inputs = dist.samples(cli.n, rng);
    let outputs = f.apply(&inputs);
    let mca = MonteCarloApproximator::new(Arc::clone(&outputs))?;
    let value = mca.statistic(cli.stat, order, cli.mode)?;
    match cli.stat {
        Statistic::Moment => println!("Moment (k = {order}, {}): {value}", cli.mode),
        stat => println!("{stat}: {value}"),
    }

    if cli.plot == 1 {
        let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
        let inputs_path = write_csv(&dir, "inputs.csv", &inputs)?;
        let outputs_path = write_csv(&dir, "outputs.csv", &outputs)?;
        info!("Wrote {} and {}", inputs_path.display(), outputs_path.display());
    }

    if cli.clt == 1 {
        let validator = CltValidator {
            batch_size: cli.n,
            ..CltValidator::default()
        };
        let report = validator.run(f, dist, rng)?;
        println!("{report}");
    }

    let time_total = time_total.elapsed();
    debug!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
