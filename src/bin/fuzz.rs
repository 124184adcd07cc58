use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bytescribe_core::{Config, ConfigParams, DriverProtocol, FuzzerEngine, ProcessDriver};

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD_RED: &str = "\x1b[1;31m";
const ANSI_BOLD_GREEN: &str = "\x1b[1;32m";

fn ansi_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
        && std::env::var("TERM").map(|term| term != "dumb").unwrap_or(true)
}

fn colorize(text: &str, code: &str) -> String {
    if ansi_enabled() {
        format!("{code}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

#[derive(Debug, clap::Parser)]
#[command(version, about = "Coverage-guided greybox fuzzer for instrumented JVM targets")]
struct Cli {
    #[clap(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Parser)]
struct GlobalOptions {
    #[clap(long, default_value = "info", env = "BYTESCRIBE_LOG")]
    default_log_level: LevelFilter,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Run the fuzzing loop to completion.
    Run(RunCommand),
    /// Handle a single driver request (JSON in, JSON out).
    Drive(DriveCommand),
}

#[derive(Debug, clap::Parser)]
struct TargetOptions {
    /// Classpath passed to the target JVM.
    #[clap(long)]
    classpath: String,

    /// Fully qualified target method signature, e.g. `pkg.Class.name:(I)I`.
    #[clap(long)]
    target_method: String,

    /// Path to the instrumentation agent jar.
    #[clap(long)]
    agent_path: PathBuf,

    #[clap(long, default_value = "./bytescribe.shm")]
    shm_path: PathBuf,

    #[clap(long, default_value = "./bytescribe-map.csv")]
    map_path: PathBuf,

    #[clap(long, default_value = "./per-edge.csv")]
    edge_csv_path: PathBuf,

    #[clap(long, default_value_t = bytescribe_core::config::DEFAULT_BITMAP_SIZE)]
    bitmap_size: usize,

    #[clap(long, default_value_t = 5)]
    timeout_secs: u64,

    #[clap(long, default_value_t = bytescribe_core::config::DEFAULT_RNG_SEED)]
    rng_seed: u64,

    #[clap(long, default_value_t = 1)]
    input_arity: usize,
}

#[derive(Debug, clap::Parser)]
struct RunCommand {
    #[clap(flatten)]
    target: TargetOptions,

    #[clap(long, default_value_t = 100)]
    seed_count: usize,

    #[clap(long, default_value_t = 5)]
    mutate_count: usize,

    #[clap(long, default_value_t = 10_000)]
    max_iterations: u64,
}

#[derive(Debug, clap::Parser)]
struct DriveCommand {
    #[clap(flatten)]
    target: TargetOptions,

    /// Read the request JSON from this file instead of stdin.
    #[clap(long)]
    request_file: Option<PathBuf>,

    /// Write the response JSON to this file instead of stdout.
    #[clap(long)]
    response_file: Option<PathBuf>,
}

fn setup_logger(global: &GlobalOptions) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(global.default_log_level.into())
                .from_env()
                .context("constructing log filter from env")?,
        )
        .init();
    Ok(())
}

fn build_config(target: &TargetOptions, extra: ConfigParams) -> anyhow::Result<Config> {
    let params = ConfigParams {
        classpath: target.classpath.clone(),
        target_method: target.target_method.clone(),
        agent_path: target.agent_path.clone(),
        shm_path: target.shm_path.clone(),
        map_path: target.map_path.clone(),
        edge_csv_path: target.edge_csv_path.clone(),
        bitmap_size: target.bitmap_size,
        timeout: Duration::from_secs(target.timeout_secs),
        rng_seed: target.rng_seed,
        input_arity: target.input_arity,
        ..extra
    };
    Config::build(params).context("validating fuzzer configuration")
}

fn run_fuzzer(cmd: RunCommand) -> anyhow::Result<()> {
    let config = build_config(
        &cmd.target,
        ConfigParams {
            seed_count: cmd.seed_count,
            mutate_count: cmd.mutate_count,
            max_iterations: cmd.max_iterations,
            ..Default::default()
        },
    )?;

    let driver = ProcessDriver::new(config.clone());
    let mut engine = FuzzerEngine::new(config, driver);
    let cancel = AtomicBool::new(false);
    let summary = engine.run(&cancel);

    let banner = if summary.crash_count > 0 {
        colorize(&format!("[FUZZ][DONE] crashes={}", summary.crash_count), ANSI_BOLD_RED)
    } else {
        colorize("[FUZZ][DONE] crashes=0", ANSI_BOLD_GREEN)
    };
    eprintln!(
        "{banner} iterations={} corpus_size={} covered_edges={}",
        summary.iterations, summary.corpus_size, summary.covered_edges
    );

    Ok(())
}

fn drive_once(cmd: DriveCommand) -> anyhow::Result<()> {
    let config = build_config(&cmd.target, ConfigParams::default())?;
    let target_method = config.target_method.clone();
    let driver = ProcessDriver::new(config);
    let mut protocol = DriverProtocol::new(driver, target_method);

    let request_json = match &cmd.request_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading request from stdin")?;
            buf
        }
    };

    let response_json = protocol.handle_request(&request_json);

    match &cmd.response_file {
        Some(path) => {
            std::fs::write(path, response_json)
                .with_context(|| format!("writing response file {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "{response_json}").context("writing response to stdout")?;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(&cli.global).context("setting up logger")?;

    match cli.command {
        Command::Run(cmd) => run_fuzzer(cmd),
        Command::Drive(cmd) => drive_once(cmd),
    }
}
