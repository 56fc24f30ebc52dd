#![warn(missing_docs)]
//! statbench CLI Library
//!
//! Command-line front end for the statbench harness: `statbench.toml`
//! discovery, flag parsing, the built-in task catalogue and output selection.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     statbench_cli::run()
//! }
//! ```

mod config;
mod tasks;

pub use config::{CONFIG_FILE, OutputConfig, RunnerConfig, StatConfig};
pub use tasks::{BuiltinTask, TASKS, find_task};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use statbench_core::{
    Benchmark, BenchmarkConfig, ConsoleStatus, NativeRuntime, NoStatus, NoiseFloorCache,
    RuntimeProbe, StatusSink,
};
use statbench_report::{OutputFormat, Report, generate_json_report};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// statbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "statbench")]
#[command(author, version, about = "statbench - statistical micro-benchmark harness")]
pub struct Cli {
    /// Optional subcommand (List, Init); defaults to running tasks
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Built-in task to benchmark; all tasks when omitted
    pub task: Option<String>,

    /// Scaled-down protocol: 5s warmup, 50ms blocks, 20 measurements
    #[arg(long)]
    pub quick: bool,

    /// Measure per-thread CPU time instead of elapsed time
    #[arg(long)]
    pub cpu: bool,

    /// Run each task exactly once and report only that duration
    #[arg(long)]
    pub single: bool,

    /// Number of measured blocks
    #[arg(long, short = 'n')]
    pub measurements: Option<usize>,

    /// Warmup duration (e.g. "10s", "500ms")
    #[arg(long)]
    pub warmup: Option<String>,

    /// Minimum block duration (e.g. "1s", "50ms")
    #[arg(long)]
    pub goal: Option<String>,

    /// Actions per task call
    #[arg(long)]
    pub actions: Option<u64>,

    /// Estimate the environmental noise floor and check each task's sd against it
    #[arg(long)]
    pub noise_floor: bool,

    /// Give up after this many runtime-regime restarts
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Output format: human, full, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of threads for bootstrap resampling
    /// 0 = use all available cores (default), 1 = single-threaded
    #[arg(long, short = 'j', default_value = "0")]
    pub threads: usize,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the built-in tasks
    List,
    /// Print a default statbench.toml
    Init,
}

/// Run the statbench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the statbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging; the filter prefix covers every statbench_* crate
    let filter = if cli.verbose {
        "statbench=debug"
    } else {
        "statbench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::List) => list_tasks(),
        Some(Commands::Init) => {
            print!("{}", StatConfig::default_toml());
            Ok(())
        }
        None => {
            let config = StatConfig::discover().unwrap_or_default();
            run_tasks(&cli, &config)
        }
    }
}

fn list_tasks() -> anyhow::Result<()> {
    println!("statbench tasks:");
    for task in TASKS {
        println!("├── {:<12} {}", task.name, task.description);
    }
    println!("{} tasks available.", TASKS.len());
    Ok(())
}

/// Layer configuration: statbench.toml, then `--quick`, then explicit flags.
pub fn build_benchmark_config(cli: &Cli, config: &StatConfig) -> anyhow::Result<BenchmarkConfig> {
    let mut bench = config
        .runner
        .to_benchmark_config()
        .with_context(|| format!("invalid [runner] section in {}", CONFIG_FILE))?;

    if cli.quick {
        let quick = BenchmarkConfig::quick();
        bench = bench
            .with_warmup_seconds(quick.warmup_seconds())?
            .with_execution_time_goal(quick.execution_time_goal_seconds())?
            .with_number_measurements(quick.number_measurements())?;
    }
    if cli.cpu {
        bench = bench.with_cpu_time(true);
    }
    if cli.single {
        bench = bench.with_many_executions(false);
    }
    if cli.noise_floor {
        bench = bench.with_noise_floor(true);
    }
    if let Some(retries) = cli.max_retries {
        bench = bench.with_max_regime_retries(Some(retries));
    }
    if let Some(n) = cli.measurements {
        bench = bench.with_number_measurements(n)?;
    }
    if let Some(warmup) = &cli.warmup {
        bench = bench.with_warmup_seconds(StatConfig::parse_duration(warmup)?)?;
    }
    if let Some(goal) = &cli.goal {
        bench = bench.with_execution_time_goal(StatConfig::parse_duration(goal)?)?;
    }
    Ok(bench)
}

/// Actions per call for `task`: CLI flag, then statbench.toml, then the task's own
fn actions_for(task: &BuiltinTask, cli: &Cli, config: &StatConfig) -> u64 {
    cli.actions
        .or(config.runner.actions_per_call)
        .unwrap_or(task.actions_per_call)
}

fn select_tasks(name: Option<&str>) -> anyhow::Result<Vec<&'static BuiltinTask>> {
    match name {
        None => Ok(TASKS.iter().collect()),
        Some(name) => find_task(name).map(|t| vec![t]).ok_or_else(|| {
            let known: Vec<_> = TASKS.iter().map(|t| t.name).collect();
            anyhow::anyhow!("unknown task '{}' (available: {})", name, known.join(", "))
        }),
    }
}

fn run_tasks(cli: &Cli, config: &StatConfig) -> anyhow::Result<()> {
    // Configure Rayon thread pool for bootstrap resampling
    if cli.threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let base = build_benchmark_config(cli, config)?;
    let tasks = select_tasks(cli.task.as_deref())?;

    let runtime: Arc<dyn RuntimeProbe> =
        Arc::new(NativeRuntime::new().with_pinning(config.runner.pin_cpu));
    let status: Arc<dyn StatusSink> = if cli.verbose {
        Arc::new(NoStatus)
    } else {
        Arc::new(ConsoleStatus::new())
    };
    let noise_cache = Arc::new(NoiseFloorCache::new());

    tracing::info!(
        tasks = tasks.len(),
        measurements = base.number_measurements(),
        clock = if base.measure_cpu_time() { "cpu" } else { "elapsed" },
        "starting"
    );

    let started = Instant::now();
    let mut report = Report::new();
    let mut text = Vec::with_capacity(tasks.len());

    for task in tasks {
        let bench_config = base
            .clone()
            .with_actions_per_call(actions_for(task, cli, config))?;
        let bench = Benchmark::new(bench_config)
            .with_runtime(Arc::clone(&runtime))
            .with_status(Arc::clone(&status))
            .with_noise_cache(Arc::clone(&noise_cache))
            .with_label(task.name);

        let result = task
            .run(&bench)
            .with_context(|| format!("benchmark '{}' failed", task.name))?;
        tracing::info!(task = task.name, "{}", result.summary());

        match format {
            OutputFormat::Human => text.push(format!("{}: {}", task.name, result.summary())),
            OutputFormat::Full => text.push(format!("{}\n{}", task.name, result.full_report())),
            OutputFormat::Json => {}
        }
        report.push(result.to_report_entry(task.name));
    }

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Full => format!("{}\n", text.join("\n\n")),
        OutputFormat::Human => format!("{}\n", text.join("\n")),
    };

    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }

    let warnings = report.warnings();
    eprintln!(
        "{} task(s) in {:.1}s, {} with warnings",
        report.results.len(),
        started.elapsed().as_secs_f64(),
        warnings
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("statbench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = parse(&["sum-1k", "--quick", "--cpu", "-n", "30", "--goal", "20ms"]);
        assert_eq!(cli.task.as_deref(), Some("sum-1k"));
        assert!(cli.quick && cli.cpu);
        assert_eq!(cli.measurements, Some(30));

        let cli = parse(&["list"]);
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_flags_override_file() {
        let config = StatConfig::default();
        let cli = parse(&["--quick", "-n", "30", "--goal", "20ms", "--single", "--max-retries", "5"]);
        let bench = build_benchmark_config(&cli, &config).unwrap();

        assert_eq!(bench.warmup_seconds(), 5.0);
        assert_eq!(bench.number_measurements(), 30);
        assert!((bench.execution_time_goal_seconds() - 0.02).abs() < 1e-15);
        assert!(!bench.many_executions());
        assert_eq!(bench.max_regime_retries(), Some(5));
    }

    #[test]
    fn test_invalid_flag_values_rejected() {
        let config = StatConfig::default();
        assert!(build_benchmark_config(&parse(&["-n", "0"]), &config).is_err());
        assert!(build_benchmark_config(&parse(&["--warmup", "soon"]), &config).is_err());
    }

    #[test]
    fn test_actions_resolution() {
        let task = find_task("sum-1k").unwrap();
        let mut config = StatConfig::default();

        assert_eq!(actions_for(task, &parse(&[]), &config), 1000);
        config.runner.actions_per_call = Some(10);
        assert_eq!(actions_for(task, &parse(&[]), &config), 10);
        assert_eq!(actions_for(task, &parse(&["--actions", "4"]), &config), 4);
    }

    #[test]
    fn test_select_tasks() {
        assert_eq!(select_tasks(None).unwrap().len(), TASKS.len());
        assert_eq!(select_tasks(Some("noop")).unwrap()[0].name, "noop");
        let err = select_tasks(Some("nope")).unwrap_err().to_string();
        assert!(err.contains("available: noop"));
    }
}
