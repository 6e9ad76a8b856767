//! HorizonScale Simulation CLI
//!
//! ```bash
//! # Default fleet: 2000 synthetic hosts, 2023-01-01 ..= 2025-12-31
//! horizon-sim generate --output data/master_daily.jsonl --csv-dir data/legacy
//!
//! # Host list from JSON, custom DNA table, debug log file
//! horizon-sim --config dna.toml --log-dir logs generate --inventory hosts.json
//!
//! # Print the built-in DNA table as TOML
//! horizon-sim dna > dna.toml
//!
//! # Common vs. rare variant of one scenario
//! horizon-sim lab --scenario seasonal --days 1095
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use horizon_core::{HostInventory, Scenario, TelemetrySink};
use horizon_simulation_engine::{
    DateRangeCalendar, DiagnosticLab, FleetConfig, FleetGenerator, GeneratorConfig, JsonInventory,
    JsonLinesSink, MonthlyCsvSink, SyntheticInventory, DEFAULT_NUM_HOSTS,
};
use rand::Rng;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "horizon-sim.log";

/// HorizonScale: synthetic fleet utilization telemetry
#[derive(Parser)]
#[command(name = "horizon-sim")]
#[command(
    about = "Generate synthetic daily utilization telemetry for a host fleet",
    long_about = None
)]
struct Cli {
    /// Generator config (TOML); built-in DNA table when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write DEBUG logs to <LOG_DIR>/horizon-sim.log
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the master telemetry table for a fleet
    Generate(GenerateArgs),

    /// Print the active generator config as TOML
    Dna,

    /// Compare the common and rare variant of one scenario
    Lab(LabArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Synthetic fleet size (ignored with --inventory)
    #[arg(long, default_value_t = DEFAULT_NUM_HOSTS)]
    hosts: usize,

    /// Seed for the synthetic fleet
    #[arg(long, default_value_t = 0)]
    inventory_seed: u64,

    /// JSON host list instead of a synthetic fleet
    #[arg(long, conflicts_with_all = ["hosts", "inventory_seed"])]
    inventory: Option<PathBuf>,

    /// First calendar day
    #[arg(long, default_value = "2023-01-01")]
    start: NaiveDate,

    /// Last calendar day (inclusive)
    #[arg(long, default_value = "2025-12-31")]
    end: NaiveDate,

    /// Master table output (JSON lines)
    #[arg(short, long, default_value = "data/master_daily.jsonl")]
    output: PathBuf,

    /// Also export the legacy monthly CSV feed under this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Warn instead of failing when a scenario has no hosts
    #[arg(long)]
    lenient_coverage: bool,

    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct LabArgs {
    /// Scenario to inspect (e.g. seasonal, capacity-breach)
    #[arg(long)]
    scenario: Scenario,

    /// Series length in days
    #[arg(long, default_value_t = 1095)]
    days: usize,

    /// Seed for the common variant (random when omitted)
    #[arg(long)]
    seed_common: Option<u64>,

    /// Seed for the rare variant (random when omitted)
    #[arg(long)]
    seed_rare: Option<u64>,

    /// Write the comparison here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    let generator = match &cli.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GeneratorConfig::builtin(),
    };

    match cli.command {
        Commands::Generate(args) => run_generate(generator, args),
        Commands::Dna => {
            print!("{}", generator.to_toml_string()?);
            Ok(())
        }
        Commands::Lab(args) => run_lab(&generator, args),
    }
}

/// Console layer filtered by `RUST_LOG`; optional DEBUG file layer
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let console = fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "horizon=info,info".into()),
    );

    let (file, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(guard)
}

fn run_generate(generator: GeneratorConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let inventory: Box<dyn HostInventory> = match &args.inventory {
        Some(path) => Box::new(JsonInventory::new(path)),
        None => Box::new(SyntheticInventory::new(args.hosts, args.inventory_seed)),
    };
    let calendar = DateRangeCalendar::new(args.start, args.end)?;

    let mut config = FleetConfig::default()
        .with_generator(generator)
        .with_worker_threads(args.threads);
    if args.lenient_coverage {
        config = config.lenient_coverage();
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  HorizonScale Simulation Engine                          ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  Inventory: {}", inventory.describe());
    println!("  Calendar: {} ..= {} ({} days)", calendar.start(), calendar.end(), calendar.days());
    println!("  DNA rows: {}", config.generator.dna.len());
    println!("  Output: {}\n", args.output.display());

    let mut master_sink = JsonLinesSink::new(&args.output);
    let mut legacy_sink = args.csv_dir.as_ref().map(MonthlyCsvSink::new);
    let mut sinks: Vec<&mut dyn TelemetrySink> = Vec::with_capacity(2);
    sinks.push(&mut master_sink);
    if let Some(sink) = legacy_sink.as_mut() {
        sinks.push(sink);
    }

    let (report, receipts) = FleetGenerator::new(config)
        .run_and_publish(inventory.as_ref(), &calendar, &mut sinks)
        .context("fleet generation failed, nothing published")?;
    let mut receipts = receipts.into_iter();
    let master = receipts.next().context("master sink returned no receipt")?;
    let legacy = receipts.next();

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Generation Complete                                     ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("  Hosts:            {}", report.hosts);
    println!("  Days:             {}", report.days);
    println!("  Rows:             {}", report.rows);
    println!(
        "  Utilization:      mean {:.2}  std {:.2}  min {:.2}  max {:.2}",
        report.utilization.mean,
        report.utilization.std,
        report.utilization.min,
        report.utilization.max
    );
    println!("  Elapsed:          {:.2}s", report.elapsed_secs);
    println!("  Master table:     {} ({} bytes)", args.output.display(), master.bytes);
    if let Some(receipt) = legacy {
        println!("  Legacy feed:      {} files, {} rows", receipt.files, receipt.rows);
    }

    println!("\n{:<18} {:<12} {:>8}", "Scenario", "Variant", "Hosts");
    println!("{}", "-".repeat(40));
    for row in &report.coverage.variants {
        println!(
            "{:<18} {:<12} {:>8}",
            row.scenario.as_str(),
            row.variant.as_str(),
            row.hosts
        );
    }
    for gap in &report.coverage.gaps {
        println!("  ! {gap}");
    }

    Ok(())
}

fn run_lab(generator: &GeneratorConfig, args: LabArgs) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let seed_common = args.seed_common.unwrap_or_else(|| rng.gen_range(10_000..=99_999));
    let seed_rare = args.seed_rare.unwrap_or_else(|| rng.gen_range(10_000..=99_999));

    let comparison = DiagnosticLab::new(&generator.dna)
        .compare(args.scenario, args.days, seed_common, seed_rare)
        .with_context(|| format!("lab run for {}", args.scenario))?;
    let json = serde_json::to_string_pretty(&comparison)?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!(
                "{}: {} (seed {}) vs {} (seed {}) -> {}",
                comparison.scenario,
                comparison.common.variant,
                comparison.common.seed,
                comparison.rare.variant,
                comparison.rare.seed,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
