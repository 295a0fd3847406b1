//! driftwatch CLI: PSI drift checks over CSV samples.
//!
//! Commands:
//! - `check`: score one column of a current file against a reference file
//! - `features`: score every shared numeric column and log the mean PSI
//! - `simulate`: write a seeded reference/current pair of CSV files, either
//!   one `value` column or `feature1..N` with injected drift
//! - `history`: print the drift log
//! - `watch`: stream numbers (or CSV feature rows with `--features`) from
//!   stdin through a sliding-window monitor

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{warn, Level};

use driftwatch_core::synthetic::{simulate_features, simulate_pair, DriftInjection};
use driftwatch_core::{BinningMode, DriftTier, PsiBreakdown};
use driftwatch_runner::telemetry::init_tracing;
use driftwatch_runner::{
    load_column, load_frame, CsvDriftLog, Diagnostic, EvaluationSession, FanoutNotifier,
    FeatureStreamMonitor, InMemoryMetrics, JsonlAlertOutbox, MonitorConfig, Settings,
    StreamMonitor, TracingNotifier,
};

#[derive(Parser)]
#[command(
    name = "driftwatch",
    about = "driftwatch, Population Stability Index drift detection"
)]
struct Cli {
    /// Emit log lines as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Drift written into simulated feature files.
#[derive(Clone, Copy, ValueEnum)]
enum DriftPreset {
    /// Current rows share the reference distributions.
    None,
    /// `feature1` shifted by +50, `feature2` redrawn from Normal(1000, 10).
    Strong,
}

impl From<DriftPreset> for DriftInjection {
    fn from(preset: DriftPreset) -> Self {
        match preset {
            DriftPreset::None => DriftInjection::none(),
            DriftPreset::Strong => DriftInjection::strong(),
        }
    }
}

/// Options shared by every command that evaluates.
#[derive(Args)]
struct EvalArgs {
    /// Settings TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of buckets.
    #[arg(long)]
    buckets: Option<usize>,

    /// Binning mode: quantile or equal-width.
    #[arg(long)]
    binning: Option<BinningMode>,

    /// Drift log path. Defaults to logs/psi_drift_log.csv.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Do not append to the drift log.
    #[arg(long, default_value_t = false)]
    no_log: bool,

    /// JSONL alert outbox path.
    #[arg(long)]
    outbox: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one column of a current file against a reference file.
    Check {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        current: PathBuf,

        /// Column to compare.
        #[arg(long, default_value = "value")]
        column: String,

        /// Print the per-bucket table.
        #[arg(long, default_value_t = false)]
        breakdown: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        eval: EvalArgs,
    },
    /// Score every numeric column present in both files; log the mean PSI.
    Features {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        current: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        eval: EvalArgs,
    },
    /// Write reference.csv and current.csv drawn from seeded normals.
    Simulate {
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100)]
        rows: usize,

        #[arg(long, default_value_t = 50.0)]
        reference_mean: f64,

        #[arg(long, default_value_t = 60.0)]
        current_mean: f64,

        #[arg(long, default_value_t = 5.0)]
        std_dev: f64,

        /// Write `feature1..N` columns instead of a single `value` column.
        #[arg(long)]
        features: Option<usize>,

        /// Drift injected into current feature columns (with --features).
        #[arg(long, value_enum, default_value = "strong")]
        drift: DriftPreset,
    },
    /// Print logged evaluations.
    History {
        /// Settings TOML file (for the log path).
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        log: Option<PathBuf>,

        /// Only the last N records.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Read one number per stdin line and check the sliding window periodically.
    Watch {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long, default_value = "value")]
        column: String,

        /// Read headed CSV rows and monitor every numeric reference column.
        #[arg(long, default_value_t = false)]
        features: bool,

        #[arg(long)]
        window_size: Option<usize>,

        #[arg(long)]
        check_interval: Option<usize>,

        #[arg(long)]
        min_observations: Option<usize>,

        #[command(flatten)]
        eval: EvalArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Check {
            reference,
            current,
            column,
            breakdown,
            format,
            eval,
        } => run_check(&reference, &current, &column, breakdown, format, &eval),
        Commands::Features {
            reference,
            current,
            format,
            eval,
        } => run_features(&reference, &current, format, &eval),
        Commands::Simulate {
            out_dir,
            seed,
            rows,
            reference_mean,
            current_mean,
            std_dev,
            features,
            drift,
        } => match features {
            Some(n) => run_simulate_features(&out_dir, seed, rows, n, drift.into()),
            None => run_simulate(&out_dir, seed, rows, reference_mean, current_mean, std_dev),
        },
        Commands::History { config, log, tail } => run_history(config.as_deref(), log, tail),
        Commands::Watch {
            reference,
            column,
            features,
            window_size,
            check_interval,
            min_observations,
            eval,
        } => {
            let mut settings = load_settings(&eval)?;
            if let Some(n) = window_size {
                settings.monitor.window_size = n;
            }
            if let Some(n) = check_interval {
                settings.monitor.check_interval = n;
            }
            if let Some(n) = min_observations {
                settings.monitor.min_observations = n;
            }
            settings.validate()?;
            if features {
                run_watch_features(&reference, &settings, eval.no_log)
            } else {
                run_watch(&reference, &column, &settings, eval.no_log)
            }
        }
    }
}

// ── Settings and session wiring ──────────────────────────────────────

fn load_settings(eval: &EvalArgs) -> Result<Settings> {
    let mut settings = match &eval.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(buckets) = eval.buckets {
        settings.evaluation.bucket_count = buckets;
    }
    if let Some(binning) = eval.binning {
        settings.evaluation.binning = binning;
    }
    if let Some(log) = &eval.log {
        settings.log.path = log.clone();
    }
    if let Some(outbox) = &eval.outbox {
        settings.alerts.outbox = Some(outbox.clone());
    }
    settings.validate()?;
    Ok(settings)
}

fn build_session(settings: &Settings, no_log: bool) -> Result<(EvaluationSession, Arc<InMemoryMetrics>)> {
    let mut notifier = FanoutNotifier::new().with(Arc::new(TracingNotifier));
    if let Some(outbox) = &settings.alerts.outbox {
        notifier = notifier.with(Arc::new(JsonlAlertOutbox::new(outbox.clone())));
    }

    let metrics = Arc::new(InMemoryMetrics::new());
    let mut session = EvaluationSession::new(settings.evaluation)?
        .with_notifier(Arc::new(notifier))
        .with_metrics(metrics.clone());
    if !no_log {
        session = session.with_log(Arc::new(CsvDriftLog::new(settings.log.path.clone())));
    }
    Ok((session, metrics))
}

fn print_warnings(warnings: &[Diagnostic]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

// ── check ────────────────────────────────────────────────────────────

fn run_check(
    reference_path: &Path,
    current_path: &Path,
    column: &str,
    show_breakdown: bool,
    format: OutputFormat,
    eval: &EvalArgs,
) -> Result<()> {
    let settings = load_settings(eval)?;
    let reference = load_column(reference_path, column)
        .with_context(|| format!("loading reference {}", reference_path.display()))?;
    let current = load_column(current_path, column)
        .with_context(|| format!("loading current {}", current_path.display()))?;

    let (session, metrics) = build_session(&settings, eval.no_log)?;
    let outcome = session.evaluate(&reference, &current)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            println!("PSI Score: {}", outcome.record.psi_display());
            println!("Drift Status: {}", outcome.record.drift_tier);
            let edges = &outcome.breakdown.edges;
            if edges.degradation().is_some() {
                println!(
                    "Buckets: {} of {} requested ({})",
                    edges.bucket_count(),
                    edges.requested(),
                    edges.mode()
                );
            } else {
                println!("Buckets: {} ({})", edges.bucket_count(), edges.mode());
            }
            if show_breakdown {
                print_breakdown(&outcome.breakdown);
            }
        }
    }
    print_warnings(&outcome.warnings);
    metrics.flush();
    Ok(())
}

fn print_breakdown(breakdown: &PsiBreakdown) {
    println!();
    println!(
        "{:>3}  {:>12}  {:>12}  {:>8}  {:>8}  {:>12}",
        "#", "lower", "upper", "ref %", "cur %", "contribution"
    );
    for bucket in &breakdown.buckets {
        println!(
            "{:>3}  {:>12.4}  {:>12.4}  {:>7.2}%  {:>7.2}%  {:>12.6}",
            bucket.index,
            bucket.lower,
            bucket.upper,
            bucket.reference_pct * 100.0,
            bucket.current_pct * 100.0,
            bucket.contribution
        );
    }
}

// ── features ─────────────────────────────────────────────────────────

fn run_features(
    reference_path: &Path,
    current_path: &Path,
    format: OutputFormat,
    eval: &EvalArgs,
) -> Result<()> {
    let settings = load_settings(eval)?;
    let reference = load_frame(reference_path)
        .with_context(|| format!("loading reference {}", reference_path.display()))?;
    let current = load_frame(current_path)
        .with_context(|| format!("loading current {}", current_path.display()))?;

    let (session, metrics) = build_session(&settings, eval.no_log)?;
    let outcome = session.evaluate_features(&reference, &current)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            let width = outcome
                .report
                .features
                .iter()
                .map(|f| f.name.len())
                .max()
                .unwrap_or(0)
                .max(7);
            for feature in &outcome.report.features {
                println!(
                    "{:<width$}  {:.4}  {}",
                    feature.name, feature.psi, feature.tier
                );
            }
            println!();
            println!("Mean PSI Score: {}", outcome.record.psi_display());
            println!("Drift Status: {}", outcome.record.drift_tier);
        }
    }
    print_warnings(&outcome.warnings);
    metrics.flush();
    Ok(())
}

// ── simulate ─────────────────────────────────────────────────────────

fn run_simulate(
    out_dir: &Path,
    seed: u64,
    rows: usize,
    reference_mean: f64,
    current_mean: f64,
    std_dev: f64,
) -> Result<()> {
    let pair = simulate_pair(seed, rows, reference_mean, current_mean, std_dev);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let reference_start = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;
    let current_start = NaiveDate::from_ymd_opt(2023, 5, 1).context("invalid start date")?;

    let reference_path = out_dir.join("reference.csv");
    let current_path = out_dir.join("current.csv");
    write_series(&reference_path, reference_start, &pair.reference)?;
    write_series(&current_path, current_start, &pair.current)?;

    println!(
        "Wrote {} rows to {} (mean {reference_mean}) and {} (mean {current_mean})",
        rows,
        reference_path.display(),
        current_path.display()
    );
    Ok(())
}

fn run_simulate_features(
    out_dir: &Path,
    seed: u64,
    rows: usize,
    features: usize,
    drift: DriftInjection,
) -> Result<()> {
    anyhow::ensure!(features >= 1, "--features must be at least 1");
    let sim = simulate_features(seed, rows, features, drift);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let reference_start = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;
    let current_start = NaiveDate::from_ymd_opt(2023, 5, 1).context("invalid start date")?;

    let reference_path = out_dir.join("reference.csv");
    let current_path = out_dir.join("current.csv");
    write_columns(&reference_path, reference_start, &sim.names, &sim.reference)?;
    write_columns(&current_path, current_start, &sim.names, &sim.current)?;

    let injected = if drift.is_none() {
        "no injected drift"
    } else {
        "drift injected into feature1/feature2"
    };
    println!(
        "Wrote {} rows x {} features to {} and {} ({injected})",
        sim.rows(),
        sim.names.len(),
        reference_path.display(),
        current_path.display()
    );
    Ok(())
}

/// `timestamp,value` with one row per day from `start`.
fn write_series(path: &Path, start: NaiveDate, values: &[f64]) -> Result<()> {
    write_columns(path, start, &["value".to_string()], &[values.to_vec()])
}

/// `timestamp` plus one column per name, one row per day from `start`.
fn write_columns(path: &Path, start: NaiveDate, names: &[String], columns: &[Vec<f64>]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let mut header = vec!["timestamp".to_string()];
    header.extend(names.iter().cloned());
    writer.write_record(&header)?;

    let rows = columns.first().map_or(0, Vec::len);
    for day in 0..rows {
        let date = start
            .checked_add_days(Days::new(day as u64))
            .context("date out of range")?;
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(columns.iter().map(|column| column[day].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

// ── history ──────────────────────────────────────────────────────────

fn run_history(config: Option<&Path>, log: Option<PathBuf>, tail: Option<usize>) -> Result<()> {
    let mut settings = match config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(log) = log {
        settings.log.path = log;
    }

    let drift_log = CsvDriftLog::new(settings.log.path.clone());
    let records = match tail {
        Some(n) => drift_log.tail(n)?,
        None => drift_log.read_all()?,
    };

    if records.is_empty() {
        println!("No drift history at {}", drift_log.path().display());
        return Ok(());
    }

    println!("{:<22}  {:>9}  Drift Status", "Timestamp", "PSI Score");
    for record in &records {
        println!(
            "{:<22}  {:>9}  {}",
            record.timestamp_iso(),
            record.psi_display(),
            record.drift_tier
        );
    }

    println!();
    let counts: Vec<String> = DriftTier::ALL
        .iter()
        .map(|tier| {
            let n = records.iter().filter(|r| r.drift_tier == *tier).count();
            format!("{tier}: {n}")
        })
        .collect();
    println!("{} records ({})", records.len(), counts.join(", "));
    Ok(())
}

// ── watch ────────────────────────────────────────────────────────────

fn run_watch(reference_path: &Path, column: &str, settings: &Settings, no_log: bool) -> Result<()> {
    let reference = load_column(reference_path, column)
        .with_context(|| format!("loading reference {}", reference_path.display()))?;
    let (session, metrics) = build_session(settings, no_log)?;
    let monitor_config: MonitorConfig = settings.monitor;
    let mut monitor = StreamMonitor::new(session, reference, monitor_config)?;

    println!(
        "Watching stdin: window {}, check every {} observations",
        monitor_config.window_size, monitor_config.check_interval
    );

    for (line_no, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = match trimmed.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                warn!(event = "watch.skipped_line", line = line_no + 1, content = %trimmed);
                continue;
            }
        };

        match monitor.push(value) {
            Ok(Some(outcome)) => {
                println!(
                    "[{}] n={} PSI Score: {} | {}",
                    outcome.record.timestamp_iso(),
                    monitor.observations_seen(),
                    outcome.record.psi_display(),
                    outcome.record.drift_tier
                );
                print_warnings(&outcome.warnings);
            }
            Ok(None) => {}
            Err(e) => warn!(event = "watch.rejected", line = line_no + 1, error = %e),
        }
    }

    metrics.flush();
    Ok(())
}

fn run_watch_features(reference_path: &Path, settings: &Settings, no_log: bool) -> Result<()> {
    let reference = load_frame(reference_path)
        .with_context(|| format!("loading reference {}", reference_path.display()))?;
    let (session, metrics) = build_session(settings, no_log)?;
    let monitor_config: MonitorConfig = settings.monitor;
    let mut monitor = FeatureStreamMonitor::new(session, reference, monitor_config)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(io::stdin().lock());
    let headers = reader.headers()?.clone();
    let positions = monitor
        .columns()
        .map(|name| {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("stdin header has no '{name}' column"))
        })
        .collect::<Result<Vec<usize>>>()?;

    println!(
        "Watching stdin: {} features, window {}, check every {} rows",
        positions.len(),
        monitor_config.window_size,
        monitor_config.check_interval
    );

    for (index, record) in reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(event = "watch.skipped_line", line = line, error = %e);
                continue;
            }
        };
        let parsed: Option<Vec<f64>> = positions
            .iter()
            .map(|&i| record.get(i).and_then(|cell| cell.parse::<f64>().ok()))
            .collect();
        let Some(row) = parsed else {
            warn!(event = "watch.skipped_line", line = line, "non-numeric feature value");
            continue;
        };

        match monitor.push_row(&row) {
            Ok(Some(outcome)) => {
                let drifted: Vec<&str> = outcome
                    .report
                    .drifted()
                    .map(|f| f.name.as_str())
                    .collect();
                println!(
                    "[{}] n={} Mean PSI Score: {} | {}{}",
                    outcome.record.timestamp_iso(),
                    monitor.observations_seen(),
                    outcome.record.psi_display(),
                    outcome.record.drift_tier,
                    if drifted.is_empty() {
                        String::new()
                    } else {
                        format!(" (drifted: {})", drifted.join(", "))
                    }
                );
                print_warnings(&outcome.warnings);
            }
            Ok(None) => {}
            Err(e) => warn!(event = "watch.rejected", line = line, error = %e),
        }
    }

    metrics.flush();
    Ok(())
}
