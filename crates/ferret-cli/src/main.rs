//! Ferret command-line driver.

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use ferret::bridge::ValidatorBridge;
use ferret::confidence::ConfidenceEngine;
use ferret::processor::{ParallelProcessor, discover_files};
use ferret::report::{ConfidenceFilter, ReportOptions};
use ferret::router::FileRouter;
use ferret::suppression::{self, SuppressionFilter};
use ferret::types::RedactionStrategyKind;
use ferret::validators::{MetadataValidator, default_validators, filter_validators};
use ferret::{RedactionConfig, RedactionEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exit code when `--preprocess-only` finds no processable files.
const EXIT_NO_PROCESSABLE_FILES: u8 = 2;
/// Findings at or above this confidence fail a pre-commit run.
const PRE_COMMIT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
    Csv,
    Yaml,
    Junit,
    #[value(name = "gitlab-sast")]
    GitlabSast,
    Sarif,
}

impl FormatArg {
    fn as_str(&self) -> &'static str {
        match self {
            FormatArg::Text => "text",
            FormatArg::Json => "json",
            FormatArg::Csv => "csv",
            FormatArg::Yaml => "yaml",
            FormatArg::Junit => "junit",
            FormatArg::GitlabSast => "gitlab-sast",
            FormatArg::Sarif => "sarif",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Simple,
    #[value(name = "format_preserving")]
    FormatPreserving,
    Synthetic,
}

impl From<StrategyArg> for RedactionStrategyKind {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Simple => RedactionStrategyKind::Simple,
            StrategyArg::FormatPreserving => RedactionStrategyKind::FormatPreserving,
            StrategyArg::Synthetic => RedactionStrategyKind::Synthetic,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ferret", version, about = "Scan files for sensitive data", long_about = None)]
struct Cli {
    /// Input files or directories.
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Additional input file (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Recurse into directories.
    #[arg(short, long)]
    recursive: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Confidence filter: high, medium, low, all, or a comma list.
    #[arg(long, default_value = "all")]
    confidence: String,

    /// Comma list of validator tags to run, or "all".
    #[arg(long, default_value = "all")]
    checks: String,

    /// Run format preprocessors (binary formats become text + metadata).
    #[arg(
        long = "enable-preprocessors",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    enable_preprocessors: bool,

    /// Stop after preprocessing and print the extracted content summary.
    #[arg(long = "preprocess-only")]
    preprocess_only: bool,

    /// Write redacted copies of files with findings.
    #[arg(long = "enable-redaction")]
    enable_redaction: bool,

    /// Root directory for redacted output.
    #[arg(long = "redaction-output-dir", value_name = "DIR", default_value = "redacted")]
    redaction_output_dir: PathBuf,

    /// Redaction strategy.
    #[arg(long = "redaction-strategy", value_enum, default_value = "simple")]
    redaction_strategy: StrategyArg,

    /// Write the JSON redaction audit log here.
    #[arg(long = "redaction-audit-log", value_name = "PATH")]
    redaction_audit_log: Option<PathBuf>,

    /// YAML suppression rule file.
    #[arg(long = "suppression-file", value_name = "PATH")]
    suppression_file: Option<PathBuf>,

    /// Print proposed suppression rules for current findings.
    #[arg(long = "generate-suppressions")]
    generate_suppressions: bool,

    /// Include suppressed matches in the report.
    #[arg(long = "show-suppressed")]
    show_suppressed: bool,

    /// Pre-commit gate: terse output, non-zero exit on high findings.
    #[arg(long = "pre-commit-mode")]
    pre_commit_mode: bool,

    /// Print matched text literally.
    #[arg(long = "show-match")]
    show_match: bool,

    /// Verbose match details.
    #[arg(short, long)]
    verbose: bool,

    /// Worker pool size (default: min of 8 and detected parallelism).
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let debug_enabled = std::env::var("FERRET_DEBUG").is_ok_and(|v| !v.is_empty());
    let default_filter = if debug_enabled { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::env::var_os("CI").is_none())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            // Interactive runs get the cause chain; pre-commit stays terse
            // inside run().
            eprintln!("ferret: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let formatter = ferret::formatter_for(cli.format.as_str()).context("unsupported --format")?;
    let confidence_filter = ConfidenceFilter::parse(&cli.confidence).context("invalid --confidence")?;

    let checks: Option<Vec<String>> = if cli.checks.trim().eq_ignore_ascii_case("all") {
        None
    } else {
        Some(cli.checks.split(',').map(|c| c.trim().to_string()).collect())
    };

    let mut inputs = cli.inputs.clone();
    inputs.extend(cli.files.clone());
    if inputs.is_empty() {
        anyhow::bail!("no input paths given");
    }
    let files = discover_files(&inputs, cli.recursive);
    debug!(count = files.len(), "discovered input files");

    let router = FileRouter::new();
    let capabilities = router.metadata_capable_types();
    let metadata_validator = MetadataValidator::new(Arc::new(move |t| capabilities.contains(&t)));
    let validators = filter_validators(default_validators(), checks.as_deref());
    let bridge = ValidatorBridge::new(validators, Arc::new(metadata_validator));

    let suppression = match &cli.suppression_file {
        Some(path) => SuppressionFilter::from_file(path).context("failed to load --suppression-file")?,
        None => SuppressionFilter::empty(),
    };

    let mut processor = ParallelProcessor::new(router, bridge, ConfidenceEngine::new())
        .with_suppression(suppression)
        .with_preprocessors_enabled(cli.enable_preprocessors)
        .preprocess_only(cli.preprocess_only)
        .with_debug(std::env::var("FERRET_DEBUG").is_ok_and(|v| !v.is_empty()));
    if let Some(workers) = cli.workers {
        processor = processor.with_workers(workers);
    }
    if cli.enable_redaction && !cli.preprocess_only {
        let mut config =
            RedactionConfig::new(&cli.redaction_output_dir).with_strategy(cli.redaction_strategy.into());
        config.audit_log_path = cli.redaction_audit_log.clone();
        let engine = RedactionEngine::new(config).context("failed to initialize redaction output")?;
        processor = processor.with_redaction(engine);
    }

    let outcome = processor.run(files).await;
    debug!(stats = ?outcome.stats, "scan complete");

    if cli.preprocess_only {
        let processed: Vec<_> = outcome.reports.iter().filter_map(|r| r.processed.as_ref()).collect();
        if processed.iter().all(|p| p.is_empty()) {
            eprintln!("no processable files found");
            return Ok(ExitCode::from(EXIT_NO_PROCESSABLE_FILES));
        }
        for content in processed {
            println!(
                "{}: {} words, {} metadata items",
                content.original_path.display(),
                content.stats.word_count,
                content.metadata_items.len()
            );
            if cli.verbose {
                for item in &content.metadata_items {
                    println!("  [{}] {}", item.preprocessor_type, item.content.replace('\n', "; "));
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut matches = Vec::new();
    let mut suppressed = Vec::new();
    for report in outcome.reports {
        if let Some(skip) = &report.skip
            && !skip.silent
        {
            debug!(path = %skip.path.display(), kind = %skip.error_kind, reason = %skip.message, "file skipped");
        }
        if let Some(note) = &report.partial_failure {
            warn!(path = %report.path.display(), note, "partial validation");
        }
        matches.extend(report.matches);
        suppressed.extend(report.suppressed);
    }

    if cli.generate_suppressions {
        let proposals = suppression::generate_proposals(&matches);
        if !proposals.is_empty() {
            eprintln!("# proposed suppression rules (disabled; review before enabling)");
            eprint!("{}", suppression::proposals_to_yaml(&proposals)?);
        }
    }

    let options = ReportOptions {
        confidence_filter,
        verbose: cli.verbose,
        no_color: std::env::var_os("CI").is_some() || cli.format.as_str() != "text",
        show_match: cli.show_match,
        show_suppressed: cli.show_suppressed,
        pre_commit_mode: cli.pre_commit_mode,
    };
    print!("{}", formatter.format(&matches, &suppressed, &options));

    if let Some(engine) = processor.redaction_engine()
        && let Some(path) = engine.write_audit_log().context("failed to write audit log")?
    {
        debug!(path = %path.display(), "audit log written");
    }

    let gating = matches.iter().filter(|m| m.confidence >= PRE_COMMIT_THRESHOLD).count();

    // Matched text is overwritten once formatting is done.
    for m in matches.iter_mut() {
        m.scrub();
    }
    for s in suppressed.iter_mut() {
        s.matched.scrub();
    }
    drop(matches);
    drop(suppressed);

    if cli.pre_commit_mode && gating > 0 {
        eprintln!(
            "ferret: {} high-confidence finding(s); run with --show-suppressed or add suppression rules to proceed",
            gating
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
