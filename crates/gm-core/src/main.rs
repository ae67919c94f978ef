//! geomix - classify people from located observations
//!
//! The main entry point, handling:
//! - Model validation (`check`)
//! - Single-sequence classification (`predict`)
//! - Side-by-side classifier evaluation (`evaluate`)

use clap::{Args, Parser, Subcommand};
use gm_common::{Error, OutputFormat, StructuredError};
use gm_config::MODEL_SCHEMA_VERSION;
use gm_core::classify::{MixtureClassifier, PriorClassifier, RegionResolver, ResolverKind};
use gm_core::config::{load_model, ConfigError, LoadedModel, ModelOptions, ResolvedModel};
use gm_core::evaluation::EvaluationManager;
use gm_core::exit_codes::ExitCode;
use gm_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use std::path::PathBuf;
use tracing::{info, info_span};

/// geomix - mixture-model classification of located observations
#[derive(Parser)]
#[command(name = "geomix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Model file (default: GEOMIX_MODEL, then config directories)
    #[arg(long, short = 'm', global = true)]
    model: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level (overrides GEOMIX_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: human or jsonl (overrides GEOMIX_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, validate and build the model, then print its summary
    Check,

    /// Classify one observation sequence
    Predict(PredictArgs),

    /// Compare classifiers on a labeled test set
    Evaluate(EvaluateArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// How observations map to model symbols
    #[arg(long, value_enum, default_value_t = ResolverKind::Auto)]
    resolver: ResolverKind,

    /// Observations (symbol names, or "lat,lon" points)
    #[arg(required = true, allow_hyphen_values = true)]
    observations: Vec<String>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Labeled test set (JSON Lines)
    #[arg(long)]
    test: PathBuf,

    /// Labeled training set, passed to every classifier before testing
    #[arg(long)]
    train: Option<PathBuf>,

    /// Write per-classifier error curves (TSV) into this directory
    #[arg(long)]
    stats_dir: Option<PathBuf>,

    /// How observations map to model symbols
    #[arg(long, value_enum, default_value_t = ResolverKind::Auto)]
    resolver: ResolverKind,

    /// Skip the prior-only baseline classifier
    #[arg(long)]
    no_baseline: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too, on stdout.
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Ok
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = cli.global.log_level.or(if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    });
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    let span = info_span!("run", run_id = %run_id);
    let _enter = span.enter();

    let exit_code = match &cli.command {
        Commands::Check => run_check(&cli.global),
        Commands::Predict(args) => run_predict(&cli.global, args),
        Commands::Evaluate(args) => run_evaluate(&cli.global, args, &run_id),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Ok
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn load(global: &GlobalOpts) -> Result<(ResolvedModel, LoadedModel), ExitCode> {
    let options = ModelOptions {
        model_path: global.model.clone(),
    };
    let resolved = load_model(&options).map_err(|e| config_failure(global, &e))?;
    let loaded = resolved.build().map_err(|e| failure(global, &e))?;
    Ok((resolved, loaded))
}

fn run_check(global: &GlobalOpts) -> ExitCode {
    let (resolved, loaded) = match load(global) {
        Ok(pair) => pair,
        Err(code) => return code,
    };
    let snapshot = resolved.snapshot();
    let summary = loaded.model.summary();

    match global.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "status": "ok",
                "model": snapshot,
                "class_labels": loaded.taxonomy.labels(),
                "summary": summary,
            });
            print_json(&output)
        }
        OutputFormat::Md => {
            println!("# Model check\n");
            println!("- file: `{}` ({})", snapshot.path.display(), snapshot.source);
            println!("- sha256: `{}`", snapshot.hash);
            if let Some(created_at) = &snapshot.created_at {
                println!("- fitted: {}", created_at);
            }
            println!(
                "- symbols: {}, topics: {}, classes: {}",
                summary.symbols, summary.topics, summary.classes
            );
            println!("- classes: {}", loaded.taxonomy.labels().join(", "));
            ExitCode::Ok
        }
        OutputFormat::Text => {
            println!("model ok: {} ({})", snapshot.path.display(), snapshot.source);
            println!("sha256: {}", snapshot.hash);
            if let Some(created_at) = &snapshot.created_at {
                println!("fitted: {}", created_at);
            }
            println!(
                "symbols: {}  topics: {}  classes: {}",
                summary.symbols, summary.topics, summary.classes
            );
            for (label, p) in loaded.taxonomy.labels().iter().zip(&summary.class_prior) {
                println!("  P({}) = {:.6}", label, p);
            }
            ExitCode::Ok
        }
    }
}

fn run_predict(global: &GlobalOpts, args: &PredictArgs) -> ExitCode {
    let (_, loaded) = match load(global) {
        Ok(pair) => pair,
        Err(code) => return code,
    };
    let resolver = RegionResolver::for_regions(args.resolver, loaded.model.symbols());
    let classifier =
        match MixtureClassifier::new(loaded.model.clone(), loaded.taxonomy.labels().to_vec(), resolver) {
            Ok(c) => c,
            Err(e) => return failure(global, &e),
        };
    let prediction = match classifier.score(&args.observations) {
        Ok(p) => p,
        Err(e) => return failure(global, &e),
    };
    let label = loaded.taxonomy.label(prediction.class).unwrap_or("?");
    info!(class = label, resolved = prediction.resolved, "prediction made");

    match global.format {
        OutputFormat::Json => {
            let posterior: serde_json::Map<String, serde_json::Value> = loaded
                .taxonomy
                .labels()
                .iter()
                .cloned()
                .zip(prediction.posterior.iter().map(|p| serde_json::json!(p)))
                .collect();
            let output = serde_json::json!({
                "class": prediction.class,
                "label": label,
                "observations": args.observations.len(),
                "resolved": prediction.resolved,
                "posterior": posterior,
                "log_scores": prediction.log_scores,
                "log_likelihood": prediction.log_likelihood,
            });
            print_json(&output)
        }
        OutputFormat::Text | OutputFormat::Md => {
            println!("{}", label);
            println!(
                "resolved {} of {} observations",
                prediction.resolved,
                args.observations.len()
            );
            for (name, p) in loaded.taxonomy.labels().iter().zip(&prediction.posterior) {
                println!("  {:<16} {:.6}", name, p);
            }
            ExitCode::Ok
        }
    }
}

fn run_evaluate(global: &GlobalOpts, args: &EvaluateArgs, run_id: &str) -> ExitCode {
    let (resolved, loaded) = match load(global) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let mut manager = EvaluationManager::new();
    let resolver = RegionResolver::for_regions(args.resolver, loaded.model.symbols());
    let mixture =
        match MixtureClassifier::new(loaded.model.clone(), loaded.taxonomy.labels().to_vec(), resolver) {
            Ok(c) => c,
            Err(e) => return failure(global, &e),
        };
    if let Err(e) = manager.register(Box::new(mixture)) {
        return failure(global, &e);
    }
    if !args.no_baseline {
        let baseline = PriorClassifier::uniform(loaded.taxonomy.clone());
        if let Err(e) = manager.register(Box::new(baseline)) {
            return failure(global, &e);
        }
    }

    if let Some(train) = &args.train {
        if let Err(e) = manager.train_predictors(train) {
            return failure(global, &e);
        }
    }

    let summary = match manager.test_predictors_file(&args.test) {
        Ok(s) => s,
        Err(e) => return failure(global, &e),
    };

    if let Some(dir) = &args.stats_dir {
        match manager.report_statistics(dir) {
            Ok(paths) => info!(files = paths.len(), dir = %dir.display(), "statistics written"),
            Err(e) => return failure(global, &e),
        }
    }

    match global.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "run_id": run_id,
                "model": resolved.snapshot(),
                "summary": summary,
                "report": manager.report(),
            });
            print_json(&output)
        }
        format => match manager.performance_report(format) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::Ok
            }
            Err(e) => failure(global, &e),
        },
    }
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "geomix_version": env!("CARGO_PKG_VERSION"),
                "model_schema_version": MODEL_SCHEMA_VERSION,
            });
            print_json(&info);
        }
        _ => {
            println!("geomix {}", env!("CARGO_PKG_VERSION"));
            println!("model schema version: {}", MODEL_SCHEMA_VERSION);
        }
    }
}

fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Ok
        }
        Err(e) => {
            eprintln!("geomix: failed to render output: {}", e);
            ExitCode::InternalError
        }
    }
}

/// Report an error on stderr and pick its exit code.
fn failure(global: &GlobalOpts, err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    tracing::error!(code = err.code(), "{}", err);
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json()),
        _ => {
            eprintln!("geomix: {}: {}", err.headline(), err);
            eprintln!("hint: {}", err.remediation());
        }
    }
    code
}

fn config_failure(global: &GlobalOpts, err: &ConfigError) -> ExitCode {
    let code = ExitCode::from(err);
    tracing::error!("{}", err);
    match global.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": code.as_i32(),
                "category": "config",
                "message": err.to_string(),
                "recoverable": false,
            });
            eprintln!("{}", output);
        }
        _ => eprintln!("geomix: {}", err),
    }
    code
}
