//! tcm-diag - command-line front end for the diagnosis engine
//!
//! Reads one JSON request (`raw_features` + `algorithm_results`) from a file or
//! stdin and prints the `DiagnosisResult` as JSON on stdout. Logs go to stderr
//! (or the configured log file) so stdout stays machine-readable.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tcm_common::config::{load_with_source, resolve_knowledge_base_path};
use tcm_common::TomlConfig;
use tcm_diag::{DiagnosisEngine, EngineConfig, KnowledgeBase};
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for tcm-diag
#[derive(Parser, Debug)]
#[command(name = "tcm-diag")]
#[command(about = "TCM diagnostic reasoning and confidence-calibration engine")]
#[command(version)]
struct Args {
    /// Bootstrap config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge base file (TOML), overrides TCM_KNOWLEDGE_BASE and the config file
    #[arg(short, long, global = true)]
    knowledge_base: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diagnose one JSON request
    Diagnose {
        /// Request file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Load, validate and summarise the knowledge base
    CheckKnowledge,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        load_with_source(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config)?;

    info!(
        "Starting tcm-diag v{} [{}] built {} ({}), embedded knowledge base v{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
        env!("BUILD_KNOWLEDGE_VERSION")
    );
    match &config_source {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file loaded, using defaults"),
    }

    let knowledge = load_knowledge(args.knowledge_base.as_deref(), &config)?;

    match args.command {
        Command::Diagnose { input, pretty } => {
            let engine = DiagnosisEngine::new(knowledge, EngineConfig::from(&config.engine));
            let payload = read_input(&input)?;
            let result = engine
                .diagnose_json(&payload)
                .context("Diagnosis request rejected")?;

            let output = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", output);
        }
        Command::CheckKnowledge => {
            println!("version:            {}", knowledge.version);
            println!("baseline label:     {}", knowledge.baseline_label);
            println!("syndrome rules:     {}", knowledge.syndrome_rules.len());
            println!("constitution rules: {}", knowledge.constitution_rules.len());
            println!("feature weights:    {}", knowledge.feature_weights.len());
            println!("profiles:           {}", knowledge.constitutions.len());
            println!("dynamic tips:       {}", knowledge.dynamic_tips.len());
            println!("risk categories:    {}", knowledge.risk_categories.len());
        }
    }

    Ok(())
}

/// Initialize tracing from RUST_LOG, falling back to the configured level
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    Ok(())
}

fn load_knowledge(cli_arg: Option<&Path>, config: &TomlConfig) -> Result<KnowledgeBase> {
    match resolve_knowledge_base_path(cli_arg, config) {
        Some(path) => KnowledgeBase::load(&path)
            .with_context(|| format!("Failed to load knowledge base {}", path.display())),
        None => {
            let knowledge = KnowledgeBase::embedded().context("Embedded knowledge base is invalid")?;
            info!("Using embedded knowledge base v{}", knowledge.version);
            Ok(knowledge)
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("Failed to read request from stdin")?;
        Ok(payload)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read request {}", input))
    }
}
