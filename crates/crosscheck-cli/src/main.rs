//! `crosscheck`: verify content against a panel of external evaluators.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crosscheck_core::{AnalysisRequest, ContentType, Priority};
use crosscheck_runtime::{
    AnalysisError, AnalysisReport, EvaluatorRegistry, EvaluatorSpec, MokaResultCache, QuotaLedger,
    RuntimeConfig, WorkflowEngine,
};

#[derive(Parser, Debug)]
#[command(name = "crosscheck", version, about = "Multi-evaluator content verification")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,

    #[arg(long, global = true, help = "Path to a YAML runtime configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze content and print the consensus report
    Analyze {
        /// Content to verify; reads stdin when omitted
        content: Option<String>,

        #[arg(long, value_enum, default_value_t = ContentTypeArg::Text)]
        content_type: ContentTypeArg,

        #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
        priority: PriorityArg,

        /// Caller identity used as the quota key
        #[arg(long, default_value = "cli")]
        caller: String,

        /// Overall deadline, e.g. "30s" or "2m"
        #[arg(long, value_parser = humantime::parse_duration)]
        deadline: Option<Duration>,
    },

    /// Show quota usage for a caller
    Usage {
        #[arg(long, default_value = "cli")]
        caller: String,
    },

    /// List evaluators that would run with the current configuration
    Providers,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ContentTypeArg {
    Text,
    Image,
    Url,
}

impl From<ContentTypeArg> for ContentType {
    fn from(arg: ContentTypeArg) -> Self {
        match arg {
            ContentTypeArg::Text => ContentType::Text,
            ContentTypeArg::Image => ContentType::Image,
            ContentTypeArg::Url => ContentType::Url,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PriorityArg {
    Normal,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            content,
            content_type,
            priority,
            caller,
            deadline,
        } => {
            let mut config = config;
            if let Some(deadline) = deadline {
                config.engine.overall_deadline = deadline;
            }

            let engine = build_engine(&config)?;
            let content = match content {
                Some(content) => content,
                None => read_stdin()?,
            };
            let request = AnalysisRequest::new(content, content_type.into(), priority.into())?;

            match engine.analyze(&caller, &request).await {
                Ok(report) => print_report(&report, cli.json)?,
                Err(AnalysisError::Quota(error)) => {
                    bail!("{error}; upgrade your plan or retry after the period resets")
                }
                Err(error) => bail!("analysis failed: {error}"),
            }
        }

        Commands::Usage { caller } => {
            let engine = build_engine(&config)?;
            let usage = engine.quota().usage(&caller);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&usage)?);
            } else {
                println!("plan: {}", usage.plan);
                println!("daily: {} / {}", usage.daily.used, limit_str(usage.daily.limit));
                println!(
                    "monthly: {} / {}",
                    usage.monthly.used,
                    limit_str(usage.monthly.limit)
                );
            }
        }

        Commands::Providers => {
            let engine = build_engine(&config)?;
            for name in engine.evaluator_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn build_engine(config: &RuntimeConfig) -> Result<WorkflowEngine> {
    let registry = EvaluatorRegistry::with_defaults();

    // With no evaluators configured, fall back to every registered type
    // whose credentials are present in the environment.
    let specs: Vec<EvaluatorSpec> = if config.evaluators.is_empty() {
        registry
            .available_types()
            .iter()
            .filter(|t| registry.validate(t, &serde_json::Value::Null).is_ok())
            .map(|t| EvaluatorSpec {
                evaluator_type: t.to_string(),
                config: serde_json::Value::Null,
            })
            .collect()
    } else {
        config.evaluators.clone()
    };

    if specs.is_empty() {
        bail!(
            "no evaluators available: configure them in the config file or \
             set provider API keys in the environment"
        );
    }

    let mut builder = WorkflowEngine::builder()
        .config(config.engine.clone())
        .cache(Arc::new(MokaResultCache::new(
            config.cache.max_entries,
            config.cache.ttl,
        )))
        .quota(Arc::new(QuotaLedger::new(config.default_plan)));

    for spec in &specs {
        let evaluator = registry
            .create(&spec.evaluator_type, &spec.config)
            .with_context(|| {
                format!("failed to configure evaluator '{}'", spec.evaluator_type)
            })?;
        builder = builder.evaluator(evaluator);
    }

    builder.build().context("invalid engine configuration")
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("failed to read content from stdin")?;
    Ok(content)
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("verdict: {}", report.verdict);
    println!("confidence: {}", report.confidence);
    println!(
        "agreement: {:.2} across {} evaluator(s)",
        report.agreement, report.model_count
    );
    println!("category: {} (risk: {})", report.category, report.risk);
    if !report.sources.is_empty() {
        println!("sources: {}", report.sources.join(", "));
    }
    println!("path: {}", report.processing_path.join(" -> "));
    println!(
        "took {} ms{}",
        report.processing_time_ms,
        if report.cached { " (cached)" } else { "" }
    );
    Ok(())
}

fn limit_str(limit: Option<u32>) -> String {
    match limit {
        Some(limit) => limit.to_string(),
        None => "unlimited".to_string(),
    }
}
