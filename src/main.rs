//! inference-router CLI
//!
//! Inspect the backend registries and the resolved settings, or run one-off
//! generation and transcription calls from the shell.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use inference_router::backends::{generation, transcription};
use inference_router::config::{self, AdapterConfig, ConfigResolver};
use inference_router::error::RouterError;
use inference_router::logging;
use inference_router::routing::BackendDescriptor;
use inference_router::work::{GenerationRequest, Outcome, TranscriptionRequest};

/// Uniform dispatch over interchangeable inference backends.
#[derive(Parser, Debug)]
#[command(name = "inference-router")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file path (default: env.config in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered backends with their descriptors
    List {
        /// Restrict the listing to one operation class
        #[arg(long, value_enum)]
        class: Option<OperationClass>,
    },

    /// Show a backend's descriptor, or live instance info with --instance
    Describe {
        #[arg(value_enum)]
        class: OperationClass,

        /// Backend name (case-insensitive)
        name: String,

        /// Construct the adapter and include its masked config and warnings
        #[arg(long)]
        instance: bool,
    },

    /// Print the masked settings snapshot
    Config,

    /// Generate text for a prompt (reads stdin when the prompt is omitted)
    Generate {
        /// Backend name
        #[arg(long, default_value = generation::DEFAULT_BACKEND)]
        backend: String,

        /// System instructions
        #[arg(long)]
        system: Option<String>,

        /// Config override, KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        prompt: Option<String>,
    },

    /// Transcribe one or more audio files (several run as a batch)
    Transcribe {
        /// Backend name
        #[arg(long, default_value = transcription::DEFAULT_BACKEND)]
        backend: String,

        /// Config override, KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OperationClass {
    Generation,
    Transcription,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(&cli.log_level);

    if let Some(path) = &cli.config {
        config::install(ConfigResolver::with_path(path));
    }

    match cli.command {
        Command::List { class } => list(class),
        Command::Describe {
            class,
            name,
            instance,
        } => describe(class, &name, instance)?,
        Command::Config => print_config()?,
        Command::Generate {
            backend,
            system,
            set,
            prompt,
        } => generate(&backend, system, &set, prompt).await?,
        Command::Transcribe {
            backend,
            set,
            sources,
        } => transcribe(&backend, &set, sources).await?,
    }

    Ok(())
}

fn list(class: Option<OperationClass>) {
    if class.map_or(true, |class| matches!(class, OperationClass::Generation)) {
        println!("generation:");
        for name in generation::list_backends() {
            if let Some(descriptor) = generation::describe(name) {
                print_descriptor_row(descriptor);
            }
        }
    }
    if class.map_or(true, |class| matches!(class, OperationClass::Transcription)) {
        println!("transcription:");
        for name in transcription::list_backends() {
            if let Some(descriptor) = transcription::describe(name) {
                print_descriptor_row(descriptor);
            }
        }
    }
}

fn print_descriptor_row(descriptor: &BackendDescriptor) {
    println!(
        "  {:<12} {:<7} ceiling {:<3} streaming {}",
        descriptor.name,
        descriptor.locality,
        descriptor.concurrency_ceiling,
        if descriptor.supports_streaming { "yes" } else { "no" }
    );
}

fn describe(class: OperationClass, name: &str, instance: bool) -> Result<()> {
    if instance {
        let info = match class {
            OperationClass::Generation => {
                generation::resolve(name, AdapterConfig::new())?.describe()
            }
            OperationClass::Transcription => {
                transcription::resolve(name, AdapterConfig::new())?.describe()
            }
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let descriptor = match class {
        OperationClass::Generation => generation::describe(name).ok_or_else(|| {
            RouterError::UnknownBackend {
                name: name.trim().to_string(),
                available: generation::list_backends().join(", "),
            }
        })?,
        OperationClass::Transcription => transcription::describe(name).ok_or_else(|| {
            RouterError::UnknownBackend {
                name: name.trim().to_string(),
                available: transcription::list_backends().join(", "),
            }
        })?,
    };
    println!("{}", serde_json::to_string_pretty(descriptor)?);
    Ok(())
}

fn print_config() -> Result<()> {
    let snapshot = config::global().snapshot_masked();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn generate(
    backend: &str,
    system: Option<String>,
    set: &[String],
    prompt: Option<String>,
) -> Result<()> {
    let prompt = match prompt {
        Some(prompt) => prompt,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer.trim().to_string()
        }
    };

    let router = generation::resolve(backend, parse_overrides(set)?)?;
    let mut item = GenerationRequest::new(prompt);
    if let Some(system) = system {
        item = item.with_system(system);
    }

    let text = router.generate(&item).await?;
    println!("{}", text);
    Ok(())
}

async fn transcribe(backend: &str, set: &[String], sources: Vec<PathBuf>) -> Result<()> {
    let router = transcription::resolve(backend, parse_overrides(set)?)?;

    if let [source] = sources.as_slice() {
        let text = router
            .transcribe(&TranscriptionRequest::new(source))
            .await?;
        println!("{}", text);
        return Ok(());
    }

    let items: Vec<TranscriptionRequest> =
        sources.iter().map(TranscriptionRequest::new).collect();
    let outcomes = router.transcribe_batch(&items).await?;

    let mut failures = 0;
    for (source, outcome) in sources.iter().zip(&outcomes) {
        match outcome {
            Outcome::Success { text } => println!("OK      {}: {}", source.display(), text),
            Outcome::Failure { reason } => {
                failures += 1;
                println!("FAILED  {}: {}", source.display(), reason);
            }
        }
    }

    if failures > 0 {
        tracing::warn!(failures, total = outcomes.len(), "batch finished with failures");
        std::process::exit(2);
    }
    Ok(())
}

fn parse_overrides(pairs: &[String]) -> Result<AdapterConfig> {
    let mut config = AdapterConfig::new();
    for pair in pairs {
        let (key, value) = parse_override(pair)?;
        config.set(key, value);
    }
    Ok(config)
}

/// Split `KEY=VALUE`; the value is parsed as JSON when possible so numbers
/// and booleans survive, and falls back to a plain string otherwise.
fn parse_override(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid override '{}', expected KEY=VALUE", pair))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}
