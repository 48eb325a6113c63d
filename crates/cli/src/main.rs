mod config;
mod console;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{
    Job, JobOutcome, JobQueue, OpenAiProvider, Orchestrator, RoomRef, ToolDefinition,
    ToolRegistry, WeatherTool, Worker,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use console::ConsoleTransport;
use error::{Error, Result};

const CONFIG_FILE: &str = "worker.toml";

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "A realtime voice agent worker with tool calling", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the worker configuration
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one agent job in a console room
    Run {
        /// Room name
        #[arg(short, long, default_value = "console")]
        room: String,
        /// Your identity in the room
        #[arg(short, long, default_value = "you")]
        identity: String,
    },
    /// Print the tool definitions sent to the model
    Tools,
}

#[tokio::main]
async fn main() {
    load_env();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `.env.local` first so its values win; existing variables are never
/// overridden.
fn load_env() {
    for file in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(file);
    }
}

/// Logs go to stderr so the conversation on stdout stays readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Some(Commands::Tools) => cmd_tools(&config),
        Some(Commands::Run { room, identity }) => cmd_run(config, &room, &identity).await,
        None => cmd_run(config, "console", "you").await,
    }
}

fn cmd_tools(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;
    println!("{}", serde_json::to_string_pretty(&registry.specs())?);
    Ok(())
}

async fn cmd_run(config: Config, room: &str, identity: &str) -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| Error::CryptoProvider)?;

    let provider = build_provider(&config)?;
    let registry = build_registry(&config)?;
    tracing::info!(
        model = %config.model.model,
        tools = registry.len(),
        "configured agent"
    );

    let orchestrator = Orchestrator::new(
        config.worker,
        registry,
        ConsoleTransport::new(identity),
        provider,
    );
    let worker = Worker::new(orchestrator);

    let (queue, mut source) = JobQueue::channel();
    let job = Job::new(RoomRef::new(room));
    let job_id = job.id.clone();
    queue.submit(job).ok_or(Error::QueueClosed)?;
    drop(queue);

    let shutdown = CancellationToken::new();
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            on_interrupt.cancel();
        }
    });

    println!("parley v{}", env!("CARGO_PKG_VERSION"));
    worker.run(&mut source, shutdown).await;

    match source.outcome(&job_id) {
        Some(JobOutcome::Completed(reason)) => {
            println!("\nSession ended ({reason:?}).");
            Ok(())
        }
        Some(JobOutcome::Failed(message)) => Err(Error::JobFailed {
            job_id: job_id.to_string(),
            message: message.clone(),
        }),
        None => Err(Error::JobNotRun {
            job_id: job_id.to_string(),
        }),
    }
}

fn build_provider(config: &Config) -> Result<OpenAiProvider> {
    let client = config.client_config(config.api_key()?);
    let mut provider = OpenAiProvider::new(client).with_modalities(config.model.modalities.clone());
    if let Some(voice) = &config.model.voice {
        provider = provider.with_voice(voice);
    }
    if let Some(model) = &config.model.transcription_model {
        provider = provider.with_transcription(model);
    }
    Ok(provider)
}

fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new().with_call_timeout(config.worker.timeouts.tool_call());
    let weather = &config.tools.weather;
    if weather.enabled {
        registry.register(ToolDefinition::from_tool(
            WeatherTool::new().with_base_url(&weather.base_url),
        ))?;
    }
    Ok(registry)
}
