//! BizScout CLI - business research assistant from the command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bizscout_core::agent::AgentSpec;
use bizscout_core::config::BizScoutConfig;
use bizscout_core::conversation::{summarize_in_chunks, Session, DEFAULT_CHUNK_SIZE};
use bizscout_core::events::{event_channel, EventReceiver, EventSender, RunEvent};
use bizscout_core::llm::{with_retry, LLMProvider, LLMProviderFactory, Message};
use bizscout_core::memory::InMemoryStore;
use bizscout_core::search::create_search_provider;
use bizscout_core::tools::{SaveFactTool, ToolRegistry, WebSearchTool};
use bizscout_core::workflow::{research_pipeline, AgentRuntime, ResearchReport, TRIAGE_AGENT};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const ASSISTANT_NAME: &str = "BizAI";

#[derive(Parser)]
#[command(name = "bizscout")]
#[command(about = "Multi-agent business research assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to bizscout.toml and BIZSCOUT_* variables)
    #[arg(short, long, global = true, env = "BIZSCOUT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the assistant a single question
    Ask {
        question: String,
    },
    /// Interactive chat with the assistant
    Chat {
        /// Keep long-term memory of earlier exchanges in this chat
        #[arg(long)]
        memory: bool,

        /// Only send the last N exchanges as context
        #[arg(long, conflicts_with = "memory")]
        recent: Option<usize>,
    },
    /// Run the triage and specialist research pipeline on a topic
    Research {
        topic: String,

        /// Write the final report as markdown
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Agent that receives the topic
        #[arg(long, default_value = TRIAGE_AGENT)]
        entry: String,
    },
    /// Summarise a saved transcript (JSON array of messages)
    Summarize {
        transcript: PathBuf,

        /// Messages per summarised chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("bizscout {}", env!("CARGO_PKG_VERSION"));
        println!("bizscout-core {}", bizscout_core::VERSION);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => BizScoutConfig::from_file(path)?,
        None => BizScoutConfig::load()?,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling the current run");
            ctrl_c.cancel();
        }
    });

    let (tx, rx) = event_channel(config.orchestration.event_buffer);
    let printer = tokio::spawn(print_events(rx));

    let result = run(cli.command, &config, cancel, tx).await;

    // Every sender is gone once the command returns
    let _ = printer.await;
    result
}

async fn run(
    command: Commands,
    config: &BizScoutConfig,
    cancel: CancellationToken,
    events: EventSender,
) -> Result<()> {
    let provider = LLMProviderFactory::create(&config.llm)?;
    let registry = Arc::new(build_registry(config)?);
    info!(
        model = %provider.model_info().model_name,
        tools = ?registry.names(),
        "Assistant ready"
    );

    let runtime = AgentRuntime::from_config(provider.clone(), registry.clone(), config)
        .with_events(events)
        .with_cancellation(cancel);
    let retry = &config.retry;

    match command {
        Commands::Ask { question } => {
            let assistant = Arc::new(assistant_spec(config, &registry)?);
            let outcome = with_retry(retry, || {
                runtime.run(assistant.clone(), vec![Message::user(question.as_str())])
            })
            .await?;
            println!("{}", outcome.output.as_text());
        }

        Commands::Chat { memory, recent } => {
            let assistant = Arc::new(assistant_spec(config, &registry)?);
            let mut session = Session::new().with_memory_k(config.memory.k);
            if memory || config.memory.enabled {
                session = session.with_memory(Arc::new(InMemoryStore::new()));
            }
            chat(&runtime, &assistant, &mut session, config, recent).await?;
        }

        Commands::Research { topic, out, entry } => {
            let pipeline = research_pipeline(runtime)?;
            let outcome = with_retry(retry, || {
                pipeline.run_pipeline(&entry, vec![Message::user(topic.as_str())])
            })
            .await?;

            let text = match outcome.artifact.parse::<ResearchReport>() {
                Ok(report) => report.to_markdown(),
                Err(_) => outcome.artifact.as_text(),
            };

            match out {
                Some(path) => {
                    tokio::fs::write(&path, &text)
                        .await
                        .with_context(|| format!("writing report to {}", path.display()))?;
                    println!("Report written to {}", path.display());
                }
                None => println!("{}", text),
            }
        }

        Commands::Summarize {
            transcript,
            chunk_size,
        } => {
            let raw = tokio::fs::read_to_string(&transcript)
                .await
                .with_context(|| format!("reading {}", transcript.display()))?;
            let messages: Vec<Message> =
                serde_json::from_str(&raw).context("transcript must be a JSON array of messages")?;

            let summaries = summarize_in_chunks(provider.as_ref(), &messages, chunk_size).await;
            for (i, summary) in summaries.iter().enumerate() {
                println!("{}. {}", i + 1, summary);
            }
        }

        Commands::Version => {}
    }

    Ok(())
}

/// Save-fact tool always; web search when a backend is configured
fn build_registry(config: &BizScoutConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    match create_search_provider(&config.search)? {
        Some(search) => registry.register(Arc::new(WebSearchTool::new(search)))?,
        None => warn!("Web search disabled; the assistant will answer from the model alone"),
    }
    registry.register(Arc::new(SaveFactTool::new()))?;
    Ok(registry)
}

fn assistant_spec(config: &BizScoutConfig, registry: &ToolRegistry) -> Result<AgentSpec> {
    Ok(AgentSpec::builder(ASSISTANT_NAME)
        .instructions(config.chat.instructions.clone())
        .tools(registry.names())
        .build()?)
}

async fn chat(
    runtime: &AgentRuntime,
    assistant: &Arc<AgentSpec>,
    session: &mut Session,
    config: &BizScoutConfig,
    recent: Option<usize>,
) -> Result<()> {
    let stop_phrase = config.chat.stop_phrase.to_lowercase();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Chatting with {} (type 'exit' to quit)", ASSISTANT_NAME);
    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = if session.memory().is_some() {
            session.ask_with_memory(runtime, assistant, input).await
        } else if let Some(n) = recent {
            session
                .ask_with_recent_context(runtime, assistant, input, n)
                .await
        } else {
            session.ask(runtime, assistant, input).await
        };

        match answer {
            Ok(answer) => {
                println!("\n{}: {}", ASSISTANT_NAME, answer);
                if !stop_phrase.is_empty() && answer.to_lowercase().contains(&stop_phrase) {
                    break;
                }
            }
            Err(e) => {
                eprintln!("\n{}", e.kind().user_message());
                warn!(error = %e, "Chat turn failed");
                if matches!(e, bizscout_core::BizScoutError::Cancelled) {
                    break;
                }
            }
        }
    }

    if !session.facts().is_empty() {
        println!("\nFacts collected:");
        for fact in session.facts() {
            println!("- {}", fact);
        }
    }
    Ok(())
}

/// Progress lines on stderr so stdout stays clean for answers and reports
async fn print_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::ToolCompleted {
                tool_name,
                success,
                duration_ms,
                ..
            } => {
                let status = if success { "ok" } else { "failed" };
                eprintln!("  [{}] {} ({} ms)", tool_name, status, duration_ms);
            }
            RunEvent::Handoff { from, to, .. } => {
                eprintln!("  {} -> {}", from, to);
            }
            RunEvent::FactCollected { fact, .. } => {
                eprintln!("  fact: {}", fact);
            }
            _ => {}
        }
    }
}
