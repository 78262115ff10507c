use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pdfchat::config::{DEFAULT_API_URL, DEFAULT_MAX_UPLOAD_BYTES};
use pdfchat::{
    ChatError, ClientConfig, ConfigError, Conversation, Document, ErrorCode, HttpTransport, SessionId, Transport,
    TransportError, TurnStatus, UploadAck, UploadCoordinator, UploadError, UploadTracker,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("could not read {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("{}", .0.user_message())]
    Upload(#[from] UploadError),
    #[error("{}", .0.user_message())]
    Chat(#[from] ChatError),
    #[error("No session ID provided. Please upload a PDF first.")]
    MissingSession,
    #[error("stdin read failed: {0}")]
    Stdin(std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pdfchat", about = "Upload a PDF and ask questions about it")]
struct Cli {
    #[arg(long, env = "PDFCHAT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF and print the new session id.
    Upload { path: PathBuf },
    /// Ask one question in an existing session.
    Ask {
        #[arg(long)]
        session_id: Option<String>,
        question: String,
    },
    /// Chat interactively in an existing session.
    Chat {
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Upload a PDF, then chat about it.
    Start { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::with_api_url(&cli.api_url)?;
    config.max_upload_bytes = cli.max_upload_bytes;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    debug!(api_url = %config.api_url, "backend configured");

    match cli.command {
        Command::Upload { path } => {
            let ack = run_upload(&config, transport, &path).await?;
            println!("{}", ack.session_id);
            Ok(())
        }
        Command::Ask { session_id, question } => {
            let session_id = session_id.as_deref().and_then(SessionId::parse);
            run_ask(transport, session_id, &question).await
        }
        Command::Chat { session_id } => {
            let session_id = session_id.as_deref().and_then(SessionId::parse);
            run_chat(transport, session_id).await
        }
        Command::Start { path } => {
            let ack = run_upload(&config, transport.clone(), &path).await?;
            eprintln!("session: {}", ack.session_id);
            run_chat(transport, Some(ack.session_id)).await
        }
    }
}

async fn run_upload(config: &ClientConfig, transport: Arc<dyn Transport>, path: &Path) -> Result<UploadAck, CliError> {
    if !path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    {
        warn!(path = %path.display(), "file does not have a .pdf extension");
    }
    let document = Document::from_path(path)
        .await
        .map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let tracker = UploadTracker::with_events(tx);
    let printer = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            eprint!("\r{:<10} {:>3}%", state.phase.as_str(), state.progress);
            if state.phase.is_terminal() {
                eprintln!();
                break;
            }
        }
    });

    let coordinator = UploadCoordinator::new(transport, config);
    let result = coordinator.upload_new(Some(&document), &tracker).await;
    drop(tracker);
    if let Err(e) = printer.await {
        debug!(error = %e, "progress printer stopped");
    }
    result.map_err(CliError::from)
}

async fn run_ask(transport: Arc<dyn Transport>, session_id: Option<SessionId>, question: &str) -> Result<(), CliError> {
    if session_id.is_none() {
        return Err(CliError::MissingSession);
    }
    let conversation = Conversation::new(session_id, transport);
    if let Some(answer) = conversation.ask(question).await? {
        println!("{}", answer.content);
    }
    Ok(())
}

async fn run_chat(transport: Arc<dyn Transport>, session_id: Option<SessionId>) -> Result<(), CliError> {
    if session_id.is_none() {
        return Err(CliError::MissingSession);
    }
    let conversation = Conversation::new(session_id, transport);
    eprintln!("Ask a question about your PDF (/history to review, /quit to leave).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(CliError::Stdin)? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => print_history(&conversation),
            _ => match conversation.ask(&line).await {
                Ok(Some(answer)) => println!("{}", answer.content),
                Ok(None) => {}
                Err(e) => eprintln!("{}", e.user_message()),
            },
        }
    }
    Ok(())
}

fn print_history(conversation: &Conversation) {
    for turn in conversation.turns() {
        let marker = match turn.status {
            TurnStatus::Unanswered => " (no answer)",
            TurnStatus::Pending | TurnStatus::Answered => "",
        };
        println!("{:>9}: {}{marker}", turn.role.as_str(), turn.content);
    }
}
