use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slidechat::config::{API_KEY_ENV, DATA_DIR_NAME};
use slidechat::providers::OpenAiAssistantClient;
use slidechat::services::conversion::{convert_batch, Progress};
use slidechat::services::export::export_to_markdown;
use slidechat::services::{
    AppSettings, AssistantOptions, AssistantService, CommandConverter, Database, SessionStore,
    SettingsService,
};

#[derive(Debug, Parser)]
#[command(name = "slidechat", version, about = "Convert slide decks to PDF and chat with them")]
struct Cli {
    /// API key for the assistant service
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Directory holding the local database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert presentations to PDF next to the originals
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Upload PDFs and start a new chat session, replacing the current one
    Session {
        #[arg(required = true)]
        documents: Vec<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Ask the current session a question
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the current session's messages
    History,
    /// Write the current session as Markdown
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change persisted settings
    Settings(SettingsArgs),
    /// Forget the current session
    Reset,
}

/// Settings that apply to this invocation only; nothing is persisted.
#[derive(Debug, Default, Args)]
struct Overrides {
    /// Model for a newly created assistant
    #[arg(long)]
    model: Option<String>,
    /// Converter program to run instead of the configured one
    #[arg(long)]
    converter: Option<String>,
    /// Give up on a run after this many seconds; 0 waits indefinitely
    #[arg(long)]
    poll_timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, mut settings: AppSettings) -> AppSettings {
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(converter) = self.converter {
            settings.converter_program = converter;
        }
        if let Some(timeout) = self.poll_timeout_secs {
            settings.poll_timeout_secs = Some(timeout).filter(|t| *t > 0);
        }
        settings
    }
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    converter: Option<String>,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Give up on a run after this many seconds; 0 waits indefinitely
    #[arg(long)]
    poll_timeout_secs: Option<u64>,
    /// Restore every setting to its default first
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let db = open_database(cli.data_dir.as_deref()).await?;
    let settings = SettingsService::load(&db).await;
    let store = SessionStore::new(db.clone());
    store.load().await.context("Failed to load stored session")?;

    match cli.command {
        Command::Convert { files, overrides } => {
            convert(&overrides.apply(settings), &files).await
        }
        Command::Session {
            documents,
            overrides,
        } => {
            let settings = overrides.apply(settings);
            let service = assistant(&settings, store, cli.api_key.as_deref()).await?;
            let session = service.create_session(&documents).await?;
            println!("{}", session.name);
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { text, overrides } => {
            let settings = overrides.apply(settings);
            let service = assistant(&settings, store, cli.api_key.as_deref()).await?;
            let session = match service.store().current().await {
                Some(session) => session,
                None => bail!("No active session. Start one with `slidechat session <PDF>...`"),
            };
            let reply = service.send_message(&session, &text.join(" ")).await?;
            println!("{}", reply);
            Ok(ExitCode::SUCCESS)
        }
        Command::History => {
            let Some(session) = store.current().await else {
                println!("No active session.");
                return Ok(ExitCode::SUCCESS);
            };
            println!("{} ({})", session.name, session.document_names.join(", "));
            for msg in session.messages() {
                println!(
                    "[{}] {}: {}",
                    msg.created_at.format("%H:%M:%S"),
                    msg.role.as_str(),
                    msg.content
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Export { output } => {
            let session = store.current().await.context("No active session to export")?;
            let markdown = export_to_markdown(&session);
            match output {
                Some(path) => {
                    tokio::fs::write(&path, markdown)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => print!("{}", markdown),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Settings(args) => {
            update_settings(&db, settings, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Reset => {
            store.clear().await?;
            println!("Session cleared.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn open_database(data_dir: Option<&std::path::Path>) -> Result<Database> {
    match data_dir {
        Some(dir) => {
            let path = dir.join(format!("{}.db", DATA_DIR_NAME));
            tokio::task::spawn_blocking(move || Database::open_at(&path)).await?
        }
        None => Database::new().await,
    }
}

async fn assistant(
    settings: &AppSettings,
    store: SessionStore,
    api_key: Option<&str>,
) -> Result<AssistantService> {
    let api_key = api_key.unwrap_or_default();
    let client = OpenAiAssistantClient::new(api_key, settings.api_base_url.as_deref())
        .with_context(|| format!("Pass --api-key or set {}", API_KEY_ENV))?;

    if store.reconcile_credential(api_key).await? {
        eprintln!("API key changed; the previous session was cleared.");
    }

    Ok(AssistantService::new(
        Arc::new(client),
        store,
        AssistantOptions::from(settings),
    ))
}

async fn convert(settings: &AppSettings, files: &[PathBuf]) -> Result<ExitCode> {
    let converter = CommandConverter::from(settings);

    let report = convert_batch(&converter, files, |progress: Progress| {
        eprintln!(
            "[{:>3.0}%] {}/{}",
            progress.fraction() * 100.0,
            progress.completed,
            progress.total
        );
    })
    .await?;

    for output in &report.converted {
        println!("{}", output.display());
    }
    for (input, error) in &report.failed {
        eprintln!("{}: {}", input.display(), error);
    }

    if report.failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn update_settings(db: &Database, current: AppSettings, args: SettingsArgs) -> Result<()> {
    let mut settings = if args.reset {
        AppSettings::default()
    } else {
        current
    };
    let before = settings.clone();

    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(base_url) = args.base_url {
        settings.api_base_url = Some(base_url).filter(|u| !u.is_empty());
    }
    if let Some(converter) = args.converter {
        settings.converter_program = converter;
    }
    if let Some(interval) = args.poll_interval_ms {
        settings.poll_interval_ms = interval.max(1);
    }
    if let Some(timeout) = args.poll_timeout_secs {
        settings.poll_timeout_secs = Some(timeout).filter(|t| *t > 0);
    }

    if args.reset || settings != before {
        SettingsService::save(db, &settings).await?;
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
