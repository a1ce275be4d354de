//! Command-line surface.
//!
//! Each subcommand is one user action from the web client: submit an
//! anamnesis, browse history, sign in, check backend health, or run the
//! same-origin relay.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::config::{ClientConfig, MockFallback, DEFAULT_PROXY_BIND, DEFAULT_PROXY_PREFIX};
use crate::core_state::{CoreError, CoreState};
use crate::input;
use crate::models::Theme;
use crate::proxy::{start_proxy_server, ProxyConfig, ProxyError};
use crate::render;
use crate::storage::StorageError;
use crate::stores::health::poll_once;
use crate::tutorial::{Tutorial, EXAMPLE_PROMPTS};
use crate::workflow::{HistorySource, WorkflowError};

#[derive(Parser, Debug)]
#[command(name = "clindiag", version, about = "Client for the clinical diagnosis backend")]
pub struct Cli {
    /// Backend base URL (overrides CLINDIAG_BACKEND_URL / BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Directory for the saved session, local history and settings
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Answer with a demo diagnosis when the backend is unreachable
    #[arg(long, global = true)]
    pub mock_fallback: bool,

    /// Report an unreachable backend as online
    #[arg(long, global = true)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relay /api/backend/* to the backend
    ServeProxy {
        #[arg(long, env = "CLINDIAG_PROXY_BIND", default_value = DEFAULT_PROXY_BIND)]
        bind: SocketAddr,

        #[arg(long, default_value = DEFAULT_PROXY_PREFIX)]
        prefix: String,
    },

    /// Check backend health
    Health {
        /// Keep polling and print every change
        #[arg(long)]
        watch: bool,
    },

    /// Submit an anamnesis (argument, --file, or stdin)
    Diagnose {
        text: Option<String>,

        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Sign in
    Login {
        email: String,

        #[arg(long, env = "CLINDIAG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        email: String,

        #[arg(long, env = "CLINDIAG_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Display name (defaults to the part of the email before @)
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Browse diagnosis history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show or change the colour theme
    Theme { theme: Option<Theme> },

    /// Walk through the anamnesis screen
    Tutorial,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List entries, optionally filtered
    List {
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Delete one entry
    Delete { id: String },
    /// Delete every entry
    Clear,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) => e.user_message(),
            Self::Workflow(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the environment.
    pub fn resolve_config(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = self.backend_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if self.mock_fallback {
            config.mock_fallback = MockFallback::Enabled;
        }
        if self.dev {
            config.dev_mode = true;
        }
        config
    }
}

pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let config = cli.resolve_config(ClientConfig::from_env());
    tracing::debug!(backend = %config.backend_url, "configuration resolved");
    let open_core = || CoreState::open(config.clone());

    match cli.command {
        Command::ServeProxy { bind, prefix } => serve_proxy(&config, bind, &prefix).await,
        Command::Tutorial => {
            print_tutorial();
            Ok(())
        }
        Command::Health { watch } => health(&open_core()?, watch).await,
        Command::Diagnose { text, file } => diagnose(&open_core()?, text, file).await,
        Command::Login { email, password } => {
            let core = open_core()?;
            let password = password_or_prompt(password).await?;
            let user = core.login(&email, &password).await?;
            println!("Вход выполнен: {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let core = open_core()?;
            let password = password_or_prompt(password).await?;
            let user = core.register(&email, &password, name.as_deref()).await?;
            println!("Аккаунт создан: {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Logout => {
            open_core()?.logout()?;
            println!("Выход выполнен.");
            Ok(())
        }
        Command::Whoami => {
            match open_core()?.refresh_session().await? {
                Some(user) => println!("{} <{}> {}", user.name, user.email, user.role),
                None => println!("Вход не выполнен."),
            }
            Ok(())
        }
        Command::History { command } => history(&open_core()?, command).await,
        Command::Theme { theme } => {
            let core = open_core()?;
            if let Some(theme) = theme {
                core.settings.set_theme(theme)?;
            }
            println!("{}", core.settings.theme());
            Ok(())
        }
    }
}

// ── Commands ────────────────────────────────────────────

async fn serve_proxy(config: &ClientConfig, bind: SocketAddr, prefix: &str) -> Result<(), CliError> {
    let proxy = ProxyConfig::new(&config.backend_url).with_prefix(prefix);
    let server = start_proxy_server(proxy, bind).await?;
    println!(
        "Relay listening on http://{}{} → {}",
        server.local_addr(),
        prefix,
        server.backend_url()
    );

    wait_for_ctrl_c().await;
    tracing::info!(started_at = %server.started_at(), "relay shutting down");
    server.stop().await;
    Ok(())
}

async fn health(core: &CoreState, watch: bool) -> Result<(), CliError> {
    if !watch {
        poll_once(&core.client, &core.health, &core.health_policy()).await;
        println!("{}", render::render_health(&core.health.get()));
        return Ok(());
    }

    let mut rx = core.health.subscribe();
    let monitor = core.start_health_monitor();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *rx.borrow_and_update();
                println!("{}", render::render_health(&status));
            }
            () = wait_for_ctrl_c() => break,
        }
    }
    monitor.stop();
    Ok(())
}

async fn diagnose(
    core: &CoreState,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<(), CliError> {
    let raw = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CliError::Io {
                source_name: path.display().to_string(),
                source,
            })?,
        (None, None) => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|source| CliError::Io {
                    source_name: "stdin".into(),
                    source,
                })?;
            buf
        }
    };

    let workflow = core.workflow();
    let raw = raw.trim();
    let adjusted = input::adjustments(raw);
    if adjusted.stripped_chars {
        eprintln!("{}", input::ALLOWED_CHARS_HINT);
    }
    if adjusted.truncated {
        eprintln!(
            "Текст сокращён до {} символов (было {}).",
            input::MAX_INPUT_CHARS,
            raw.chars().count()
        );
    }
    workflow.diagnosis().set_input(raw);

    let mut progress = workflow.diagnosis().subscribe();
    let printer = tokio::spawn(async move {
        let mut last: Option<String> = None;
        while progress.changed().await.is_ok() {
            let step = progress.borrow_and_update().progress_step.clone();
            if step != last {
                if let Some(label) = &step {
                    eprintln!("{label}");
                }
                last = step;
            }
        }
    });

    let outcome = workflow.submit().await;
    printer.abort();

    let result = outcome?;
    print!("{}", render::render_result(&result));
    Ok(())
}

async fn history(core: &CoreState, command: HistoryCommand) -> Result<(), CliError> {
    let view = core.history_view();
    match command {
        HistoryCommand::List { query } => {
            let items = view.list(query.as_deref().unwrap_or_default()).await?;
            let source = match view.source() {
                HistorySource::Server => "сервер",
                HistorySource::Local => "локально",
            };
            println!("История ({source}, {} зап.)", items.len());
            print!("{}", render::render_history(&items));
        }
        HistoryCommand::Delete { id } => {
            if view.remove(&id).await? {
                println!("Удалено: {id}");
            } else {
                return Err(CliError::Usage(format!("Запись не найдена: {id}")));
            }
        }
        HistoryCommand::Clear => {
            view.clear().await?;
            println!("История очищена.");
        }
    }
    Ok(())
}

fn print_tutorial() {
    let mut tour = Tutorial::default();
    loop {
        if let Some(step) = tour.current() {
            println!("[{}/{}] {}", tour.index() + 1, tour.len(), step.title);
            println!("    {}\n", step.body);
        }
        if !tour.next() {
            break;
        }
    }
    println!("Примеры:");
    for prompt in EXAMPLE_PROMPTS {
        println!("  - {prompt}");
    }
}

// ── Helpers ─────────────────────────────────────────────

async fn password_or_prompt(password: Option<String>) -> Result<String, CliError> {
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        return Ok(password);
    }
    eprint!("Пароль: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|source| CliError::Io {
            source_name: "stdin".into(),
            source,
        })?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(CliError::Usage("Пароль не указан".into()));
    }
    Ok(password)
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
