use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use pms_tui::{
    api::{errors, ApiClient, CredentialProvider, PmsApi, SessionStore, StaticToken},
    cli::{Cli, Commands, ExpenditureCommand, RisksCommand},
    config::Config,
    models::{NewExpenditure, NewRiskIssue, NotificationItem, ProjectId, Route},
    poller::PollTask,
    tui::{App, AppOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "pms_tui=info,pms=info");
    }

    if matches!(cli.command, Commands::Tui { .. }) {
        init_tui_logging()?;
    } else {
        init_cli_logging();
    }

    let config = Config::from_env()?;
    config.validate()?;

    let session = SessionStore::new(&config.session_file);
    let credentials: Arc<dyn CredentialProvider> = match &cli.token {
        Some(token) => Arc::new(StaticToken(Some(token.clone()))),
        None => Arc::new(session.clone()),
    };
    let api: Arc<dyn PmsApi> = Arc::new(
        ApiClient::new(&config, credentials).context("Failed to build HTTP client")?,
    );

    match cli.command {
        Commands::Tui { project, owner } => {
            info!("Launching TUI for project {}", project);
            match run_tui(&config, api, session, project, owner).await {
                Ok(_) => info!("TUI exited successfully"),
                Err(e) => {
                    error!("TUI failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Notifications { watch } => {
            if watch {
                watch_notifications(&config, api).await?;
            } else {
                let items = api.list_notifications().await?;
                if items.is_empty() {
                    println!("No recent activity.");
                }
                for item in &items {
                    print_notification(item);
                }
            }
        }

        Commands::Risks { command } => run_risks(api, command).await?,

        Commands::Expenditure { command } => run_expenditure(api, command).await?,

        Commands::Login { name } => {
            let token = cli
                .token
                .context("login needs the session token: pms login --token <TOKEN>")?;
            session.sign_in(&token, name.as_deref())?;
            println!("Session saved to {}", session.path().display());
        }

        Commands::Logout => {
            session.clear()?;
            println!("Logged out");
        }
    }

    Ok(())
}

/// CLI mode: logs to both stderr and `pms.log`
fn init_cli_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "pms.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}

/// TUI mode: logs to `pms_tui.log` only, to avoid interfering with the display
fn init_tui_logging() -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("pms_tui.log")
        .context("Cannot open pms_tui.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}

async fn run_tui(
    config: &Config,
    api: Arc<dyn PmsApi>,
    session: SessionStore,
    project: ProjectId,
    is_owner: bool,
) -> Result<()> {
    let options = AppOptions {
        project,
        is_owner,
        user_name: session.user_name(),
        start: Route::RiskIssues(project),
    };
    let mut app = App::new(config, api, options, Box::new(move || session.clear()));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn print_notification(item: &NotificationItem) {
    println!(
        "{} - {}: {}",
        item.local_timestamp(),
        item.author_name(),
        item.description
    );
}

async fn watch_notifications(config: &Config, api: Arc<dyn PmsApi>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _poller = PollTask::spawn(
        "notifications",
        config.notification_poll_interval(),
        move || {
            let api = api.clone();
            async move { api.list_notifications().await }
        },
        tx,
    );

    info!(
        "Watching activity every {:?}, Ctrl+C to stop",
        config.notification_poll_interval()
    );
    let mut seen: HashSet<u64> = HashSet::new();
    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let Some(items) = snapshot else { break };
                // Oldest first so the terminal reads chronologically
                for item in items.iter().rev().filter(|n| !seen.contains(&n.id)) {
                    print_notification(item);
                }
                seen.extend(items.iter().map(|n| n.id));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped watching");
                break;
            }
        }
    }
    Ok(())
}

async fn run_risks(api: Arc<dyn PmsApi>, command: RisksCommand) -> Result<()> {
    match command {
        RisksCommand::List { project } => {
            let items = api
                .list_risk_issues(project)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::LOAD_RISK_ISSUES_FAILED)))?;
            if items.is_empty() {
                println!("No risks or issues reported for this project.");
            }
            for item in items {
                println!(
                    "#{} [{}] {} ({}, impact {}) - {}",
                    item.id,
                    item.status.as_str(),
                    item.title,
                    item.kind.as_str(),
                    item.impact_level.as_str(),
                    item.description
                );
            }
        }

        RisksCommand::Report { project, kind, title, description, impact } => {
            let draft = NewRiskIssue {
                kind: Commands::parse_kind(&kind)?,
                title,
                description,
                impact_level: Commands::parse_impact(&impact)?,
            };
            let created = api
                .create_risk_issue(project, &draft)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::SUBMIT_FAILED)))?;
            info!("Reported {} #{}", created.kind.as_str(), created.id);
            println!("Reported #{}: {}", created.id, created.title);
        }

        RisksCommand::SetStatus { project, id, status } => {
            let status = Commands::parse_status(&status)?;
            let items = api
                .list_risk_issues(project)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::LOAD_RISK_ISSUES_FAILED)))?;
            let item = items
                .into_iter()
                .find(|i| i.id == id)
                .with_context(|| format!("No risk/issue #{} in project {}", id, project))?;

            api.update_risk_issue(&item.with_status(status))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::UPDATE_STATUS_FAILED)))?;
            println!("#{} is now {}", id, status.as_str());
        }
    }
    Ok(())
}

async fn run_expenditure(api: Arc<dyn PmsApi>, command: ExpenditureCommand) -> Result<()> {
    match command {
        ExpenditureCommand::Add { project, amount, description } => {
            let draft = NewExpenditure { amount, description };
            api.create_expenditure(project, &draft)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::ADD_EXPENDITURE_FAILED)))?;
            info!("Recorded expenditure of {} on project {}", draft.amount, project);
            println!("Recorded. See {}", Route::Expenditures(project).path());
        }

        ExpenditureCommand::List { project } => {
            let items = api
                .list_expenditures(project)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(errors::LOAD_EXPENDITURES_FAILED)))?;
            if items.is_empty() {
                println!("No expenditures recorded yet.");
            }
            for e in items {
                let date = e
                    .created_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("#{} {} {:>12} {}", e.id, date, e.amount, e.description);
            }
        }
    }
    Ok(())
}
