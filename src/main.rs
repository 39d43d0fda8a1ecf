use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use restkit::config::{self, Config};
use restkit::events::{self, Event};
use restkit::metrics::Reporter;
use restkit::{logging, server, tasks, AppState};

#[derive(Debug, Parser)]
#[command(name = "restkit", version, about = "REST API service with an in-process event bus")]
struct Cli {
    /// YAML config file. Defaults apply when it does not exist.
    #[arg(short, long, env = "RESTKIT_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Run a one-shot maintenance task.
    Task {
        /// One of: cleanup, data-sync, send-emails.
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = logging::init(&cfg.log);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => match serve(cfg).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "server failed");
                ExitCode::FAILURE
            }
        },
        Command::Task { name } => match tasks::run(&name).await {
            Ok(elapsed) => {
                println!("Task '{name}' completed successfully (took {elapsed:?})");
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn serve(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let listen = cfg.server.listen_addr()?;
    let mode = cfg.server.mode;
    let report_interval = cfg.monitor.report_interval();

    let state = Arc::new(AppState::new(cfg));
    let reporter = Reporter::new(
        Arc::clone(&state.monitor),
        Arc::clone(&state.bus),
        report_interval,
    )
    .spawn();

    let app = server::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(listen).await?;
    let bound = listener.local_addr()?;

    state.bus.publish(Event::new(
        events::SYSTEM_STARTED,
        json!({ "port": bound.port(), "mode": mode.as_str() }),
    ));
    tracing::info!(listen = %bound, mode = mode.as_str(), "server listening");

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    state
        .bus
        .publish_and_wait(Event::new(
            events::SYSTEM_SHUTDOWN,
            json!({ "mode": mode.as_str(), "time": chrono::Utc::now().to_rfc3339() }),
        ))
        .await;
    reporter.abort();

    let stats = state.monitor.stats();
    tracing::info!(
        uptime = %stats.uptime,
        total_requests = stats.total_requests,
        error_rate = stats.error_rate,
        "final stats"
    );

    result.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
