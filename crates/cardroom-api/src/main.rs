//! Cardroom CLI and lobby server entry point.
//!
//! Binary name: `cardroom`
//!
//! Parses CLI arguments, initializes storage and services, then dispatches to
//! a table command or starts the server together with the game relay.

mod cli;
mod http;
mod state;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use cardroom_types::game::CreateGameRequest;
use cli::{Cli, Commands, GamesCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    cardroom_observe::tracing_setup::init_tracing(cli.log_filter(), otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    cardroom_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            in_memory,
            ..
        } => {
            let state = AppState::init(in_memory).await?;
            serve(state, host, port, cli.quiet).await?;
        }

        Commands::Games { action } => {
            let state = AppState::init(false).await?;
            match action {
                GamesCommand::List => cli::games::list_games(&state, cli.json).await?,
                GamesCommand::Create {
                    name,
                    max_players,
                    small_blind,
                    big_blind,
                } => {
                    let req = CreateGameRequest {
                        name,
                        max_players,
                        small_blind,
                        big_blind,
                    };
                    cli::games::create_game(&state, req, cli.json, cli.quiet).await?;
                }
                GamesCommand::Delete { id } => {
                    cli::games::delete_game(&state, &id, cli.json, cli.quiet).await?;
                }
            }
        }
    }

    Ok(())
}

/// Run the HTTP server and the relay supervisor until Ctrl+C or SIGTERM.
async fn serve(
    state: AppState,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.host.clone());
    let port = port.unwrap_or(state.config.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown = CancellationToken::new();
    let supervisor = state.supervisor().start(shutdown.clone());

    tracing::info!(
        %addr,
        store = state.store.kind(),
        data_dir = %state.data_dir.display(),
        "lobby server listening"
    );
    if !quiet {
        println!(
            "  {} Cardroom lobby listening on {}",
            console::style("♠").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state);
    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await;

    // Stop the relay even when the server exited with an error.
    shutdown.cancel();
    if let Err(err) = supervisor.await {
        tracing::error!("game relay task failed: {err}");
    }

    served?;
    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
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
}
