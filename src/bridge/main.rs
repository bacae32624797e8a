mod completion;
mod config;
mod handler;
mod slack;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use lambda_http::{run, Error};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use completion::AzureOpenAiClient;
use config::Config;
use handler::AppState;

fn main() -> Result<(), Error> {
    // .env has to be applied before the runtime spawns worker threads
    config::load_dotenv();

    let on_lambda = std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some();
    init_tracing(on_lambda);

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "refusing to start with invalid configuration");
        e
    })?;
    info!(?config, "configuration loaded");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config, on_lambda))
}

fn init_tracing(on_lambda: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // CloudWatch stamps every line already
    if on_lambda {
        subscriber.without_time().init();
    } else {
        subscriber.init();
    }
}

async fn serve(config: Config, on_lambda: bool) -> Result<(), Error> {
    let completions = AzureOpenAiClient::new(
        config.completion_endpoint.clone(),
        config.api_key.clone(),
        config.request_timeout,
    )?;
    let app = handler::router(
        AppState::new(&config, Arc::new(completions)),
        &config.command_path,
    );

    if on_lambda {
        info!(path = %config.command_path, "serving slash commands from the Lambda runtime");
        return run(app).await;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, path = %config.command_path, "listening for slash commands");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .unwrap_or_else(|e| error!(error = %e, "ctrl-c handler failed"));
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable, relying on ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}
