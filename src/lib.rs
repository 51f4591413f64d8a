pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod models;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Loads config from `--config` or the default search path.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            config.validate()?;
            let prometheus_handle = init_observability(&config)?;
            run_daemon(config, prometheus_handle).await
        }
        Commands::HashPassword => {
            let stdin = std::io::stdin();
            cli::cmd_hash_password(&config, &mut stdin.lock(), &mut std::io::stdout())
        }
        Commands::CheckConfig => cli::cmd_check_config(&config),
    }
}

fn init_observability(
    config: &Config,
) -> anyhow::Result<Option<metrics_exporter_prometheus::PrometheusHandle>> {
    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.extra_field("env", "production")?.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    Ok(prometheus_handle)
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "ScriptVault v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config).await?);
    info!(
        accounts = shared.credentials.len().await,
        "Credential store loaded"
    );

    let sweeper_handle = shared.sweeper().map(services::Sweeper::start);

    let server = shared.config.server.clone();
    if server.enabled {
        let api_state = api::create_app_state(shared.clone(), prometheus_handle)?;
        let app = api::router(api_state);

        let addr = format!("{}:{}", server.bind_address, server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!("Web Server running at http://{}. Press Ctrl+C to stop.", addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;
    } else {
        info!("Web server disabled. Press Ctrl+C to stop.");
        shutdown_signal().await;
    }

    if let Some(handle) = sweeper_handle {
        handle.abort();
    }
    info!("Stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }
}
