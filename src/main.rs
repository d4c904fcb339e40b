//! slircbot - Straylight IRC bot

use std::sync::Arc;

use slircbot::config::{self, Config, LogFormat};
use slircbot::plugin::{CorePlugin, StaticDiscovery};
use slircbot::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Loaded before tracing so the configured filter applies.
    let config = Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load {config_path}: {e}"))?;

    init_tracing(&config);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.address,
        port = config.server.port,
        nickname = %config.identity.nickname,
        "Starting slircbot"
    );

    let discovery = StaticDiscovery::new().with(Arc::new(CorePlugin::new([])));
    let client = Client::new(Arc::new(config), discovery)?;

    if let Err(e) = client.initialise().await {
        error!(error = %e, "Failed to initialise client");
        client.dispose().await;
        return Err(e.into());
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let result = client.run(shutdown).await;
    client.dispose().await;
    result?;

    info!("slircbot stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
