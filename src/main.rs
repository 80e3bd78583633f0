use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use marge_template_light::api::{self, AppState};
use marge_template_light::config::{self, DEFAULT_HTTP_PORT};
use marge_template_light::mqtt;
use marge_template_light::platform::LightPlatform;
use marge_template_light::state::StateMachine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,marge_template_light=debug")),
        )
        .init();

    tracing::info!("Starting marge-template-light v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("MARGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("lights.yaml"));
    let config = config::load_config(&config_path)?;
    tracing::info!("Loaded {} light entries from {}", config.light.len(), config_path.display());

    let state_machine = Arc::new(StateMachine::new(4096));

    let (transport, event_loop) = mqtt::connect(&config.mqtt);
    let platform = Arc::new(LightPlatform::new(Arc::new(transport), state_machine.clone()));
    platform.setup(config.light);

    let _bridge = mqtt::start_bridge(event_loop, platform.clone());
    tracing::info!("MQTT bridge connecting to {}:{}", config.mqtt.host, config.mqtt.port);

    let app_state = Arc::new(AppState {
        state_machine,
        platform,
    });
    let app = api::router(app_state);

    let port: u16 = std::env::var("MARGE_HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .or(config.http_port)
        .unwrap_or(DEFAULT_HTTP_PORT);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
