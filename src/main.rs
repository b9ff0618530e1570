use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_companion::{
    create_router, AppState, Config, DevTokenIssuer, JsonFileSettings, LogOverlay, LoopbackRelay,
    NatsOverlay, OverlaySurface, SessionController, SessionDeps, SyntheticHost,
};
use voice_companion::session::{FixedIdentity, IdentityPrompt, NoPrompt};

#[derive(Parser, Debug)]
#[command(name = "voice-companion", about = "Voice chat companion client")]
struct Args {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/voice-companion")]
    config: String,

    /// Channel to select at startup
    #[arg(long)]
    channel: Option<u32>,

    /// Connect at startup regardless of the auto-connect preference
    #[arg(long)]
    connect: bool,

    /// Display identity to use when none is stored
    #[arg(long)]
    identity: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("Voice Companion v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Relay endpoint: {}", cfg.relay.endpoint);

    let settings_path = cfg.settings_path()?;
    let settings = JsonFileSettings::open(&settings_path).await?;
    info!("Settings file: {}", settings_path.display());

    let overlay: Arc<dyn OverlaySurface> =
        match NatsOverlay::connect(&cfg.overlay.nats_url, cfg.overlay.subject.clone()).await {
            Ok(overlay) => Arc::new(overlay),
            Err(e) => {
                warn!("Overlay unavailable ({:#}), logging presence events instead", e);
                Arc::new(LogOverlay)
            }
        };

    let identity_prompt: Arc<dyn IdentityPrompt> = match args.identity {
        Some(name) => Arc::new(FixedIdentity(name)),
        None => Arc::new(NoPrompt),
    };

    let deps = SessionDeps {
        tokens: Arc::new(DevTokenIssuer::new(Duration::from_secs(cfg.token.ttl_secs))),
        provider: Arc::new(LoopbackRelay::new()),
        audio: Arc::new(SyntheticHost::new()),
        settings: Arc::new(settings),
        identity_prompt,
        overlay,
    };

    let controller = SessionController::spawn(cfg.session_config(), deps).await;

    if let Some(channel) = args.channel {
        controller.switch_channel(channel).await?;
    }
    if args.connect {
        if let Err(e) = controller.connect().await {
            warn!("Startup connect failed: {}", e);
        }
    }

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Control API listening on http://{}", addr);

    let app = create_router(AppState::new(controller.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    controller.shutdown().await;
    info!("Stopped");

    Ok(())
}
