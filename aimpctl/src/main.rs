//! Wires the settings, store, method registry, broker, and HTTP transport
//! together and runs the event loop. Startup order matches the dependency
//! chain: settings, then the store, then the player/cover seams, then the
//! method registry, then the broker, then the HTTP transport.

mod player;

use std::sync::Arc;
use std::time::Duration;

use aimpctl_config::Config;
use aimpctl_covers::{CoverService, ImageCrateScaler};
use aimpctl_rpc::methods::{self, Context};
use aimpctl_rpc::{Broker, Dispatcher, Frontend, JsonRpcFrontend, MethodRegistry, QueryStringFrontend, XmlRpcFrontend};
use aimpctl_server::AppState;
use aimpctl_store::Store;
use player::InProcessPlayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load_default());
    init_logging(&config);
    tracing::info!(port = config.http_port(), "loaded configuration");

    let store = Arc::new(Store::open(&config.database_path())?);

    let player: Arc<InProcessPlayer> = Arc::new(InProcessPlayer::default());
    let scheduler = Arc::new(aimpctl_rpc::Scheduler::new());
    let rating = Arc::new(aimpctl_rpc::RatingWriter::new(config.file_to_save_ratings()));

    let cover_service = Arc::new(CoverService::new(
        config.cover_directory(),
        config.document_root(),
        player.clone(),
        Arc::new(ImageCrateScaler::new(player.clone())),
    )?);

    let ctx = Arc::new(Context {
        store: store.clone(),
        player: player.clone() as Arc<dyn aimpctl_rpc::PlayerBackend>,
        scheduler: scheduler.clone(),
        rating,
        enable_physical_track_deletion: config.enable_physical_track_deletion(),
        enable_scheduler: config.enable_scheduler(),
    });

    let broker = Arc::new(Broker::new());

    let mut registry = MethodRegistry::new();
    methods::register_control_methods(&mut registry, ctx.clone());
    methods::register_query_methods(&mut registry, ctx.clone());
    methods::register_compat_method(&mut registry, ctx.clone());
    registry.register("GetAlbumCoverURI", Arc::new(methods::cover::GetAlbumCoverUri::new(cover_service)));
    aimpctl_rpc::register_subscribe_method(&mut registry, broker.clone());

    let frontends: Vec<Arc<dyn Frontend>> = vec![Arc::new(XmlRpcFrontend), Arc::new(QueryStringFrontend), Arc::new(JsonRpcFrontend)];
    let dispatcher = Dispatcher::new(frontends, registry);

    let state = Arc::new(AppState {
        dispatcher,
        store,
        player: player.clone() as Arc<dyn aimpctl_rpc::PlayerBackend>,
        document_root: config.document_root(),
        enable_track_upload: config.enable_track_upload(),
        init_cookies: config.init_cookies(),
    });

    if config.enable_scheduler() {
        spawn_scheduler_tick(scheduler, player.clone(), config.scheduler_poll_interval_ms());
    }

    let router = aimpctl_server::build_router(state);
    let address = format!("{}:{}", config.http_bind_address(), config.http_port());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Ticks the single-slot scheduler timer at the configured granularity.
fn spawn_scheduler_tick(scheduler: Arc<aimpctl_rpc::Scheduler>, player: Arc<InProcessPlayer>, interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));
        loop {
            interval.tick().await;
            scheduler.tick(player.as_ref());
        }
    });
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received ctrl-c, shutting down");
}

/// `logging.enable_console` toggles ANSI colour codes rather than the sink
/// itself — this binary has only one sink, stdout.
fn init_logging(config: &Config) {
    let filter = format!(
        "aimpctl={level},aimpctl_rpc={level},aimpctl_server={level},aimpctl_store={level},aimpctl_covers={level}",
        level = config.logging_min_level()
    );
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_ansi(config.logging_enable_console())
        .init();
}
