use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homefeed::config::Config;
use homefeed::fetcher::FeedService;
use homefeed::proxy::EventualAddr;
use homefeed::routes::{self, AppState, PROXY_WAIT};

const CONFIG_PATH: &str = "homefeed.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homefeed=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if Path::new(CONFIG_PATH).exists() {
        Config::load(CONFIG_PATH)?
    } else {
        info!("No {} found, using defaults", CONFIG_PATH);
        Config::default()
    };
    info!(
        "Serving the {} feed, refreshing every {} minutes",
        config.locale, config.refresh_interval
    );

    let service = Arc::new(FeedService::with_endpoint(config.endpoint.clone()));

    let state = Arc::new(AppState {
        service: service.clone(),
        locale: config.locale.clone(),
        proxy: EventualAddr::with_value(config.proxy_addr.clone()),
    });

    // Start background refresh task
    let bg_state = state.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        start_background_refresh(bg_state, refresh_interval).await;
    });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr.as_str()).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn start_background_refresh(state: Arc<AppState>, interval_minutes: u64) {
    let interval = Duration::from_secs(interval_minutes.max(1) * 60);

    loop {
        let mut sources: Vec<String> = Vec::new();
        match state
            .service
            .get_feed_via(&state.locale, &state.proxy, PROXY_WAIT, &mut sources)
            .await
        {
            Ok(count) => info!("Feed refreshed: {} entries from {} sources", count, sources.len()),
            Err(e) => error!("Scheduled feed refresh failed: {}", e),
        }
        tokio::time::sleep(interval).await;
    }
}
