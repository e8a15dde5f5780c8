use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::warn;

use crate::fetcher::FeedService;
use crate::model::{Article, ALL_ITEMS};
use crate::proxy::EventualAddr;

/// How long a refresh waits for the proxy address to become known.
pub const PROXY_WAIT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub service: Arc<FeedService>,
    pub locale: String,
    /// Resolves to an empty string for a direct connection
    pub proxy: EventualAddr,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub sources: Vec<String>,
    pub items: Vec<Article>,
    pub fetched_at: Option<String>,
    pub refreshing: bool,
}

#[derive(Template)]
#[template(path = "feed_items.html")]
pub struct FeedItemsTemplate {
    pub name: String,
    pub items: Vec<Article>,
}

#[derive(Template)]
#[template(path = "refresh_button.html")]
pub struct RefreshButtonTemplate {
    pub refreshing: bool,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/feed/:name", get(feed_items))
        .route("/refresh", post(refresh))
        .route("/refresh/status", get(refresh_status))
        .route("/health", get(health))
        .with_state(state)
}

async fn collect_items(service: &FeedService, name: &str) -> Vec<Article> {
    let mut items = Vec::new();
    service.feed_by_name(name, &mut items).await;
    items
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index = state.service.snapshot().await;
    let mut items = Vec::new();
    index.visit(ALL_ITEMS, &mut items);

    HtmlTemplate(IndexTemplate {
        sources: index.sources.clone(),
        items,
        fetched_at: index
            .fetched_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string()),
        refreshing: state.service.is_refreshing(),
    })
}

pub async fn feed_items(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let items = collect_items(&state.service, &name).await;
    HtmlTemplate(FeedItemsTemplate { name, items })
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Spawn the refresh task
    tokio::spawn(async move {
        let mut sources: Vec<String> = Vec::new();
        if let Err(e) = state
            .service
            .get_feed_via(&state.locale, &state.proxy, PROXY_WAIT, &mut sources)
            .await
        {
            warn!("Manual refresh failed: {}", e);
        }
    });

    // Return refreshing state immediately
    HtmlTemplate(RefreshButtonTemplate { refreshing: true })
}

pub async fn refresh_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let refreshing = state.service.is_refreshing();
    HtmlTemplate(RefreshButtonTemplate { refreshing })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
