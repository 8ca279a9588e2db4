//! InvestIQ API Gateway
//!
//! The entry point for all external API requests. Handles:
//! - RAG search over ingested company data
//! - Dashboard and chat generation
//! - Read-only index metadata (health, companies, stats)
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use investiq_common::config::{AppConfig, ObservabilityConfig};
use investiq_common::embeddings::OpenAiEmbedder;
use investiq_common::llm::OpenAiChatClient;
use investiq_common::store::HttpVectorStore;
use investiq_common::websearch::{HttpWebSearchClient, WebSearchClient};
use investiq_common::{metrics, ChatClient, Embedder, VectorStore};
use investiq_rag::router::Router as TurnRouter;
use investiq_rag::{GenerationOrchestrator, RetrievalClient};
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn VectorStore>,
    pub retrieval: Arc<RetrievalClient>,
    pub router: Arc<TurnRouter>,
    pub orchestrator: Arc<GenerationOrchestrator>,
}

impl AppState {
    /// Wire the core components from their external collaborators
    pub fn new(
        config: Arc<AppConfig>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatClient>,
        web: Option<Arc<dyn WebSearchClient>>,
    ) -> Self {
        let retrieval = Arc::new(RetrievalClient::new(embedder, store.clone()));
        let router = Arc::new(TurnRouter::new(retrieval.clone(), web, config.chat.top_k));
        let orchestrator = Arc::new(GenerationOrchestrator::new(llm, config.chat.history_window));
        Self {
            config,
            store,
            retrieval,
            router,
            orchestrator,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration, then bring up tracing with its settings
    let config = Arc::new(AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?);
    init_tracing(&config.observability);

    info!("Starting InvestIQ gateway v{}", investiq_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();

    // External collaborators
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
    let store: Arc<dyn VectorStore> = Arc::new(HttpVectorStore::new(&config.vector_store)?);
    let llm: Arc<dyn ChatClient> = Arc::new(OpenAiChatClient::new(&config.generation)?);
    let web: Option<Arc<dyn WebSearchClient>> = if config.web_search.enabled {
        Some(Arc::new(HttpWebSearchClient::new(&config.web_search)?))
    } else {
        None
    };

    let state = AppState::new(config.clone(), embedder, store, llm, web);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber
fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Metadata endpoints
        .route("/", get(handlers::meta::root))
        .route("/health", get(handlers::meta::health))
        .route("/companies", get(handlers::meta::companies))
        .route("/stats", get(handlers::meta::stats))
        // RAG search
        .route(
            "/rag/search",
            get(handlers::search::search_get).post(handlers::search::search_post),
        )
        // Dashboard generation
        .route("/dashboard/rag", post(handlers::dashboard::dashboard_post))
        .route(
            "/dashboard/rag/{company_name}",
            get(handlers::dashboard::dashboard_get),
        )
        // Chat
        .route("/chat", post(handlers::chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
