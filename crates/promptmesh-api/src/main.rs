//! promptmesh-api - HTTP API server for promptmesh

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use governor::{
    clock::{Clock, DefaultClock},
    Quota, RateLimiter,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use promptmesh_agent::{AgentEvent, AgentSession, ChatInput};
use promptmesh_core::defaults::{
    CHAT_RATE_LIMIT_REQUESTS, CHAT_RATE_LIMIT_WINDOW_SECS, IMPROVE_MAX_TOKENS,
};
use promptmesh_core::{
    CategoryRef, DraftState, EmbeddingBackend, Error as CoreError, FeatureFlags,
    GenerationBackend, ImproveRequest, JobRepository, JobType, SearchResponse, TagRef,
};
use promptmesh_db::Database;
use promptmesh_inference::{AnthropicBackend, AnthropicConfig, VoyageBackend};
use promptmesh_jobs::{
    BackfillHandler, QualityHandler, RelatednessHandler, WorkerBuilder, WorkerConfig,
};
use promptmesh_search::{
    group_by_category, ImprovementService, QualityChecker, QueryExpander, RelatednessIndexer,
    SearchOptions, SemanticSearchEngine,
};

/// Model used for query expansion (cheap, low-latency).
const DEFAULT_EXPAND_MODEL: &str = "claude-3-5-haiku-latest";
const EXPAND_MAX_TOKENS: u32 = 150;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Per-user keyed rate limiter for the builder chat endpoint.
///
/// Process-local: with multiple API instances each enforces its own window.
type ChatRateLimiter = governor::DefaultKeyedRateLimiter<String>;

/// Quota admitting a burst of the full request count, replenished evenly
/// across the window so a full window admits the full count again.
fn chat_quota() -> Quota {
    // Both constants are compile-time non-zero.
    let period = Duration::from_secs(CHAT_RATE_LIMIT_WINDOW_SECS) / CHAT_RATE_LIMIT_REQUESTS;
    Quota::with_period(period)
        .expect("rate limit period must be non-zero")
        .allow_burst(NonZeroU32::new(CHAT_RATE_LIMIT_REQUESTS).expect("rate limit must be non-zero"))
}

fn chat_rate_limiter() -> Arc<ChatRateLimiter> {
    Arc::new(RateLimiter::keyed(chat_quota()))
}

/// Rate-limit key for a request: authenticated user id when present,
/// otherwise the forwarded client address.
fn client_key(headers: &HeaderMap) -> String {
    if let Some(user) = headers.get("x-user-id").and_then(|v| v.to_str().ok()) {
        if !user.is_empty() {
            return format!("user:{}", user);
        }
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return format!("ip:{}", first);
            }
        }
    }
    "anonymous".to_string()
}

// =============================================================================
// APP STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    search: Arc<SemanticSearchEngine>,
    improver: Arc<ImprovementService>,
    agent: Arc<AgentSession<AnthropicBackend>>,
    /// Keyed chat rate limiter, injected so tests can construct their own.
    chat_limiter: Arc<ChatRateLimiter>,
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Wrapper turning pipeline errors into HTTP responses.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound(_) | CoreError::PromptNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Provider { .. }
        | CoreError::EmptyGeneration
        | CoreError::Embedding(_)
        | CoreError::Inference(_) => StatusCode::BAD_GATEWAY,
        CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if let CoreError::RateLimited { reset_secs } = self.0 {
            let body = json!({
                "error": "Rate limit exceeded. Try again later.",
                "retryAfter": reset_secs,
            });
            let mut response = (status, Json(body)).into_response();
            if let Ok(value) = HeaderValue::from_str(&reset_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            return response;
        }

        if status.is_server_error() {
            warn!(error = %self.0, status = %status, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// =============================================================================
// SSE WIRE FORMAT
// =============================================================================

/// Encode one agent event as a wire frame for the builder chat stream.
fn wire_frame(event: &AgentEvent) -> JsonValue {
    match event {
        AgentEvent::Text { text } => json!({ "type": "text", "content": text }),
        AgentEvent::ToolCall { name, input } => json!({
            "type": "tool_call",
            "toolCall": { "name": name, "input": input },
        }),
        AgentEvent::State { draft } => json!({ "type": "state", "state": draft }),
        AgentEvent::Done => json!({ "type": "done" }),
        AgentEvent::Error { message } => json!({ "type": "error", "error": message }),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health() -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<i64>,
    #[serde(default)]
    expand: bool,
}

async fn search_prompts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(CoreError::InvalidInput("Query must not be empty".to_string()).into());
    }

    let opts = SearchOptions {
        expand: params.expand,
        limit: params.limit,
    };
    Ok(Json(run_search(&state.search, query, &opts).await?))
}

/// Semantic search when available, substring fallback when not. A provider
/// or embedding failure mid-pipeline also degrades to the fallback rather
/// than surfacing an error to the caller.
async fn run_search(
    engine: &SemanticSearchEngine,
    query: &str,
    opts: &SearchOptions,
) -> Result<SearchResponse, CoreError> {
    if engine.is_available() {
        match engine.search(query, opts).await {
            Ok(response) => return Ok(response),
            Err(err @ (CoreError::Provider { .. } | CoreError::Embedding(_))) => {
                warn!(error = %err, "Vector search failed, falling back to substring matching");
            }
            Err(err) => return Err(err),
        }
    }

    let results = engine.fallback_search(query, opts.limit).await?;
    let grouped_by_category = group_by_category(&results);
    Ok(SearchResponse {
        results,
        grouped_by_category,
        expanded: false,
        expanded_query: None,
    })
}

async fn improve_prompt(
    State(state): State<AppState>,
    Json(request): Json<ImproveRequest>,
) -> Result<Json<promptmesh_core::Improvement>, ApiError> {
    if request.content.trim().is_empty() {
        return Err(CoreError::InvalidInput("Content must not be empty".to_string()).into());
    }
    let improvement = state.improver.improve(&request).await?;
    Ok(Json(improvement))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    #[serde(default)]
    draft: DraftState,
    #[serde(default)]
    categories: Vec<CategoryRef>,
    #[serde(default)]
    tags: Vec<TagRef>,
}

async fn builder_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    let key = client_key(&headers);
    if let Err(not_until) = state.chat_limiter.check_key(&key) {
        let reset_secs = not_until
            .wait_time_from(DefaultClock::default().now())
            .as_secs()
            .max(1);
        return Err(CoreError::RateLimited { reset_secs }.into());
    }

    if request.message.trim().is_empty() {
        return Err(CoreError::InvalidInput("Message must not be empty".to_string()).into());
    }

    let (tx, rx) = mpsc::channel::<AgentEvent>(64);
    let session = state.agent.clone();
    let input = ChatInput {
        message: request.message,
        draft: request.draft,
        categories: request.categories,
        tags: request.tags,
    };

    tokio::spawn(async move {
        if let Err(err) = session.run(input, tx).await {
            warn!(error = %err, "Builder chat session failed");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|event| Ok(Event::default().data(wire_frame(&event).to_string())))
        .chain(futures::stream::once(async {
            Ok(Event::default().data("[DONE]"))
        }));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

async fn job_stats(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let stats = state.db.jobs.queue_stats().await?;
    Ok(Json(json!({ "queue": stats })))
}

async fn trigger_backfill(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let job_id = state
        .db
        .jobs
        .queue_deduplicated(
            None,
            JobType::EmbedBackfill,
            JobType::EmbedBackfill.default_priority(),
            None,
        )
        .await?;

    Ok(Json(json!({
        "queued": job_id.is_some(),
        "jobId": job_id,
    })))
}

// =============================================================================
// ROUTER
// =============================================================================

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/search", get(search_prompts))
        .route("/api/v1/improve", post(improve_prompt))
        .route("/api/v1/builder/chat", post(builder_chat))
        .route("/api/v1/jobs/stats", get(job_stats))
        .route("/api/v1/admin/backfill", post(trigger_backfill))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(3600))
        })
        .with_state(state)
}

/// Comma-separated `ALLOWED_ORIGINS`, defaulting to local development hosts.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let raw = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());
    raw.split(',')
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect()
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   RUST_LOG    - standard env filter (default: "promptmesh_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "promptmesh_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    info!("Database connected and migrated");

    let flags = FeatureFlags::from_env();
    let embedder: Arc<dyn EmbeddingBackend> = Arc::new(VoyageBackend::from_env()?);

    let anthropic_config = AnthropicConfig::from_env();
    let generator: Arc<dyn GenerationBackend> = Arc::new(AnthropicBackend::new(
        anthropic_config.clone().with_max_tokens(IMPROVE_MAX_TOKENS),
    )?);
    let expand_model = std::env::var("ANTHROPIC_EXPAND_MODEL")
        .unwrap_or_else(|_| DEFAULT_EXPAND_MODEL.to_string());
    let expand_generator: Arc<dyn GenerationBackend> = Arc::new(AnthropicBackend::new(
        anthropic_config
            .clone()
            .with_model(expand_model)
            .with_max_tokens(EXPAND_MAX_TOKENS),
    )?);
    let agent_backend = AnthropicBackend::new(anthropic_config)?;

    let search = Arc::new(SemanticSearchEngine::new(
        db.prompts.clone(),
        db.embeddings.clone(),
        embedder.clone(),
        QueryExpander::new(expand_generator),
        flags,
    ));
    let improver = Arc::new(ImprovementService::new(
        db.prompts.clone(),
        db.embeddings.clone(),
        embedder.clone(),
        generator.clone(),
    ));
    let indexer = Arc::new(RelatednessIndexer::new(
        db.prompts.clone(),
        db.embeddings.clone(),
        db.edges.clone(),
        flags,
    ));
    let checker = Arc::new(QualityChecker::new(generator));
    let agent = Arc::new(AgentSession::new(agent_backend));

    // Background worker
    let worker = WorkerBuilder::new(db.clone())
        .with_config(WorkerConfig::from_env())
        .with_handler(RelatednessHandler::new(indexer))
        .with_handler(BackfillHandler::new(
            db.prompts.clone(),
            db.embeddings.clone(),
            embedder,
        ))
        .with_handler(QualityHandler::new(db.prompts.clone(), checker))
        .build()
        .await;
    let _worker_handle = worker.start();
    info!("Job worker started");

    let state = AppState {
        db,
        search,
        improver,
        agent,
        chat_limiter: chat_rate_limiter(),
    };

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
