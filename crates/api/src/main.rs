mod config;
mod metrics;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use extract::{CompletionModel, Extractor, OllamaClient};
use index::{
    EmbeddingIndexBuilder, EmbeddingModel, GraphStore, GraphUpserter, Indexer, Neo4jStore,
    OllamaEmbedder, RetryPolicy,
};
use query::{QueryConfig, QueryEvent, QueryPipeline};

use config::AppConfig;
use metrics::Metrics;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn GraphStore>,
    pipeline: Arc<QueryPipeline>,
    indexer: Arc<Indexer>,
    metrics: Arc<Metrics>,
    config: Arc<AppConfig>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    query: Option<String>,
}

#[derive(Deserialize)]
struct IndexRequest {
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(AppConfig::from_env());
    let timeout = Duration::from_secs(config.models.request_timeout_secs);

    let neo4j = Neo4jStore::connect(
        &config.neo4j.uri,
        &config.neo4j.user,
        &config.neo4j.password,
    )
    .await
    .context("failed to connect to Neo4j")?;
    neo4j
        .init_schema()
        .await
        .context("failed to initialize Neo4j schema")?;
    let store: Arc<dyn GraphStore> = Arc::new(neo4j);

    let llm: Arc<dyn CompletionModel> = Arc::new(OllamaClient::new(
        config.models.base_url.clone(),
        config.models.completion_model.clone(),
        timeout,
    ));
    let embedder: Arc<dyn EmbeddingModel> = Arc::new(OllamaEmbedder::new(
        config.models.base_url.clone(),
        config.models.embedding_model.clone(),
        timeout,
    ));

    let extractor = Arc::new(Extractor::new(llm.clone()));
    let upserter = Arc::new(GraphUpserter::new(
        store.clone(),
        RetryPolicy::new(
            config.retry.max_retries,
            config.retry.initial_backoff_ms,
            config.retry.max_backoff_ms,
        ),
    ));
    let builder = Arc::new(EmbeddingIndexBuilder::new(store.clone(), embedder.clone()));
    let indexer = Arc::new(Indexer::new(
        extractor,
        upserter,
        builder,
        config.indexing.max_concurrent_extractions,
    ));

    let pipeline = Arc::new(QueryPipeline::new(
        store.clone(),
        embedder,
        llm,
        QueryConfig {
            similarity_threshold: config.query.similarity_threshold,
            max_context_chars: config.query.max_context_chars,
            max_query_chars: config.query.max_query_chars,
        },
    ));

    let state = AppState {
        store,
        pipeline,
        indexer,
        metrics: Metrics::new(),
        config: config.clone(),
    };

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/analyze", post(analyze_query))
        .route("/api/analyze-stream", post(analyze_query_stream))
        .route("/api/index", post(index_document))
        .route("/api/stats", get(get_stats))
        .route("/api/metrics", get(get_metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let graph_connected = state.store.ping().await.is_ok();

    Json(json!({
        "status": if graph_connected { "healthy" } else { "degraded" },
        "graph_connected": graph_connected,
        "llm_ready": true,
        "embedder_ready": true,
    }))
}

async fn analyze_query(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(query) = req.query else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'query' in request body");
    };
    if query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query cannot be empty");
    }

    let query_id = Uuid::new_v4();
    let started = Instant::now();
    info!(%query_id, "analyze request");

    match state.pipeline.run_collected(&query).await {
        Ok(outcome) => {
            if outcome.low_confidence {
                state.metrics.record_low_confidence();
            }
            state.metrics.record_query(true, started.elapsed());
            info!(
                %query_id,
                matched = %outcome.matched_node,
                score = outcome.similarity_score,
                "analyze complete"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "data": outcome,
                })),
            )
        }
        Err(e) => {
            state.metrics.record_query(false, started.elapsed());
            error!(%query_id, error = %e, "analyze failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn analyze_query_stream(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, (StatusCode, Json<Value>)> {
    let Some(query) = req.query else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing 'query' in request body",
        ));
    };
    if query.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Query cannot be empty"));
    }

    let query_id = Uuid::new_v4();
    info!(%query_id, "analyze-stream request");

    let rx = state.pipeline.stream(query);
    let metrics = state.metrics.clone();
    let started = Instant::now();

    let stream = ReceiverStream::new(rx).map(move |event| {
        match &event {
            QueryEvent::MatchedNode {
                low_confidence: true,
                ..
            } => metrics.record_low_confidence(),
            QueryEvent::Complete => metrics.record_query(true, started.elapsed()),
            QueryEvent::Error { .. } => metrics.record_query(false, started.elapsed()),
            _ => {}
        }

        let sse = SseEvent::default()
            .json_data(&event)
            .unwrap_or_else(|_| SseEvent::default().data(r#"{"type":"error","message":"event serialization failed"}"#));

        Ok(sse)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn index_document(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> (StatusCode, Json<Value>) {
    let path = std::path::PathBuf::from(&req.path);

    let Ok(meta) = tokio::fs::metadata(&path).await else {
        return error_response(StatusCode::NOT_FOUND, "Path not found");
    };

    let chunker_config = ingest::ChunkerConfig {
        max_chars: state.config.indexing.chunk_max_chars,
        overlap_chars: state.config.indexing.chunk_overlap_chars,
    };

    let chunks = if meta.is_file() {
        ingest::ingest_file(&path, chunker_config).await
    } else if meta.is_dir() {
        ingest::ingest_directory(&path, chunker_config).await
    } else {
        return error_response(StatusCode::BAD_REQUEST, "Path is neither file nor directory");
    };

    let chunks = match chunks {
        Ok(chunks) => chunks,
        Err(e) => {
            error!(path = %req.path, error = %e, "ingestion failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    info!(path = %req.path, chunks = chunks.len(), "indexing document");

    let report = state.indexer.index_chunks(chunks).await;
    state.metrics.record_indexing(&report);

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": report,
        })),
    )
}

async fn get_stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": stats,
            })),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn get_metrics(State(state): State<AppState>) -> Json<metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"status": "error", "error": message})))
}
