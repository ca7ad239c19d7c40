//! HTTP surface: the orchestrator endpoint, component endpoints, health,
//! debug and the OpenAPI document.

pub mod dtos;
pub mod handlers;

use axum::{
    Json, Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::entities::Listing;
use crate::health::{self, DebugResponse, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::scrape,
        handlers::scrape_page,
        handlers::save,
        handlers::send_email,
        health::health_check,
        health::debug,
    ),
    components(schemas(
        Listing,
        dtos::ScrapeResponse,
        dtos::ScheduledResponse,
        dtos::PostsResponse,
        dtos::SaveRequest,
        dtos::SaveResponse,
        dtos::SendEmailRequest,
        dtos::MessageResponse,
        dtos::ErrorResponse,
        HealthResponse,
        DebugResponse,
    )),
    tags(
        (name = "orchestrator", description = "Per-page scrape pipeline"),
        (name = "components", description = "Scraper, deduper and notifier endpoints"),
        (name = "health", description = "Liveness and diagnostics")
    )
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scrape", get(handlers::scrape))
        .route("/api/health", get(health::health_check))
        .route("/api/debug", get(health::debug))
        .route("/api/openapi.json", get(openapi))
        .route("/scrape", get(handlers::scrape_page))
        .route("/save", post(handlers::save))
        .route("/send_email", post(handlers::send_email))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &Request<Body>| {
                        let request_id = request
                            .extensions()
                            .get::<RequestId>()
                            .and_then(|id| id.header_value().to_str().ok())
                            .unwrap_or_default();
                        info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    },
                ))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// Serve until Ctrl-C or SIGTERM, then drain requests and background scrapes.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let tasks = state.tasks.clone();
    tokio::spawn(listen_for_shutdown(shutdown.clone()));

    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tasks.close();
    info!("Waiting for {} background scrapes to stop", tasks.len());
    tasks.wait().await;
    Ok(())
}

async fn listen_for_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => return,
    }
    info!("Received shutdown signal, initiating graceful shutdown...");
    token.cancel();
}
