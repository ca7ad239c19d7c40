use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::api::dtos::{
    ErrorResponse, MessageResponse, PageQuery, PostsResponse, SaveRequest, SaveResponse,
    ScheduledResponse, ScrapeQuery, ScrapeResponse, SendEmailRequest, validate_page,
};
use crate::app_state::AppState;
use crate::orchestrator::{ListingSource, ListingStore, Notifier};

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/scrape",
    tag = "orchestrator",
    params(ScrapeQuery),
    responses(
        (status = 200, description = "Page processed", body = ScrapeResponse),
        (status = 202, description = "Page scheduled in the background", body = ScheduledResponse),
        (status = 400, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Fetch or store failure", body = ErrorResponse)
    )
)]
pub async fn scrape(
    State(state): State<AppState>,
    query: Result<Query<ScrapeQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let page = match query.validate() {
        Ok(page) => page,
        Err(detail) => return error_response(StatusCode::BAD_REQUEST, detail),
    };

    if query.background {
        state
            .pipeline
            .spawn_detached(page, &state.tasks, state.shutdown.child_token());
        info!("Scheduled background scrape of page {}", page);
        return (
            StatusCode::ACCEPTED,
            Json(ScheduledResponse {
                message: format!("Scrape of page {page} scheduled."),
                page,
            }),
        )
            .into_response();
    }

    match state.pipeline.scrape(page).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ScrapeResponse {
                message: format!("Successfully processed page {page}."),
                new_posts: summary.processed,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Scrape of page {} failed: {}", page, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[utoipa::path(
    get,
    path = "/scrape",
    tag = "components",
    params(PageQuery),
    responses(
        (status = 200, description = "Listings extracted from the page", body = PostsResponse),
        (status = 400, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Fetch failure", body = ErrorResponse)
    )
)]
pub async fn scrape_page(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let page = match query {
        Ok(Query(query)) => query.page,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let page = match validate_page(page) {
        Ok(page) => page,
        Err(detail) => return error_response(StatusCode::BAD_REQUEST, detail),
    };

    match state.source.scrape(page).await {
        Ok(posts) => (StatusCode::OK, Json(PostsResponse { posts })).into_response(),
        Err(e) => {
            error!("Scraping page {} failed: {}", page, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path = "/save",
    tag = "components",
    request_body = SaveRequest,
    responses(
        (status = 200, description = "Listings not stored before", body = SaveResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn save(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(e) => return error_response(e.status(), e.body_text()),
    };
    info!("Received {} posts to save", payload.posts.len());
    match state.store.save(&payload.posts).await {
        Ok(new_posts) => (StatusCode::OK, Json(SaveResponse { new_posts })).into_response(),
        Err(e) => {
            error!("Saving posts failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error saving to document store: {e}"),
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/send_email",
    tag = "components",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email sent", body = MessageResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Delivery failure", body = ErrorResponse)
    )
)]
pub async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(e) => return error_response(e.status(), e.body_text()),
    };
    match state
        .notifier
        .notify(&payload.subject, &payload.car_info)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Email sent successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(link = %payload.car_info.post_link, "Failed to send email: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to send email: {e}"),
            )
        }
    }
}
