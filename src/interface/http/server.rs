use crate::application::error::AppError;
use crate::application::service::{
    IdOnly, InsultService, InsultView, LikeStatus, NewInsult, PageView, UpdateCommand,
};
use crate::domain::model::{LogEntry, StoredInsult};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, ConnectInfo, FromRequest, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
struct AppState {
    service: Arc<InsultService>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    start: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "error": message }),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(message) => Self {
                status: StatusCode::BAD_REQUEST,
                body: serde_json::json!({ "error": message }),
            },
            AppError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                body: serde_json::json!({ "status": "not found" }),
            },
            AppError::Conflict(id) => Self {
                status: StatusCode::CONFLICT,
                body: serde_json::json!({ "status": "document conflict", "id": id }),
            },
            AppError::PreconditionFailed(message) => Self {
                status: StatusCode::PRECONDITION_FAILED,
                body: serde_json::json!({ "status": message }),
            },
            AppError::Store(message) => Self::internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// JSON body extractor that reports malformed input as 400 rather than
/// axum's default 422.
struct AppJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError {
                status: StatusCode::BAD_REQUEST,
                body: serde_json::json!({ "error": rejection.body_text() }),
            }),
        }
    }
}

/// Run a synchronous service call on the blocking pool.
async fn blocking<T, F>(state: AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&InsultService) -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&state.service).map_err(ApiError::from))
        .await
        .map_err(|err| ApiError::internal(format!("join error: {}", err)))?
}

fn doc_headers(doc: &StoredInsult) -> [(&'static str, String); 2] {
    let canonical = serde_json::to_string(doc).unwrap_or_default();
    let sha = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    [("etag", doc.rev.clone()), ("x-sha", sha)]
}

async fn get_insult_handler(
    State(state): State<AppState>,
    Path(insult_id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = blocking(state, move |service| service.get(&insult_id)).await?;
    let headers = doc_headers(&doc);
    Ok((StatusCode::OK, headers, Json(InsultView::from(doc))).into_response())
}

async fn update_insult_handler(
    State(state): State<AppState>,
    Path(insult_id): Path<String>,
    AppJson(patch): AppJson<UpdateCommand>,
) -> Result<Json<InsultView>, ApiError> {
    let doc = blocking(state, move |service| service.update(&insult_id, &patch)).await?;
    Ok(Json(InsultView::from(doc)))
}

async fn delete_insult_handler(
    State(state): State<AppState>,
    Path(insult_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    blocking(state, move |service| service.delete(&insult_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_insult_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<NewInsult>,
) -> Result<(StatusCode, Json<IdOnly>), ApiError> {
    let doc = blocking(state, move |service| service.create(body.into())).await?;
    Ok((StatusCode::CREATED, Json(IdOnly { id: doc.id })))
}

async fn list_insults_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageView>, ApiError> {
    let page = blocking(state, move |service| service.list(query.start.as_deref())).await?;
    Ok(Json(page))
}

async fn random_insult_handler(
    State(state): State<AppState>,
) -> Result<Json<InsultView>, ApiError> {
    let doc = blocking(state, |service| service.random()).await?;
    Ok(Json(InsultView::from(doc)))
}

async fn like_insult_handler(
    State(state): State<AppState>,
    Path(insult_id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = blocking(state, move |service| service.like(&insult_id)).await?;
    let status = match outcome {
        LikeStatus::Updated => StatusCode::OK,
        LikeStatus::NotFound => StatusCode::NOT_FOUND,
        LikeStatus::IncorrectType => StatusCode::PRECONDITION_FAILED,
    };
    let body = serde_json::json!({ "status": outcome.message() });
    Ok((status, Json(body)).into_response())
}

async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let categories = blocking(state, |service| service.categories()).await?;
    Ok(Json(categories))
}

async fn list_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageView>, ApiError> {
    let page = blocking(state, move |service| {
        service.list_category(&category, query.start.as_deref())
    })
    .await?;
    Ok(Json(page))
}

async fn health_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    blocking(state, |service| service.health()).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Append one immutable log document per completed request.
async fn log_request(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let entry = LogEntry {
        method,
        path,
        ip: peer.ip().to_string(),
        time: Utc::now(),
        status: response.status().as_u16(),
    };
    let service = state.service.clone();
    // log_request swallows store failures; a lost log line must not
    // change the response already computed.
    let _ = tokio::task::spawn_blocking(move || service.log_request(&entry)).await;

    response
}

pub fn router(service: Arc<InsultService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/insult/_random", get(random_insult_handler))
        .route(
            "/insult/:insult_id",
            get(get_insult_handler)
                .put(update_insult_handler)
                .delete(delete_insult_handler),
        )
        .route(
            "/insult",
            post(create_insult_handler).get(list_insults_handler),
        )
        // Trailing-slash aliases; axum matches them as distinct paths.
        .route(
            "/insult/",
            post(create_insult_handler).get(list_insults_handler),
        )
        .route("/insult/:insult_id/like", put(like_insult_handler))
        .route("/category", get(list_categories_handler))
        .route("/category/", get(list_categories_handler))
        .route("/category/:category", get(list_category_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(state.clone(), log_request))
        .with_state(state)
}

pub async fn serve(addr: String, service: InsultService) -> io::Result<()> {
    let app = router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
