//! HTTP surface of the document store.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `GET /api/db`: Non-empty collections with document counts
//! - `POST /api/db/{collection}`: Create a document (`{id?, data}`)
//! - `GET /api/db/{collection}?q=&limit=&offset=`: List / filter documents
//! - `GET /api/db/{collection}/{id}`: Read a document
//! - `PUT /api/db/{collection}/{id}`: Replace a document's data (`{data}`)
//! - `PATCH /api/db/{collection}/{id}`: Shallow-merge into a document (`{data}`)
//! - `DELETE /api/db/{collection}/{id}`: Delete a document, returning it

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{Method, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::store::{CollectionInfo, Document, DocumentStore, ListOptions, Page};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
}

/// Create request body
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub data: Map<String, Value>,
}

/// Replace / patch request body
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub data: Map<String, Value>,
}

/// Listing query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "saturating_usize")]
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "saturating_usize")]
    pub offset: Option<usize>,
}

/// Parses a non-negative integer, saturating at `usize::MAX` instead of
/// failing on overflow. Anything other than ASCII digits is rejected.
fn saturating_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got '{}'",
            raw
        )));
    }
    Ok(Some(raw.parse().unwrap_or(usize::MAX)))
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Collection overview response
#[derive(Serialize)]
struct CollectionsResponse {
    collections: Vec<CollectionInfo>,
}

type DocPath = Result<Path<(String, String)>, PathRejection>;

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_collections(State(state): State<AppState>) -> Json<CollectionsResponse> {
    Json(CollectionsResponse {
        collections: state.store.collections(),
    })
}

async fn create_document(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let Path(collection) = path?;
    let Json(request) = body?;

    let doc = state.store.create(&collection, request.id, request.data)?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn list_documents(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page>, ApiError> {
    let Path(collection) = path?;
    let Query(params) = params?;

    let options = ListOptions {
        q: params.q,
        limit: params.limit,
        offset: params.offset.unwrap_or(0),
    };
    Ok(Json(state.store.list(&collection, &options)?))
}

async fn read_document(
    State(state): State<AppState>,
    path: DocPath,
) -> Result<Json<Document>, ApiError> {
    let Path((collection, id)) = path?;
    Ok(Json(state.store.read(&collection, &id)?))
}

async fn replace_document(
    State(state): State<AppState>,
    path: DocPath,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let Path((collection, id)) = path?;
    let Json(request) = body?;
    Ok(Json(state.store.replace(&collection, &id, request.data)?))
}

async fn patch_document(
    State(state): State<AppState>,
    path: DocPath,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let Path((collection, id)) = path?;
    let Json(request) = body?;
    Ok(Json(state.store.patch(&collection, &id, request.data)?))
}

async fn delete_document(
    State(state): State<AppState>,
    path: DocPath,
) -> Result<Json<Document>, ApiError> {
    let Path((collection, id)) = path?;
    Ok(Json(state.store.delete(&collection, &id)?))
}

async fn no_route(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("no route for {} {}", method, uri.path()),
    )
}

async fn wrong_method(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "bad_request",
        format!("method {} not allowed for {}", method, uri.path()),
    )
}

/// Builds the application router.
///
/// Request bodies larger than `max_body_bytes` are rejected with 413.
pub fn app(store: Arc<DocumentStore>, max_body_bytes: usize) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/health", get(health))
        .route("/api/db", get(list_collections))
        .route(
            "/api/db/{collection}",
            get(list_documents).post(create_document),
        )
        .route(
            "/api/db/{collection}/{id}",
            get(read_document)
                .put(replace_document)
                .patch(patch_document)
                .delete(delete_document),
        )
        .fallback(no_route)
        .method_not_allowed_fallback(wrong_method)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}
