//! HTTP transport for a remote store - serves any `RemoteStore` over REST.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /collections` - list collections.
//! - `POST /collections` - create a collection. Body = `CollectionAttrs`.
//! - `PUT /collections/:id` - update a collection. Body = `CollectionAttrs`.
//! - `DELETE /collections/:id` - delete a collection and its cards.
//! - `GET /collection-cards` - list every card row.
//! - `POST /collections/:id/cards/:card_id` - create a row or add one copy.
//! - `PUT /collections/:id/cards/:card_id` - set the quantity. Body = `{ "quantity": n }`.
//! - `DELETE /collections/:id/cards/:card_id` - delete the row (idempotent).
//!
//! Errors answer with `{ "error": "..." }` and a status matching the
//! `RemoteError` kind.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use collection_sync::{remote::http, InMemoryRemoteStore};
//!
//! let store = Arc::new(InMemoryRemoteStore::new());
//!
//! // Get the router to compose with other axum routes
//! let app = http::router(store.clone());
//!
//! // Or serve directly
//! http::serve(store, "0.0.0.0:3000").await?;
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{RemoteError, RemoteStore};
use crate::model::{CardId, CollectionAttrs, CollectionId};

/// Body of `PUT /collections/:id/cards/:card_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantityBody {
    pub quantity: u32,
}

/// A `RemoteError` on its way out as an HTTP response.
pub struct ApiError(pub RemoteError);

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RemoteError::NotFound(_) => StatusCode::NOT_FOUND,
            RemoteError::Server { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RemoteError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RemoteError::Network(_) => StatusCode::BAD_GATEWAY,
            RemoteError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self.0 {
            RemoteError::NotFound(what) => what,
            RemoteError::Server { message, .. } => message,
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build an axum `Router` serving the given store.
pub fn router<R: RemoteStore>(store: Arc<R>) -> Router {
    Router::new()
        .route(
            "/collections",
            get(list_collections::<R>).post(create_collection::<R>),
        )
        .route(
            "/collections/:id",
            axum::routing::put(update_collection::<R>).delete(delete_collection::<R>),
        )
        .route("/collection-cards", get(list_collection_cards::<R>))
        .route(
            "/collections/:id/cards/:card_id",
            post(create_collection_card::<R>)
                .put(update_collection_card::<R>)
                .delete(delete_collection_card::<R>),
        )
        .with_state(store)
}

/// Serve the store over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve<R: RemoteStore>(store: Arc<R>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving remote store");
    axum::serve(listener, app).await
}

async fn list_collections<R: RemoteStore>(State(store): State<Arc<R>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(store.list_collections().await?))
}

async fn create_collection<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Json(attrs): Json<CollectionAttrs>,
) -> ApiResult<impl IntoResponse> {
    let collection = store.create_collection(&attrs).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

async fn update_collection<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Path(id): Path<i64>,
    Json(attrs): Json<CollectionAttrs>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(store.update_collection(CollectionId(id), &attrs).await?))
}

async fn delete_collection<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    store.delete_collection(CollectionId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_collection_cards<R: RemoteStore>(
    State(store): State<Arc<R>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(store.list_collection_cards().await?))
}

async fn create_collection_card<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Path((id, card_id)): Path<(i64, String)>,
) -> ApiResult<impl IntoResponse> {
    let row = store
        .create_collection_card(CollectionId(id), &CardId(card_id))
        .await?;
    Ok(Json(row))
}

async fn update_collection_card<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Path((id, card_id)): Path<(i64, String)>,
    Json(body): Json<QuantityBody>,
) -> ApiResult<impl IntoResponse> {
    let row = store
        .update_collection_card_quantity(CollectionId(id), &CardId(card_id), body.quantity)
        .await?;
    Ok(Json(row))
}

async fn delete_collection_card<R: RemoteStore>(
    State(store): State<Arc<R>>,
    Path((id, card_id)): Path<(i64, String)>,
) -> ApiResult<impl IntoResponse> {
    store
        .delete_collection_card(CollectionId(id), &CardId(card_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
