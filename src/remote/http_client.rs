use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::http::QuantityBody;
use super::{RemoteError, RemoteStore};
use crate::model::{CardId, Collection, CollectionAttrs, CollectionCard, CollectionId};

/// `RemoteStore` over the REST routes served by [`router`](super::http::router).
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRemoteStore {
    /// Client for a server at `base`, e.g. `http://127.0.0.1:3000`.
    pub fn new(base: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base).map_err(|e| RemoteError::Network(format!("invalid base url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Network(format!("invalid base url: {base}")));
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    /// Use a preconfigured client, e.g. one with a request timeout.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Network(format!("invalid base url: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, RemoteError> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    fn card_request(
        &self,
        method: Method,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<RequestBuilder, RemoteError> {
        let id = collection_id.to_string();
        self.request(method, &["collections", &id, "cards", card_id.as_str()])
    }

    async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => RemoteError::Timeout,
            _ => RemoteError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_decode() {
        RemoteError::Decode(err.to_string())
    } else {
        RemoteError::Network(err.to_string())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError> {
        Self::json(self.request(Method::GET, &["collections"])?).await
    }

    async fn list_collection_cards(&self) -> Result<Vec<CollectionCard>, RemoteError> {
        Self::json(self.request(Method::GET, &["collection-cards"])?).await
    }

    async fn create_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<CollectionCard, RemoteError> {
        Self::json(self.card_request(Method::POST, collection_id, card_id)?).await
    }

    async fn update_collection_card_quantity(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError> {
        let request = self
            .card_request(Method::PUT, collection_id, card_id)?
            .json(&QuantityBody { quantity });
        Self::json(request).await
    }

    async fn delete_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<(), RemoteError> {
        Self::send(self.card_request(Method::DELETE, collection_id, card_id)?).await?;
        Ok(())
    }

    async fn create_collection(&self, attrs: &CollectionAttrs) -> Result<Collection, RemoteError> {
        Self::json(self.request(Method::POST, &["collections"])?.json(attrs)).await
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        attrs: &CollectionAttrs,
    ) -> Result<Collection, RemoteError> {
        let id = id.to_string();
        Self::json(self.request(Method::PUT, &["collections", &id])?.json(attrs)).await
    }

    async fn delete_collection(&self, id: CollectionId) -> Result<(), RemoteError> {
        let id = id.to_string();
        Self::send(self.request(Method::DELETE, &["collections", &id])?).await?;
        Ok(())
    }
}
