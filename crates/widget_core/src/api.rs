use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::protocol::{
    ChatRequest, ChatResponse, ClassifyRequest, ClassifyResponse, CHAT_PATH, CLASSIFY_PATH,
    MODEL_STATUS_PATH,
};
use tracing::debug;
use url::Url;

use crate::error::ApiError;

#[async_trait]
pub trait WidgetApi: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
    async fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse, ApiError>;
    async fn model_status(&self) -> Result<serde_json::Value, ApiError>;
}

pub struct HttpWidgetApi {
    http: Client,
    base_url: Url,
}

impl HttpWidgetApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ApiError> {
        // Without the trailing slash `join` would drop the last path segment.
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|source| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|source| ApiError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    /// Status codes are not inspected: the backend reports failures as
    /// `success: false` bodies, so only an unparseable body is an error here.
    async fn decode<T: DeserializeOwned>(
        response: Response,
        endpoint: &'static str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            endpoint,
            status = status.as_u16(),
            bytes = body.len(),
            "api: response received"
        );
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { endpoint, source })
    }
}

#[async_trait]
impl WidgetApi for HttpWidgetApi {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(CHAT_PATH)?)
            .json(request)
            .send()
            .await?;
        Self::decode(response, CHAT_PATH).await
    }

    async fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse, ApiError> {
        let image = Part::bytes(request.image)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)?;
        let form = Form::new()
            .part("image", image)
            .text("session_id", request.session_id.0);

        let response = self
            .http
            .post(self.endpoint(CLASSIFY_PATH)?)
            .multipart(form)
            .send()
            .await?;
        Self::decode(response, CLASSIFY_PATH).await
    }

    async fn model_status(&self) -> Result<serde_json::Value, ApiError> {
        let response = self
            .http
            .get(self.endpoint(MODEL_STATUS_PATH)?)
            .send()
            .await?;
        Self::decode(response, MODEL_STATUS_PATH).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
