//! HTTP client for the backend API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::error::GatewayError;
use super::models::{ErrorBody, OpenFileRequest, SearchHit, Stats, UploadResponse};
use crate::backend::{BackendLocator, HealthProbe};
use crate::upload::UploadBatch;

/// Backend API client.
///
/// Holds no per-request state; the only shared state it reads is the
/// locator's cached port.
pub struct Gateway {
    client: Client,
    locator: Arc<BackendLocator>,
}

impl Gateway {
    pub fn new(locator: Arc<BackendLocator>) -> Self {
        Self {
            client: Client::new(),
            locator,
        }
    }

    async fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.locator.api_base().await?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::BadResponse("backend url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ranked chunks matching `query`, at most `top_k` of them.
    pub async fn search(&self, query: &str, top_k: u32) -> Result<Vec<SearchHit>, GatewayError> {
        let mut url = self.endpoint(&["search"]).await?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("top_k", &top_k.to_string());
        debug!(url = %url, "search");

        let response = self.client.get(url).send().await?;
        decode(response, "Search failed").await
    }

    /// Upload every file in the batch as a repeated `files` multipart field.
    pub async fn upload(&self, batch: UploadBatch) -> Result<UploadResponse, GatewayError> {
        let url = self.endpoint(&["upload"]).await?;
        debug!(url = %url, files = batch.len(), bytes = batch.total_bytes, "upload");

        let form = batch.files.into_iter().fold(Form::new(), |form, file| {
            form.part("files", Part::bytes(file.bytes).file_name(file.name))
        });

        let response = self.client.post(url).multipart(form).send().await?;
        decode(response, "Upload failed").await
    }

    pub async fn get_stats(&self) -> Result<Stats, GatewayError> {
        let url = self.endpoint(&["stats"]).await?;
        debug!(url = %url, "stats");

        let response = self.client.get(url).send().await?;
        decode(response, "Failed to fetch stats").await
    }

    /// Download a stored file's bytes.
    pub async fn open_file(&self, file_name: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.endpoint(&["open_file"]).await?;
        debug!(url = %url, file = file_name, "open file");

        let response = self
            .client
            .post(url)
            .json(&OpenFileRequest {
                filename: file_name,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail_text().map(str::to_string))
                .unwrap_or_else(|| format!("Failed to open file ({})", status.as_u16()));
            return Err(GatewayError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// URL the presentation layer loads a file's thumbnail from. Not fetched here.
    pub async fn thumbnail_url(&self, file_name: &str) -> Result<Url, GatewayError> {
        self.endpoint(&["thumbnail", file_name]).await
    }
}

#[async_trait]
impl HealthProbe for Gateway {
    async fn probe(&self) -> Result<(), GatewayError> {
        self.get_stats().await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, failure: &str) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            detail: format!("{failure}: {}", status.as_u16()),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| GatewayError::BadResponse(e.to_string()))
}
