use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::endpoints::{
    DetectionResponse, ErrorPayload, HealthStatus, PantryData, PantryReceipt, RecipeRequest,
    RecipeSuggestions, DETECT_PATH, HEALTH_PATH, IMAGES_FIELD, PANTRY_PATH, RECIPES_PATH,
};
use crate::config::ClientConfig;
use crate::flight::FlightGate;
use crate::staging::StagedImage;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("No images staged for upload")]
    NoImages,
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Upload failed ({0})")]
    UploadFailed(StatusCode),
    #[error("{message}")]
    ApiError { status: StatusCode, message: String },
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request cancelled")]
    Cancelled,
    #[error("A {0} request is already in flight")]
    AlreadyInFlight(&'static str),
    #[error("Incomplete recipe response: missing {0}")]
    IncompleteResponse(&'static str),
}

impl ApiConnectionError {
    /// Text shown to the user in the chat transcript.
    pub fn user_message(&self) -> String {
        match self {
            ApiConnectionError::ApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// HTTP client for the Sustainabite service. Cheap to clone; clones share the
/// connection pool and the per-operation flight gates.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    detect_gate: FlightGate,
    recipes_gate: FlightGate,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiConnectionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiConnectionError::NetworkError)?;
        Ok(Self {
            client,
            config,
            detect_gate: FlightGate::new("detection"),
            recipes_gate: FlightGate::new("recipe"),
        })
    }

    pub fn detect_gate(&self) -> &FlightGate {
        &self.detect_gate
    }

    pub fn recipes_gate(&self) -> &FlightGate {
        &self.recipes_gate
    }

    /// Uploads every staged image in one multipart request and returns the
    /// detected ingredient labels.
    pub async fn detect(
        &self,
        images: &[StagedImage],
        cancel: &CancellationToken,
    ) -> Result<DetectionResponse, ApiConnectionError> {
        if images.is_empty() {
            return Err(ApiConnectionError::NoImages);
        }
        let _guard = self
            .detect_gate
            .begin()
            .ok_or(ApiConnectionError::AlreadyInFlight(self.detect_gate.kind()))?;

        let mut form = Form::new();
        for image in images {
            let part = Part::bytes(image.bytes().to_vec())
                .file_name(image.file_name().to_string())
                .mime_str(image.content_type())
                .map_err(ApiConnectionError::NetworkError)?;
            form = form.part(IMAGES_FIELD, part);
        }

        let url = self.config.endpoint(DETECT_PATH);
        info!("Uploading {} image(s) to {}", images.len(), url);

        self.guarded(cancel, async {
            let response = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if !response.status().is_success() {
                let status = response.status();
                warn!("Detection endpoint answered {}", status);
                return Err(ApiConnectionError::UploadFailed(status));
            }

            let detected: DetectionResponse = self.read_json(response).await?;
            info!(
                "Detection returned {} ingredient(s) (count {})",
                detected.ingredients.len(),
                detected.count
            );
            Ok(detected)
        })
        .await
    }

    /// Submits a composed recipe request. Non-2xx replies become
    /// [`ApiConnectionError::ApiError`] carrying the server's `detail` text,
    /// or the status reason phrase when there is none.
    pub async fn request_recipes(
        &self,
        request: &RecipeRequest,
        cancel: &CancellationToken,
    ) -> Result<RecipeSuggestions, ApiConnectionError> {
        let _guard = self
            .recipes_gate
            .begin()
            .ok_or(ApiConnectionError::AlreadyInFlight(self.recipes_gate.kind()))?;

        let url = self.config.endpoint(RECIPES_PATH);
        info!(
            "Requesting recipes for {} ingredient(s), {} utensil(s), budget {}",
            request.available_ingredients.len(),
            request.available_utensils.len(),
            request.budget
        );

        self.guarded(cancel, async {
            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if response.status().is_success() {
                self.read_json(response).await
            } else {
                Err(self.api_error(response).await)
            }
        })
        .await
    }

    pub async fn submit_pantry(
        &self,
        pantry: &PantryData,
        cancel: &CancellationToken,
    ) -> Result<PantryReceipt, ApiConnectionError> {
        let url = self.config.endpoint(PANTRY_PATH);
        self.guarded(cancel, async {
            let response = self
                .client
                .post(&url)
                .json(pantry)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if response.status().is_success() {
                self.read_json(response).await
            } else {
                Err(self.api_error(response).await)
            }
        })
        .await
    }

    pub async fn health(&self, cancel: &CancellationToken) -> Result<HealthStatus, ApiConnectionError> {
        let url = self.config.endpoint(HEALTH_PATH);
        self.guarded(cancel, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if response.status().is_success() {
                self.read_json(response).await
            } else {
                Err(self.api_error(response).await)
            }
        })
        .await
    }

    async fn guarded<T, F>(&self, cancel: &CancellationToken, call: F) -> Result<T, ApiConnectionError>
    where
        F: Future<Output = Result<T, ApiConnectionError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Request cancelled by caller");
                Err(ApiConnectionError::Cancelled)
            }
            result = call => result,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ApiConnectionError> {
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to deserialize response body: {}", e);
            ApiConnectionError::SerializationError(e)
        })
    }

    async fn api_error(&self, response: Response) -> ApiConnectionError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorPayload>(&body)
            .ok()
            .and_then(|payload| payload.message().map(str::to_string))
            .unwrap_or_else(|| status_text(status));
        warn!("Request failed with {}: {}", status, message);
        ApiConnectionError::ApiError { status, message }
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiConnectionError {
        if err.is_timeout() {
            warn!("Request timed out after {:?}", self.config.timeout);
            ApiConnectionError::Timeout(self.config.timeout)
        } else {
            warn!("Network error: {}", err);
            ApiConnectionError::NetworkError(err)
        }
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_uses_reason_phrase() {
        assert_eq!(status_text(StatusCode::UNPROCESSABLE_ENTITY), "Unprocessable Entity");
        assert_eq!(status_text(StatusCode::from_u16(599).unwrap()), "Request failed");
    }

    #[test]
    fn test_user_message_is_bare_detail_for_api_errors() {
        let err = ApiConnectionError::ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "bad budget".to_string(),
        };
        assert_eq!(err.user_message(), "bad budget");
        assert_eq!(
            ApiConnectionError::UploadFailed(StatusCode::INTERNAL_SERVER_ERROR).user_message(),
            "Upload failed (500 Internal Server Error)"
        );
    }

    #[tokio::test]
    async fn test_detect_without_images_fails_fast() {
        // Nothing listens on port 9; reaching the network would error differently.
        let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:9", Duration::from_secs(1))).unwrap();
        let result = client.detect(&[], &CancellationToken::new()).await;
        assert!(matches!(result, Err(ApiConnectionError::NoImages)));
        assert_eq!(client.detect_gate().state(), crate::flight::FlightState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:9", Duration::from_secs(1))).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let result = client.health(&token).await;
        assert!(matches!(result, Err(ApiConnectionError::Cancelled)));
    }
}
