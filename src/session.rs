//! One user's working session: staged photos, the ingredient list, the
//! kitchen setup and the recipe chat.
//!
//! Failures of remote calls are logged, announced through the speech service
//! and returned to the caller; they never disturb state the call did not own.

use std::path::PathBuf;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_connection::endpoints::{PantryData, PantryReceipt, RecipeRequest};
use crate::api_connection::{ApiClient, ApiConnectionError};
use crate::chat::ChatTranscript;
use crate::ingredients::IngredientStore;
use crate::recipes::{compose, Budget, Utensil, UtensilSelection};
use crate::speech::SpeechService;
use crate::staging::{ImageStagingBuffer, SelectedFile};

pub const UPLOAD_FAILED_NOTICE: &str = "Upload failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionReport {
    /// Count reported by the detection service.
    pub detected: u32,
    /// Labels that actually made it into the store.
    pub added: usize,
}

#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    speech: SpeechService,
    staging: ImageStagingBuffer,
    ingredients: IngredientStore,
    utensils: UtensilSelection,
    budget: Budget,
    transcript: ChatTranscript,
}

impl Session {
    pub fn new(client: ApiClient, speech: SpeechService) -> Self {
        Self {
            client,
            speech,
            staging: ImageStagingBuffer::new(),
            ingredients: IngredientStore::new(),
            utensils: UtensilSelection::new(),
            budget: Budget::default(),
            transcript: ChatTranscript::new(),
        }
    }

    pub fn stage_files(&mut self, files: Vec<SelectedFile>) -> usize {
        self.staging.select(files)
    }

    /// Reads the given files and stages the images among them.
    pub async fn stage_paths(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(SelectedFile::from_path(path).await?);
        }
        Ok(self.stage_files(files))
    }

    pub fn remove_image(&mut self, index: usize) -> bool {
        self.staging.remove(index).is_some()
    }

    /// Uploads the staged images and merges the detected labels into the
    /// ingredient list. Returns `Ok(None)` when nothing is staged.
    pub async fn detect_ingredients(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<DetectionReport>, ApiConnectionError> {
        if self.staging.is_empty() {
            return Ok(None);
        }

        match self.client.detect(self.staging.images(), cancel).await {
            Ok(response) => {
                let added = self.ingredients.merge(response.ingredients);
                info!("Detection added {} ingredient(s)", added);
                self.speech
                    .speak(&format!("Detected {} ingredients", response.count));
                Ok(Some(DetectionReport {
                    detected: response.count,
                    added,
                }))
            }
            Err(ApiConnectionError::NoImages) => Ok(None),
            Err(e) => {
                warn!("Error uploading images: {}", e);
                self.speech.speak(UPLOAD_FAILED_NOTICE);
                Err(e)
            }
        }
    }

    pub fn add_ingredient(&mut self, label: &str) -> bool {
        self.ingredients.add(label)
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Option<String> {
        self.ingredients.remove_at(index)
    }

    pub fn toggle_utensil(&mut self, utensil: Utensil) -> bool {
        self.utensils.toggle(utensil)
    }

    pub fn set_budget(&mut self, value: f64) -> Budget {
        self.budget = Budget::new(value);
        self.budget
    }

    pub fn compose_request(&self, preference: &str) -> RecipeRequest {
        compose(
            self.ingredients.as_slice(),
            &self.utensils,
            preference,
            self.budget.value(),
        )
    }

    /// Sends the current kitchen state plus `preference` to the recipe
    /// service. The user's message, and then exactly one reply (recipes or
    /// an error text), end up in the transcript; the loading placeholder
    /// never outlives the call. Returns the number of recipes received.
    pub async fn send(
        &mut self,
        preference: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, ApiConnectionError> {
        let request = self.compose_request(preference);
        self.transcript.push_user(request.preference.clone());
        self.speech.speak("Send");

        let pending = self.transcript.begin_reply();
        let outcome = self
            .client
            .request_recipes(&request, cancel)
            .await
            .and_then(|suggestions| match (suggestions.title, suggestions.recipes) {
                (Some(title), Some(recipes)) => Ok((title, recipes)),
                (None, _) => Err(ApiConnectionError::IncompleteResponse("Title")),
                (_, None) => Err(ApiConnectionError::IncompleteResponse("recipes")),
            });

        match outcome {
            Ok((title, recipes)) => {
                let count = recipes.len();
                info!("Received {} recipe(s)", count);
                pending.settle(title.clone(), Some(recipes));
                self.speech.speak(&title);
                Ok(count)
            }
            Err(e) => {
                warn!("Error fetching recipes: {}", e);
                let message = e.user_message();
                pending.settle(message.clone(), None);
                self.speech.speak(&message);
                Err(e)
            }
        }
    }

    pub async fn save_pantry(&self, cancel: &CancellationToken) -> Result<PantryReceipt, ApiConnectionError> {
        let pantry = PantryData {
            ingredients: self.ingredients.to_vec(),
            budget: self.budget.value(),
            utensils: self.utensils.labels(),
        };
        self.client.submit_pantry(&pantry, cancel).await
    }

    /// Drops staged images (revoking their previews) and the ingredient list.
    pub fn reset_upload(&mut self) {
        self.staging.reset();
        self.ingredients.clear();
    }

    pub fn clear_chat(&mut self) {
        self.transcript.clear();
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn speech(&self) -> &SpeechService {
        &self.speech
    }

    pub fn staging(&self) -> &ImageStagingBuffer {
        &self.staging
    }

    pub fn ingredients(&self) -> &IngredientStore {
        &self.ingredients
    }

    pub fn utensils(&self) -> &UtensilSelection {
        &self.utensils
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }
}
