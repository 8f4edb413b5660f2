//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapters for speech-to-text transcription.
//! Both implement the `SpeechToTextService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client,
};
use async_trait::async_trait;
use debaide_core::ports::{SpeechToTextService, StoredAudio, Transcription};
use tracing::{info, warn};

//=========================================================================================
// Whisper
//=========================================================================================

/// An adapter that implements the `SpeechToTextService` port using the OpenAI Whisper API.
#[derive(Clone)]
pub struct WhisperTranscriber {
    client: Client<OpenAIConfig>,
    model: String,
}

impl WhisperTranscriber {
    /// Creates a new `WhisperTranscriber`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl SpeechToTextService for WhisperTranscriber {
    /// Transcribes the uploaded file as English speech. The API does not report a
    /// duration here, so callers estimate one from the word count.
    async fn transcribe(&self, audio: &StoredAudio) -> Transcription {
        let input = AudioInput::from_vec_u8(audio.file_name.clone(), audio.bytes.to_vec());

        let request = CreateTranscriptionRequest {
            file: input,
            model: self.model.clone(),
            language: Some("en".to_string()),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        match self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e: OpenAIError| e.to_string())
        {
            Ok(response) => {
                info!("Transcribed {} ({} bytes).", audio.reference, audio.bytes.len());
                Transcription {
                    text: response.text.trim().to_string(),
                    duration_seconds: 0.0,
                }
            }
            Err(e) => {
                warn!("Whisper transcription of {} failed: {}", audio.reference, e);
                Transcription::placeholder()
            }
        }
    }
}

//=========================================================================================
// Offline
//=========================================================================================

/// Used when no transcription backend is configured.
#[derive(Clone, Default)]
pub struct OfflineTranscriber;

#[async_trait]
impl SpeechToTextService for OfflineTranscriber {
    async fn transcribe(&self, audio: &StoredAudio) -> Transcription {
        info!("Using mock transcription for {} (no STT backend configured).", audio.reference);
        Transcription {
            text: "[Mock transcription: This is a sample transcription of your debate speech.]".to_string(),
            duration_seconds: 5.0,
        }
    }
}
