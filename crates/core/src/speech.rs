//! Speech collaborator interface.
//!
//! Speech-to-text and text-to-speech are consumed as opaque functions
//! (bytes -> text, text -> bytes). The voice transport never cares which
//! engine sits behind this trait.

use anyhow::Result;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        AudioInput, CreateSpeechRequestArgs, CreateTranscriptionRequestArgs, SpeechModel,
        SpeechResponseFormat, Voice,
    },
};
use async_trait::async_trait;

/// Opaque speech engine: raw audio in, text out and vice versa.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribes a finalized utterance segment. An empty string means the
    /// segment contained no usable speech.
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String>;

    /// Synthesizes spoken audio (raw PCM16) for the given text.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// [`SpeechService`] backed by the OpenAI audio endpoints.
pub struct OpenAISpeechService {
    client: Client<OpenAIConfig>,
}

impl OpenAISpeechService {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl SpeechService for OpenAISpeechService {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8("utterance.wav".to_string(), audio))
            .model("whisper-1")
            .build()?;
        let response = self.client.audio().transcribe(request).await?;
        Ok(response.text)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text.to_string())
            .model(SpeechModel::Tts1)
            .voice(Voice::Alloy)
            .response_format(SpeechResponseFormat::Pcm)
            .build()?;
        let response = self.client.audio().speech(request).await?;
        Ok(response.bytes.to_vec())
    }
}
