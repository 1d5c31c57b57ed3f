//! Press-to-record flow: capture, transcribe, extract, store.

pub mod extraction;
pub mod llm;
pub mod pipeline;

use anyhow::Result;

pub use extraction::{extraction_prompt, parse_extraction};
pub use llm::{build_language_model, EchoModel, LanguageModel, OllamaCli};
pub use pipeline::{CaptureOutcome, CapturePipeline};

/// Mono PCM audio as delivered by the capture collaborator.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
}

/// Records one utterance. `None` when nothing usable was heard.
pub trait AudioCapture: Send + Sync {
    fn capture(&self) -> Result<Option<AudioClip>>;
}

pub trait Transcriber: Send + Sync {
    /// Recognised text; empty when no speech was found.
    fn transcribe(&self, clip: &AudioClip) -> Result<String>;

    fn name(&self) -> &str;
}
