use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDateTime};
use log::{info, warn};

use crate::{
    actuators::Beeper,
    db::{Database, ReminderRecord},
    error::ReminderError,
};

use super::{extraction_prompt, parse_extraction, AudioCapture, LanguageModel, Transcriber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Stored(ReminderRecord),
    /// The same triple is already pending; nothing new was written.
    Duplicate(ReminderRecord),
    NoSpeech,
    ExtractionFailed,
    Unavailable(String),
}

/// Turns one button press into at most one stored reminder. Every failure is
/// handled here and reported through [`CaptureOutcome`].
pub struct CapturePipeline {
    audio: Arc<dyn AudioCapture>,
    stt: Arc<dyn Transcriber>,
    llm: Arc<dyn LanguageModel>,
    db: Database,
    beeper: Beeper,
    beep: Duration,
}

impl CapturePipeline {
    pub fn new(
        audio: Arc<dyn AudioCapture>,
        stt: Arc<dyn Transcriber>,
        llm: Arc<dyn LanguageModel>,
        db: Database,
        beeper: Beeper,
        beep: Duration,
    ) -> Self {
        info!("Capture pipeline: STT={}, LLM={}", stt.name(), llm.name());
        Self {
            audio,
            stt,
            llm,
            db,
            beeper,
            beep,
        }
    }

    /// Runs capture to insert. Blocks the caller for the whole sequence.
    pub async fn run(&self, now: NaiveDateTime) -> CaptureOutcome {
        let started = std::time::Instant::now();
        self.beeper.beep(self.beep).await;

        let audio = self.audio.clone();
        let clip = match blocking(move || audio.capture()).await {
            Ok(Some(clip)) => clip,
            Ok(None) => {
                info!("{}", ReminderError::CaptureEmpty);
                return CaptureOutcome::NoSpeech;
            }
            Err(err) => return unavailable("microphone", err),
        };

        let stt = self.stt.clone();
        let text = match blocking(move || stt.transcribe(&clip)).await {
            Ok(text) if text.trim().is_empty() => {
                info!("{}", ReminderError::CaptureEmpty);
                return CaptureOutcome::NoSpeech;
            }
            Ok(text) => text.trim().to_string(),
            Err(err) => return unavailable("transcriber", err),
        };
        info!("Heard: {text}");
        self.beeper.beep(self.beep).await;

        let prompt = extraction_prompt(&text, now.year());
        let llm = self.llm.clone();
        let output = match blocking(move || llm.complete(&prompt)).await {
            Ok(output) => output,
            Err(err) => return unavailable("language model", err),
        };

        let Some(record) = parse_extraction(&output) else {
            warn!("{}; try again", ReminderError::ExtractionFailed);
            return CaptureOutcome::ExtractionFailed;
        };

        match self.db.insert_reminder(&record).await {
            Ok(()) => {
                info!(
                    "Reminder {record} captured in {:.2}s",
                    started.elapsed().as_secs_f64()
                );
                CaptureOutcome::Stored(record)
            }
            Err(err) => match err.downcast_ref::<ReminderError>() {
                Some(ReminderError::DuplicateRecord(_)) => {
                    warn!("{err}");
                    CaptureOutcome::Duplicate(record)
                }
                _ => unavailable("record store", err),
            },
        }
    }
}

async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| anyhow!("collaborator worker failed: {err}"))?
}

fn unavailable(collaborator: &'static str, err: anyhow::Error) -> CaptureOutcome {
    let reason = match err.downcast_ref::<ReminderError>() {
        Some(known @ ReminderError::CollaboratorUnavailable { .. }) => known.to_string(),
        _ => ReminderError::unavailable(collaborator, format!("{err:#}")).to_string(),
    };
    warn!("Capture aborted: {reason}");
    CaptureOutcome::Unavailable(reason)
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        capture::{AudioClip, EchoModel},
        hardware::{sim::{ScriptedSpeech, SimGpio}, Level},
    };

    struct FailingModel;

    impl LanguageModel for FailingModel {
        fn complete(&self, _prompt: &str) -> Result<String> {
            bail!("connection refused")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct SilentMic;

    impl AudioCapture for SilentMic {
        fn capture(&self) -> Result<Option<AudioClip>> {
            Ok(Some(AudioClip {
                samples: vec![0; 160],
                sample_rate: AudioClip::DEFAULT_SAMPLE_RATE,
            }))
        }
    }

    impl Transcriber for SilentMic {
        fn transcribe(&self, _clip: &AudioClip) -> Result<String> {
            Ok("   ".into())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    }

    fn pipeline(
        speech: Arc<ScriptedSpeech>,
        llm: Arc<dyn LanguageModel>,
    ) -> (TempDir, Database, Arc<SimGpio>, CapturePipeline) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("reminders.sqlite3")).unwrap();
        let gpio = Arc::new(SimGpio::new());
        let beeper = Beeper::new(gpio.clone(), 27);
        let pipeline = CapturePipeline::new(
            speech.clone(),
            speech,
            llm,
            db.clone(),
            beeper,
            Duration::from_millis(1),
        );
        (dir, db, gpio, pipeline)
    }

    #[tokio::test]
    async fn stores_extracted_reminder_and_beeps_twice() {
        let speech = Arc::new(ScriptedSpeech::new());
        speech.push("(call mom, 2025-06-02, 9:05)");
        let (_dir, db, gpio, pipeline) = pipeline(speech, Arc::new(EchoModel));

        let expected = ReminderRecord::parse("call mom", "2025-06-02", "09:05").unwrap();
        assert_eq!(pipeline.run(now()).await, CaptureOutcome::Stored(expected.clone()));
        assert_eq!(db.list_active().await.unwrap(), vec![expected]);

        let highs = gpio.writes(27).iter().filter(|l| **l == Level::High).count();
        assert_eq!(highs, 2);
    }

    #[tokio::test]
    async fn duplicate_is_reported_not_fatal() {
        let speech = Arc::new(ScriptedSpeech::new());
        speech.push("(call mom, 2025-06-02, 9:05)");
        speech.push("(call mom, 2025-06-02, 09:05)");
        let (_dir, db, _gpio, pipeline) = pipeline(speech, Arc::new(EchoModel));

        assert!(matches!(pipeline.run(now()).await, CaptureOutcome::Stored(_)));
        assert!(matches!(pipeline.run(now()).await, CaptureOutcome::Duplicate(_)));
        assert_eq!(db.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nothing_captured_aborts_after_single_beep() {
        let speech = Arc::new(ScriptedSpeech::new());
        let (_dir, db, gpio, pipeline) = pipeline(speech, Arc::new(EchoModel));

        assert_eq!(pipeline.run(now()).await, CaptureOutcome::NoSpeech);
        assert!(db.list_active().await.unwrap().is_empty());
        assert_eq!(gpio.writes(27), vec![Level::High, Level::Low]);
    }

    #[tokio::test]
    async fn blank_transcript_is_no_speech() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("reminders.sqlite3")).unwrap();
        let mic = Arc::new(SilentMic);
        let pipeline = CapturePipeline::new(
            mic.clone(),
            mic,
            Arc::new(EchoModel),
            db.clone(),
            Beeper::new(Arc::new(SimGpio::new()), 27),
            Duration::from_millis(1),
        );

        assert_eq!(pipeline.run(now()).await, CaptureOutcome::NoSpeech);
    }

    #[tokio::test]
    async fn unmatched_model_output_writes_nothing() {
        let speech = Arc::new(ScriptedSpeech::new());
        speech.push("remind me about something sometime");
        let (_dir, db, _gpio, pipeline) = pipeline(speech, Arc::new(EchoModel));

        assert_eq!(pipeline.run(now()).await, CaptureOutcome::ExtractionFailed);
        assert!(db.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_model_is_unavailable() {
        let speech = Arc::new(ScriptedSpeech::new());
        speech.push("call mom tomorrow at nine");
        let (_dir, db, _gpio, pipeline) = pipeline(speech, Arc::new(FailingModel));

        match pipeline.run(now()).await {
            CaptureOutcome::Unavailable(reason) => {
                assert!(reason.starts_with("language model unavailable"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(db.list_active().await.unwrap().is_empty());
    }
}
