//! Speech Interaction Controller
//!
//! A three-state machine (Idle, Listening, Speaking) in front of the
//! platform's speech recognition and synthesis. Listening and Speaking are
//! mutually exclusive; the control that starts listening doubles as a
//! "stop talking" button while an answer is being read out.

use log::{debug, warn};
use std::fmt;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Voice input is not supported in this environment")]
    RecognitionUnavailable,

    #[error("Speech backend error: {0}")]
    Backend(String),
}

/// Identifies one spoken answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Listening,
    Speaking(UtteranceId),
}

impl fmt::Display for SpeechState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechState::Idle => write!(f, "idle"),
            SpeechState::Listening => write!(f, "listening"),
            SpeechState::Speaking(_) => write!(f, "speaking"),
        }
    }
}

/// Text to be read aloud, with voice parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

/// Callbacks delivered by the platform
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Final transcript of the listening session
    Recognized(String),
    /// Recognition stopped without a result
    RecognitionEnded,
    RecognitionFailed(String),
    SpeechFinished(UtteranceId),
    SpeechFailed(UtteranceId),
}

/// What the caller should do after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAction {
    /// Submit the transcript as an assistant query, without confirmation
    SubmitQuery(String),
}

/// Result of pressing the microphone control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    StartedListening,
    /// An answer was being read; it was stopped instead
    StoppedSpeaking,
    AlreadyListening,
}

/// Platform speech capabilities
pub trait SpeechBackend {
    fn recognition_available(&self) -> bool;

    /// Begin a single-shot recognition session; results arrive as events
    fn start_recognition(&mut self, locale: &str) -> Result<(), SpeechError>;

    /// Queue an utterance; completion arrives as an event
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Stop whatever is being spoken
    fn cancel_speech(&mut self);
}

/// Voice parameters shared by recognition and synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for VoiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            locale: config.locale.clone(),
            rate: config.speech_rate,
            pitch: config.speech_pitch,
        }
    }
}

pub struct SpeechController<B> {
    backend: B,
    settings: VoiceSettings,
    state: SpeechState,
    next_utterance: u64,
}

impl<B: SpeechBackend> SpeechController<B> {
    pub fn new(backend: B, settings: VoiceSettings) -> Self {
        Self {
            backend,
            settings,
            state: SpeechState::Idle,
            next_utterance: 1,
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == SpeechState::Listening
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, SpeechState::Speaking(_))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The microphone control
    ///
    /// While speaking this cancels speech and returns to Idle without
    /// listening. From Idle it starts a recognition session, unless the
    /// platform has no recognition, in which case the state stays Idle.
    pub fn activate(&mut self) -> Result<Activation, SpeechError> {
        match self.state {
            SpeechState::Speaking(id) => {
                self.backend.cancel_speech();
                self.state = SpeechState::Idle;
                debug!("Speech {:?} stopped by user", id);
                Ok(Activation::StoppedSpeaking)
            }
            SpeechState::Listening => Ok(Activation::AlreadyListening),
            SpeechState::Idle => {
                if !self.backend.recognition_available() {
                    return Err(SpeechError::RecognitionUnavailable);
                }
                self.backend.start_recognition(&self.settings.locale)?;
                self.state = SpeechState::Listening;
                Ok(Activation::StartedListening)
            }
        }
    }

    /// Feed a platform callback into the state machine
    ///
    /// Events that do not belong to the current session (a late transcript,
    /// the end of a cancelled utterance) are ignored.
    pub fn handle_event(&mut self, event: SpeechEvent) -> Option<SpeechAction> {
        match (self.state, event) {
            (SpeechState::Listening, SpeechEvent::Recognized(transcript)) => {
                self.state = SpeechState::Idle;
                let query = transcript.trim();
                if query.is_empty() {
                    None
                } else {
                    Some(SpeechAction::SubmitQuery(query.to_string()))
                }
            }
            (SpeechState::Listening, SpeechEvent::RecognitionEnded) => {
                self.state = SpeechState::Idle;
                None
            }
            (SpeechState::Listening, SpeechEvent::RecognitionFailed(reason)) => {
                warn!("Speech recognition failed: {}", reason);
                self.state = SpeechState::Idle;
                None
            }
            (SpeechState::Speaking(current), SpeechEvent::SpeechFinished(id))
            | (SpeechState::Speaking(current), SpeechEvent::SpeechFailed(id))
                if current == id =>
            {
                self.state = SpeechState::Idle;
                None
            }
            (state, event) => {
                debug!("Ignoring {:?} while {}", event, state);
                None
            }
        }
    }

    /// Read an answer aloud, replacing any answer currently being read
    ///
    /// Declined (returns `Ok(None)`) while listening, and for text that is
    /// empty once markdown is stripped.
    pub fn speak(&mut self, text: &str) -> Result<Option<UtteranceId>, SpeechError> {
        match self.state {
            SpeechState::Listening => {
                debug!("Not speaking while listening");
                return Ok(None);
            }
            SpeechState::Speaking(_) => {
                self.backend.cancel_speech();
                self.state = SpeechState::Idle;
            }
            SpeechState::Idle => {}
        }

        let text = clean_for_speech(text);
        if text.trim().is_empty() {
            return Ok(None);
        }

        let utterance = Utterance {
            id: UtteranceId(self.next_utterance),
            text,
            locale: self.settings.locale.clone(),
            rate: self.settings.rate,
            pitch: self.settings.pitch,
        };
        self.next_utterance += 1;

        self.backend.speak(&utterance)?;
        self.state = SpeechState::Speaking(utterance.id);
        Ok(Some(utterance.id))
    }

    /// Stop reading aloud, if anything is being read
    pub fn stop_speaking(&mut self) {
        if self.is_speaking() {
            self.backend.cancel_speech();
            self.state = SpeechState::Idle;
        }
    }
}

/// Drop markdown emphasis and heading marks that would be read out literally
pub fn clean_for_speech(text: &str) -> String {
    text.chars().filter(|c| *c != '*' && *c != '#').collect()
}

/// Transcript for a free-text form field, without a trailing full stop
pub fn dictation_text(transcript: &str) -> String {
    let trimmed = transcript.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

/// Digits of a spoken number for a numeric form field
///
/// Returns `None` when the transcript has no digits, leaving the field as is.
pub fn dictation_number(transcript: &str) -> Option<u64> {
    let digits: String = dictation_text(transcript)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        unavailable: bool,
        fail_speak: bool,
        recognitions: Vec<String>,
        spoken: Vec<Utterance>,
        cancels: usize,
    }

    impl SpeechBackend for FakeBackend {
        fn recognition_available(&self) -> bool {
            !self.unavailable
        }

        fn start_recognition(&mut self, locale: &str) -> Result<(), SpeechError> {
            self.recognitions.push(locale.to_string());
            Ok(())
        }

        fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
            if self.fail_speak {
                return Err(SpeechError::Backend("no voices".to_string()));
            }
            self.spoken.push(utterance.clone());
            Ok(())
        }

        fn cancel_speech(&mut self) {
            self.cancels += 1;
        }
    }

    fn controller() -> SpeechController<FakeBackend> {
        SpeechController::new(FakeBackend::default(), VoiceSettings::default())
    }

    #[test]
    fn test_listen_then_auto_submit() {
        let mut speech = controller();
        assert_eq!(speech.activate(), Ok(Activation::StartedListening));
        assert!(speech.is_listening());
        assert_eq!(speech.backend().recognitions, ["id-ID"]);

        let action = speech.handle_event(SpeechEvent::Recognized("cek stok laptop".into()));
        assert_eq!(
            action,
            Some(SpeechAction::SubmitQuery("cek stok laptop".to_string()))
        );
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_activate_while_speaking_only_cancels() {
        let mut speech = controller();
        speech.speak("Stock is low").unwrap();
        assert!(speech.is_speaking());

        assert_eq!(speech.activate(), Ok(Activation::StoppedSpeaking));
        assert_eq!(speech.state(), SpeechState::Idle);
        assert_eq!(speech.backend().cancels, 1);
        assert!(speech.backend().recognitions.is_empty());
    }

    #[test]
    fn test_unavailable_recognition_stays_idle() {
        let backend = FakeBackend {
            unavailable: true,
            ..Default::default()
        };
        let mut speech = SpeechController::new(backend, VoiceSettings::default());

        assert_eq!(speech.activate(), Err(SpeechError::RecognitionUnavailable));
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_recognition_end_without_result_returns_to_idle() {
        let mut speech = controller();
        speech.activate().unwrap();
        assert_eq!(speech.handle_event(SpeechEvent::RecognitionEnded), None);
        assert_eq!(speech.state(), SpeechState::Idle);

        speech.activate().unwrap();
        assert_eq!(
            speech.handle_event(SpeechEvent::RecognitionFailed("no-speech".into())),
            None
        );
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_blank_transcript_is_not_submitted() {
        let mut speech = controller();
        speech.activate().unwrap();
        assert_eq!(speech.handle_event(SpeechEvent::Recognized("   ".into())), None);
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_new_utterance_replaces_current_one() {
        let mut speech = controller();
        let first = speech.speak("first answer").unwrap().unwrap();
        let second = speech.speak("second answer").unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(speech.backend().cancels, 1);
        assert_eq!(speech.state(), SpeechState::Speaking(second));

        // The cancelled utterance reporting its end must not stop the new one
        speech.handle_event(SpeechEvent::SpeechFinished(first));
        assert_eq!(speech.state(), SpeechState::Speaking(second));

        speech.handle_event(SpeechEvent::SpeechFinished(second));
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_speech_error_returns_to_idle() {
        let mut speech = controller();
        let id = speech.speak("answer").unwrap().unwrap();
        speech.handle_event(SpeechEvent::SpeechFailed(id));
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_speak_is_declined_while_listening() {
        let mut speech = controller();
        speech.activate().unwrap();

        assert_eq!(speech.speak("answer"), Ok(None));
        assert!(speech.is_listening());
        assert!(speech.backend().spoken.is_empty());
    }

    #[test]
    fn test_failed_speak_stays_idle() {
        let backend = FakeBackend {
            fail_speak: true,
            ..Default::default()
        };
        let mut speech = SpeechController::new(backend, VoiceSettings::default());
        assert!(speech.speak("answer").is_err());
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_utterance_is_cleaned_and_uses_voice_settings() {
        let mut speech = controller();
        speech.speak("## Summary\n**Stock** is low").unwrap();

        let utterance = &speech.backend().spoken[0];
        assert_eq!(utterance.text, " Summary\nStock is low");
        assert_eq!(utterance.locale, "id-ID");
        assert_eq!(utterance.rate, 1.05);
        assert_eq!(utterance.pitch, 1.0);
    }

    #[test]
    fn test_late_transcript_is_ignored() {
        let mut speech = controller();
        assert_eq!(speech.handle_event(SpeechEvent::Recognized("hello".into())), None);
        assert_eq!(speech.state(), SpeechState::Idle);
    }

    #[test]
    fn test_dictation_helpers() {
        assert_eq!(dictation_text("Samsung Galaxy."), "Samsung Galaxy");
        assert_eq!(dictation_number("lima belas 15."), Some(15));
        assert_eq!(dictation_number("Rp 1.500.000"), Some(1_500_000));
        assert_eq!(dictation_number("seratus"), None);
    }
}
