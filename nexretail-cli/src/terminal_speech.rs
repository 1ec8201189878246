use colored::Colorize;
use inquire::{InquireError, Text};
use std::collections::VecDeque;

use nexretail_core::{SpeechBackend, SpeechError, SpeechEvent, Utterance, UtteranceId};

/// Speech backend for a terminal
///
/// Recognition is a typed transcript; synthesis prints the text. An
/// utterance counts as being read until the user moves on, so the
/// microphone control can still interrupt it.
pub struct TerminalSpeech {
    voice_input: bool,
    reading: Option<UtteranceId>,
    events: VecDeque<SpeechEvent>,
}

impl TerminalSpeech {
    pub fn new(voice_input: bool) -> Self {
        Self {
            voice_input,
            reading: None,
            events: VecDeque::new(),
        }
    }

    /// The user moved on; whatever was being read has finished
    pub fn finish_reading(&mut self) {
        if let Some(id) = self.reading.take() {
            self.events.push_back(SpeechEvent::SpeechFinished(id));
        }
    }

    /// Events delivered since the last call, oldest first
    pub fn drain_events(&mut self) -> Vec<SpeechEvent> {
        self.events.drain(..).collect()
    }
}

impl SpeechBackend for TerminalSpeech {
    fn recognition_available(&self) -> bool {
        self.voice_input
    }

    fn start_recognition(&mut self, locale: &str) -> Result<(), SpeechError> {
        let prompt = format!("Listening ({}):", locale);
        let event = match Text::new(&prompt)
            .with_help_message("Speak (type) your question, Esc to stop")
            .prompt()
        {
            Ok(transcript) if transcript.trim().is_empty() => SpeechEvent::RecognitionEnded,
            Ok(transcript) => SpeechEvent::Recognized(transcript),
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                SpeechEvent::RecognitionEnded
            }
            Err(e) => SpeechEvent::RecognitionFailed(e.to_string()),
        };
        self.events.push_back(event);
        Ok(())
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        println!("{} {}", "[speaking]".magenta(), utterance.text.italic());
        self.reading = Some(utterance.id);
        Ok(())
    }

    fn cancel_speech(&mut self) {
        if self.reading.take().is_some() {
            println!("{}", "[speech stopped]".magenta());
        }
    }
}
