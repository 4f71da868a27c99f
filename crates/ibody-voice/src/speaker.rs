//! Speaker - the speech collaborator contract
//!
//! `speak` returns immediately. When the environment cannot speak, the
//! utterance is reported `Finished` synchronously so timing logic never
//! waits on audio that will not come.

use std::collections::VecDeque;
use std::time::Duration;

use ibody_core::PerformanceTime;
use ibody_time::Clock;

/// Voice settings
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// BCP-47 language tag
    pub lang: String,
    /// Speaking rate (1.0 = normal)
    pub rate: f32,
    /// Pitch (1.0 = normal)
    pub pitch: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            lang: "en-GB".to_string(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

/// A piece of text to speak
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, voice: &VoiceConfig) -> Self {
        Self {
            text: text.into(),
            lang: voice.lang.clone(),
            rate: voice.rate,
            pitch: voice.pitch,
        }
    }
}

/// Ticket for an utterance still playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

/// Result of handing an utterance to the speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStatus {
    /// Already over (or never played); completion is immediate
    Finished,
    /// Playing; completion is reported later via `drain_finished`
    Pending(UtteranceId),
}

/// Speech collaborator
pub trait Speaker {
    /// Start speaking. Never blocks.
    fn speak(&mut self, utterance: Utterance) -> SpeechStatus;

    /// Tickets of utterances that completed since the last call
    fn drain_finished(&mut self) -> Vec<UtteranceId> {
        Vec::new()
    }
}

/// Environment without speech: nothing is played, everything finishes at once
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, utterance: Utterance) -> SpeechStatus {
        tracing::debug!(text = %utterance.text, "speech unavailable, skipping utterance");
        SpeechStatus::Finished
    }
}

/// Speaker driven by hand: utterances stay pending until completed.
///
/// Used by tests and simulations to control exactly when speech ends.
#[derive(Debug, Default)]
pub struct ScriptedSpeaker {
    next_id: u64,
    spoken: Vec<(UtteranceId, Utterance)>,
    pending: VecDeque<UtteranceId>,
    finished: Vec<UtteranceId>,
}

impl ScriptedSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every utterance ever spoken, in order
    pub fn spoken(&self) -> impl Iterator<Item = &str> {
        self.spoken.iter().map(|(_, u)| u.text.as_str())
    }

    pub fn spoken_count(&self) -> usize {
        self.spoken.len()
    }

    /// Utterances still playing, oldest first
    pub fn pending(&self) -> impl Iterator<Item = UtteranceId> + '_ {
        self.pending.iter().copied()
    }

    /// Text of a pending or past utterance
    pub fn text_of(&self, id: UtteranceId) -> Option<&str> {
        self.spoken
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, u)| u.text.as_str())
    }

    /// Finish the oldest pending utterance
    pub fn finish_next(&mut self) -> Option<UtteranceId> {
        let id = self.pending.pop_front()?;
        self.finished.push(id);
        Some(id)
    }

    /// Finish every pending utterance
    pub fn finish_all(&mut self) {
        self.finished.extend(self.pending.drain(..));
    }
}

impl Speaker for ScriptedSpeaker {
    fn speak(&mut self, utterance: Utterance) -> SpeechStatus {
        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        self.spoken.push((id, utterance));
        self.pending.push_back(id);
        SpeechStatus::Pending(id)
    }

    fn drain_finished(&mut self) -> Vec<UtteranceId> {
        std::mem::take(&mut self.finished)
    }
}

/// Speaker that logs utterances and finishes them after an estimated
/// speaking time, read from a clock.
///
/// Utterances queue behind each other the way a speech engine would.
#[derive(Debug)]
pub struct PacedSpeaker<C> {
    clock: C,
    words_per_minute: f64,
    next_id: u64,
    /// (id, time it finishes)
    queue: VecDeque<(UtteranceId, PerformanceTime)>,
}

impl<C: Clock> PacedSpeaker<C> {
    pub fn new(clock: C) -> Self {
        Self::with_pace(clock, 160.0)
    }

    pub fn with_pace(clock: C, words_per_minute: f64) -> Self {
        Self {
            clock,
            words_per_minute: words_per_minute.max(1.0),
            next_id: 0,
            queue: VecDeque::new(),
        }
    }

    /// Estimated time to speak `utterance`
    pub fn estimate(&self, utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count().max(1) as f64;
        let rate = f64::from(utterance.rate).max(0.1);
        Duration::from_secs_f64(words * 60.0 / (self.words_per_minute * rate))
    }
}

impl<C: Clock> Speaker for PacedSpeaker<C> {
    fn speak(&mut self, utterance: Utterance) -> SpeechStatus {
        let now = self.clock.now();
        let start = self.queue.back().map_or(now, |(_, end)| (*end).max(now));
        let end = start.saturating_add(self.estimate(&utterance));

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        self.queue.push_back((id, end));

        tracing::info!(target: "ibody::speech", lang = %utterance.lang, "speaking: {}", utterance.text);
        SpeechStatus::Pending(id)
    }

    fn drain_finished(&mut self) -> Vec<UtteranceId> {
        let now = self.clock.now();
        let mut done = Vec::new();
        while let Some((id, end)) = self.queue.front().copied() {
            if end > now {
                break;
            }
            self.queue.pop_front();
            done.push(id);
        }
        done
    }
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
    fn speak(&mut self, utterance: Utterance) -> SpeechStatus {
        (**self).speak(utterance)
    }

    fn drain_finished(&mut self) -> Vec<UtteranceId> {
        (**self).drain_finished()
    }
}
