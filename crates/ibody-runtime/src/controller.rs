//! Phase controller - the timed state machine of the show
//!
//! ```text
//! waiting ──start──▶ training ──4 segments──▶ transition ──intro spoken──▶ inference ──4 segments──▶ done
//!    ▲                                                                                                │
//!    └──────────────────────────────── start (from any phase) ───────────────────────────────────────┘
//! ```
//!
//! The controller is polled: `update` is called every frame with the current
//! time and re-derives the action index from elapsed time. Side effects are
//! guarded by explicit watermarks so repeated polls never repeat speech:
//! - `announced`: highest action index spoken in the current run
//! - `intro`: progress of the second-part intro
//!
//! Speech never blocks a transition. Utterances are fire-and-forget and
//! their completions come back through `speech_finished`.

use std::collections::HashMap;
use std::time::Duration;

use ibody_core::{ActionLabelStats, Phase, PerformanceTime, SessionId, SessionState, NO_ACTION};
use ibody_time::{SegmentPosition, SegmentSchedule};
use ibody_voice::{
    action_announcement, label_report, Speaker, SpeechStatus, Utterance, UtteranceId, VoiceConfig,
    SECOND_PART_INTRO,
};

/// Upper bound on phase changes applied within one `update`
const MAX_CASCADE: usize = 5;

/// Progress of the second-part intro within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroState {
    NotPlayed,
    Speaking(UtteranceId),
    Finished,
}

/// Counters for one controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub runs: u64,
    pub phase_changes: u64,
    pub announcements: u64,
    pub label_reports: u64,
}

/// Timed phase state machine, one per session
#[derive(Debug)]
pub struct PhaseController {
    session_id: SessionId,
    schedule: SegmentSchedule,
    voice: VoiceConfig,
    phase: Phase,
    current_action: u32,
    training_start: PerformanceTime,
    inference_start: PerformanceTime,
    /// Highest action index announced in the current run
    announced: u32,
    intro: IntroState,
    /// Label reports waiting for their "Action n" utterance to end
    followups: HashMap<UtteranceId, String>,
    stats: ControllerStats,
}

impl PhaseController {
    pub fn new(session_id: SessionId, schedule: SegmentSchedule, voice: VoiceConfig) -> Self {
        PhaseController {
            session_id,
            schedule,
            voice,
            phase: Phase::Waiting,
            current_action: NO_ACTION,
            training_start: PerformanceTime::ZERO,
            inference_start: PerformanceTime::ZERO,
            announced: NO_ACTION,
            intro: IntroState::NotPlayed,
            followups: HashMap::new(),
            stats: ControllerStats::default(),
        }
    }

    /// Observable state, as published to the store
    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            current_action: self.current_action,
            session_id: self.session_id.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_action(&self) -> u32 {
        self.current_action
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn schedule(&self) -> &SegmentSchedule {
        &self.schedule
    }

    pub fn announced(&self) -> u32 {
        self.announced
    }

    pub fn intro(&self) -> IntroState {
        self.intro
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Manual start trigger. Accepted in any phase; always restarts the
    /// whole sequence from training and re-arms every guard.
    ///
    /// Utterances still playing from an earlier run are not cancelled.
    pub fn start(&mut self, now: PerformanceTime) {
        tracing::info!(session = %self.session_id, from = %self.phase, "performance started");
        self.stats.runs += 1;
        self.set_phase(Phase::Training);
        self.current_action = NO_ACTION;
        self.training_start = now;
        self.inference_start = now;
        self.announced = NO_ACTION;
        self.intro = IntroState::NotPlayed;
    }

    /// Advance the state machine to `now`.
    ///
    /// Phase changes cascade within one call: a transition whose intro is
    /// already finished moves straight on to inference.
    pub fn update<S: Speaker + ?Sized>(
        &mut self,
        now: PerformanceTime,
        labels: &ActionLabelStats,
        speaker: &mut S,
    ) {
        for _ in 0..MAX_CASCADE {
            if !self.step(now, labels, speaker) {
                break;
            }
        }
    }

    /// Report a completed utterance. Unknown tickets are ignored.
    pub fn speech_finished<S: Speaker + ?Sized>(&mut self, id: UtteranceId, speaker: &mut S) {
        if self.intro == IntroState::Speaking(id) {
            tracing::info!(session = %self.session_id, "second part intro finished");
            self.intro = IntroState::Finished;
            return;
        }

        if let Some(report) = self.followups.remove(&id) {
            self.speak_report(report, speaker);
        }
    }

    /// Time left in the running segment, `None` outside timed phases
    pub fn remaining(&self, now: PerformanceTime) -> Option<Duration> {
        let start = match self.phase {
            Phase::Training => self.training_start,
            Phase::Inference => self.inference_start,
            _ => return None,
        };
        match self.schedule.position(now - start) {
            SegmentPosition::Active { remaining, .. } => Some(remaining),
            SegmentPosition::Finished => Some(Duration::ZERO),
        }
    }

    /// One pass of the machine. Returns whether the phase changed.
    fn step<S: Speaker + ?Sized>(
        &mut self,
        now: PerformanceTime,
        labels: &ActionLabelStats,
        speaker: &mut S,
    ) -> bool {
        match self.phase {
            Phase::Waiting | Phase::Done => {
                self.current_action = NO_ACTION;
                false
            }
            Phase::Training => match self.schedule.position(now - self.training_start) {
                SegmentPosition::Finished => {
                    self.set_phase(Phase::Transition);
                    self.current_action = NO_ACTION;
                    true
                }
                SegmentPosition::Active { action, .. } => {
                    self.enter_action(action, labels, speaker);
                    false
                }
            },
            Phase::Transition => {
                self.current_action = NO_ACTION;
                if self.intro == IntroState::NotPlayed {
                    self.play_intro(speaker);
                }
                if self.intro != IntroState::Finished {
                    return false;
                }
                self.set_phase(Phase::Inference);
                self.inference_start = now;
                self.announced = NO_ACTION;
                true
            }
            Phase::Inference => match self.schedule.position(now - self.inference_start) {
                SegmentPosition::Finished => {
                    self.set_phase(Phase::Done);
                    self.current_action = NO_ACTION;
                    true
                }
                SegmentPosition::Active { action, .. } => {
                    self.enter_action(action, labels, speaker);
                    false
                }
            },
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!(session = %self.session_id, from = %self.phase, to = %phase, "phase changed");
            self.stats.phase_changes += 1;
        }
        self.phase = phase;
    }

    fn enter_action<S: Speaker + ?Sized>(
        &mut self,
        action: u32,
        labels: &ActionLabelStats,
        speaker: &mut S,
    ) {
        if action == self.current_action {
            return;
        }
        tracing::info!(session = %self.session_id, phase = %self.phase, action, "action started");
        self.current_action = action;
        self.announce(action, labels, speaker);
    }

    /// Speak "Action n" once per index per run. In inference the top label
    /// follows once the number has been spoken.
    fn announce<S: Speaker + ?Sized>(
        &mut self,
        action: u32,
        labels: &ActionLabelStats,
        speaker: &mut S,
    ) {
        if action == NO_ACTION || action <= self.announced {
            tracing::debug!(action, announced = self.announced, "announcement suppressed");
            return;
        }
        self.announced = action;
        self.stats.announcements += 1;

        let status = speaker.speak(Utterance::new(action_announcement(action), &self.voice));

        if self.phase != Phase::Inference {
            return;
        }
        let Some(top) = labels.top(action) else {
            tracing::info!(action, "no audience labels to report");
            return;
        };

        let report = label_report(top);
        match status {
            SpeechStatus::Finished => self.speak_report(report, speaker),
            SpeechStatus::Pending(id) => {
                self.followups.insert(id, report);
            }
        }
    }

    fn speak_report<S: Speaker + ?Sized>(&mut self, report: String, speaker: &mut S) {
        self.stats.label_reports += 1;
        speaker.speak(Utterance::new(report, &self.voice));
    }

    fn play_intro<S: Speaker + ?Sized>(&mut self, speaker: &mut S) {
        tracing::info!(session = %self.session_id, "playing second part intro");
        self.intro = match speaker.speak(Utterance::new(SECOND_PART_INTRO, &self.voice)) {
            SpeechStatus::Finished => IntroState::Finished,
            SpeechStatus::Pending(id) => IntroState::Speaking(id),
        };
    }
}
