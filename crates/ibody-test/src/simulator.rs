//! Show simulator

use std::collections::BTreeMap;
use std::time::Duration;

use ibody_core::{IbodyResult, Phase, PerformanceTime, SessionState, ViewerId, NO_ACTION};
use ibody_runtime::{
    PerformanceConfig, PerformerDisplay, RenderFrame, SyntheticAudience, SyntheticPoses, ViewerClient,
};
use ibody_state::SubmitError;
use ibody_store::MemoryStore;
use ibody_time::{Clock, ManualClock};
use ibody_voice::ScriptedSpeaker;

/// When the scripted speaker reports utterances as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPolicy {
    /// Everything spoken finishes before the next frame
    Immediate,
    /// Only `finish_speech` completes utterances
    Manual,
}

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub performance: PerformanceConfig,
    pub viewers: usize,
    pub seed: u64,
    /// Show time per frame
    pub frame: Duration,
    pub speech: SpeechPolicy,
    /// Viewers only write valid drafts
    pub careful_viewers: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            performance: PerformanceConfig::default(),
            viewers: 0,
            seed: 1,
            frame: Duration::from_millis(33),
            speech: SpeechPolicy::Immediate,
            careful_viewers: true,
        }
    }
}

/// Observable state change seen by the performer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub at: PerformanceTime,
    pub phase: Phase,
    pub action: u32,
}

/// Outcome of the vote attempts made by simulated viewers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub recorded: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Summary of a finished show
#[derive(Debug, Clone)]
pub struct ShowReport {
    pub transitions: Vec<Transition>,
    pub spoken: Vec<String>,
    pub top_labels: BTreeMap<u32, String>,
    pub votes: VoteTally,
    pub publishes: u64,
    pub frames: u64,
}

struct SimViewer {
    client: ViewerClient<MemoryStore, ManualClock>,
    audience: SyntheticAudience,
    voted_for: u32,
    vote_at: Option<PerformanceTime>,
}

/// Deterministic two-client show
pub struct ShowSimulator {
    clock: ManualClock,
    store: MemoryStore,
    performer: PerformerDisplay<MemoryStore, ScriptedSpeaker>,
    viewers: Vec<SimViewer>,
    poses: SyntheticPoses,
    frame: Duration,
    speech: SpeechPolicy,
    transitions: Vec<Transition>,
    votes: VoteTally,
}

impl ShowSimulator {
    pub fn new(config: SimConfig) -> IbodyResult<Self> {
        let clock = ManualClock::with_wall_epoch(1_700_000_000_000);
        let store = MemoryStore::with_wall_clock(clock.clone()).with_seed(config.seed);
        let performer = PerformerDisplay::new(&config.performance, store.clone(), ScriptedSpeaker::new())?;

        let mut viewers = Vec::with_capacity(config.viewers);
        for i in 0..config.viewers as u64 {
            let seed = config.seed.wrapping_mul(1_000).wrapping_add(i);
            let client = ViewerClient::new(
                store.clone(),
                clock.clone(),
                config.performance.session_id(),
                ViewerId::new(format!("viewer-sim{i:05}")),
            )?
            .with_num_actions(config.performance.schedule.num_actions);
            let audience = if config.careful_viewers {
                SyntheticAudience::careful(seed)
            } else {
                SyntheticAudience::new(seed)
            };
            viewers.push(SimViewer {
                client,
                audience,
                voted_for: NO_ACTION,
                vote_at: None,
            });
        }

        Ok(ShowSimulator {
            clock,
            store,
            performer,
            viewers,
            poses: SyntheticPoses::new(config.seed),
            frame: config.frame,
            speech: config.speech,
            transitions: Vec::new(),
            votes: VoteTally::default(),
        })
    }

    pub fn now(&self) -> PerformanceTime {
        self.clock.now()
    }

    pub fn state(&self) -> SessionState {
        self.performer.state()
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn performer(&self) -> &PerformerDisplay<MemoryStore, ScriptedSpeaker> {
        &self.performer
    }

    pub fn speaker(&self) -> &ScriptedSpeaker {
        self.performer.speaker()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn votes(&self) -> &VoteTally {
        &self.votes
    }

    /// Press the start key
    pub fn start(&mut self) {
        let now = self.now();
        self.performer.start(now);
    }

    /// Complete every utterance still playing
    pub fn finish_speech(&mut self) {
        self.performer.speaker_mut().finish_all();
    }

    /// Advance one frame
    pub fn step(&mut self) -> RenderFrame {
        let dt = self.frame;
        self.step_by(dt)
    }

    /// Advance the clock by `dt` and run one frame of every client
    pub fn step_by(&mut self, dt: Duration) -> RenderFrame {
        let now = self.clock.advance(dt);
        self.run_frame(now)
    }

    /// Run one frame without moving the clock
    pub fn run_frame(&mut self, now: PerformanceTime) -> RenderFrame {
        if self.speech == SpeechPolicy::Immediate {
            self.performer.speaker_mut().finish_all();
        }

        self.step_viewers(now);

        let poses = self.poses.sample(now);
        let frame = self.performer.frame(now, &poses);
        self.record(now, &frame.state);
        frame
    }

    /// Run frames until `dt` of show time has passed
    pub fn run_for(&mut self, dt: Duration) -> Option<RenderFrame> {
        let end = self.now().saturating_add(dt);
        let mut last = None;
        while self.now() < end {
            let step = self.frame.min(end - self.now());
            last = Some(self.step_by(step));
        }
        last
    }

    /// Run frames until `done` holds, at most `limit` of show time
    pub fn run_until<F>(&mut self, limit: Duration, mut done: F) -> Option<RenderFrame>
    where
        F: FnMut(&RenderFrame) -> bool,
    {
        let end = self.now().saturating_add(limit);
        while self.now() < end {
            let frame = self.step();
            if done(&frame) {
                return Some(frame);
            }
        }
        None
    }

    /// Start the show and run it to the end
    pub fn run_show(&mut self, limit: Duration) -> ShowReport {
        self.run_frame(self.now());
        self.start();
        self.run_until(limit, |f| f.state.phase == Phase::Done);
        self.report()
    }

    pub fn report(&self) -> ShowReport {
        ShowReport {
            transitions: self.transitions.clone(),
            spoken: self.speaker().spoken().map(str::to_string).collect(),
            top_labels: self
                .performer
                .top_labels()
                .into_iter()
                .map(|(action, label)| (action, label.to_string()))
                .collect(),
            votes: self.votes.clone(),
            publishes: self.performer.stats().publishes,
            frames: self.performer.stats().frames,
        }
    }

    fn step_viewers(&mut self, now: PerformanceTime) {
        for viewer in &mut self.viewers {
            viewer.client.poll();

            let Some(state) = viewer.client.observed().cloned() else {
                continue;
            };
            if !state.accepts_votes() || state.current_action == viewer.voted_for {
                viewer.vote_at = None;
                continue;
            }

            if viewer.vote_at.is_none() {
                viewer.vote_at = Some(now.saturating_add(viewer.audience.think_time()));
            }
            if viewer.vote_at.is_some_and(|due| now < due) {
                continue;
            }

            let draft = viewer.audience.draft_for(state.current_action);
            match viewer.client.submit(&draft) {
                Ok(_) => self.votes.recorded += 1,
                Err(SubmitError::Rejected(_)) => self.votes.rejected += 1,
                Err(SubmitError::Transport(_)) => self.votes.failed += 1,
            }
            viewer.voted_for = state.current_action;
            viewer.vote_at = None;
        }
    }

    fn record(&mut self, now: PerformanceTime, state: &SessionState) {
        let changed = self
            .transitions
            .last()
            .map_or(true, |t| t.phase != state.phase || t.action != state.current_action);
        if changed {
            tracing::debug!(at = ?now, phase = %state.phase, action = state.current_action, "transition");
            self.transitions.push(Transition {
                at: now,
                phase: state.phase,
                action: state.current_action,
            });
        }
    }
}
