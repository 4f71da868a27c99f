//! Performer display - the projection side of the show
//!
//! Owns the phase controller and is the only writer of session state.
//! Each frame runs the same stages in order:
//! 1. Collect finished speech
//! 2. Re-aggregate votes if the snapshot changed
//! 3. Advance the phase controller
//! 4. Smooth the primary pose and lay out the skeleton
//! 5. Build the HUD
//! 6. Publish state if it changed

use std::collections::BTreeMap;

use ibody_core::{ActionLabelStats, IbodyResult, PerformanceTime, SessionState};
use ibody_state::{SessionPublisher, VoteAggregator};
use ibody_store::{SharedStore, StorePath, Subscription};
use ibody_time::SegmentSchedule;
use ibody_visual::{
    action_color, layout_skeleton, primary_pose, Pose, PoseSmoother, Rgb, SkeletonConfig, SkeletonLayout,
};
use ibody_voice::Speaker;

use crate::{build_hud, Hud, PerformanceConfig, PhaseController};

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub state: SessionState,
    /// Stroke and fill colour of the skeleton
    pub color: Rgb,
    /// `None` when no body was detected this frame
    pub skeleton: Option<SkeletonLayout>,
    pub hud: Hud,
}

#[derive(Clone, Debug, Default)]
pub struct PerformerStats {
    pub frames: u64,
    pub vote_snapshots: u64,
    pub subscription_errors: u64,
    pub publishes: u64,
    pub poses_seen: u64,
}

/// Performer display loop
pub struct PerformerDisplay<S, K> {
    store: S,
    speaker: K,
    controller: PhaseController,
    aggregator: VoteAggregator,
    smoother: PoseSmoother,
    skeleton: SkeletonConfig,
    publisher: SessionPublisher,
    votes: Subscription,
    stats: PerformerStats,
}

impl<S: SharedStore, K: Speaker> PerformerDisplay<S, K> {
    pub fn new(config: &PerformanceConfig, store: S, speaker: K) -> IbodyResult<Self> {
        let session_id = config.session_id();
        let votes = store.subscribe(&StorePath::session_votes(&session_id)?);
        let publisher = SessionPublisher::new(&session_id)?;

        tracing::info!(session = %session_id, "performer display ready");

        Ok(PerformerDisplay {
            store,
            speaker,
            controller: PhaseController::new(
                session_id,
                SegmentSchedule::new(config.schedule()),
                config.voice(),
            ),
            aggregator: VoteAggregator::new(),
            smoother: PoseSmoother::new(config.smoothing()),
            skeleton: config.skeleton(),
            publisher,
            votes,
            stats: PerformerStats::default(),
        })
    }

    /// Manual "begin performance" trigger
    pub fn start(&mut self, now: PerformanceTime) {
        self.controller.start(now);
    }

    /// Run one frame with the poses detected in it
    pub fn frame(&mut self, now: PerformanceTime, poses: &[Pose]) -> RenderFrame {
        self.stats.frames += 1;

        // Stage 1: finished speech may complete the intro or queue a label report
        for id in self.speaker.drain_finished() {
            self.controller.speech_finished(id, &mut self.speaker);
        }

        // Stage 2: votes
        self.ingest_votes();

        // Stage 3: phase and action
        self.controller
            .update(now, self.aggregator.stats(), &mut self.speaker);
        let state = self.controller.state();

        // Stage 4: skeleton
        let skeleton = primary_pose(poses).map(|raw| {
            self.stats.poses_seen += 1;
            let smoothed = self.smoother.update(raw);
            layout_skeleton(smoothed, &self.skeleton)
        });

        // Stage 5: HUD
        let hud = build_hud(
            &state,
            self.controller.remaining(now),
            self.aggregator.stats(),
        );

        // Stage 6: publish; failures are logged by the publisher and retried next frame
        if let Ok(true) = self.publisher.publish_if_changed(&state, &self.store) {
            self.stats.publishes += 1;
        }

        RenderFrame {
            color: action_color(state.current_action),
            state,
            skeleton,
            hud,
        }
    }

    fn ingest_votes(&mut self) {
        match self.votes.poll_changed() {
            Some(Ok(snapshot)) => {
                self.stats.vote_snapshots += 1;
                self.aggregator.ingest(snapshot.as_ref());
            }
            Some(Err(e)) => {
                // keep the last good statistics until the next snapshot
                self.stats.subscription_errors += 1;
                tracing::warn!(path = %self.votes.path(), error = %e, "vote subscription error");
            }
            None => {}
        }
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn labels(&self) -> &ActionLabelStats {
        self.aggregator.stats()
    }

    /// Top label per action
    pub fn top_labels(&self) -> BTreeMap<u32, &str> {
        self.aggregator.stats().top_labels()
    }

    pub fn speaker(&self) -> &K {
        &self.speaker
    }

    pub fn speaker_mut(&mut self) -> &mut K {
        &mut self.speaker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> &PerformerStats {
        &self.stats
    }
}
