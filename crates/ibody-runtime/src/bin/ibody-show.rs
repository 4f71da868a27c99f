//! ibody-show - run a complete simulated performance
//!
//! Drives a performer display from a synthetic pose source and lets a crowd
//! of synthetic viewers vote through the shared in-memory store, with show
//! time compressed by `--speed`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{value_parser, Arg, Command};
use ibody_core::{IbodyResult, Phase, ViewerId, NO_ACTION};
use ibody_runtime::{
    init_logging, PerformanceConfig, PerformerDisplay, SyntheticAudience, SyntheticPoses, ViewerClient,
};
use ibody_store::MemoryStore;
use ibody_time::{Clock, ManualClock, SystemWallClock, WallClock};
use ibody_voice::{PacedSpeaker, SilentSpeaker, Speaker};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Show time per display frame
const FRAME: Duration = Duration::from_millis(33);

#[tokio::main]
async fn main() {
    let matches = Command::new("ibody-show")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run a simulated Invisible Body performance")
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Performance configuration (TOML)"),
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .default_value("10")
                .value_parser(value_parser!(f64))
                .help("Time compression factor"),
        )
        .arg(
            Arg::new("viewers")
                .long("viewers")
                .default_value("12")
                .value_parser(value_parser!(usize))
                .help("Number of synthetic viewers"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("42")
                .value_parser(value_parser!(u64))
                .help("Random seed for reproducibility"),
        )
        .get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => match PerformanceConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                std::process::exit(2);
            }
        },
        None => PerformanceConfig::default(),
    };
    init_logging(&config.logging);

    let speed = matches.get_one::<f64>("speed").copied().unwrap_or(10.0).max(0.1);
    let viewers = matches.get_one::<usize>("viewers").copied().unwrap_or(12);
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);

    if let Err(e) = run(config, speed, viewers, seed).await {
        tracing::error!(error = %e, "show aborted");
        std::process::exit(1);
    }
}

async fn run(config: PerformanceConfig, speed: f64, viewers: usize, seed: u64) -> IbodyResult<()> {
    let clock = ManualClock::with_wall_epoch(SystemWallClock.unix_millis());
    let store = MemoryStore::with_wall_clock(clock.clone()).with_seed(seed);

    let speaker: Box<dyn Speaker + Send> = if config.voice.enabled {
        Box::new(PacedSpeaker::new(clock.clone()))
    } else {
        Box::new(SilentSpeaker)
    };
    let mut performer = PerformerDisplay::new(&config, store.clone(), speaker)?;

    let mut crowd = Vec::with_capacity(viewers);
    for i in 0..viewers as u64 {
        let viewer_id = ViewerId::generate(&mut StdRng::seed_from_u64(seed.wrapping_add(i)));
        let client = ViewerClient::new(store.clone(), clock.clone(), config.session_id(), viewer_id)?
            .with_num_actions(config.schedule.num_actions);
        let audience = SyntheticAudience::new(seed ^ (i + 1));
        crowd.push(tokio::spawn(run_viewer(client, audience, speed)));
    }

    tracing::info!(
        session = %config.session_id,
        viewers,
        speed,
        "show starting"
    );

    let mut poses = SyntheticPoses::new(seed);
    let mut ticker = tokio::time::interval(FRAME.div_f64(speed).max(Duration::from_micros(100)));

    performer.frame(clock.now(), &[]);
    performer.start(clock.now());

    let mut shown = (Phase::Waiting, NO_ACTION);
    loop {
        ticker.tick().await;
        let now = clock.advance(FRAME);
        let frame = performer.frame(now, &poses.sample(now));

        let current = (frame.state.phase, frame.state.current_action);
        if current != shown {
            shown = current;
            tracing::info!(hud = %frame.hud.hints.join(" | "), "{}", frame.hud.status.join("  "));
            if let Some(overlay) = &frame.hud.overlay {
                tracing::info!(action = overlay.action, "{}", overlay.headline);
            }
        }
        if frame.state.phase == Phase::Done {
            break;
        }
    }

    for task in &crowd {
        task.abort();
    }

    let stats = performer.stats();
    tracing::info!(
        frames = stats.frames,
        publishes = stats.publishes,
        votes = performer.labels().total_votes(),
        "show finished"
    );
    for (action, label) in performer.top_labels() {
        tracing::info!(action, label, "top audience label");
    }
    Ok(())
}

/// One synthetic viewer: waits for each training action and votes once
async fn run_viewer(
    mut client: ViewerClient<MemoryStore, ManualClock>,
    mut audience: SyntheticAudience,
    speed: f64,
) {
    let mut voted_for = NO_ACTION;

    while client.next_change().await.is_some() {
        let Some(state) = client.observed().cloned() else {
            continue;
        };
        if state.phase.is_terminal() {
            break;
        }
        if !state.accepts_votes() || state.current_action == voted_for {
            continue;
        }

        tokio::time::sleep(audience.think_time().div_f64(speed)).await;
        client.poll();

        let action = client.observed().map_or(NO_ACTION, |s| s.current_action);
        match client.submit(&audience.draft_for(action)) {
            Ok(receipt) => tracing::debug!(viewer = %client.viewer_id(), key = %receipt.key, "voted"),
            Err(e) => tracing::debug!(viewer = %client.viewer_id(), reason = %e, "vote not recorded"),
        }
        voted_for = state.current_action.max(action);
    }
}
