//! End-to-end show scenarios

use std::time::Duration;

use ibody_core::{Phase, PerformanceTime, SessionId};
use ibody_store::{SharedStore, StorePath};
use ibody_test::{ShowSimulator, SimConfig, SpeechPolicy};
use ibody_voice::{label_report, SECOND_PART_INTRO};
use proptest::prelude::*;

const SHOW_LIMIT: Duration = Duration::from_secs(600);

fn expected_sequence() -> Vec<(Phase, u32)> {
    let mut seq = vec![(Phase::Waiting, 0)];
    seq.extend((1..=4).map(|a| (Phase::Training, a)));
    seq.push((Phase::Transition, 0));
    seq.extend((1..=4).map(|a| (Phase::Inference, a)));
    seq.push((Phase::Done, 0));
    seq
}

fn intro_count(spoken: &[String]) -> usize {
    spoken.iter().filter(|s| s.as_str() == SECOND_PART_INTRO).count()
}

#[test]
fn test_full_run_scenario() {
    let mut sim = ShowSimulator::new(SimConfig {
        speech: SpeechPolicy::Manual,
        ..Default::default()
    })
    .unwrap();

    sim.start();
    let frame = sim.run_frame(sim.now());
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Training, 1));

    let frame = sim.run_for(Duration::from_millis(119_999)).unwrap();
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Training, 4));

    let frame = sim.step_by(Duration::from_millis(1));
    assert_eq!(sim.now(), PerformanceTime::from_millis(120_000));
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Transition, 0));

    // the intro gates part two however long it takes
    let frame = sim.run_for(Duration::from_secs(10)).unwrap();
    assert_eq!(frame.state.phase, Phase::Transition);
    assert_eq!(intro_count(&sim.report().spoken), 1);

    sim.finish_speech();
    let frame = sim.step();
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Inference, 1));
    let action_one = sim.speaker().spoken().filter(|s| *s == "Action 1").count();
    assert_eq!(action_one, 2);

    let frame = sim.run_for(Duration::from_millis(119_999)).unwrap();
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Inference, 4));

    let frame = sim.step_by(Duration::from_millis(1));
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Done, 0));
}

#[test]
fn test_each_action_announced_once_per_part() {
    let mut sim = ShowSimulator::new(SimConfig::default()).unwrap();
    let report = sim.run_show(SHOW_LIMIT);

    let numbers: Vec<&str> = report
        .spoken
        .iter()
        .map(String::as_str)
        .filter(|s| s.starts_with("Action "))
        .collect();
    assert_eq!(
        numbers,
        vec!["Action 1", "Action 2", "Action 3", "Action 4", "Action 1", "Action 2", "Action 3", "Action 4"]
    );
    assert_eq!(intro_count(&report.spoken), 1);
    assert!(!report.spoken.iter().any(|s| s.starts_with("Top label")));
}

#[test]
fn test_state_published_once_per_change() {
    let mut sim = ShowSimulator::new(SimConfig::default()).unwrap();
    let report = sim.run_show(SHOW_LIMIT);

    let seen: Vec<(Phase, u32)> = report.transitions.iter().map(|t| (t.phase, t.action)).collect();
    assert_eq!(seen, expected_sequence());
    assert_eq!(report.publishes, expected_sequence().len() as u64);

    let path = StorePath::session_state(&SessionId::default()).unwrap();
    let stored = sim.store().get(&path).unwrap().unwrap();
    assert_eq!(stored["phase"], "done");
    assert_eq!(stored["currentAction"], 0);
    assert!(stored["updatedAt"].is_u64());
}

#[test]
fn test_audience_labels_spoken_in_part_two() {
    let mut sim = ShowSimulator::new(SimConfig {
        viewers: 8,
        seed: 7,
        ..Default::default()
    })
    .unwrap();
    let report = sim.run_show(SHOW_LIMIT);

    assert_eq!(report.votes.recorded, 32);
    assert_eq!(report.votes.rejected, 0);
    assert_eq!(report.top_labels.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    let labels = sim.performer().labels();
    for action in 1..=4 {
        let expected = label_report(labels.top(action).unwrap());
        let at = report.spoken.iter().position(|s| *s == expected);
        assert!(at.is_some(), "missing report for action {action}");
    }

    // each report directly follows its inference announcement
    let part_two: Vec<&str> = report
        .spoken
        .iter()
        .skip_while(|s| s.as_str() != SECOND_PART_INTRO)
        .skip(1)
        .map(String::as_str)
        .collect();
    assert_eq!(part_two.len(), 8);
    for pair in part_two.chunks(2) {
        assert!(pair[0].starts_with("Action "));
        assert!(pair[1].starts_with("Top label: "));
    }
}

#[test]
fn test_rejected_votes_never_reach_the_store() {
    let mut sim = ShowSimulator::new(SimConfig {
        viewers: 20,
        seed: 3,
        careful_viewers: false,
        ..Default::default()
    })
    .unwrap();
    sim.start();
    sim.run_for(Duration::from_secs(120));

    let votes = sim.votes().clone();
    assert_eq!(votes.recorded + votes.rejected, 80);
    assert_eq!(votes.failed, 0);
    assert_eq!(u64::from(sim.performer().labels().total_votes()), votes.recorded);
}

#[test]
fn test_store_outage_during_training() {
    let mut sim = ShowSimulator::new(SimConfig {
        viewers: 10,
        ..Default::default()
    })
    .unwrap();
    sim.start();
    sim.run_for(Duration::from_secs(5));

    sim.store().set_online(false);
    let frame = sim.run_for(Duration::from_secs(40)).unwrap();
    assert_eq!((frame.state.phase, frame.state.current_action), (Phase::Training, 2));

    // viewers still believe action 1 is running; those who voted late lost their vote
    let votes = sim.votes().clone();
    assert_eq!(votes.recorded + votes.failed, 10);
    assert!(votes.failed > 0);

    sim.store().set_online(true);
    sim.step();
    let path = StorePath::session_state(&SessionId::default()).unwrap();
    let stored = sim.store().get(&path).unwrap().unwrap();
    assert_eq!(stored["phase"], "training");
    assert_eq!(stored["currentAction"], 2);

    let before = sim.votes().recorded;
    sim.run_for(Duration::from_secs(30));
    assert!(sim.votes().recorded >= before + 10);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_frame_rate_does_not_change_the_show(frame_ms in 200u64..=5_000, seed in any::<u64>()) {
        let mut sim = ShowSimulator::new(SimConfig {
            frame: Duration::from_millis(frame_ms),
            seed,
            ..Default::default()
        })
        .unwrap();
        let report = sim.run_show(SHOW_LIMIT);

        let seen: Vec<(Phase, u32)> = report.transitions.iter().map(|t| (t.phase, t.action)).collect();
        prop_assert_eq!(seen, expected_sequence());
        prop_assert_eq!(intro_count(&report.spoken), 1);
        prop_assert_eq!(report.spoken.iter().filter(|s| s.starts_with("Action ")).count(), 8);
    }
}
