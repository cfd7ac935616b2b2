// tests/scenarios.rs - End-to-end tracking scenarios
mod common;

use common::{frame, hand, linear_track};
use hand_tracker::mediapipe_bridge::RecordedFrames;
use hand_tracker::statistics::{self, Metric};
use hand_tracker::{Config, Handedness, TrackingAnomaly, TrackingSession};

fn run(frames: Vec<hand_tracker::mediapipe_bridge::FrameRecord>) -> TrackingSession {
    let mut session = TrackingSession::new("scenario", Config::default()).unwrap();
    session
        .process_source(&mut RecordedFrames::new(frames))
        .unwrap();
    session
}

#[test]
fn test_single_hand_linear_motion() {
    let session = run(linear_track(0..10, 0.1));
    let analysis = session.analyze().unwrap();

    assert_eq!(session.store().len(), 1);
    assert_eq!(analysis.statistics.len(), 1);

    let stats = &analysis.statistics[0];
    assert!((stats.total_distance.value().unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(stats.detection_rate, 1.0);
    assert_eq!(stats.observed_frames, 10);
}

#[test]
fn test_two_hands_never_crossing() {
    let frames = (0..20)
        .map(|f| {
            let t = f as f64 * 0.01;
            frame(
                f,
                vec![
                    hand(Handedness::Right, 0.92, [0.7 + t, 0.5 - t, 0.0]),
                    hand(Handedness::Left, 0.88, [0.1 + t, 0.4 + t, 0.0]),
                ],
            )
        })
        .collect();
    let session = run(frames);
    let analysis = session.analyze().unwrap();

    assert_eq!(session.store().len(), 2);
    let [a, b] = analysis.statistics.as_slice() else {
        panic!("expected two tracks, got {}", analysis.statistics.len());
    };
    assert_eq!(a.detection_rate, 1.0);
    assert_eq!(b.detection_rate, 1.0);
    assert_ne!(a.handedness, b.handedness);
    assert!(a.position_range.is_disjoint(&b.position_range));

    for track in session.store().all_tracks() {
        assert_eq!(track.handedness_history().len(), 1);
    }
}

#[test]
fn test_gap_keeps_one_track() {
    let mut frames: Vec<_> = (0..5)
        .map(|f| frame(f, vec![hand(Handedness::Left, 0.9, [0.2, 0.2, 0.0])]))
        .collect();
    frames.extend((5..10).map(|f| frame(f, vec![])));
    frames.extend((10..15).map(|f| frame(f, vec![hand(Handedness::Left, 0.9, [0.5, 0.6, 0.0])])));

    let session = run(frames);
    let analysis = session.analyze().unwrap();

    assert_eq!(session.store().len(), 1);
    let stats = &analysis.statistics[0];
    assert!((stats.detection_rate - 10.0 / 15.0).abs() < 1e-12);

    // Stationary on both segments; the 4 -> 10 jump is counted once.
    let jump = (0.3_f64.powi(2) + 0.4_f64.powi(2)).sqrt();
    assert!((stats.total_distance.value().unwrap() - jump).abs() < 1e-12);

    let steps = statistics::steps(session.store().all_tracks()[0].points(), 1.0 / 30.0);
    assert_eq!(steps.len(), 9);
    assert_eq!(steps.iter().filter(|s| s.distance > 0.0).count(), 1);
    assert_eq!(analysis.video.frames_processed, 15);
}

#[test]
fn test_five_detections_drop_least_confident() {
    let confidences = [0.81, 0.93, 0.52, 0.77, 0.64];
    let hands = confidences
        .iter()
        .enumerate()
        .map(|(i, &c)| hand(Handedness::Right, c, [0.1 + 0.2 * i as f64, 0.5, 0.0]))
        .collect();

    let mut session = TrackingSession::new("stress", Config::default()).unwrap();
    let assignment = session.process_frame(&frame(0, hands)).unwrap();

    assert_eq!(assignment.assigned_count(), 4);
    assert_eq!(assignment.assignments[2], None);
    assert_eq!(session.store().len(), 4);

    assert_eq!(session.anomalies().len(), 1);
    match &session.anomalies()[0] {
        TrackingAnomaly::TrackCapacityExceeded {
            frame,
            index,
            confidence,
            ..
        } => {
            assert_eq!((*frame, *index), (0, 2));
            assert_eq!(*confidence, 0.52);
        }
        other => panic!("unexpected anomaly {other}"),
    }
}

#[test]
fn test_single_point_track() {
    let session = run(vec![frame(3, vec![hand(Handedness::Left, 0.7, [0.4, 0.3, -0.05])])]);
    let analysis = session.analyze().unwrap();
    let stats = &analysis.statistics[0];

    assert!(matches!(stats.speed, Metric::InsufficientData { observed_points: 1, required: 2 }));
    assert!(matches!(stats.acceleration, Metric::InsufficientData { .. }));
    assert!(!stats.total_distance.is_available());
    assert_eq!(stats.position_range.min, stats.position_range.max);
    assert!((stats.center_of_mass.x - 0.4).abs() < 1e-12);
    assert!((stats.center_of_mass.z + 0.05).abs() < 1e-12);
}

#[test]
fn test_malformed_detection_does_not_stop_processing() {
    let mut short = hand(Handedness::Left, 0.9, [0.3, 0.3, 0.0]);
    short.landmarks.truncate(5);
    let mut frames = linear_track(0..4, 0.05);
    frames[2].hands.push(short);

    let session = run(frames);
    assert_eq!(session.store().len(), 1);
    assert_eq!(session.store().total_points(), 4);
    assert!(matches!(
        session.anomalies(),
        [TrackingAnomaly::MalformedDetection { frame: 2, index: 1, .. }]
    ));
}

#[test]
fn test_handedness_flip_is_recorded_on_the_track() {
    let frames = (0..6)
        .map(|f| {
            let label = if f < 3 { Handedness::Left } else { Handedness::Right };
            frame(f, vec![hand(label, 0.9, [0.3 + 0.01 * f as f64, 0.5, 0.0])])
        })
        .collect();
    let session = run(frames);

    assert_eq!(session.store().len(), 1);
    let track = &session.store().all_tracks()[0];
    assert_eq!(
        track.handedness_history(),
        &[(0, Handedness::Left), (3, Handedness::Right)]
    );
    assert_eq!(track.initial_handedness(), Handedness::Left);
    assert_eq!(track.current_handedness(), Handedness::Right);

    let series = session.analyze().unwrap().series;
    assert_eq!(series[0].points[2].handedness, Handedness::Left);
    assert_eq!(series[0].points[3].handedness, Handedness::Right);
}

#[test]
fn test_repeated_runs_are_identical() {
    let frames: Vec<_> = (0..30)
        .map(|f| {
            let t = f as f64 / 30.0;
            let mut hands = vec![
                hand(Handedness::Left, 0.9, [0.2 + 0.1 * t, 0.5, 0.0]),
                hand(Handedness::Right, 0.85, [0.8 - 0.1 * t, 0.5, 0.0]),
            ];
            if f % 7 == 0 {
                hands.push(hand(Handedness::Right, 0.6, [0.5, 0.9 - t, 0.0]));
            }
            if f % 2 == 1 {
                hands.reverse();
            }
            frame(f, hands)
        })
        .collect();

    let assign = |frames: &[hand_tracker::mediapipe_bridge::FrameRecord]| {
        let mut session = TrackingSession::new("det", Config::default()).unwrap();
        frames
            .iter()
            .map(|r| session.process_frame(r).unwrap().assignments)
            .collect::<Vec<_>>()
    };

    assert_eq!(assign(&frames), assign(&frames));
}

#[test]
fn test_statistics_are_pure() {
    let session = run(linear_track(0..12, 0.03));
    let track = &session.store().all_tracks()[0];

    let first = statistics::compute(track, 1.0 / 30.0).unwrap();
    let second = statistics::compute(track, 1.0 / 30.0).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_expiry_is_opt_in() {
    let mut frames: Vec<_> = (0..3)
        .map(|f| frame(f, vec![hand(Handedness::Left, 0.9, [0.2, 0.2, 0.0])]))
        .collect();
    frames.push(frame(50, vec![hand(Handedness::Left, 0.9, [0.2, 0.2, 0.0])]));

    let default_run = run(frames.clone());
    assert_eq!(default_run.store().len(), 1);

    let mut config = Config::default();
    config.tracker.max_unobserved_frames = Some(10);
    let mut session = TrackingSession::new("expiry", config).unwrap();
    session.process_source(&mut RecordedFrames::new(frames)).unwrap();
    assert_eq!(session.store().len(), 2);
    assert_eq!(session.store().total_points(), 4);
}
