// tests/properties.rs - Property checks for the store and the resolver
mod common;

use hand_tracker::mediapipe_bridge::HandDetection;
use hand_tracker::{Error, HandTracker, Handedness, TrackPoint, TrajectoryStore};
use nalgebra::Vector3;
use proptest::prelude::*;

fn handedness() -> impl Strategy<Value = Handedness> {
    prop_oneof![Just(Handedness::Left), Just(Handedness::Right)]
}

fn raw_hand() -> impl Strategy<Value = (Handedness, f64, f64, f64)> {
    (handedness(), 0.0..=1.0f64, 0.0..1.0f64, 0.0..1.0f64)
}

proptest! {
    #[test]
    fn appends_stay_strictly_increasing(frames in prop::collection::vec(0u64..50, 1..40)) {
        let mut store = TrajectoryStore::new();
        let id = store.create_track(Handedness::Left, frames[0]);
        let mut last: Option<u64> = None;

        for frame in frames {
            let point = TrackPoint {
                frame,
                position: Vector3::new(0.5, 0.5, 0.0),
                landmark_count: 21,
            };
            let result = store.append_point(id, point);
            match last {
                Some(prev) if frame <= prev => {
                    let is_out_of_order = matches!(result, Err(Error::OutOfOrderFrame { .. }));
                    prop_assert!(is_out_of_order);
                }
                _ => {
                    prop_assert!(result.is_ok());
                    last = Some(frame);
                }
            }
        }

        let points = store.track(id).unwrap().points();
        prop_assert!(points.windows(2).all(|w| w[0].frame < w[1].frame));
    }

    #[test]
    fn assignments_never_exceed_capacity(
        frames in prop::collection::vec(prop::collection::vec(raw_hand(), 0..8), 1..25)
    ) {
        let mut tracker = HandTracker::default();
        let mut store = TrajectoryStore::new();

        for (i, hands) in frames.iter().enumerate() {
            let frame = i as u64;
            let detections: Vec<HandDetection> = hands
                .iter()
                .map(|&(handedness, confidence, x, y)| {
                    let raw = common::hand(handedness, confidence, [x, y, 0.0]);
                    HandDetection::from_raw(frame, 0, &raw).unwrap()
                })
                .collect();

            let result = tracker.process_frame(frame, &detections, &mut store).unwrap();
            prop_assert!(result.assigned_count() <= detections.len().min(4));

            let mut ids: Vec<_> = result.assignments.iter().flatten().collect();
            let assigned = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), assigned);
        }

        prop_assert!(store.len() <= 4);
        for track in store.all_tracks() {
            prop_assert!(track.points().windows(2).all(|w| w[0].frame < w[1].frame));
        }
    }
}
