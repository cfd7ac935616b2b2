// tests/common/mod.rs - Shared detector fixtures
#![allow(dead_code)]

use hand_tracker::mediapipe_bridge::{FrameRecord, LANDMARK_COUNT};
use hand_tracker::{Handedness, RawHandRecord};

/// A 21-landmark hand with its wrist at `wrist` and the fingers above it.
pub fn hand(handedness: Handedness, confidence: f64, wrist: [f64; 3]) -> RawHandRecord {
    let landmarks = (0..LANDMARK_COUNT)
        .map(|i| [wrist[0], wrist[1] - 0.005 * i as f64, wrist[2]])
        .collect();
    RawHandRecord {
        handedness,
        confidence,
        landmarks,
    }
}

pub fn frame(frame: u64, hands: Vec<RawHandRecord>) -> FrameRecord {
    FrameRecord { frame, hands }
}

/// One hand moving along x from the origin, seen on every frame in `frames`.
pub fn linear_track(frames: std::ops::Range<u64>, step: f64) -> Vec<FrameRecord> {
    frames
        .map(|f| frame(f, vec![hand(Handedness::Right, 0.9, [step * f as f64, 0.0, 0.0])]))
        .collect()
}
