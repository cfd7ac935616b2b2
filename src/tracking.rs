// src/tracking.rs - Hand identity resolution across frames
use std::cmp::Ordering;
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mediapipe_bridge::{HandDetection, Handedness};
use crate::trajectory::{TrackId, TrackPoint, TrajectoryStore};
use crate::{Error, FrameIndex, Result};

/// The detector never reports more hands than this.
pub const MAX_LIVE_TRACKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Upper bound on simultaneously live tracks (1..=4)
    pub max_tracks: usize,
    /// Retire a track after this many consecutive unobserved frames.
    /// `None` keeps every track alive for the whole video.
    pub max_unobserved_frames: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_tracks: MAX_LIVE_TRACKS,
            max_unobserved_frames: None,
        }
    }
}

/// Non-fatal detection quality problems. Processing continues past all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingAnomaly {
    MalformedDetection {
        frame: FrameIndex,
        index: usize,
        reason: String,
    },
    TrackCapacityExceeded {
        frame: FrameIndex,
        index: usize,
        handedness: Handedness,
        confidence: f64,
    },
}

impl TrackingAnomaly {
    pub fn frame(&self) -> FrameIndex {
        match self {
            Self::MalformedDetection { frame, .. } | Self::TrackCapacityExceeded { frame, .. } => *frame,
        }
    }
}

impl fmt::Display for TrackingAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDetection { frame, index, reason } => {
                write!(f, "frame {frame}: dropped malformed detection {index} ({reason})")
            }
            Self::TrackCapacityExceeded {
                frame,
                index,
                handedness,
                confidence,
            } => write!(
                f,
                "frame {frame}: track capacity exceeded, dropped {handedness} detection {index} (confidence {confidence:.3})"
            ),
        }
    }
}

impl TryFrom<Error> for TrackingAnomaly {
    type Error = Error;

    /// Only malformed detections are recoverable; everything else is handed back.
    fn try_from(err: Error) -> std::result::Result<Self, Error> {
        match err {
            Error::MalformedDetection { frame, index, reason } => {
                Ok(Self::MalformedDetection { frame, index, reason })
            }
            other => Err(other),
        }
    }
}

/// Result of resolving one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAssignment {
    pub frame: FrameIndex,
    /// One entry per input detection, in input order. `None` means dropped.
    pub assignments: Vec<Option<TrackId>>,
    /// Tracks created on this frame.
    pub created: Vec<TrackId>,
    /// Tracks retired on this frame because they went unobserved too long.
    pub retired: Vec<TrackId>,
    pub anomalies: Vec<TrackingAnomaly>,
}

impl FrameAssignment {
    pub fn assigned_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_some()).count()
    }
}

#[derive(Debug, Clone)]
struct LiveTrack {
    id: TrackId,
    last_position: Vector3<f64>,
    last_frame: FrameIndex,
    handedness: Handedness,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    detection: usize,
    cross_handed: bool,
    distance: f64,
    confidence: f64,
}

impl Candidate {
    /// Same-handedness pairs first, then nearest, then the more confident
    /// detection, then input order.
    fn priority(&self, other: &Self) -> Ordering {
        self.cross_handed
            .cmp(&other.cross_handed)
            .then_with(|| self.distance.total_cmp(&other.distance))
            .then_with(|| other.confidence.total_cmp(&self.confidence))
            .then_with(|| self.detection.cmp(&other.detection))
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

/// Assigns each frame's detections to stable track identities using greedy
/// nearest-first matching with a handedness preference.
#[derive(Debug, Clone)]
pub struct HandTracker {
    config: TrackerConfig,
    live: Vec<LiveTrack>,
    last_frame: Option<FrameIndex>,
}

impl HandTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            live: Vec::with_capacity(config.max_tracks),
            config,
            last_frame: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.last_frame
    }

    pub fn live_tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.live.iter().map(|t| t.id)
    }

    /// Resolves one frame and appends the resulting points to `store`.
    ///
    /// Frames must arrive in strictly increasing order; anything else is a
    /// caller bug and fails with [`Error::OutOfOrderFrame`] before any state
    /// is touched.
    pub fn process_frame(
        &mut self,
        frame: FrameIndex,
        detections: &[HandDetection],
        store: &mut TrajectoryStore,
    ) -> Result<FrameAssignment> {
        if let Some(last_frame) = self.last_frame {
            if frame <= last_frame {
                return Err(Error::OutOfOrderFrame { frame, last_frame });
            }
        }

        let mut result = FrameAssignment {
            frame,
            assignments: vec![None; detections.len()],
            created: Vec::new(),
            retired: self.retire_stale(frame),
            anomalies: Vec::new(),
        };

        let mut kept: Vec<usize> = Vec::with_capacity(detections.len());
        for (index, detection) in detections.iter().enumerate() {
            if detection.frame != frame {
                result.anomalies.push(TrackingAnomaly::MalformedDetection {
                    frame,
                    index,
                    reason: format!("detection belongs to frame {}", detection.frame),
                });
            } else {
                kept.push(index);
            }
        }

        if kept.len() > self.config.max_tracks {
            // Stable sort keeps input order among equal confidences.
            kept.sort_by(|&a, &b| detections[b].confidence.total_cmp(&detections[a].confidence));
            for &index in &kept[self.config.max_tracks..] {
                result
                    .anomalies
                    .push(Self::capacity_exceeded(frame, index, &detections[index]));
            }
            warn!(
                "Frame {}: {} detections exceed capacity {}, dropping the least confident",
                frame,
                kept.len(),
                self.config.max_tracks
            );
            kept.truncate(self.config.max_tracks);
            kept.sort_unstable();
        }

        let mut candidates = Vec::with_capacity(self.live.len() * kept.len());
        for (slot, track) in self.live.iter().enumerate() {
            for &index in &kept {
                let detection = &detections[index];
                candidates.push(Candidate {
                    slot,
                    detection: index,
                    cross_handed: detection.handedness != track.handedness,
                    distance: (detection.wrist() - track.last_position).norm(),
                    confidence: detection.confidence,
                });
            }
        }
        candidates.sort_by(Candidate::priority);

        let mut slot_taken = vec![false; self.live.len()];
        let mut matches: Vec<(usize, usize)> = Vec::with_capacity(kept.len());
        for candidate in &candidates {
            if slot_taken[candidate.slot] || result.assignments[candidate.detection].is_some() {
                continue;
            }
            slot_taken[candidate.slot] = true;
            result.assignments[candidate.detection] = Some(self.live[candidate.slot].id);
            matches.push((candidate.slot, candidate.detection));
        }

        for (slot, index) in matches {
            self.observe(slot, &detections[index], store)?;
        }

        for index in kept {
            if result.assignments[index].is_some() {
                continue;
            }
            // kept <= max_tracks and every live slot left free got matched.
            debug_assert!(self.live.len() < self.config.max_tracks);
            let detection = &detections[index];
            let id = store.create_track(detection.handedness, frame);
            debug!("Frame {}: created track {} ({})", frame, id, detection.handedness);
            self.live.push(LiveTrack {
                id,
                last_position: detection.wrist(),
                last_frame: frame,
                handedness: detection.handedness,
            });
            self.observe(self.live.len() - 1, detection, store)?;
            result.assignments[index] = Some(id);
            result.created.push(id);
        }

        self.last_frame = Some(frame);
        Ok(result)
    }

    fn observe(
        &mut self,
        slot: usize,
        detection: &HandDetection,
        store: &mut TrajectoryStore,
    ) -> Result<()> {
        let track = &mut self.live[slot];
        store.append_point(
            track.id,
            TrackPoint {
                frame: detection.frame,
                position: detection.wrist(),
                landmark_count: detection.landmark_count(),
            },
        )?;
        store.record_handedness(track.id, detection.frame, detection.handedness)?;

        if track.handedness != detection.handedness {
            debug!(
                "Frame {}: track {} relabeled {} -> {}",
                detection.frame, track.id, track.handedness, detection.handedness
            );
            track.handedness = detection.handedness;
        }
        track.last_position = detection.wrist();
        track.last_frame = detection.frame;
        Ok(())
    }

    fn retire_stale(&mut self, frame: FrameIndex) -> Vec<TrackId> {
        let Some(limit) = self.config.max_unobserved_frames else {
            return Vec::new();
        };

        let mut retired = Vec::new();
        self.live.retain(|track| {
            let unobserved = frame.saturating_sub(track.last_frame + 1);
            if unobserved > limit {
                debug!(
                    "Frame {}: retiring track {} after {} unobserved frames",
                    frame, track.id, unobserved
                );
                retired.push(track.id);
                false
            } else {
                true
            }
        });
        retired
    }

    fn capacity_exceeded(
        frame: FrameIndex,
        index: usize,
        detection: &HandDetection,
    ) -> TrackingAnomaly {
        TrackingAnomaly::TrackCapacityExceeded {
            frame,
            index,
            handedness: detection.handedness,
            confidence: detection.confidence,
        }
    }
}

impl Default for HandTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
