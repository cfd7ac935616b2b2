// src/trajectory.rs - Append-only per-track position history
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::mediapipe_bridge::Handedness;
use crate::{Error, FrameIndex, Result};

/// Stable identity of a reconstructed hand track within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(u32);

impl TrackId {
    pub fn get(&self) -> u32 {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrist position of a track on one observed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub frame: FrameIndex,
    pub position: Vector3<f64>,
    pub landmark_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    handedness_history: Vec<(FrameIndex, Handedness)>,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Points ordered by strictly increasing frame.
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Handedness changes as `(frame, handedness)`, oldest first. The first
    /// entry is the handedness the track was created with.
    pub fn handedness_history(&self) -> &[(FrameIndex, Handedness)] {
        &self.handedness_history
    }

    pub fn initial_handedness(&self) -> Handedness {
        self.handedness_history[0].1
    }

    pub fn current_handedness(&self) -> Handedness {
        self.handedness_history[self.handedness_history.len() - 1].1
    }

    /// Handedness in effect at `frame`. Frames before the track existed
    /// report the initial handedness.
    pub fn handedness_at(&self, frame: FrameIndex) -> Handedness {
        let idx = self.handedness_history.partition_point(|(f, _)| *f <= frame);
        if idx == 0 {
            self.initial_handedness()
        } else {
            self.handedness_history[idx - 1].1
        }
    }

    pub fn first_frame(&self) -> Option<FrameIndex> {
        self.points.first().map(|p| p.frame)
    }

    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.points.last().map(|p| p.frame)
    }

    pub fn observed_frames(&self) -> usize {
        self.points.len()
    }
}

/// Canonical owner of every track in a session. Tracks are created and
/// appended to, never removed or rewritten.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryStore {
    tracks: Vec<Track>,
    expected_frames: usize,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes each new track's point buffer for a video of roughly
    /// `frames` frames.
    pub fn with_expected_frames(frames: usize) -> Self {
        Self {
            tracks: Vec::new(),
            expected_frames: frames,
        }
    }

    pub fn create_track(&mut self, handedness: Handedness, frame: FrameIndex) -> TrackId {
        let id = TrackId(self.tracks.len() as u32);
        self.tracks.push(Track {
            id,
            handedness_history: vec![(frame, handedness)],
            points: Vec::with_capacity(self.expected_frames),
        });
        id
    }

    pub fn append_point(&mut self, id: TrackId, point: TrackPoint) -> Result<()> {
        let track = self.track_mut(id)?;
        if let Some(last_frame) = track.last_frame() {
            if point.frame <= last_frame {
                return Err(Error::OutOfOrderFrame {
                    frame: point.frame,
                    last_frame,
                });
            }
        }
        track.points.push(point);
        Ok(())
    }

    /// Records the handedness observed for a track at `frame`. Only changes
    /// are kept; repeating the current handedness is a no-op.
    pub fn record_handedness(
        &mut self,
        id: TrackId,
        frame: FrameIndex,
        handedness: Handedness,
    ) -> Result<()> {
        let track = self.track_mut(id)?;
        let (last_frame, current) = track.handedness_history[track.handedness_history.len() - 1];
        if frame < last_frame {
            return Err(Error::OutOfOrderFrame { frame, last_frame });
        }
        if current == handedness {
            return Ok(());
        }
        if frame == last_frame && track.handedness_history.len() > 1 {
            track.handedness_history.pop();
            if track.current_handedness() == handedness {
                return Ok(());
            }
        } else if frame == last_frame {
            // Still on the creation frame: the newer label replaces it.
            track.handedness_history[0].1 = handedness;
            return Ok(());
        }
        track.handedness_history.push((frame, handedness));
        Ok(())
    }

    pub fn get_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.index())
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.get_track(id).ok_or(Error::UnknownTrack(id))
    }

    pub fn all_tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.tracks.iter().map(|t| t.points.len()).sum()
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks.get_mut(id.index()).ok_or(Error::UnknownTrack(id))
    }
}
