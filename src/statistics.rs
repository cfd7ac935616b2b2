// src/statistics.rs - Movement statistics derived from track snapshots
//
// Everything here is a pure function of a track's points. Nothing is cached.
use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::Serialize;

use crate::mediapipe_bridge::Handedness;
use crate::trajectory::{Track, TrackId, TrackPoint, TrajectoryStore};
use crate::{Error, FrameIndex, Result};

/// A derived value that may not be computable for short tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Metric<T> {
    Value(T),
    InsufficientData { observed_points: usize, required: usize },
}

impl<T> Metric<T> {
    fn require(observed_points: usize, required: usize, compute: impl FnOnce() -> T) -> Self {
        if observed_points < required {
            Self::InsufficientData {
                observed_points,
                required,
            }
        } else {
            Self::Value(compute())
        }
    }

    pub fn value(&self) -> Result<&T> {
        match self {
            Self::Value(v) => Ok(v),
            Self::InsufficientData {
                observed_points,
                required,
            } => Err(Error::InsufficientData {
                observed_points: *observed_points,
                required: *required,
            }),
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// Motion between two consecutive observed points of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepKinematics {
    pub from_frame: FrameIndex,
    pub to_frame: FrameIndex,
    pub distance: f64,
    /// Seconds spanned by the step, `frame_gap * frame_duration`.
    pub duration: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceStatistics {
    pub avg_per_step: f64,
    pub max_per_step: f64,
    pub min_per_step: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedStatistics {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccelerationStatistics {
    pub avg: f64,
    pub max_abs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl BoundingBox {
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// True when the boxes share no volume on at least one axis.
    pub fn is_disjoint(&self, other: &BoundingBox) -> bool {
        (0..3).any(|axis| self.max[axis] < other.min[axis] || other.max[axis] < self.min[axis])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementStatistics {
    pub track_id: TrackId,
    pub handedness: Handedness,
    pub observed_frames: usize,
    pub first_frame: FrameIndex,
    pub last_frame: FrameIndex,
    pub total_distance: Metric<f64>,
    pub distance: Metric<DistanceStatistics>,
    pub speed: Metric<SpeedStatistics>,
    pub acceleration: Metric<AccelerationStatistics>,
    pub position_range: BoundingBox,
    pub center_of_mass: Vector3<f64>,
    /// Observed frames over the track's frame span, in [0, 1].
    pub detection_rate: f64,
}

fn check_frame_duration(frame_duration: f64) -> Result<()> {
    if frame_duration.is_finite() && frame_duration > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "frame duration must be a positive number of seconds, got {frame_duration}"
        )))
    }
}

/// Per-step distance and speed between consecutive observed points. Gaps are
/// not interpolated; a step across missed frames is one step whose duration
/// covers the whole gap.
pub fn steps(points: &[TrackPoint], frame_duration: f64) -> Vec<StepKinematics> {
    points
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let distance = (curr.position - prev.position).norm();
            let duration = (curr.frame - prev.frame) as f64 * frame_duration;
            StepKinematics {
                from_frame: prev.frame,
                to_frame: curr.frame,
                distance,
                duration,
                speed: distance / duration,
            }
        })
        .collect()
}

/// Change in speed between consecutive steps, over the time between the
/// steps' midpoints.
pub fn accelerations(steps: &[StepKinematics]) -> Vec<f64> {
    steps
        .windows(2)
        .map(|pair| {
            let dt = (pair[0].duration + pair[1].duration) / 2.0;
            (pair[1].speed - pair[0].speed) / dt
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Computes the movement statistics of one track.
///
/// `frame_duration` is seconds per frame. Tracks with fewer than two points
/// report [`Metric::InsufficientData`] for every motion field; acceleration
/// needs three.
pub fn compute(track: &Track, frame_duration: f64) -> Result<MovementStatistics> {
    check_frame_duration(frame_duration)?;

    let points = track.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(Error::InsufficientData {
            observed_points: 0,
            required: 1,
        });
    };
    let n = points.len();

    let steps = steps(points, frame_duration);
    let distances: Vec<f64> = steps.iter().map(|s| s.distance).collect();
    let speeds: Vec<f64> = steps.iter().map(|s| s.speed).collect();
    let accels = accelerations(&steps);

    let total_distance = Metric::require(n, 2, || distances.iter().sum::<f64>());

    let distance = Metric::require(n, 2, || {
        let (min, max) = min_max(&distances);
        DistanceStatistics {
            avg_per_step: mean(&distances),
            max_per_step: max,
            min_per_step: min,
        }
    });

    let speed = Metric::require(n, 2, || {
        let avg = mean(&speeds);
        let (min, max) = min_max(&speeds);
        let variance = speeds.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / speeds.len() as f64;
        SpeedStatistics {
            avg,
            max,
            min,
            std_dev: variance.sqrt(),
        }
    });

    let acceleration = Metric::require(n, 3, || AccelerationStatistics {
        avg: mean(&accels),
        max_abs: accels.iter().fold(0.0_f64, |m, a| m.max(a.abs())),
    });

    let mut position_range = BoundingBox {
        min: first.position,
        max: first.position,
    };
    let mut sum = Vector3::zeros();
    for p in points {
        position_range.min = position_range.min.inf(&p.position);
        position_range.max = position_range.max.sup(&p.position);
        sum += p.position;
    }

    let span = last.frame - first.frame + 1;

    Ok(MovementStatistics {
        track_id: track.id(),
        handedness: track.current_handedness(),
        observed_frames: n,
        first_frame: first.frame,
        last_frame: last.frame,
        total_distance,
        distance,
        speed,
        acceleration,
        position_range,
        center_of_mass: sum / n as f64,
        detection_rate: n as f64 / span as f64,
    })
}

/// Statistics for every track that has at least one observed point.
pub fn compute_all(store: &TrajectoryStore, frame_duration: f64) -> Result<Vec<MovementStatistics>> {
    check_frame_duration(frame_duration)?;
    store
        .all_tracks()
        .iter()
        .filter(|t| t.observed_frames() > 0)
        .map(|t| compute(t, frame_duration))
        .collect()
}

/// Totals across every track in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub track_count: usize,
    pub total_detections: usize,
    pub unique_frames: usize,
    pub first_frame: Option<FrameIndex>,
    pub last_frame: Option<FrameIndex>,
    /// Frames with at least one observed hand over the observed span.
    pub detection_rate: f64,
    /// Detections keyed by the handedness in effect at each point.
    pub detections_by_hand: BTreeMap<Handedness, usize>,
}

pub fn summarize(store: &TrajectoryStore) -> SessionSummary {
    let mut frames = std::collections::BTreeSet::new();
    let mut detections_by_hand = BTreeMap::new();

    for track in store.all_tracks() {
        for point in track.points() {
            frames.insert(point.frame);
            *detections_by_hand
                .entry(track.handedness_at(point.frame))
                .or_insert(0) += 1;
        }
    }

    let first_frame = frames.first().copied();
    let last_frame = frames.last().copied();
    let detection_rate = match (first_frame, last_frame) {
        (Some(first), Some(last)) => frames.len() as f64 / (last - first + 1) as f64,
        _ => 0.0,
    };

    SessionSummary {
        track_count: store.len(),
        total_detections: store.total_points(),
        unique_frames: frames.len(),
        first_frame,
        last_frame,
        detection_rate,
        detections_by_hand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS30: f64 = 1.0 / 30.0;

    fn track_from(points: &[(FrameIndex, [f64; 3])]) -> Track {
        let mut store = TrajectoryStore::new();
        let id = store.create_track(Handedness::Right, points[0].0);
        for &(frame, [x, y, z]) in points {
            store
                .append_point(
                    id,
                    TrackPoint {
                        frame,
                        position: Vector3::new(x, y, z),
                        landmark_count: 21,
                    },
                )
                .unwrap();
        }
        store.track(id).unwrap().clone()
    }

    #[test]
    fn test_linear_motion() {
        let points: Vec<_> = (0..10).map(|i| (i as FrameIndex, [0.1 * i as f64, 0.0, 0.0])).collect();
        let stats = compute(&track_from(&points), FPS30).unwrap();

        assert!((stats.total_distance.value().unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(stats.detection_rate, 1.0);

        let speed = stats.speed.value().unwrap();
        assert!((speed.avg - 3.0).abs() < 1e-9);
        assert!(speed.std_dev < 1e-9);

        let accel = stats.acceleration.value().unwrap();
        assert!(accel.max_abs < 1e-6);
    }

    #[test]
    fn test_gap_divides_speed_by_elapsed_frames() {
        let track = track_from(&[(0, [0.0, 0.0, 0.0]), (3, [0.3, 0.0, 0.0])]);
        let steps = steps(track.points(), 0.5);

        assert_eq!(steps.len(), 1);
        assert!((steps[0].duration - 1.5).abs() < 1e-12);
        assert!((steps[0].speed - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_single_point_track() {
        let stats = compute(&track_from(&[(4, [0.2, 0.3, -0.1])]), FPS30).unwrap();

        assert!(!stats.speed.is_available());
        assert!(!stats.acceleration.is_available());
        assert!(matches!(
            stats.total_distance.value(),
            Err(Error::InsufficientData { observed_points: 1, required: 2 })
        ));
        assert_eq!(stats.center_of_mass, Vector3::new(0.2, 0.3, -0.1));
        assert_eq!(stats.position_range.extent(), Vector3::zeros());
        assert_eq!(stats.detection_rate, 1.0);
    }

    #[test]
    fn test_two_points_lack_acceleration_only() {
        let stats = compute(&track_from(&[(0, [0.0, 0.0, 0.0]), (1, [0.0, 0.1, 0.0])]), FPS30).unwrap();
        assert!(stats.speed.is_available());
        assert!(matches!(
            stats.acceleration,
            Metric::InsufficientData { observed_points: 2, required: 3 }
        ));
    }

    #[test]
    fn test_acceleration_from_speed_change() {
        // Speeds 1.0 then 3.0 units/s with one-second frames.
        let track = track_from(&[(0, [0.0, 0.0, 0.0]), (1, [1.0, 0.0, 0.0]), (2, [4.0, 0.0, 0.0])]);
        let accel = compute(&track, 1.0).unwrap().acceleration;
        let accel = accel.value().unwrap();
        assert!((accel.avg - 2.0).abs() < 1e-12);
        assert!((accel.max_abs - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_range_and_center() {
        let track = track_from(&[(0, [0.1, 0.8, 0.0]), (1, [0.5, 0.2, -0.2]), (2, [0.3, 0.5, 0.2])]);
        let stats = compute(&track, FPS30).unwrap();

        assert_eq!(stats.position_range.min, Vector3::new(0.1, 0.2, -0.2));
        assert_eq!(stats.position_range.max, Vector3::new(0.5, 0.8, 0.2));
        assert!((stats.center_of_mass - Vector3::new(0.3, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_detection_rate_with_gap() {
        let mut points: Vec<_> = (0..5).map(|f| (f, [0.2, 0.2, 0.0])).collect();
        points.extend((10..15).map(|f| (f, [0.7, 0.7, 0.0])));
        let stats = compute(&track_from(&points), FPS30).unwrap();

        assert!((stats.detection_rate - 10.0 / 15.0).abs() < 1e-12);
        let expected: f64 = Vector3::new(0.5, 0.5, 0.0).norm();
        assert!((stats.total_distance.value().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_frame_duration() {
        let track = track_from(&[(0, [0.0, 0.0, 0.0])]);
        assert!(matches!(compute(&track, 0.0), Err(Error::Config(_))));
        assert!(matches!(compute(&track, f64::NAN), Err(Error::Config(_))));
    }

    #[test]
    fn test_summary_counts_handedness_per_point() {
        let mut store = TrajectoryStore::new();
        let id = store.create_track(Handedness::Left, 0);
        for frame in 0..4 {
            store
                .append_point(
                    id,
                    TrackPoint {
                        frame,
                        position: Vector3::new(0.5, 0.5, 0.0),
                        landmark_count: 21,
                    },
                )
                .unwrap();
        }
        store.record_handedness(id, 2, Handedness::Right).unwrap();

        let summary = summarize(&store);
        assert_eq!(summary.total_detections, 4);
        assert_eq!(summary.unique_frames, 4);
        assert_eq!(summary.detections_by_hand[&Handedness::Left], 2);
        assert_eq!(summary.detections_by_hand[&Handedness::Right], 2);
        assert_eq!(summary.detection_rate, 1.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&TrajectoryStore::new());
        assert_eq!(summary.track_count, 0);
        assert_eq!(summary.first_frame, None);
        assert_eq!(summary.detection_rate, 0.0);
    }
}
