//! # Hand Tracker
//!
//! Reconstructs stable per-hand trajectories from a per-frame stream of hand
//! landmark detections and derives movement statistics and visualization data
//! from them.
//!
//! ```text
//! detector output ──▶ mediapipe_bridge ──▶ tracking ──▶ trajectory
//!                                                          │
//!                          ┌───────────────────────────────┤
//!                          ▼                               ▼
//!                     statistics                     visualization
//!                          │                               │
//!                          └──────────▶ report / data ◀────┘
//! ```
//!
//! Frames must be fed in strictly increasing order. Each video gets its own
//! [`session::TrackingSession`]; nothing is shared between sessions.

pub mod config;
pub mod data;
pub mod mediapipe_bridge;
pub mod report;
pub mod session;
pub mod statistics;
pub mod tracking;
pub mod trajectory;
pub mod visualization;

pub use config::Config;
pub use mediapipe_bridge::{HandDetection, Handedness, RawHandRecord};
pub use session::{SessionAnalysis, TrackingSession};
pub use statistics::{Metric, MovementStatistics};
pub use tracking::{HandTracker, TrackerConfig, TrackingAnomaly};
pub use trajectory::{Track, TrackId, TrackPoint, TrajectoryStore};
pub use visualization::{HeatmapGrid, TrajectorySeries};

/// Frame index as produced by the video decode pipeline.
pub type FrameIndex = u64;

/// Result type alias for the hand tracker
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the hand tracker
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed detection {index} at frame {frame}: {reason}")]
    MalformedDetection {
        frame: FrameIndex,
        index: usize,
        reason: String,
    },

    #[error("Out of order frame {frame}: last recorded frame is {last_frame}")]
    OutOfOrderFrame {
        frame: FrameIndex,
        last_frame: FrameIndex,
    },

    #[error("Insufficient data: {observed_points} observed points, {required} required")]
    InsufficientData {
        observed_points: usize,
        required: usize,
    },

    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
