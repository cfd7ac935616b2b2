// src/session.rs - Per-video pipeline from detector output to analysis
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::mediapipe_bridge::{adapt_frame, DetectionSource, FrameRecord};
use crate::statistics::{self, MovementStatistics, SessionSummary};
use crate::tracking::{FrameAssignment, HandTracker, TrackingAnomaly};
use crate::trajectory::TrajectoryStore;
use crate::visualization::{self, HeatmapGrid, TrajectorySeries};
use crate::{FrameIndex, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub name: String,
    pub frame_rate: f64,
    /// Frame records fed to the session, including empty ones
    pub frames_processed: u64,
    /// Seconds from the start of the video to the end of the last processed frame
    pub duration_secs: f64,
}

/// Everything derived from a session's trajectories at one point in time.
#[derive(Debug, Clone)]
pub struct SessionAnalysis {
    pub video: VideoInfo,
    pub statistics: Vec<MovementStatistics>,
    pub summary: SessionSummary,
    pub heatmap: HeatmapGrid,
    pub series: Vec<TrajectorySeries>,
    pub anomalies: Vec<TrackingAnomaly>,
}

/// One video's tracker, store and anomaly log. Sessions share nothing, so
/// independent videos can be processed on separate threads.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    name: String,
    config: Config,
    tracker: HandTracker,
    store: TrajectoryStore,
    anomalies: Vec<TrackingAnomaly>,
    frames_processed: u64,
    last_frame: Option<FrameIndex>,
}

impl TrackingSession {
    pub fn new(name: impl Into<String>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            tracker: HandTracker::new(config.tracker.clone()),
            config,
            store: TrajectoryStore::new(),
            anomalies: Vec::new(),
            frames_processed: 0,
            last_frame: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    pub fn anomalies(&self) -> &[TrackingAnomaly] {
        &self.anomalies
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Validates and resolves one frame of detector output.
    ///
    /// Malformed records and capacity overflow are logged and recorded as
    /// anomalies; only an out-of-order frame fails. Anomaly indices refer to
    /// positions in `record.hands`, while `assignments` follows the order of
    /// the valid detections.
    pub fn process_frame(&mut self, record: &FrameRecord) -> Result<FrameAssignment> {
        let adapted = adapt_frame(record);

        let mut anomalies = Vec::with_capacity(adapted.rejected.len());
        for err in adapted.rejected {
            anomalies.push(TrackingAnomaly::try_from(err)?);
        }

        let mut assignment =
            self.tracker
                .process_frame(record.frame, &adapted.detections, &mut self.store)?;

        for anomaly in &mut assignment.anomalies {
            remap_index(anomaly, &adapted.source_indices);
        }
        anomalies.append(&mut assignment.anomalies);

        for anomaly in &anomalies {
            if matches!(anomaly, TrackingAnomaly::MalformedDetection { .. }) {
                warn!("{}", anomaly);
            } else {
                debug!("{}", anomaly);
            }
        }
        self.anomalies.extend(anomalies.iter().cloned());
        assignment.anomalies = anomalies;

        self.frames_processed += 1;
        self.last_frame = Some(record.frame);
        Ok(assignment)
    }

    /// Drains a detection source. Returns the number of frames processed.
    /// Frames already processed stay in the session if the source fails.
    pub fn process_source<S: DetectionSource + ?Sized>(&mut self, source: &mut S) -> Result<u64> {
        let start = self.frames_processed;
        while let Some(record) = source.next_frame()? {
            self.process_frame(&record)?;
        }
        let processed = self.frames_processed - start;
        info!(
            "Session {}: processed {} frames, {} tracks, {} anomalies",
            self.name,
            processed,
            self.store.len(),
            self.anomalies.len()
        );
        Ok(processed)
    }

    /// Computes statistics and visualization data from the trajectories so
    /// far. Valid at any point; no finalize step is needed.
    pub fn analyze(&self) -> Result<SessionAnalysis> {
        let analysis = &self.config.analysis;
        let frame_duration = analysis.frame_duration();

        Ok(SessionAnalysis {
            video: VideoInfo {
                name: self.name.clone(),
                frame_rate: analysis.frame_rate,
                frames_processed: self.frames_processed,
                duration_secs: self
                    .last_frame
                    .map_or(0.0, |f| (f + 1) as f64 * frame_duration),
            },
            statistics: statistics::compute_all(&self.store, frame_duration)?,
            summary: statistics::summarize(&self.store),
            heatmap: HeatmapGrid::from_store(&self.store, analysis.heatmap_rows, analysis.heatmap_cols)?,
            series: visualization::series(&self.store),
            anomalies: self.anomalies.clone(),
        })
    }
}

fn remap_index(anomaly: &mut TrackingAnomaly, source_indices: &[usize]) {
    match anomaly {
        TrackingAnomaly::MalformedDetection { index, .. }
        | TrackingAnomaly::TrackCapacityExceeded { index, .. } => {
            if let Some(&source) = source_indices.get(*index) {
                *index = source;
            }
        }
    }
}
