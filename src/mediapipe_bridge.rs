// src/mediapipe_bridge.rs - Normalizes external landmark detector output
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, FrameIndex, Result};

/// Landmarks per hand in the MediaPipe hand model.
pub const LANDMARK_COUNT: usize = 21;

/// Index of the wrist in the MediaPipe hand landmark model.
pub const WRIST: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hand exactly as the detector reported it, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHandRecord {
    pub handedness: Handedness,
    pub confidence: f64,
    pub landmarks: Vec<[f64; 3]>,
}

/// Everything the detector produced for one decoded frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: FrameIndex,
    #[serde(default)]
    pub hands: Vec<RawHandRecord>,
}

/// A validated hand detection.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    pub frame: FrameIndex,
    pub handedness: Handedness,
    pub landmarks: Vec<Vector3<f64>>,
    pub confidence: f64,
}

impl HandDetection {
    /// Validates a raw record. `index` is the record's position in the
    /// detector output and only used for diagnostics.
    pub fn from_raw(frame: FrameIndex, index: usize, raw: &RawHandRecord) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedDetection { frame, index, reason };

        if raw.landmarks.len() != LANDMARK_COUNT {
            return Err(malformed(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT,
                raw.landmarks.len()
            )));
        }
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(malformed(format!("confidence {} outside [0, 1]", raw.confidence)));
        }
        if let Some(i) = raw
            .landmarks
            .iter()
            .position(|lm| lm.iter().any(|c| !c.is_finite()))
        {
            return Err(malformed(format!("landmark {i} has a non-finite coordinate")));
        }

        Ok(Self {
            frame,
            handedness: raw.handedness,
            landmarks: raw
                .landmarks
                .iter()
                .map(|lm| Vector3::new(lm[0], lm[1], lm[2]))
                .collect(),
            confidence: raw.confidence,
        })
    }

    pub fn wrist(&self) -> Vector3<f64> {
        self.landmarks[WRIST]
    }

    pub fn landmark_count(&self) -> usize {
        self.landmarks.len()
    }
}

/// A frame's raw records split into valid detections and rejected ones.
#[derive(Debug, Default)]
pub struct AdaptedFrame {
    pub detections: Vec<HandDetection>,
    /// Position of each detection in the detector output.
    pub source_indices: Vec<usize>,
    pub rejected: Vec<Error>,
}

/// Validates every record of a frame. Rejections never abort the frame.
pub fn adapt_frame(record: &FrameRecord) -> AdaptedFrame {
    let mut adapted = AdaptedFrame {
        detections: Vec::with_capacity(record.hands.len()),
        source_indices: Vec::with_capacity(record.hands.len()),
        rejected: Vec::new(),
    };

    for (index, raw) in record.hands.iter().enumerate() {
        match HandDetection::from_raw(record.frame, index, raw) {
            Ok(detection) => {
                adapted.detections.push(detection);
                adapted.source_indices.push(index);
            }
            Err(e) => adapted.rejected.push(e),
        }
    }

    adapted
}

/// Anything that can hand over detector output one frame at a time.
pub trait DetectionSource {
    /// Returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameRecord>>;
}

/// Detector output already held in memory, replayed in order.
#[derive(Debug, Clone, Default)]
pub struct RecordedFrames {
    frames: VecDeque<FrameRecord>,
}

impl RecordedFrames {
    pub fn new(frames: impl IntoIterator<Item = FrameRecord>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl DetectionSource for RecordedFrames {
    fn next_frame(&mut self) -> Result<Option<FrameRecord>> {
        Ok(self.frames.pop_front())
    }
}

/// Reads detector output stored as JSON lines, one [`FrameRecord`] per line.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Reading detections from {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> DetectionSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameRecord>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}
