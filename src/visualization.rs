// src/visualization.rs - Heatmap and 3D series views over the trajectory store
use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::Serialize;

use crate::mediapipe_bridge::Handedness;
use crate::trajectory::{Track, TrackId, TrajectoryStore};
use crate::{Error, FrameIndex, Result};

pub const DEFAULT_HEATMAP_ROWS: usize = 20;
pub const DEFAULT_HEATMAP_COLS: usize = 40;

/// Fixed-resolution visit counts over normalized (x, y) screen space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapGrid {
    rows: usize,
    cols: usize,
    counts: Vec<u32>,
}

impl HeatmapGrid {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::Config(format!(
                "heatmap grid needs at least one row and column, got {rows}x{cols}"
            )));
        }
        Ok(Self {
            rows,
            cols,
            counts: vec![0; rows * cols],
        })
    }

    /// Bins every observed point of every track.
    pub fn from_store(store: &TrajectoryStore, rows: usize, cols: usize) -> Result<Self> {
        let mut grid = Self::new(rows, cols)?;
        for track in store.all_tracks() {
            for point in track.points() {
                grid.record(&point.position);
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(floor(y * rows), floor(x * cols))`, clamped to the grid.
    pub fn bucket(&self, position: &Vector3<f64>) -> (usize, usize) {
        (
            Self::quantize(position.y, self.rows),
            Self::quantize(position.x, self.cols),
        )
    }

    fn quantize(value: f64, buckets: usize) -> usize {
        // NaN falls through the clamp and casts to 0.
        (value * buckets as f64)
            .floor()
            .clamp(0.0, (buckets - 1) as f64) as usize
    }

    pub fn record(&mut self, position: &Vector3<f64>) {
        let (row, col) = self.bucket(position);
        self.counts[row * self.cols + col] += 1;
    }

    pub fn count(&self, row: usize, col: usize) -> u32 {
        if row < self.rows && col < self.cols {
            self.counts[row * self.cols + col]
        } else {
            0
        }
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Fraction of buckets visited at least once.
    pub fn coverage(&self) -> f64 {
        let visited = self.counts.iter().filter(|&&c| c > 0).count();
        visited as f64 / self.counts.len() as f64
    }

    /// Count scaled by the busiest bucket, in [0, 1].
    pub fn intensity(&self, row: usize, col: usize) -> f64 {
        match self.max_count() {
            0 => 0.0,
            max => self.count(row, col) as f64 / max as f64,
        }
    }

    /// Visited buckets only, keyed by `(row, col)`.
    pub fn occupied(&self) -> BTreeMap<(usize, usize), u32> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, &c)| ((i / self.cols, i % self.cols), c))
            .collect()
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.counts[row * self.cols..(row + 1) * self.cols]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub frame: FrameIndex,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub handedness: Handedness,
}

/// A track's raw observed points in frame order, ready for a 3D plotter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySeries {
    pub track_id: TrackId,
    pub initial_handedness: Handedness,
    pub points: Vec<SeriesPoint>,
}

impl TrajectorySeries {
    pub fn from_track(track: &Track) -> Self {
        Self {
            track_id: track.id(),
            initial_handedness: track.initial_handedness(),
            points: track
                .points()
                .iter()
                .map(|p| SeriesPoint {
                    frame: p.frame,
                    x: p.position.x,
                    y: p.position.y,
                    z: p.position.z,
                    handedness: track.handedness_at(p.frame),
                })
                .collect(),
        }
    }

    pub fn start(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }
}

pub fn series(store: &TrajectoryStore) -> Vec<TrajectorySeries> {
    store
        .all_tracks()
        .iter()
        .filter(|t| t.observed_frames() > 0)
        .map(TrajectorySeries::from_track)
        .collect()
}
