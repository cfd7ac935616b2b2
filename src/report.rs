// src/report.rs - Human-readable session report and ASCII heatmap
use std::fmt::{self, Display, Formatter};

use crate::session::SessionAnalysis;
use crate::statistics::{Metric, MovementStatistics};
use crate::tracking::TrackingAnomaly;
use crate::visualization::HeatmapGrid;

/// Intensity ramp from no activity to the busiest bucket.
pub const HEATMAP_RAMP: [char; 6] = [' ', '·', '░', '▒', '▓', '█'];

const RULE_WIDTH: usize = 50;

pub fn render_report(analysis: &SessionAnalysis) -> String {
    TextReport(analysis).to_string()
}

pub fn render_heatmap(grid: &HeatmapGrid) -> String {
    HeatmapView(grid).to_string()
}

/// Ramp character for a bucket, scaled by the grid's busiest bucket.
pub fn ramp_char(grid: &HeatmapGrid, row: usize, col: usize) -> char {
    let steps = (HEATMAP_RAMP.len() - 1) as f64;
    let idx = (grid.intensity(row, col) * steps).floor() as usize;
    HEATMAP_RAMP[idx.min(HEATMAP_RAMP.len() - 1)]
}

pub struct HeatmapView<'a>(pub &'a HeatmapGrid);

impl Display for HeatmapView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let grid = self.0;
        let border = "─".repeat(grid.cols());
        let last = grid.rows() - 1;

        writeln!(f, "┌{border}┐")?;
        for row in 0..grid.rows() {
            let line: String = (0..grid.cols()).map(|col| ramp_char(grid, row, col)).collect();
            let marker = if row == 0 {
                " ← Top"
            } else if row == last {
                " ← Bottom"
            } else if row == grid.rows() / 2 {
                " ← Center"
            } else {
                ""
            };
            writeln!(f, "│{line}│{marker}")?;
        }
        writeln!(f, "└{border}┘")?;
        write!(f, "Legend:")?;
        for (symbol, label) in HEATMAP_RAMP
            .iter()
            .zip(["none", "minimal", "low", "medium", "high", "very high"])
        {
            write!(f, " '{symbol}' {label}")?;
        }
        writeln!(f)
    }
}

struct TextReport<'a>(&'a SessionAnalysis);

impl Display for TextReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let analysis = self.0;
        let video = &analysis.video;

        writeln!(f, "HAND TRACKING ANALYSIS REPORT")?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "Video: {}", video.name)?;
        writeln!(f, "Duration: {:.2} seconds", video.duration_secs)?;
        writeln!(f, "FPS: {:.2}", video.frame_rate)?;
        writeln!(f, "Frames processed: {}", video.frames_processed)?;
        writeln!(f)?;

        write_summary(f, analysis)?;

        section(f, "MOVEMENT ANALYSIS")?;
        if analysis.statistics.is_empty() {
            writeln!(f, "No hands were tracked.")?;
        }
        for stats in &analysis.statistics {
            write_track(f, stats)?;
        }

        section(f, "HAND MOVEMENT HEATMAP")?;
        write!(f, "{}", HeatmapView(&analysis.heatmap))?;
        writeln!(
            f,
            "Grid resolution: {} x {}, screen coverage {:.1}%",
            analysis.heatmap.cols(),
            analysis.heatmap.rows(),
            analysis.heatmap.coverage() * 100.0
        )?;

        if !analysis.anomalies.is_empty() {
            writeln!(f)?;
            section(f, "ANOMALIES")?;
            for anomaly in &analysis.anomalies {
                writeln!(f, "  - {anomaly}")?;
            }
        }
        Ok(())
    }
}

fn section(f: &mut Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{title}:")?;
    writeln!(f, "{}", "-".repeat(30))
}

fn write_summary(f: &mut Formatter<'_>, analysis: &SessionAnalysis) -> fmt::Result {
    let summary = &analysis.summary;
    section(f, "DETECTION SUMMARY")?;
    writeln!(f, "Tracks: {}", summary.track_count)?;
    writeln!(f, "Total detections: {}", summary.total_detections)?;
    for (hand, count) in &summary.detections_by_hand {
        let share = if summary.total_detections > 0 {
            *count as f64 / summary.total_detections as f64 * 100.0
        } else {
            0.0
        };
        writeln!(f, "  - {hand}: {count} ({share:.1}%)")?;
    }
    match (summary.first_frame, summary.last_frame) {
        (Some(first), Some(last)) => writeln!(
            f,
            "Frames with a hand: {} of {} (frames {}-{}, {:.1}%)",
            summary.unique_frames,
            last - first + 1,
            first,
            last,
            summary.detection_rate * 100.0
        )?,
        _ => writeln!(f, "Frames with a hand: 0")?,
    }

    let malformed = analysis
        .anomalies
        .iter()
        .filter(|a| matches!(a, TrackingAnomaly::MalformedDetection { .. }))
        .count();
    writeln!(
        f,
        "Dropped detections: {} malformed, {} over capacity",
        malformed,
        analysis.anomalies.len() - malformed
    )?;
    writeln!(f)
}

fn write_track(f: &mut Formatter<'_>, stats: &MovementStatistics) -> fmt::Result {
    writeln!(f, "Track {} ({} hand):", stats.track_id, stats.handedness)?;
    writeln!(
        f,
        "  - observed_frames: {} (frames {}-{})",
        stats.observed_frames, stats.first_frame, stats.last_frame
    )?;
    writeln!(f, "  - detection_rate: {:.1}%", stats.detection_rate * 100.0)?;
    writeln!(
        f,
        "  - total_distance: {}",
        metric(&stats.total_distance, |d| format!("{d:.4}"))
    )?;
    writeln!(
        f,
        "  - distance_per_step: {}",
        metric(&stats.distance, |d| format!(
            "avg {:.4}, max {:.4}, min {:.4}",
            d.avg_per_step, d.max_per_step, d.min_per_step
        ))
    )?;
    writeln!(
        f,
        "  - speed (units/sec): {}",
        metric(&stats.speed, |s| format!(
            "avg {:.4}, max {:.4}, min {:.4}, std {:.4}",
            s.avg, s.max, s.min, s.std_dev
        ))
    )?;
    writeln!(
        f,
        "  - acceleration (units/sec^2): {}",
        metric(&stats.acceleration, |a| format!(
            "avg {:.4}, peak {:.4}",
            a.avg, a.max_abs
        ))
    )?;

    let range = &stats.position_range;
    let extent = range.extent();
    writeln!(f, "  - position_range:")?;
    for (axis, i) in [("x", 0), ("y", 1), ("z", 2)] {
        writeln!(
            f,
            "    - {axis}: {:.3} to {:.3} (range {:.3})",
            range.min[i], range.max[i], extent[i]
        )?;
    }
    let c = &stats.center_of_mass;
    writeln!(f, "  - center_of_mass: ({:.4}, {:.4}, {:.4})", c.x, c.y, c.z)?;
    writeln!(f)
}

fn metric<T>(value: &Metric<T>, show: impl FnOnce(&T) -> String) -> String {
    match value {
        Metric::Value(v) => show(v),
        Metric::InsufficientData {
            observed_points,
            required,
        } => format!("insufficient data ({observed_points} of {required} points)"),
    }
}
