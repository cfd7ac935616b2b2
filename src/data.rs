// src/data.rs - Tabular, report and series export for a tracking session
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ExportConfig;
use crate::mediapipe_bridge::Handedness;
use crate::report;
use crate::session::SessionAnalysis;
use crate::trajectory::TrajectoryStore;
use crate::visualization::TrajectorySeries;
use crate::{FrameIndex, Result};

/// One observed (frame, hand) pair. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub frame: FrameIndex,
    /// Handedness of the track at this frame, not at creation
    pub hand: Handedness,
    pub wrist_x: f64,
    pub wrist_y: f64,
    pub wrist_z: f64,
    pub num_landmarks: usize,
}

/// Flattens the store into records ordered by frame, then track id.
pub fn records_from_store(store: &TrajectoryStore) -> Vec<TrajectoryRecord> {
    let mut keyed: Vec<_> = store
        .all_tracks()
        .iter()
        .flat_map(|track| {
            track.points().iter().map(move |p| {
                (
                    (p.frame, track.id()),
                    TrajectoryRecord {
                        frame: p.frame,
                        hand: track.handedness_at(p.frame),
                        wrist_x: p.position.x,
                        wrist_y: p.position.y,
                        wrist_z: p.position.z,
                        num_landmarks: p.landmark_count,
                    },
                )
            })
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, record)| record).collect()
}

/// Writes records with a header row. Floats are written at full precision.
pub fn write_csv<W: Write>(writer: W, records: &[TrajectoryRecord]) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TrajectoryRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Paths written by [`DataExporter::export_session`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportedFiles {
    pub csv: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub series: Option<PathBuf>,
}

/// Writes one session's outputs into `<output_dir>/<session_name>/`.
/// Files of an earlier run with the same name are overwritten.
pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.session_dir()
            .join(format!("{}_hand_data.csv", self.session_name))
    }

    pub fn report_path(&self) -> PathBuf {
        self.session_dir()
            .join(format!("{}_tracking_report.txt", self.session_name))
    }

    pub fn series_path(&self) -> PathBuf {
        self.session_dir()
            .join(format!("{}_trajectories.json", self.session_name))
    }

    fn create(&self, path: &Path) -> Result<BufWriter<File>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(BufWriter::new(File::create(path)?))
    }

    pub fn export_csv(&self, store: &TrajectoryStore) -> Result<PathBuf> {
        let path = self.csv_path();
        let records = records_from_store(store);
        write_csv(self.create(&path)?, &records)?;
        info!("Wrote {} rows to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn export_report(&self, text: &str) -> Result<PathBuf> {
        let path = self.report_path();
        let mut file = self.create(&path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        info!("Wrote report to {}", path.display());
        Ok(path)
    }

    pub fn export_series(&self, series: &[TrajectorySeries]) -> Result<PathBuf> {
        let path = self.series_path();
        let mut file = self.create(&path)?;
        serde_json::to_writer_pretty(&mut file, series)?;
        file.flush()?;
        info!("Wrote {} trajectory series to {}", series.len(), path.display());
        Ok(path)
    }

    /// Writes whichever outputs `export` enables.
    pub fn export_session(
        &self,
        store: &TrajectoryStore,
        analysis: &SessionAnalysis,
        export: &ExportConfig,
    ) -> Result<ExportedFiles> {
        let mut files = ExportedFiles::default();
        if export.write_csv {
            files.csv = Some(self.export_csv(store)?);
        }
        if export.write_report {
            files.report = Some(self.export_report(&report::render_report(analysis))?);
        }
        if export.write_series {
            files.series = Some(self.export_series(&analysis.series)?);
        }
        Ok(files)
    }
}
