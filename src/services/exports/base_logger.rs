use std::fs::{create_dir_all, metadata, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use chrono::Local;
use csv::{Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// One row of `metadata.csv`: a summary of the last reporting interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub episode: usize,
    pub mean_score: f64,
    pub epsilon: f64,
    pub total_elapsed_secs: f64,
    pub interval_elapsed_secs: f64,
}

/// Writes interval summaries of a training run to
/// `<base_dir>/run<timestamp>/metadata.csv`.
pub struct TrainingLogger {
    writer: Writer<File>,
    start_time: Instant,
    last_log_time: Instant,
    run_dir: PathBuf,
}

impl TrainingLogger {
    /// Creates the run folder under `base_dir` and opens the csv in append
    /// mode; the header is only written into an empty file.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let run_dir = base_dir.as_ref().join(format!("run{timestamp}"));
        create_dir_all(&run_dir)?;

        let csv_path = run_dir.join("metadata.csv");
        let file = OpenOptions::new().create(true).append(true).open(&csv_path)?;
        let is_empty = metadata(&csv_path).map(|m| m.len() == 0).unwrap_or(true);
        let writer = WriterBuilder::new().has_headers(is_empty).from_writer(file);

        let now = Instant::now();
        Ok(Self { writer, start_time: now, last_log_time: now, run_dir })
    }

    pub fn log(&mut self, episode: usize, mean_score: f64, epsilon: f64) -> Result<TrainingRecord> {
        let now = Instant::now();
        let record = TrainingRecord {
            episode,
            mean_score,
            epsilon,
            total_elapsed_secs: now.duration_since(self.start_time).as_secs_f64(),
            interval_elapsed_secs: now.duration_since(self.last_log_time).as_secs_f64(),
        };
        self.last_log_time = now;
        self.writer.serialize(&record)?;
        self.writer.flush()?;
        Ok(record)
    }

    pub fn run_dir(&self) -> &Path { &self.run_dir }

    pub fn csv_path(&self) -> PathBuf { self.run_dir.join("metadata.csv") }
}
