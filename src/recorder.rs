use anyhow::{Context, Result};
use log::{debug, info};
use potts_common::{OutputConfig, OutputFormat, Snapshot, SnapshotKind};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of the per-step diagnostic log.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepRecord {
    pub step: u64,
    pub temperature: f64,
    pub current_energy: f64,
    pub best_energy: f64,
}

/// Receives the run's log rows and snapshots.
pub trait Recorder {
    /// Called once per step, before the move is proposed.
    fn record_step(&mut self, record: &StepRecord) -> Result<()>;
    /// Current state at a save interval.
    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<()>;
    /// Best state of the run, after the last step.
    fn save_final(&mut self, snapshot: Snapshot) -> Result<()>;
    /// Flushes anything buffered. Called once at the end of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    pub steps: Vec<StepRecord>,
    pub snapshots: Vec<Snapshot>,
    pub final_snapshot: Option<Snapshot>,
    pub finished: bool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps at which periodic snapshots were taken.
    pub fn snapshot_steps(&self) -> Vec<u64> {
        self.snapshots
            .iter()
            .filter_map(|s| match s.kind {
                SnapshotKind::Periodic(step) => Some(step),
                SnapshotKind::Final => None,
            })
            .collect()
    }
}

impl Recorder for MemoryRecorder {
    fn record_step(&mut self, record: &StepRecord) -> Result<()> {
        self.steps.push(*record);
        Ok(())
    }

    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        self.snapshots.push(snapshot);
        Ok(())
    }

    fn save_final(&mut self, snapshot: Snapshot) -> Result<()> {
        self.final_snapshot = Some(snapshot);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes the summary log as CSV and snapshots as matrix files or one archive.
pub struct FileRecorder {
    directory: PathBuf,
    base_filename: String,
    format: OutputFormat,
    summary: csv::Writer<File>,
    collected: Vec<Snapshot>,
}

impl FileRecorder {
    /// Creates the output directory and the summary log.
    pub fn create(output: &OutputConfig) -> Result<Self> {
        let directory = PathBuf::from(&output.directory);
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create output directory: {}", directory.display()))?;

        let summary_path = directory.join(&output.summary_filename);
        let mut file = File::create(&summary_path)
            .with_context(|| format!("Failed to create summary file: {}", summary_path.display()))?;
        writeln!(file, "# RUNNING MONTE_CARLO MODULE##")?;
        writeln!(file, "# Cellular Potts model, Metropolis sampling")?;
        let mut summary = csv::Writer::from_writer(file);
        summary.write_record(["cur_step", "T", "cur_energy", "opt_energy"])?;
        info!("Writing step log to {}", summary_path.display());

        Ok(Self {
            directory,
            base_filename: output.base_filename.clone(),
            format: output.format,
            summary,
            collected: Vec::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_pair(&self, prefix: &str, snapshot: &Snapshot) -> Result<()> {
        let spins_path = self.directory.join(format!("{}_spins.csv", prefix));
        let types_path = self.directory.join(format!("{}_types.csv", prefix));
        write_matrix(&spins_path, &snapshot.spin_rows())?;
        write_matrix(&types_path, &snapshot.type_rows())?;
        debug!("Saved {} and {}", spins_path.display(), types_path.display());
        Ok(())
    }

    fn write_archive(&self) -> Result<()> {
        let snapshots = &self.collected;
        match self.format {
            OutputFormat::Csv => {}
            OutputFormat::Json => {
                let filename = self.directory.join(format!("{}_snapshots.json", self.base_filename));
                let file = File::create(&filename)
                    .with_context(|| format!("Failed to create snapshot file: {}", filename.display()))?;
                serde_json::to_writer(BufWriter::new(file), snapshots)
                    .context("Failed to serialize snapshots to JSON")?;
                info!("All snapshots saved to {}", filename.display());
            }
            OutputFormat::Bincode => {
                let filename = self.directory.join(format!("{}_snapshots.bin", self.base_filename));
                let file = File::create(&filename)
                    .with_context(|| format!("Failed to create snapshot file: {}", filename.display()))?;
                bincode::serialize_into(BufWriter::new(file), snapshots)
                    .context("Failed to serialize snapshots to bincode")?;
                info!("All snapshots saved to {} (binary format)", filename.display());
            }
            OutputFormat::Messagepack => {
                let filename = self.directory.join(format!("{}_snapshots.msgpack", self.base_filename));
                let file = File::create(&filename)
                    .with_context(|| format!("Failed to create snapshot file: {}", filename.display()))?;
                let mut writer = BufWriter::new(file);
                rmp_serde::encode::write(&mut writer, snapshots)
                    .context("Failed to serialize snapshots to MessagePack")?;
                writer.flush()?;
                info!("All snapshots saved to {} (MessagePack format)", filename.display());
            }
        }
        Ok(())
    }
}

impl Recorder for FileRecorder {
    fn record_step(&mut self, record: &StepRecord) -> Result<()> {
        self.summary.write_record([
            record.step.to_string(),
            format!("{:.6}", record.temperature),
            format!("{:.6}", record.current_energy),
            format!("{:.6}", record.best_energy),
        ])?;
        Ok(())
    }

    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        let kind = snapshot.kind;
        let step = match kind {
            SnapshotKind::Periodic(step) => step,
            SnapshotKind::Final => return self.save_final(snapshot),
        };
        self.summary.flush()?;
        match self.format {
            OutputFormat::Csv => self.write_pair(&format!("mcs_{}", step), &snapshot)?,
            _ => self.collected.push(snapshot),
        }
        Ok(())
    }

    fn save_final(&mut self, snapshot: Snapshot) -> Result<()> {
        match self.format {
            OutputFormat::Csv => self.write_pair("final_optimal", &snapshot)?,
            _ => self.collected.push(snapshot),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.summary.flush()?;
        self.write_archive()
    }
}

/// Writes rows as space-delimited text, one line per row.
pub fn write_matrix<T: Display>(path: &Path, rows: &[&[T]]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create matrix file: {}", path.display()))?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
