// src/history/mod.rs
pub mod state;

pub use state::RunEvent;

use crate::artifact::ArtifactVersion;
use crate::error::{CleaningError, Result};
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "config.json";

/// Disambiguates runs started by one process within the same microsecond.
static RUN_COUNTER: AtomicU32 = AtomicU32::new(0);

fn history_err(context: &str, e: impl std::fmt::Display) -> CleaningError {
    CleaningError::History(format!("{}: {}", context, e))
}

fn event_schema() -> Schema {
    Schema::new(vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("job_type", DataType::Utf8, false),
        Field::new("seq", DataType::UInt32, false),
        Field::new("event", DataType::Utf8, false),
        Field::new("detail", DataType::Utf8, true),
        Field::new(
            "event_time",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ])
}

/// One row of a run's event log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub run_id: String,
    pub job_type: String,
    pub seq: u32,
    pub event: RunEvent,
    pub detail: Option<String>,
    pub event_time: DateTime<Utc>,
}

/// Explicit handle for one pipeline run.
///
/// `init` records `started` and writes the run configuration; `finish` or
/// `fail` closes it. A context dropped without either (early return, panic)
/// records `failed` on its way out. Events are single-row Parquet files
/// under `<runs_root>/<run_id>/`.
pub struct RunContext {
    run_id: String,
    job_type: String,
    run_dir: PathBuf,
    seq: u32,
    closed: bool,
}

impl RunContext {
    pub fn init(
        runs_root: impl Into<PathBuf>,
        job_type: &str,
        config: &impl Serialize,
    ) -> Result<Self> {
        let runs_root = runs_root.into();
        fs::create_dir_all(&runs_root)?;

        let run_id = format!(
            "{}-{}-{}-{}",
            job_type,
            Utc::now().format("%Y%m%dT%H%M%S%.6f"),
            std::process::id(),
            RUN_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let run_dir = runs_root.join(&run_id);
        fs::create_dir(&run_dir)
            .map_err(|e| history_err(&format!("creating run dir {}", run_dir.display()), e))?;

        let config_json =
            serde_json::to_vec_pretty(config).map_err(|e| history_err("serializing config", e))?;
        fs::write(run_dir.join(CONFIG_FILE), config_json)?;

        let mut ctx = Self {
            run_id,
            job_type: job_type.to_string(),
            run_dir,
            seq: 0,
            closed: false,
        };
        ctx.record(RunEvent::Started, None)?;
        info!(run_id = %ctx.run_id, job_type, "run started");
        Ok(ctx)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Record that this run consumed `qualified_name`.
    pub fn use_artifact(&mut self, qualified_name: &str) -> Result<()> {
        self.record(RunEvent::UsedArtifact, Some(qualified_name))
    }

    /// Record that this run produced `version`.
    pub fn log_artifact(&mut self, version: &ArtifactVersion) -> Result<()> {
        self.record(RunEvent::LoggedArtifact, Some(&version.qualified_name()))
    }

    pub fn finish(mut self) -> Result<()> {
        self.closed = true;
        self.record(RunEvent::Finished, None)?;
        info!(run_id = %self.run_id, "run finished");
        Ok(())
    }

    pub fn fail(mut self, reason: &str) -> Result<()> {
        self.closed = true;
        self.record(RunEvent::Failed, Some(reason))?;
        warn!(run_id = %self.run_id, reason, "run failed");
        Ok(())
    }

    /// Write a single-row Parquet file `<seq>_<event>_<ts>.parquet`.
    fn record(&mut self, event: RunEvent, detail: Option<&str>) -> Result<()> {
        let now = Utc::now();
        let ts = now.timestamp_micros();
        let seq = self.seq;
        self.seq += 1;

        let path = self
            .run_dir
            .join(format!("{:04}_{}_{}.parquet", seq, event.as_str(), ts));
        let schema = Arc::new(event_schema());
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![self.run_id.as_str()])),
            Arc::new(StringArray::from(vec![self.job_type.as_str()])),
            Arc::new(UInt32Array::from(vec![seq])),
            Arc::new(StringArray::from(vec![event.as_str()])),
            Arc::new(StringArray::from(vec![detail])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)
            .map_err(|e| history_err("building event batch", e))?;

        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .map_err(|e| history_err("creating event writer", e))?;
        writer
            .write(&batch)
            .map_err(|e| history_err("writing event", e))?;
        writer
            .close()
            .map_err(|e| history_err("closing event writer", e))?;
        Ok(())
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.record(RunEvent::Failed, Some("run dropped before finish")) {
            warn!(run_id = %self.run_id, error = %e, "could not record run failure");
        }
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| CleaningError::History(format!("event file lacks `{}`", name)))
}

/// Read back every event of the run stored in `run_dir`, ordered by sequence.
pub fn load_events(run_dir: &Path) -> Result<Vec<EventRecord>> {
    let pattern = format!("{}/*.parquet", run_dir.display());
    let mut events = Vec::new();

    for entry in glob(&pattern).map_err(|e| history_err("invalid glob pattern", e))? {
        let path = entry.map_err(|e| history_err("reading run dir", e))?;
        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(|b| b.build())
            .map_err(|e| history_err(&format!("opening {}", path.display()), e))?;

        for batch in reader {
            let batch = batch.map_err(|e| history_err("reading event batch", e))?;
            let run_ids = string_column(&batch, "run_id")?;
            let job_types = string_column(&batch, "job_type")?;
            let kinds = string_column(&batch, "event")?;
            let details = string_column(&batch, "detail")?;
            let seqs = batch
                .column_by_name("seq")
                .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
                .ok_or_else(|| CleaningError::History("event file lacks `seq`".into()))?;
            let times = batch
                .column_by_name("event_time")
                .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
                .ok_or_else(|| CleaningError::History("event file lacks `event_time`".into()))?;

            for i in 0..batch.num_rows() {
                let event = RunEvent::from_str(kinds.value(i)).ok_or_else(|| {
                    CleaningError::History(format!("unknown event `{}`", kinds.value(i)))
                })?;
                let event_time = DateTime::<Utc>::from_timestamp_micros(times.value(i))
                    .ok_or_else(|| CleaningError::History("event time out of range".into()))?;
                events.push(EventRecord {
                    run_id: run_ids.value(i).to_string(),
                    job_type: job_types.value(i).to_string(),
                    seq: seqs.value(i),
                    event,
                    detail: details
                        .is_valid(i)
                        .then(|| details.value(i).to_string()),
                    event_time,
                });
            }
        }
    }

    events.sort_by_key(|e| e.seq);
    Ok(events)
}
