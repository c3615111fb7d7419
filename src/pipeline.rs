use crate::artifact::{ArtifactSpec, ArtifactStore, ArtifactVersion};
use crate::error::Result;
use crate::history::RunContext;
use crate::process::{clean, read_csv_file, write_csv_file, CleanParams};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

/// File name of the cleaned CSV, both on disk and inside the published artifact.
pub const OUTPUT_FILE_NAME: &str = "clean_sample.csv";

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub input: ArtifactVersion,
    pub rows_in: usize,
    pub rows_out: usize,
    pub output: ArtifactVersion,
}

/// Fetch → clean → publish, for one input artifact.
///
/// The cleaned CSV lives in a private temp directory that is removed on every
/// exit path, including a failed publish.
#[instrument(level = "info", skip_all, fields(run_id = %ctx.run_id(), input = input_artifact))]
pub fn run(
    ctx: &mut RunContext,
    store: &dyn ArtifactStore,
    input_artifact: &str,
    output: &ArtifactSpec,
    params: &CleanParams,
    work_dir: Option<&Path>,
) -> Result<RunSummary> {
    let start = Instant::now();
    params.range()?;

    info!("Downloading artifact");
    let input = store.fetch(input_artifact)?;
    ctx.use_artifact(&input.qualified_name())?;

    info!(artifact = %input.qualified_name(), path = %input.path.display(), "Reading input CSV");
    let raw = read_csv_file(&input.path)?;

    info!("Dropping outliers and converting {} to dates", params.date_column);
    let cleaned = clean(&raw, params)?;

    let tmp = match work_dir {
        Some(dir) => tempfile::Builder::new().prefix("basic_cleaning-").tempdir_in(dir)?,
        None => tempfile::Builder::new().prefix("basic_cleaning-").tempdir()?,
    };
    let out_path = tmp.path().join(OUTPUT_FILE_NAME);
    info!(path = %out_path.display(), "Saving new CSV");
    let bytes = write_csv_file(&cleaned, &out_path)?;

    info!(bytes, "Creating artifact");
    let version = store.publish(output, &out_path)?;
    ctx.log_artifact(&version)?;

    info!("Removing temporary output");
    tmp.close()?;

    info!(
        artifact = %version.qualified_name(),
        rows_in = raw.num_rows(),
        rows_out = cleaned.num_rows(),
        elapsed = ?start.elapsed(),
        "run complete"
    );
    Ok(RunSummary {
        input,
        rows_in: raw.num_rows(),
        rows_out: cleaned.num_rows(),
        output: version,
    })
}
