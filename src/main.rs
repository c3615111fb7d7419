use anyhow::{Context, Result};
use basic_cleaning::{
    artifact::LocalArtifactStore, config::Args, history::RunContext, pipeline,
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    args.validate().context("invalid configuration")?;
    info!(
        input = %args.input_artifact,
        output = %args.output_artifact,
        min_price = args.min_price,
        max_price = args.max_price,
        "startup"
    );

    // ─── 3) store + run context ──────────────────────────────────────
    let store = LocalArtifactStore::new(&args.artifact_root).with_context(|| {
        format!(
            "opening artifact store at {}",
            args.artifact_root.display()
        )
    })?;
    info!(root = %store.root().display(), "artifact store ready");
    let mut ctx = RunContext::init(store.root().join("runs"), &args.job_type, &args)
        .context("starting run")?;

    // ─── 4) fetch → clean → publish ──────────────────────────────────
    let outcome = pipeline::run(
        &mut ctx,
        &store,
        &args.input_artifact,
        &args.output_spec(),
        &args.clean_params(),
        args.work_dir.as_deref(),
    );

    match outcome {
        Ok(summary) => {
            ctx.finish().context("finalizing run")?;
            info!(
                artifact = %summary.output.qualified_name(),
                rows_out = summary.rows_out,
                "done"
            );
            Ok(())
        }
        Err(e) => {
            error!("basic cleaning failed: {}", e);
            if let Err(history) = ctx.fail(&e.to_string()) {
                error!("could not record run failure: {}", history);
            }
            Err(e).context("basic cleaning failed")
        }
    }
}
