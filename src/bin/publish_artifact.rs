use anyhow::{Context, Result};
use basic_cleaning::artifact::{ArtifactSpec, ArtifactStore, LocalArtifactStore};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line args: store root, local file, artifact name/type/description
#[derive(Parser, Debug)]
struct Args {
    /// Root directory of the local artifact store
    #[arg(long = "artifact_root", env = "ARTIFACT_ROOT", default_value = "artifacts")]
    artifact_root: PathBuf,

    /// File to publish
    #[arg(long)]
    file: PathBuf,

    /// Artifact name; defaults to the file name
    #[arg(long)]
    name: Option<String>,

    /// Artifact type, e.g. `raw_data`
    #[arg(long = "type")]
    artifact_type: String,

    /// Free-text description
    #[arg(long, default_value = "")]
    description: String,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .init();

    let args = Args::parse();
    let name = match &args.name {
        Some(n) => n.clone(),
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a name from {}", args.file.display()))?,
    };

    let store = LocalArtifactStore::new(&args.artifact_root).with_context(|| {
        format!(
            "opening artifact store at {}",
            args.artifact_root.display()
        )
    })?;
    let spec = ArtifactSpec {
        name,
        artifact_type: args.artifact_type.clone(),
        description: args.description.clone(),
    };
    let version = store
        .publish(&spec, &args.file)
        .with_context(|| format!("publishing {}", args.file.display()))?;

    info!(artifact = %version.qualified_name(), path = %version.path.display(), "published");
    println!("{}", version.qualified_name());
    Ok(())
}
