use super::{
    manifest::{file_sha256, Manifest},
    validate_name, Alias, ArtifactRef, ArtifactSpec, ArtifactStore, ArtifactVersion,
};
use crate::error::{CleaningError, Result};
use chrono::Utc;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Artifact store on the local filesystem.
///
/// Layout: `<root>/artifacts/<name>/v<N>/{<file>, manifest.json}`. A version
/// directory is assembled in a hidden staging dir and renamed into place, so a
/// half-written version is never visible to `fetch`.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("artifacts"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.root.join("artifacts"), |dir, seg| dir.join(seg))
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    /// All committed versions of `name`, ascending. Unknown names have none.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.artifact_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(v) = file_name
                .to_str()
                .and_then(|s| s.strip_prefix('v'))
                .and_then(|s| s.parse::<u32>().ok())
            else {
                continue;
            };
            versions.push(v);
        }
        versions.sort_unstable();
        Ok(versions)
    }

    pub fn manifest(&self, name: &str, version: u32) -> Result<Manifest> {
        Manifest::read(&self.version_dir(name, version))
    }

    /// Resolve a reference to its committed version number.
    pub fn resolve(&self, r: &ArtifactRef) -> Result<u32> {
        let versions = self.versions(&r.name)?;
        let found = match r.alias {
            Alias::Latest => versions.last().copied(),
            Alias::Version(v) => versions.binary_search(&v).ok().map(|_| v),
        };
        found.ok_or_else(|| CleaningError::ArtifactNotFound(r.to_string()))
    }
}

impl ArtifactStore for LocalArtifactStore {
    #[instrument(level = "debug", skip(self))]
    fn fetch(&self, qualified_name: &str) -> Result<ArtifactVersion> {
        let r = ArtifactRef::parse(qualified_name)?;
        let not_found = |reason: String| {
            CleaningError::ArtifactNotFound(format!("{} ({})", qualified_name, reason))
        };

        let version = self.resolve(&r)?;
        let manifest = self
            .manifest(&r.name, version)
            .map_err(|e| not_found(format!("v{} manifest unreadable: {}", version, e)))?;
        let path = self.version_dir(&r.name, version).join(&manifest.file_name);
        if !path.is_file() {
            return Err(not_found(format!(
                "v{} payload {} missing",
                version,
                path.display()
            )));
        }
        debug!(path = %path.display(), version, "resolved artifact");
        Ok(ArtifactVersion {
            name: r.name,
            version,
            path,
        })
    }

    #[instrument(level = "debug", skip(self, spec), fields(name = %spec.name))]
    fn publish(&self, spec: &ArtifactSpec, local_path: &Path) -> Result<ArtifactVersion> {
        let rejected = |e: CleaningError| CleaningError::publish(&spec.name, e);
        let io_failed = |e: std::io::Error| CleaningError::publish(&spec.name, e);

        validate_name(&spec.name).map_err(rejected)?;
        if spec.artifact_type.trim().is_empty() {
            return Err(CleaningError::publish(&spec.name, "artifact type is empty"));
        }
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|_| local_path.is_file())
            .ok_or_else(|| {
                CleaningError::publish(
                    &spec.name,
                    format!("{} is not a readable file", local_path.display()),
                )
            })?
            .to_string();

        let versions = self.versions(&spec.name).map_err(rejected)?;
        if let Some(&latest) = versions.last() {
            let existing = self.manifest(&spec.name, latest).map_err(rejected)?;
            if existing.artifact_type != spec.artifact_type {
                return Err(CleaningError::publish(
                    &spec.name,
                    format!(
                        "existing versions have type `{}`, refusing type `{}`",
                        existing.artifact_type, spec.artifact_type
                    ),
                ));
            }
        }
        let version = versions.last().map_or(0, |v| v + 1);

        let artifact_dir = self.artifact_dir(&spec.name);
        fs::create_dir_all(&artifact_dir).map_err(io_failed)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&artifact_dir)
            .map_err(io_failed)?;

        let staged_file = staging.path().join(&file_name);
        let size_bytes = fs::copy(local_path, &staged_file).map_err(io_failed)?;
        let manifest = Manifest {
            name: spec.name.clone(),
            version,
            artifact_type: spec.artifact_type.clone(),
            description: spec.description.clone(),
            file_name: file_name.clone(),
            size_bytes,
            sha256: file_sha256(&staged_file).map_err(rejected)?,
            created_at: Utc::now(),
        };
        manifest.write(staging.path()).map_err(rejected)?;

        let final_dir = self.version_dir(&spec.name, version);
        if final_dir.exists() {
            return Err(CleaningError::publish(
                &spec.name,
                format!("version v{} already exists", version),
            ));
        }
        // `staging` still owns the old path; its drop finds nothing left to delete.
        fs::rename(staging.path(), &final_dir).map_err(io_failed)?;

        info!(
            artifact = %format!("{}:v{}", spec.name, version),
            bytes = size_bytes,
            sha256 = %manifest.sha256,
            "published artifact"
        );
        Ok(ArtifactVersion {
            name: spec.name.clone(),
            version,
            path: final_dir.join(&file_name),
        })
    }
}
