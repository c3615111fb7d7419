// src/artifact/mod.rs
pub mod local;
pub mod manifest;

pub use local::LocalArtifactStore;
pub use manifest::Manifest;

use crate::error::{CleaningError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fmt,
    path::{Path, PathBuf},
};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*$").expect("valid regex"));

static ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(latest|v(\d+))$").expect("valid regex"));

/// Segments that would collide with a store's version directories.
static VERSION_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").expect("valid regex"));

/// Which version of an artifact a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alias {
    Latest,
    Version(u32),
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alias::Latest => write!(f, "latest"),
            Alias::Version(v) => write!(f, "v{}", v),
        }
    }
}

/// Validate an artifact name: `/`-separated segments of `[A-Za-z0-9_.-]`,
/// none of them `.`, `..` or a version label like `v7`.
pub fn validate_name(name: &str) -> Result<()> {
    let ok = NAME_RE.is_match(name)
        && name
            .split('/')
            .all(|seg| seg != "." && seg != ".." && !VERSION_SEGMENT_RE.is_match(seg));
    if ok {
        Ok(())
    } else {
        Err(CleaningError::Configuration(format!(
            "invalid artifact name `{}`",
            name
        )))
    }
}

/// A parsed `name[:alias]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub alias: Alias,
}

impl ArtifactRef {
    pub fn parse(qualified: &str) -> Result<Self> {
        let (name, alias) = match qualified.rsplit_once(':') {
            Some((name, alias)) => {
                let caps = ALIAS_RE.captures(alias).ok_or_else(|| {
                    CleaningError::Configuration(format!(
                        "invalid alias `{}` in `{}` (expected `latest` or `v<N>`)",
                        alias, qualified
                    ))
                })?;
                let alias = match caps.get(2) {
                    Some(v) => Alias::Version(v.as_str().parse().map_err(|_| {
                        CleaningError::Configuration(format!("version out of range in `{}`", qualified))
                    })?),
                    None => Alias::Latest,
                };
                (name, alias)
            }
            None => (qualified, Alias::Latest),
        };
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            alias,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.alias)
    }
}

/// What a new artifact version is published as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
}

/// Handle to a concrete, immutable artifact version and its local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    pub path: PathBuf,
}

impl ArtifactVersion {
    pub fn qualified_name(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}

/// Versioned blob store consumed by the pipeline. Both calls block.
pub trait ArtifactStore {
    /// Resolve `qualified_name` to a concrete version whose `path` is a
    /// readable local file.
    fn fetch(&self, qualified_name: &str) -> Result<ArtifactVersion>;

    /// Store `local_path` as a brand new version of `spec.name`.
    fn publish(&self, spec: &ArtifactSpec, local_path: &Path) -> Result<ArtifactVersion>;
}
