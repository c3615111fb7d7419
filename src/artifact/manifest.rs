use crate::error::{CleaningError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::Path,
};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata stored next to every artifact version's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    pub fn read(version_dir: &Path) -> Result<Self> {
        let path = version_dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CleaningError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("corrupt manifest {}: {}", path.display(), e),
            ))
        })
    }

    pub fn write(&self, version_dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| CleaningError::Io(std::io::Error::other(e)))?;
        fs::write(version_dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }
}

/// Streaming SHA-256 of a file, hex encoded.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_json_uses_type_key() -> Result<()> {
        let dir = tempdir()?;
        let m = Manifest {
            name: "clean_sample.csv".into(),
            version: 0,
            artifact_type: "clean_sample".into(),
            description: "Data with outliers removed".into(),
            file_name: "clean_sample.csv".into(),
            size_bytes: 12,
            sha256: "00".into(),
            created_at: Utc::now(),
        };
        m.write(dir.path())?;

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE))?;
        assert!(raw.contains("\"type\": \"clean_sample\""));
        assert_eq!(Manifest::read(dir.path())?, m);
        Ok(())
    }

    #[test]
    fn sha256_of_known_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc")?;
        assert_eq!(
            file_sha256(&path)?,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        Ok(())
    }
}
