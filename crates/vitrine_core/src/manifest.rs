use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::color::Color;

/// Declarative runtime configuration shipped alongside a bundle reference.
///
/// A manifest only describes host-side setup (camera pose, clear color); the
/// bundle itself never sees it. Absent fields leave the engine defaults
/// untouched.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub camera_position: Option<[f32; 3]>,
    #[serde(default)]
    pub background_color: Option<Color>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest validation failed: {0}")]
    Invalid(String),
}

pub fn load_manifest_from_path(path: &Path) -> Result<Manifest, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: Manifest = serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Rejects values that would poison the camera. Color validation already
/// happens during deserialization.
pub fn validate_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    if let Some(position) = manifest.camera_position {
        if position.iter().any(|component| !component.is_finite()) {
            return Err(ManifestError::Invalid(format!(
                "cameraPosition has a non-finite component: {:?}",
                position
            )));
        }
    }
    Ok(())
}

/// Polls a manifest file's mtime so the active manifest can be re-applied
/// when edited on disk.
pub struct ManifestWatcher {
    manifest_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl ManifestWatcher {
    pub fn new(manifest_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&manifest_path);
        Self {
            manifest_path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.manifest_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
