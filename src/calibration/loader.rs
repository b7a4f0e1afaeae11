//! Profile loading with graceful fallback.
//!
//! Sources are tried in order; the first one that yields a valid profile
//! wins. When every source fails the default profile is used and the
//! failure is only logged.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{CalibrationProfile, ProfileError};

/// Somewhere a calibration profile can be read from
#[cfg_attr(test, mockall::automock)]
pub trait ProfileSource {
    /// Label used in logs and in [`LoadedProfile::source`]
    fn name(&self) -> String;

    fn fetch(&self) -> Result<CalibrationProfile, ProfileError>;
}

/// Profile document on disk. `.yaml`/`.yml` files are read as YAML,
/// everything else as JSON.
#[derive(Debug, Clone)]
pub struct FileProfileSource {
    path: PathBuf,
}

impl FileProfileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    }
}

impl ProfileSource for FileProfileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<CalibrationProfile, ProfileError> {
        let document = fs::read_to_string(&self.path).map_err(|source| ProfileError::Io {
            path: self.name(),
            source,
        })?;
        if self.is_yaml() {
            CalibrationProfile::from_yaml_str(&document)
        } else {
            CalibrationProfile::from_json_str(&document)
        }
    }
}

/// A profile together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProfile {
    pub profile: CalibrationProfile,
    /// Source name, or `"default"` for the built-in profile
    pub source: String,
}

pub struct ProfileLoader {
    sources: Vec<Box<dyn ProfileSource>>,
}

impl ProfileLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Loader over file paths, tried in the given order
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .fold(Self::new(), |loader, path| {
                loader.with_source(Box::new(FileProfileSource::new(path)))
            })
    }

    pub fn with_source(mut self, source: Box<dyn ProfileSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// First valid profile, or the default. Never fails.
    pub fn load(&self) -> LoadedProfile {
        for source in &self.sources {
            let name = source.name();
            match source.fetch() {
                Ok(profile) => {
                    info!("📐 Calibration profile loaded from {}: {}", name, profile);
                    return LoadedProfile {
                        profile,
                        source: name,
                    };
                }
                Err(e) => {
                    warn!("Calibration source {} unusable: {}", name, e);
                }
            }
        }

        let profile = CalibrationProfile::default();
        info!("📐 Using default calibration profile: {}", profile);
        LoadedProfile {
            profile,
            source: "default".to_string(),
        }
    }
}

impl Default for ProfileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationProfile {
    /// Read a profile file, falling back to the default on any failure.
    pub fn load_or_default(path: impl Into<PathBuf>) -> CalibrationProfile {
        ProfileLoader::new()
            .with_source(Box::new(FileProfileSource::new(path)))
            .load()
            .profile
    }
}
