//! Persistence for the shield marker.
//!
//! The controller only sees the [`MarkerStore`] trait. [`FileMarkerStore`]
//! keeps the marker as a one-line text file; every call opens, uses and
//! closes the file within the call. [`InMemoryMarkerStore`] backs tests.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use loadshield_core::marker::{MarkerState, ShieldMarker};

#[derive(Debug, thiserror::Error)]
pub enum MarkerIoError {
    #[error("failed to read marker {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write marker {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove marker {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load, save and clear the single shield marker.
pub trait MarkerStore {
    /// Current marker state. Unparseable content is `MarkerState::Invalid`,
    /// not an error.
    fn load(&self) -> Result<MarkerState, MarkerIoError>;

    /// Replace any existing marker.
    fn save(&self, marker: &ShieldMarker) -> Result<(), MarkerIoError>;

    /// Remove the marker. Removing an absent marker succeeds.
    fn clear(&self) -> Result<(), MarkerIoError>;
}

// ---------------------------------------------------------------------------
// FileMarkerStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarkerStore for FileMarkerStore {
    fn load(&self) -> Result<MarkerState, MarkerIoError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MarkerState::Absent),
            Err(source) => {
                return Err(MarkerIoError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // Non-UTF-8 bytes simply fail to parse below.
        let contents = String::from_utf8_lossy(&bytes);
        let state = MarkerState::from_contents(&contents);
        if let MarkerState::Invalid(raw) = &state {
            tracing::warn!(
                path = %self.path.display(),
                raw = %raw,
                "Shield marker content is invalid",
            );
        }
        Ok(state)
    }

    fn save(&self, marker: &ShieldMarker) -> Result<(), MarkerIoError> {
        std::fs::write(&self.path, marker.to_contents()).map_err(|source| MarkerIoError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            path = %self.path.display(),
            enabled_at = %marker.to_contents(),
            "Shield marker recorded",
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), MarkerIoError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Shield marker cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MarkerIoError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryMarkerStore
// ---------------------------------------------------------------------------

/// Holds raw marker content in memory, mirroring what the file would hold.
#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    contents: Mutex<Option<String>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary raw content, valid or not.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    pub fn with_marker(marker: ShieldMarker) -> Self {
        Self::with_contents(marker.to_contents())
    }

    /// Raw stored content, `None` when no marker exists.
    pub fn contents(&self) -> Option<String> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MarkerStore for InMemoryMarkerStore {
    fn load(&self) -> Result<MarkerState, MarkerIoError> {
        Ok(match self.slot().as_deref() {
            None => MarkerState::Absent,
            Some(raw) => MarkerState::from_contents(raw),
        })
    }

    fn save(&self, marker: &ShieldMarker) -> Result<(), MarkerIoError> {
        *self.slot() = Some(marker.to_contents());
        Ok(())
    }

    fn clear(&self) -> Result<(), MarkerIoError> {
        *self.slot() = None;
        Ok(())
    }
}
