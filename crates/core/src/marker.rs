//! The persisted "shield last enabled at" marker.
//!
//! The marker is a single timestamp written as plain text in the fixed
//! format [`MARKER_TIME_FORMAT`]. Its presence is the only record that the
//! shield is currently considered active. Content that does not parse is
//! reported as [`MarkerState::Invalid`] rather than as an error.

use chrono::{Duration, NaiveDateTime};

/// Lexical format of the stored timestamp (local wall-clock time).
pub const MARKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// When the shield was last successfully enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShieldMarker {
    pub enabled_at: NaiveDateTime,
}

impl ShieldMarker {
    pub fn new(enabled_at: NaiveDateTime) -> Self {
        Self { enabled_at }
    }

    /// Parse stored marker text. Surrounding whitespace is ignored.
    pub fn parse(contents: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(contents.trim(), MARKER_TIME_FORMAT)
            .ok()
            .map(Self::new)
    }

    /// Render the marker in its on-disk form.
    pub fn to_contents(&self) -> String {
        self.enabled_at.format(MARKER_TIME_FORMAT).to_string()
    }

    /// Time elapsed since the marker was written. Negative if the marker is
    /// ahead of `now` (clock moved backwards).
    pub fn age(&self, now: NaiveDateTime) -> Duration {
        now.signed_duration_since(self.enabled_at)
    }
}

/// What the marker store found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    /// No marker is stored.
    Absent,
    /// A marker exists but its content is empty or unparseable.
    Invalid(String),
    Present(ShieldMarker),
}

impl MarkerState {
    /// Classify raw marker content.
    pub fn from_contents(contents: &str) -> Self {
        match ShieldMarker::parse(contents) {
            Some(marker) => Self::Present(marker),
            None => Self::Invalid(contents.to_string()),
        }
    }

    pub fn marker(&self) -> Option<&ShieldMarker> {
        match self {
            Self::Present(marker) => Some(marker),
            _ => None,
        }
    }
}
