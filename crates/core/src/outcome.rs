//! Result of one controller evaluation and its exit-status mapping.

use std::fmt;

use crate::decision::NoOpReason;

/// Exit status for runs that completed as designed.
pub const EXIT_OK: u8 = 0;

/// Exit status for any failed run.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The enable call succeeded and a fresh marker was written.
    Enabled,
    /// The disable call succeeded and the marker was removed.
    DisabledAfterCooldown,
    /// Load is normal but the shield is still inside its cooldown window.
    StillCoolingDown,
    /// Nothing to do (including high load already handled recently).
    NoActionNeeded,
    /// The firewall API call failed; the marker is left as it was.
    RemoteCallFailed,
    /// Reading, writing or removing the marker failed.
    MarkerIoFailed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::RemoteCallFailed | Self::MarkerIoFailed)
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            EXIT_OK
        } else {
            EXIT_FAILURE
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::DisabledAfterCooldown => "disabled_after_cooldown",
            Self::StillCoolingDown => "still_cooling_down",
            Self::NoActionNeeded => "no_action_needed",
            Self::RemoteCallFailed => "remote_call_failed",
            Self::MarkerIoFailed => "marker_io_failed",
        }
    }
}

impl From<NoOpReason> for Outcome {
    fn from(reason: NoOpReason) -> Self {
        match reason {
            NoOpReason::CoolingDown => Self::StillCoolingDown,
            NoOpReason::RecentlyEnabled | NoOpReason::NoMarker | NoOpReason::InvalidMarker => {
                Self::NoActionNeeded
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
