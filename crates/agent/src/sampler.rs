//! Host load-average sampling.
//!
//! [`HostLoadSampler`] reads the kernel's 1/5/15-minute run-queue averages
//! via `getloadavg(3)`. Platforms without that facility report
//! [`SampleError::Unsupported`], which callers treat as a terminal no-op
//! rather than something to retry.

use loadshield_core::sample::LoadSample;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// This platform has no load-average facility.
    #[error("load average is not supported on {platform}")]
    Unsupported { platform: &'static str },

    /// The facility exists but did not return a reading.
    #[error("load average unavailable: {0}")]
    Unavailable(String),
}

/// Source of load samples.
pub trait LoadSampler {
    fn sample(&self) -> Result<LoadSample, SampleError>;
}

/// Reads the real host load average.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostLoadSampler;

impl HostLoadSampler {
    pub fn new() -> Self {
        Self
    }
}

impl LoadSampler for HostLoadSampler {
    #[cfg(unix)]
    fn sample(&self) -> Result<LoadSample, SampleError> {
        let mut loads = [0.0_f64; 3];
        // Safety: the buffer holds exactly the three elements requested.
        let filled = unsafe { libc::getloadavg(loads.as_mut_ptr(), 3) };
        if filled < 1 {
            return Err(SampleError::Unavailable(format!(
                "getloadavg returned {filled}"
            )));
        }
        let sample = LoadSample::new(loads[0], loads[1], loads[2]);
        tracing::debug!(
            load1 = sample.load1,
            load5 = sample.load5,
            load15 = sample.load15,
            "Sampled host load",
        );
        Ok(sample)
    }

    #[cfg(not(unix))]
    fn sample(&self) -> Result<LoadSample, SampleError> {
        Err(SampleError::Unsupported {
            platform: std::env::consts::OS,
        })
    }
}
