//! Host load averages.

/// One reading of the host's run-queue load averages.
///
/// Produced fresh on every invocation; only `load1` takes part in the
/// shield decision, the longer windows are carried along for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

impl LoadSample {
    pub fn new(load1: f64, load5: f64, load15: f64) -> Self {
        Self {
            load1,
            load5,
            load15,
        }
    }

    /// A sample where only the 1-minute average is known.
    pub fn one_minute(load1: f64) -> Self {
        Self::new(load1, 0.0, 0.0)
    }
}
