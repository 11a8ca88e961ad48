//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI file.

use std::path::PathBuf;

use crate::acquisition::DEFAULT_DEADLINE_SECS;

/// Default directory for log files.
pub const DEFAULT_LOG_DIRECTORY: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "geofix.log";

/// `[acquisition]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    /// Seconds to listen before settling for the best reading.
    pub deadline_secs: u64,
    /// Resolve early once a reading is at least this accurate (meters).
    pub accuracy_threshold: Option<f32>,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            accuracy_threshold: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIRECTORY),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}
