//! Configuration for a single acquisition.

use std::time::Duration;

use super::error::AcquisitionError;

/// Default time allowed for an acquisition.
pub const DEFAULT_DEADLINE_SECS: u64 = 30;

/// Configuration for an acquisition task.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// How long to listen before settling for the best reading so far.
    pub deadline: Duration,

    /// Resolve early once the best reading is at least this accurate (meters).
    pub accuracy_threshold: Option<f32>,
}

impl AcquisitionConfig {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            accuracy_threshold: None,
        }
    }

    /// Resolve as soon as a reading within `meters` is accepted.
    pub fn with_accuracy_threshold(mut self, meters: f32) -> Self {
        self.accuracy_threshold = Some(meters);
        self
    }

    /// Check the values can drive a task.
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.deadline.is_zero() {
            return Err(AcquisitionError::ZeroDeadline);
        }
        if let Some(threshold) = self.accuracy_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(AcquisitionError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_DEADLINE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.deadline, Duration::from_secs(30));
        assert!(config.accuracy_threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_is_valid() {
        let config = AcquisitionConfig::new(Duration::from_secs(5)).with_accuracy_threshold(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_deadline() {
        let config = AcquisitionConfig::new(Duration::ZERO);
        assert_eq!(config.validate(), Err(AcquisitionError::ZeroDeadline));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let negative = AcquisitionConfig::default().with_accuracy_threshold(-5.0);
        assert_eq!(
            negative.validate(),
            Err(AcquisitionError::InvalidThreshold(-5.0))
        );

        let nan = AcquisitionConfig::default().with_accuracy_threshold(f32::NAN);
        assert!(matches!(
            nan.validate(),
            Err(AcquisitionError::InvalidThreshold(_))
        ));
    }
}
