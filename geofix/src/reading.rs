//! Core reading types for position fix acquisition.
//!
//! - [`Accuracy`] - Horizontal error magnitude in meters (lower is better)
//! - [`ProviderId`] - Opaque identity of the provider that produced a reading
//! - [`Reading`] - One timestamped position estimate
//! - [`InvalidReading`] - Why a reading was refused before arbitration

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Estimated horizontal error in meters (lower is better).
///
/// Providers report their own precision. A value is only meaningful when it is
/// finite and non-negative; see [`Accuracy::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accuracy(pub f32);

impl Accuracy {
    /// Returns true if this accuracy is better (lower meters) than other.
    #[inline]
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.0 < other.0
    }

    /// Get the accuracy value in meters.
    #[inline]
    pub fn meters(&self) -> f32 {
        self.0
    }

    /// True if the magnitude is a finite, non-negative number.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

impl PartialOrd for Accuracy {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // Lower meters = higher accuracy = greater in ordering
        other.0.partial_cmp(&self.0)
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}m", self.0)
    }
}

/// Identity of a position provider ("gps", "network", "fused", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reasons a reading is refused before it reaches the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidReading {
    /// Accuracy below zero.
    #[error("accuracy must not be negative (got {0})")]
    NegativeAccuracy(f32),

    /// Accuracy is NaN or infinite.
    #[error("accuracy must be a finite number (got {0})")]
    NonFiniteAccuracy(f32),
}

/// A single position estimate.
///
/// Readings are immutable values. The `timestamp` is the instant the provider
/// produced the fix, not the instant it was delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,

    /// When the provider produced this fix.
    pub timestamp: DateTime<Utc>,

    /// Estimated horizontal error.
    pub accuracy: Accuracy,

    /// Originating provider, if the provider reported one.
    pub provider: Option<ProviderId>,
}

impl Reading {
    /// Create a reading with no provider attribution.
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f32, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy: Accuracy(accuracy_m),
            provider: None,
        }
    }

    /// Attribute this reading to a provider.
    pub fn with_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Get position as (latitude, longitude) tuple.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Check the reading can take part in arbitration.
    pub fn validate(&self) -> Result<(), InvalidReading> {
        if self.accuracy.is_valid() {
            return Ok(());
        }
        let meters = self.accuracy.meters();
        if meters.is_finite() {
            Err(InvalidReading::NegativeAccuracy(meters))
        } else {
            Err(InvalidReading::NonFiniteAccuracy(meters))
        }
    }
}
