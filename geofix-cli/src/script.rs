//! Command-line provider scripts.
//!
//! `--reading gps:1000:12.5` and `--error network:2000:offline` arguments are
//! parsed here and grouped into one [`ScriptedFeed`] per provider, in the order
//! providers first appear on the command line.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use geofix::feed::{ProviderFeed, ScriptedEvent, ScriptedFeed};
use geofix::reading::ProviderId;

/// `<provider>:<delay_ms>:<accuracy>[:<age_ms>]`
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingArg {
    pub provider: String,
    pub delay: Duration,
    pub accuracy_m: f32,
    pub age: Duration,
}

impl FromStr for ReadingArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(format!(
                "expected <provider>:<delay_ms>:<accuracy>[:<age_ms>], got '{}'",
                s
            ));
        }

        let provider = parse_provider(parts[0])?;
        let delay = parse_millis(parts[1], "delay")?;
        let accuracy_m = parts[2]
            .parse::<f32>()
            .map_err(|_| format!("invalid accuracy '{}'", parts[2]))?;
        let age = match parts.get(3) {
            Some(age) => parse_millis(age, "age")?,
            None => Duration::ZERO,
        };

        Ok(Self {
            provider,
            delay,
            accuracy_m,
            age,
        })
    }
}

/// `<provider>:<delay_ms>:<reason>`; the reason may contain colons.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorArg {
    pub provider: String,
    pub delay: Duration,
    pub reason: String,
}

impl FromStr for ErrorArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(provider), Some(delay), Some(reason)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!(
                "expected <provider>:<delay_ms>:<reason>, got '{}'",
                s
            ));
        };

        Ok(Self {
            provider: parse_provider(provider)?,
            delay: parse_millis(delay, "delay")?,
            reason: reason.to_string(),
        })
    }
}

fn parse_provider(s: &str) -> Result<String, String> {
    let name = s.trim();
    if name.is_empty() {
        return Err("provider name must not be empty".to_string());
    }
    Ok(name.to_string())
}

fn parse_millis(s: &str, what: &str) -> Result<Duration, String> {
    s.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("invalid {} '{}' (milliseconds)", what, s))
}

/// Group script arguments into one feed per provider.
///
/// Every reading is reported at (`latitude`, `longitude`); only accuracy and
/// age vary between scripted fixes.
pub fn build_feeds(
    readings: &[ReadingArg],
    errors: &[ErrorArg],
    latitude: f64,
    longitude: f64,
) -> Vec<Arc<ScriptedFeed>> {
    let mut scripts: Vec<(String, Vec<(Duration, ScriptedEvent)>)> = Vec::new();
    let mut add = |provider: &str, delay: Duration, event: ScriptedEvent| {
        match scripts.iter_mut().find(|(name, _)| name == provider) {
            Some((_, steps)) => steps.push((delay, event)),
            None => scripts.push((provider.to_string(), vec![(delay, event)])),
        }
    };

    for reading in readings {
        add(
            &reading.provider,
            reading.delay,
            ScriptedEvent::Fix {
                latitude,
                longitude,
                accuracy_m: reading.accuracy_m,
                age: reading.age,
            },
        );
    }
    for error in errors {
        add(
            &error.provider,
            error.delay,
            ScriptedEvent::Error(error.reason.clone()),
        );
    }

    scripts
        .into_iter()
        .map(|(name, steps)| {
            let feed = steps
                .into_iter()
                .fold(ScriptedFeed::new(ProviderId::new(name)), |feed, (delay, event)| {
                    feed.step(delay, event)
                });
            Arc::new(feed)
        })
        .collect()
}

/// Erase feed types for `AcquisitionTask::start`.
pub fn as_providers(feeds: &[Arc<ScriptedFeed>]) -> Vec<Arc<dyn ProviderFeed>> {
    feeds
        .iter()
        .map(|feed| Arc::clone(feed) as Arc<dyn ProviderFeed>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading() {
        let arg: ReadingArg = "gps:1500:12.5".parse().unwrap();
        assert_eq!(arg.provider, "gps");
        assert_eq!(arg.delay, Duration::from_millis(1500));
        assert_eq!(arg.accuracy_m, 12.5);
        assert_eq!(arg.age, Duration::ZERO);
    }

    #[test]
    fn test_parse_reading_with_age() {
        let arg: ReadingArg = "passive:0:3:600000".parse().unwrap();
        assert_eq!(arg.age, Duration::from_secs(600));
    }

    #[test]
    fn test_parse_reading_rejects_bad_input() {
        assert!("gps:1000".parse::<ReadingArg>().is_err());
        assert!("gps:soon:10".parse::<ReadingArg>().is_err());
        assert!("gps:1000:close".parse::<ReadingArg>().is_err());
        assert!(":1000:10".parse::<ReadingArg>().is_err());
        assert!("gps:1:2:3:4".parse::<ReadingArg>().is_err());
    }

    #[test]
    fn test_negative_accuracy_parses() {
        // Rejected later by the acquisition task, not by the parser
        let arg: ReadingArg = "gps:100:-5".parse().unwrap();
        assert_eq!(arg.accuracy_m, -5.0);
    }

    #[test]
    fn test_parse_error_keeps_colons_in_reason() {
        let arg: ErrorArg = "network:2000:http: 503".parse().unwrap();
        assert_eq!(arg.provider, "network");
        assert_eq!(arg.delay, Duration::from_secs(2));
        assert_eq!(arg.reason, "http: 503");
    }

    #[test]
    fn test_parse_error_requires_reason() {
        assert!("network:2000".parse::<ErrorArg>().is_err());
    }

    #[test]
    fn test_build_feeds_groups_by_provider() {
        let readings = vec![
            "gps:3000:10".parse().unwrap(),
            "network:1000:900".parse().unwrap(),
            "gps:1000:40".parse().unwrap(),
        ];
        let errors = vec!["network:2000:offline".parse().unwrap()];

        let feeds = build_feeds(&readings, &errors, 53.6, 10.0);

        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].id(), ProviderId::new("gps"));
        assert_eq!(feeds[1].id(), ProviderId::new("network"));

        let gps_offsets: Vec<u64> = feeds[0]
            .steps()
            .iter()
            .map(|s| s.offset.as_millis() as u64)
            .collect();
        assert_eq!(gps_offsets, vec![1000, 3000]);

        assert!(matches!(
            feeds[1].steps()[1].event,
            ScriptedEvent::Error(ref reason) if reason == "offline"
        ));
    }

    #[test]
    fn test_build_feeds_empty() {
        assert!(build_feeds(&[], &[], 0.0, 0.0).is_empty());
    }
}
