//! INI parsing logic for converting `Ini` → `ConfigFile`.

use std::path::PathBuf;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use super::settings::AcquisitionSettings;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [acquisition] section
    if let Some(section) = ini.section(Some("acquisition")) {
        if let Some(v) = section.get("deadline_secs") {
            config.acquisition.deadline_secs = v.trim().parse().map_err(|_| {
                invalid("acquisition", "deadline_secs", v, "must be a whole number of seconds")
            })?;
        }
        if let Some(v) = section.get("accuracy_threshold") {
            let v = v.trim();
            if !v.is_empty() {
                let meters: f32 = v.parse().map_err(|_| {
                    invalid("acquisition", "accuracy_threshold", v, "must be a number of meters")
                })?;
                config.acquisition.accuracy_threshold = Some(meters);
            }
        }
    }
    validate_acquisition(&config.acquisition)?;

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Range checks shared by loading and saving.
pub(super) fn validate_acquisition(settings: &AcquisitionSettings) -> Result<(), ConfigFileError> {
    if settings.deadline_secs == 0 {
        return Err(invalid(
            "acquisition",
            "deadline_secs",
            &settings.deadline_secs.to_string(),
            "must be greater than zero",
        ));
    }
    if let Some(meters) = settings.accuracy_threshold {
        if !meters.is_finite() || meters < 0.0 {
            return Err(invalid(
                "acquisition",
                "accuracy_threshold",
                &meters.to_string(),
                "must be a finite, non-negative number",
            ));
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
