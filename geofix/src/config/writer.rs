//! INI serialization logic for converting `ConfigFile` → INI string.

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let threshold = config
        .acquisition
        .accuracy_threshold
        .map(|t| t.to_string())
        .unwrap_or_default();

    format!(
        r#"[acquisition]
; Seconds to listen before settling for the best reading
deadline_secs = {deadline}
; Stop early once a reading is at least this accurate, in meters (blank = never)
accuracy_threshold = {threshold}

[logging]
directory = {directory}
file = {file}
"#,
        deadline = config.acquisition.deadline_secs,
        threshold = threshold,
        directory = config.logging.directory.display(),
        file = config.logging.file,
    )
}
