//! User configuration loaded from `~/.geofix/config.ini`.
//!
//! Settings structs live in [`settings`], INI parsing in [`parser`] and
//! serialization in [`writer`]. [`ConfigFile`] ties them together.
//!
//! # Example
//!
//! ```ignore
//! use geofix::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let task = AcquisitionTask::new(config.acquisition_config());
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use settings::{
    AcquisitionSettings, LoggingSettings, DEFAULT_LOG_DIRECTORY, DEFAULT_LOG_FILE,
};
