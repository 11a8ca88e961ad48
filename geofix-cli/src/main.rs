//! geofix CLI - replay scripted providers through a single fix acquisition.
//!
//! Each `--reading` and `--error` argument schedules an event on a named
//! provider. The acquisition listens to all of them and prints the outcome.
//!
//! Exit codes: 0 on a fix, 2 on timeout, 1 on failure, cancellation or error.

mod error;
mod script;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use chrono::SecondsFormat;
use clap::Parser;
use geofix::acquisition::{AcquisitionOutcome, AcquisitionTask};
use geofix::config::{config_file_path, ConfigFile};
use geofix::logging::init_logging;

use error::CliError;
use script::{as_providers, build_feeds, ErrorArg, ReadingArg};

#[derive(Parser)]
#[command(name = "geofix", version = geofix::VERSION)]
#[command(about = "Acquire one position fix from scripted providers", long_about = None)]
struct Args {
    /// Configuration file (default: ~/.geofix/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to listen before settling for the best reading
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Stop as soon as a reading is at least this accurate (meters)
    #[arg(long, value_name = "METERS")]
    threshold: Option<f32>,

    /// Latitude reported by scripted readings
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    lat: f64,

    /// Longitude reported by scripted readings
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    lon: f64,

    /// Scripted reading, repeatable
    #[arg(long = "reading", value_name = "PROVIDER:DELAY_MS:ACCURACY[:AGE_MS]")]
    readings: Vec<ReadingArg>,

    /// Scripted provider failure, repeatable
    #[arg(long = "error", value_name = "PROVIDER:DELAY_MS:REASON")]
    errors: Vec<ErrorArg>,

    /// Cancel the acquisition after this many milliseconds
    #[arg(long, value_name = "MS")]
    cancel_after: Option<u64>,

    /// Write the effective settings back to the configuration file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

/// Run one acquisition and return the process exit code.
async fn run(args: Args) -> Result<i32, CliError> {
    let config_path = args.config.clone().unwrap_or_else(config_file_path);
    let mut config = ConfigFile::load_from(&config_path)?;

    if let Some(deadline) = args.deadline {
        config.acquisition.deadline_secs = deadline;
    }
    if let Some(threshold) = args.threshold {
        config.acquisition.accuracy_threshold = Some(threshold);
    }

    if args.save_config {
        config.save_to(&config_path)?;
        println!("Saved configuration to {}", config_path.display());
        if args.readings.is_empty() && args.errors.is_empty() {
            return Ok(0);
        }
    }

    // Held until run() returns so the file writer flushes before exit
    let _logging = init_logging(&config.logging).map_err(CliError::LoggingInit)?;

    tracing::info!(version = geofix::VERSION, config = %config_path.display(), "geofix starting");

    let feeds = build_feeds(&args.readings, &args.errors, args.lat, args.lon);
    let acquisition = config.acquisition_config();

    println!("Acquiring position fix:");
    println!("  Providers: {}", feeds.len());
    println!("  Deadline:  {}s", acquisition.deadline.as_secs());
    if let Some(threshold) = acquisition.accuracy_threshold {
        println!("  Threshold: {:.1}m", threshold);
    }
    println!();

    let handle = AcquisitionTask::new(acquisition).start(as_providers(&feeds))?;

    if let Some(ms) = args.cancel_after {
        let canceller = handle.canceller();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if canceller.cancel() {
                tracing::info!(after_ms = ms, "Acquisition cancelled from command line");
            }
        });
    }

    let outcome = handle.outcome().await;
    print_outcome(&outcome);
    Ok(exit_code(&outcome))
}

fn print_outcome(outcome: &AcquisitionOutcome) {
    match outcome {
        AcquisitionOutcome::Success(reading) => {
            println!("Position fix:");
            println!("  Location: {}, {}", reading.latitude, reading.longitude);
            println!("  Accuracy: {}", reading.accuracy);
            println!(
                "  Time:     {}",
                reading.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
            );
            if let Some(provider) = &reading.provider {
                println!("  Provider: {}", provider);
            }
        }
        AcquisitionOutcome::TimedOut => println!("No reading before the deadline"),
        AcquisitionOutcome::Cancelled => println!("Acquisition cancelled"),
        AcquisitionOutcome::Failed(reason) => println!("All providers failed: {}", reason),
    }
}

fn exit_code(outcome: &AcquisitionOutcome) -> i32 {
    match outcome {
        AcquisitionOutcome::Success(_) => 0,
        AcquisitionOutcome::TimedOut => 2,
        AcquisitionOutcome::Cancelled | AcquisitionOutcome::Failed(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geofix::config::ConfigFileError;
    use geofix::reading::Reading;
    use tempfile::TempDir;

    #[test]
    fn test_exit_codes() {
        let reading = Reading::new(53.6, 10.0, 12.0, Utc::now());
        assert_eq!(exit_code(&AcquisitionOutcome::Success(reading)), 0);
        assert_eq!(exit_code(&AcquisitionOutcome::TimedOut), 2);
        assert_eq!(exit_code(&AcquisitionOutcome::Cancelled), 1);
        assert_eq!(exit_code(&AcquisitionOutcome::Failed("offline".into())), 1);
    }

    #[test]
    fn test_args_parse_scripts() {
        let args = Args::try_parse_from([
            "geofix",
            "--deadline",
            "5",
            "--lat",
            "-33.9",
            "--reading",
            "gps:1000:12.5",
            "--reading",
            "network:500:900",
            "--error",
            "gps:3000:lost lock",
        ])
        .unwrap();

        assert_eq!(args.deadline, Some(5));
        assert_eq!(args.lat, -33.9);
        assert_eq!(args.readings.len(), 2);
        assert_eq!(args.errors[0].reason, "lost lock");
    }

    fn save_args(path: &std::path::Path, extra: &[&str]) -> Args {
        let mut argv = vec![
            "geofix".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--save-config".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_save_config_rejects_invalid_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let result = run(save_args(&path, &["--deadline", "0"])).await;
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigFileError::InvalidValue { .. }))
        ));

        let result = run(save_args(&path, &["--threshold=-5"])).await;
        assert!(matches!(result, Err(CliError::Config(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_saved_config_loads_again() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let code = run(save_args(&path, &["--deadline", "7", "--threshold", "20"]))
            .await
            .unwrap();
        assert_eq!(code, 0);

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded.acquisition.deadline_secs, 7);
        assert_eq!(reloaded.acquisition.accuracy_threshold, Some(20.0));
    }

    #[test]
    fn test_args_reject_malformed_reading() {
        assert!(Args::try_parse_from(["geofix", "--reading", "gps:abc"]).is_err());
    }
}
