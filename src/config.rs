use std::path::PathBuf;

use anyhow::bail;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::normalize::{Normalizer, StatusPolicy};

pub const DEFAULT_DATA_FILE: &str = "data/attendance.csv";

/// Options shared by every subcommand, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_file: PathBuf,
    pub status_policy: StatusPolicy,
}

impl Settings {
    pub fn new(data_file: PathBuf, strict_status: bool) -> Self {
        Self {
            data_file,
            status_policy: if strict_status {
                StatusPolicy::Strict
            } else {
                StatusPolicy::Permissive
            },
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.status_policy)
    }
}

pub fn validate_threshold(threshold: f64) -> anyhow::Result<f64> {
    if !(0.0..=100.0).contains(&threshold) {
        bail!("threshold must be between 0 and 100, got {threshold}");
    }
    Ok(threshold)
}

pub fn validate_top(top: usize) -> anyhow::Result<usize> {
    if top == 0 {
        bail!("top must be at least 1");
    }
    Ok(top)
}

/// Install the global subscriber. Output goes to stderr so stdout stays parseable.
pub fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(layer).init();
}
