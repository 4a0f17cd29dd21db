//! Run configuration files and validation

use crate::structs::{Result, RunConfig, RunError};
use serde::{Deserialize, Deserializer};
use std::path::Path;

impl RunConfig {
    /// Read a run configuration from a JSON file
    ///
    /// # Errors
    /// Returns error if the file is missing, is not valid JSON, or fails validation
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RunError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the type system does not rule out
    ///
    /// # Errors
    /// Returns `Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(RunError::Config("Delimiter must be an ASCII character".into()));
        }
        if self.concurrency == Some(0) {
            return Err(RunError::Config(
                "Concurrency must be at least 1 (omit it to use all workers)".into(),
            ));
        }

        let c = &self.clustering;
        if c.dbscan_min_points < 2 {
            return Err(RunError::Config(
                "DBSCAN minimum points must be at least 2".into(),
            ));
        }
        if !c.dbscan_eps.is_finite() || c.dbscan_eps < 0.0 {
            return Err(RunError::Config(format!(
                "DBSCAN epsilon must be a non-negative number, got {}",
                c.dbscan_eps
            )));
        }
        if c.max_clusters == 0 {
            return Err(RunError::Config("Maximum clusters must be at least 1".into()));
        }

        Ok(())
    }
}

/// Parse a field delimiter: a single ASCII character or one of
/// `tab`, `\t`, `comma`, `space`
///
/// # Errors
/// Returns `Config` for anything else
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "space" => Ok(b' '),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(RunError::Config(format!(
                    "Delimiter must be a single ASCII character, got '{other}'"
                ))),
            }
        }
    }
}

/// serde adapter for [`parse_delimiter`]
pub fn deserialize_delimiter<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_delimiter(&s).map_err(serde::de::Error::custom)
}
