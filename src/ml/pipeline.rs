//! Run pipeline: load, select, cluster, write

use crate::loader;
use crate::structs::{Clusterer, DataMatrix, Result, RunConfig, RunError};
use log::{debug, info};
use std::path::PathBuf;

/// What a completed run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub columns: usize,
    pub clusters: usize,
    pub noise: usize,
    pub output: PathBuf,
}

/// Load the configured input and narrow it to the selected marker columns
///
/// # Errors
/// Returns error if loading or selection fails
pub fn load_markers(config: &RunConfig) -> Result<DataMatrix> {
    info!("Loading: {}", config.input_path.display());

    let markers = if config.select_at_load {
        debug!("Applying column filter while parsing");
        loader::load(
            &config.input_path,
            config.delimiter,
            config.skip_header_rows(),
            Some(config.columns.indices()),
        )?
    } else {
        let full = loader::load(
            &config.input_path,
            config.delimiter,
            config.skip_header_rows(),
            None,
        )?;
        info!("Loaded {} rows x {} columns", full.n_rows(), full.n_columns());
        full.select(&config.columns)?
    };

    info!(
        "Working matrix: {} rows x {} marker columns ({})",
        markers.n_rows(),
        markers.n_columns(),
        config.columns
    );
    if !markers.names.is_empty() {
        debug!("Markers: {}", markers.names.join(", "));
    }

    Ok(markers)
}

/// Run one configuration end to end
///
/// # Errors
/// Returns the first error from any stage; nothing is retried.
pub fn run(config: &RunConfig, clusterer: &dyn Clusterer) -> Result<RunSummary> {
    config.validate()?;

    let markers = load_markers(config)?;

    info!("Running {}...", clusterer.name());
    let labels = clusterer.cluster(&markers, config.concurrency)?;

    if labels.len() != markers.n_rows() {
        return Err(RunError::ClusteringFailed(format!(
            "{} returned {} labels for {} rows",
            clusterer.name(),
            labels.len(),
            markers.n_rows()
        )));
    }

    super::output::write_labels(&config.output_path, &labels, config.delimiter)?;

    let summary = RunSummary {
        rows: markers.n_rows(),
        columns: markers.n_columns(),
        clusters: labels.n_clusters(),
        noise: labels.n_noise(),
        output: config.output_path.clone(),
    };

    info!(
        "Found {} clusters ({} unassigned); labels written to {}",
        summary.clusters,
        summary.noise,
        summary.output.display()
    );

    Ok(summary)
}
