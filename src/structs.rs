//! Consolidated public types for the markerclust crate
//!
//! This module contains the data model shared by every pipeline stage, the error
//! type, and the `Clusterer` trait the clustering backends implement.

use ndarray::Array2;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed input at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("Column index {index} out of range for matrix with {columns} columns")]
    IndexOutOfRange { index: usize, columns: usize },

    #[error("Clustering failed: {0}")]
    ClusteringFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RunError>;

// ============================================================================
// Matrix Types
// ============================================================================

/// Numeric observation matrix: rows are cells, columns are measured channels
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    /// Channel names, empty when the input carried no usable header
    pub names: Vec<String>,
    /// Values, one row per observation
    pub values: Array2<f64>,
}

impl DataMatrix {
    #[must_use]
    pub fn new(values: Array2<f64>) -> Self {
        Self {
            names: Vec::new(),
            values,
        }
    }

    /// Attach channel names. Names are dropped if their count does not match the
    /// column count.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        if names.len() == self.n_columns() {
            self.names = names;
        } else {
            self.names.clear();
        }
        self
    }

    /// Build a matrix from row vectors
    ///
    /// # Errors
    /// Returns `Malformed` if the rows do not all have the same length
    #[allow(dead_code)]
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * width);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(RunError::Malformed {
                    line: i as u64 + 1,
                    reason: format!("expected {width} fields, found {}", row.len()),
                });
            }
            flat.extend_from_slice(row);
        }

        let values = Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| {
            RunError::Malformed {
                line: 0,
                reason: format!("cannot shape matrix: {e}"),
            }
        })?;

        Ok(Self::new(values))
    }

    /// Number of observations
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of channels
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get((row, column)).copied()
    }
}

/// Ordered list of column indices. Order is authoritative and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "crate::selection::ColumnsRepr")]
pub struct ColumnSelection(pub(crate) Vec<usize>);

impl ColumnSelection {
    #[allow(dead_code)]
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Clustering Types
// ============================================================================

/// Label given to observations a backend leaves unassigned
pub const NOISE_LABEL: i64 = -1;

/// One opaque cluster identifier per input row, in input row order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterLabels(pub Vec<i64>);

impl ClusterLabels {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Number of distinct non-noise labels
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.0
            .iter()
            .filter(|&&l| l != NOISE_LABEL)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of noise labels
    #[must_use]
    pub fn n_noise(&self) -> usize {
        self.0.iter().filter(|&&l| l == NOISE_LABEL).count()
    }
}

impl From<Vec<i64>> for ClusterLabels {
    fn from(labels: Vec<i64>) -> Self {
        Self(labels)
    }
}

/// Clustering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMethod {
    #[default]
    #[value(name = "kmeans")]
    KMeans,
    Dbscan,
}

impl ClusterMethod {
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::KMeans => "k-means",
            Self::Dbscan => "DBSCAN",
        }
    }
}

/// Backend parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringConfig {
    pub method: ClusterMethod,
    /// Number of k-means clusters (0 = auto)
    pub clusters: usize,
    /// Upper bound for the automatic k
    pub max_clusters: usize,
    /// DBSCAN neighbourhood radius (0.0 = auto-estimate)
    pub dbscan_eps: f64,
    pub dbscan_min_points: usize,
    /// Min-max scale columns before clustering
    pub scale: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            method: ClusterMethod::KMeans,
            clusters: 0,
            max_clusters: 20,
            dbscan_eps: 0.0,
            dbscan_min_points: 5,
            scale: false,
        }
    }
}

/// Immutable configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub columns: ColumnSelection,
    #[serde(default = "default_true")]
    pub skip_header: bool,
    /// Worker count for the backend (`None` = all available)
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(
        default = "default_delimiter",
        deserialize_with = "crate::config::deserialize_delimiter"
    )]
    pub delimiter: u8,
    /// Apply the column selection while parsing instead of after loading
    #[serde(default = "default_true")]
    pub select_at_load: bool,
    #[serde(default)]
    pub clustering: ClusteringConfig,
}

const fn default_true() -> bool {
    true
}

const fn default_delimiter() -> u8 {
    b'\t'
}

impl RunConfig {
    /// Header rows the loader discards
    #[must_use]
    pub fn skip_header_rows(&self) -> usize {
        usize::from(self.skip_header)
    }
}

/// Something that can assign cluster labels to the rows of a matrix
pub trait Clusterer {
    /// Cluster `matrix`, returning exactly one label per row in row order.
    ///
    /// `concurrency` bounds the number of workers; `None` uses all available.
    ///
    /// # Errors
    /// Returns `ClusteringFailed` on invalid input or backend failure
    fn cluster(&self, matrix: &DataMatrix, concurrency: Option<usize>) -> Result<ClusterLabels>;

    /// Short name for logs
    fn name(&self) -> &str;
}
