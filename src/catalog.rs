//! Benchmark dataset catalog
//!
//! Each entry fixes where a dataset lives under the benchmark data directory and
//! which of its columns are protein marker channels. A `Study` fixes the output
//! location, concurrency hint and selection path shared by every run of a
//! comparison study.

use crate::structs::{ClusteringConfig, ColumnSelection, Result, RunConfig, RunError};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A benchmark dataset
#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    pub name: &'static str,
    /// Path relative to the data directory
    pub relative_path: &'static str,
    /// Marker column ranges (half open)
    pub marker_ranges: &'static [Range<usize>],
}

impl Dataset {
    #[must_use]
    pub fn marker_columns(&self) -> ColumnSelection {
        ColumnSelection::from_ranges(self.marker_ranges)
    }

    #[must_use]
    pub fn input_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.relative_path)
    }

    #[must_use]
    pub fn output_file_name(&self) -> String {
        format!("python_out_{}.txt", self.name)
    }
}

pub const DATASETS: &[Dataset] = &[
    Dataset {
        name: "Levine_32dim",
        relative_path: "Levine_32dim/data/Levine_32dim.txt",
        marker_ranges: &[4..36],
    },
    Dataset {
        name: "Levine_13",
        relative_path: "Levine_2015_marrow_13/data/Levine_2015_marrow_13.txt",
        marker_ranges: &[0..13],
    },
    Dataset {
        name: "Levine_32",
        relative_path: "Levine_2015_marrow_32/data/Levine_2015_marrow_32.txt",
        marker_ranges: &[4..36],
    },
    Dataset {
        name: "Mosmann",
        relative_path: "Mosmann_2014_activ/data/Mosmann_2014_activ.txt",
        marker_ranges: &[6..21],
    },
    Dataset {
        name: "Mosmann_rare",
        relative_path: "Mosmann_rare/data/Mosmann_rare.txt",
        marker_ranges: &[6..9, 10..21],
    },
    Dataset {
        name: "Nilsson",
        relative_path: "Nilsson_2013_HSC/data/Nilsson_2013_HSC.txt",
        marker_ranges: &[4..7, 8..18],
    },
];

/// Look up a dataset by name, ignoring case
///
/// # Errors
/// Returns `Config` if no dataset matches
pub fn find(name: &str) -> Result<&'static Dataset> {
    DATASETS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            let known: Vec<&str> = DATASETS.iter().map(|d| d.name).collect();
            RunError::Config(format!(
                "Unknown dataset '{name}' (known: {})",
                known.join(", ")
            ))
        })
}

/// Comparison study a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Study {
    /// Single worker, select after loading
    Robustness,
    /// Single worker, select after loading.
    ///
    /// These are the settings of the first stability runs. Later stability runs used
    /// all workers with a parse-time filter; `random-starts` or `--threads` give that.
    Stability,
    /// All workers, filter columns while parsing
    RandomStarts,
}

impl Study {
    #[must_use]
    pub fn output_subdir(self) -> &'static str {
        match self {
            Self::Robustness => "robustness_analysis",
            Self::Stability => "stability_analysis",
            Self::RandomStarts => "stability_random_starts",
        }
    }

    #[must_use]
    pub fn concurrency(self) -> Option<usize> {
        match self {
            Self::Robustness | Self::Stability => Some(1),
            Self::RandomStarts => None,
        }
    }

    #[must_use]
    pub fn select_at_load(self) -> bool {
        matches!(self, Self::RandomStarts)
    }

    /// Build the run configuration for `dataset` in this study
    #[must_use]
    pub fn run_config(
        self,
        dataset: &Dataset,
        data_dir: &Path,
        out_dir: &Path,
        clustering: ClusteringConfig,
    ) -> RunConfig {
        RunConfig {
            input_path: dataset.input_path(data_dir),
            output_path: out_dir
                .join(self.output_subdir())
                .join(dataset.output_file_name()),
            columns: dataset.marker_columns(),
            skip_header: true,
            concurrency: self.concurrency(),
            delimiter: b'\t',
            select_at_load: self.select_at_load(),
            clustering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_columns() {
        let mosmann_rare = find("Mosmann_rare").expect("dataset");
        let cols = mosmann_rare.marker_columns();
        assert_eq!(cols.len(), 14);
        assert!(!cols.indices().contains(&9));

        let nilsson = find("nilsson").expect("dataset");
        assert_eq!(nilsson.marker_columns().len(), 13);

        assert_eq!(find("Levine_32").expect("dataset").marker_columns().len(), 32);
    }

    #[test]
    fn test_lookup_ignores_case() {
        let dataset = find("levine_13").expect("dataset");
        assert_eq!(dataset.name, "Levine_13");
        assert_eq!(dataset.output_file_name(), "python_out_Levine_13.txt");
        assert!(find("Levine_13dim").is_err());
        assert!(matches!(find("Samusik"), Err(RunError::Config(_))));
    }

    #[test]
    fn test_names_unique() {
        for (i, a) in DATASETS.iter().enumerate() {
            for b in &DATASETS[i + 1..] {
                assert!(!a.name.eq_ignore_ascii_case(b.name));
            }
        }
    }

    #[test]
    fn test_study_run_config() {
        let dataset = find("Mosmann").expect("dataset");
        let config = Study::Robustness.run_config(
            dataset,
            Path::new("/data"),
            Path::new("/results"),
            ClusteringConfig::default(),
        );

        assert_eq!(
            config.input_path,
            PathBuf::from("/data/Mosmann_2014_activ/data/Mosmann_2014_activ.txt")
        );
        assert_eq!(
            config.output_path,
            PathBuf::from("/results/robustness_analysis/python_out_Mosmann.txt")
        );
        assert_eq!(config.concurrency, Some(1));
        assert!(!config.select_at_load);
        assert!(config.validate().is_ok());

        let random = Study::RandomStarts.run_config(
            dataset,
            Path::new("/data"),
            Path::new("/results"),
            ClusteringConfig::default(),
        );
        assert_eq!(random.concurrency, None);
        assert!(random.select_at_load);
    }
}
