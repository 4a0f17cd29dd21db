#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

mod catalog;
mod config;
mod loader;
mod ml;
mod selection;
mod structs;

use catalog::Study;
use clap::{Args, Parser, Subcommand};
use log::info;
use ml::clustering::LinfaClusterer;
use ml::pipeline::RunSummary;
use std::path::{Path, PathBuf};
use structs::{ClusterMethod, ClusteringConfig, ColumnSelection, Result, RunConfig};

/// markerclust - cluster marker channels of cytometry datasets and record labels
#[derive(Parser, Debug)]
#[command(name = "markerclust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster one input file and write per-row labels
    Run {
        /// JSON run configuration (replaces every option except --threads)
        #[arg(
            long,
            conflicts_with_all = [
                "input",
                "output",
                "columns",
                "delimiter",
                "no_header",
                "select_after_load",
                "method",
                "clusters",
                "max_clusters",
                "dbscan_eps",
                "dbscan_min_points",
                "scale",
            ]
        )]
        config: Option<PathBuf>,

        /// Input delimited text file
        #[arg(short, long, required_unless_present = "config")]
        input: Option<PathBuf>,

        /// Output labels file (its directory must exist)
        #[arg(short, long, required_unless_present = "config")]
        output: Option<PathBuf>,

        /// Marker columns, e.g. "6..9,10..21" or "0..=12"
        #[arg(short, long, required_unless_present = "config")]
        columns: Option<ColumnSelection>,

        /// Field delimiter: a single character, or tab / comma / space
        #[arg(short, long, default_value = "tab", value_parser = parse_delimiter_arg)]
        delimiter: u8,

        /// Input has no header row
        #[arg(long)]
        no_header: bool,

        /// Load every column, then select (instead of filtering while parsing)
        #[arg(long)]
        select_after_load: bool,

        /// Worker threads for clustering (default: all available)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        #[command(flatten)]
        clustering: ClusterArgs,
    },

    /// Run catalog datasets with a study's fixed settings
    Dataset {
        /// Dataset name (see `markerclust list`)
        #[arg(required_unless_present = "all")]
        name: Option<String>,

        /// Run every catalog dataset in order
        #[arg(long, conflicts_with = "name")]
        all: bool,

        /// Study whose output layout and worker settings to use
        #[arg(short, long, value_enum)]
        study: Study,

        /// Benchmark data directory
        #[arg(long, default_value = "benchmark_data_sets")]
        data_dir: PathBuf,

        /// Results directory (study subdirectories must exist)
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,

        /// Override the study's worker thread count
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        #[command(flatten)]
        clustering: ClusterArgs,
    },

    /// List catalog datasets
    List,
}

/// Clustering backend options shared by `run` and `dataset`
#[derive(Args, Debug)]
struct ClusterArgs {
    /// Clustering backend
    #[arg(long, value_enum, default_value_t = ClusterMethod::KMeans)]
    method: ClusterMethod,

    /// Number of clusters for K-means (0 = auto)
    #[arg(short = 'k', long, default_value = "0")]
    clusters: usize,

    /// Upper bound for automatic K
    #[arg(long, default_value = "20")]
    max_clusters: usize,

    /// DBSCAN epsilon (0.0 = auto-estimate via k-distance heuristic)
    #[arg(long, default_value = "0.0")]
    dbscan_eps: f64,

    /// DBSCAN minimum points per cluster
    #[arg(long, default_value = "5")]
    dbscan_min_points: usize,

    /// Min-max scale marker columns before clustering
    #[arg(long)]
    scale: bool,
}

impl From<ClusterArgs> for ClusteringConfig {
    fn from(args: ClusterArgs) -> Self {
        Self {
            method: args.method,
            clusters: args.clusters,
            max_clusters: args.max_clusters,
            dbscan_eps: args.dbscan_eps,
            dbscan_min_points: args.dbscan_min_points,
            scale: args.scale,
        }
    }
}

fn parse_delimiter_arg(s: &str) -> std::result::Result<u8, String> {
    config::parse_delimiter(s).map_err(|e| e.to_string())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Some(Commands::Run {
            config,
            input,
            output,
            columns,
            delimiter,
            no_header,
            select_after_load,
            threads,
            clustering,
        }) => {
            let mut run_config = match config {
                Some(path) => RunConfig::from_json_file(&path)?,
                None => RunConfig {
                    input_path: input.unwrap_or_default(),
                    output_path: output.unwrap_or_default(),
                    columns: columns.unwrap_or_default(),
                    skip_header: !no_header,
                    concurrency: None,
                    delimiter,
                    select_at_load: !select_after_load,
                    clustering: clustering.into(),
                },
            };
            if threads.is_some() {
                run_config.concurrency = threads;
            }
            run_single(&run_config).map(|_| ())
        }

        Some(Commands::Dataset {
            name,
            all,
            study,
            data_dir,
            out_dir,
            threads,
            clustering,
        }) => {
            let datasets: Vec<&catalog::Dataset> = if all {
                catalog::DATASETS.iter().collect()
            } else {
                vec![catalog::find(name.as_deref().unwrap_or_default())?]
            };
            let clustering = ClusteringConfig::from(clustering);
            run_datasets(&datasets, study, &data_dir, &out_dir, threads, &clustering)
        }

        Some(Commands::List) => {
            list_datasets();
            Ok(())
        }

        None => {
            eprintln!("No subcommand provided. Use 'markerclust run', 'dataset' or 'list'.");
            eprintln!("Run 'markerclust --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Run one configuration with the linfa backend
fn run_single(config: &RunConfig) -> Result<RunSummary> {
    let clusterer = LinfaClusterer::new(config.clustering.clone());
    let summary = ml::pipeline::run(config, &clusterer)?;

    eprintln!(
        "{} rows x {} markers -> {} clusters: {}",
        summary.rows,
        summary.columns,
        summary.clusters,
        summary.output.display()
    );
    Ok(summary)
}

/// Run catalog datasets in order, stopping at the first failure
fn run_datasets(
    datasets: &[&catalog::Dataset],
    study: Study,
    data_dir: &Path,
    out_dir: &Path,
    threads: Option<usize>,
    clustering: &ClusteringConfig,
) -> Result<()> {
    for dataset in datasets {
        info!("=== {} ({:?} study) ===", dataset.name, study);
        let mut config = study.run_config(dataset, data_dir, out_dir, clustering.clone());
        if threads.is_some() {
            config.concurrency = threads;
        }
        run_single(&config)?;
    }
    Ok(())
}

fn list_datasets() {
    println!("{:<14} {:>7}  {:<14} INPUT", "NAME", "MARKERS", "COLUMNS");
    for dataset in catalog::DATASETS {
        let columns = dataset.marker_columns();
        println!(
            "{:<14} {:>7}  {:<14} {}",
            dataset.name,
            columns.len(),
            columns.to_string(),
            dataset.relative_path
        );
    }
}
