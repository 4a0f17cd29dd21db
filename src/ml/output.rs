//! Cluster label writer

use crate::structs::{ClusterLabels, Result};
use csv::{Terminator, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Write `labels` to `path`, one plain decimal integer per line, no header.
///
/// Any existing file is overwritten. The parent directory must already exist.
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_labels(path: &Path, labels: &ClusterLabels, delimiter: u8) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    for label in labels.as_slice() {
        writer.write_record([label.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::RunError;
    use std::fs;
    use tempfile::TempDir;

    fn read_labels(path: &Path) -> Vec<i64> {
        fs::read_to_string(path)
            .expect("read")
            .lines()
            .map(|l| l.parse().expect("integer label"))
            .collect()
    }

    #[test]
    fn test_write_labels_exact_lines() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("labels.txt");

        write_labels(&path, &ClusterLabels::from(vec![2, 0, 0, 1, 2]), b'\t')
            .expect("write labels");

        let content = fs::read_to_string(&path).expect("read");
        assert_eq!(content, "2\n0\n0\n1\n2\n");
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("labels.txt");
        let labels: Vec<i64> = vec![7, -1, 3, 3, 0, 12, -1, 5];

        write_labels(&path, &ClusterLabels::from(labels.clone()), b'\t').expect("write labels");

        assert_eq!(read_labels(&path), labels);
    }

    #[test]
    fn test_overwrites_existing() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("labels.txt");
        fs::write(&path, "stale\nstale\nstale\nstale\n").expect("seed file");

        write_labels(&path, &ClusterLabels::from(vec![1]), b'\t').expect("write labels");

        assert_eq!(fs::read_to_string(&path).expect("read"), "1\n");
    }

    #[test]
    fn test_empty_labels() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("labels.txt");

        write_labels(&path, &ClusterLabels::default(), b'\t').expect("write labels");

        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }

    #[test]
    fn test_missing_parent_dir() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("missing").join("labels.txt");

        let err = write_labels(&path, &ClusterLabels::from(vec![0]), b'\t').unwrap_err();
        assert!(matches!(err, RunError::Io(_)));
    }
}
