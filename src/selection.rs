//! Marker column selection

use crate::structs::{ColumnSelection, DataMatrix, Result, RunError};
use ndarray::Axis;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

impl DataMatrix {
    /// Extract the selected columns, preserving row order.
    ///
    /// Column `j` of the result is column `selection[j]` of `self`; duplicates and
    /// reordering are honoured.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if any index is not below the column count
    pub fn select(&self, selection: &ColumnSelection) -> Result<Self> {
        let columns = self.n_columns();
        if let Some(&index) = selection.indices().iter().find(|&&i| i >= columns) {
            return Err(RunError::IndexOutOfRange { index, columns });
        }

        let values = self.values.select(Axis(1), selection.indices());
        let names = selection
            .indices()
            .iter()
            .map(|&i| self.names.get(i).cloned())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();

        Ok(Self { names, values })
    }

    /// Min-max scale each column to [0, 1]
    #[must_use]
    pub fn min_max_scaled(&self) -> Self {
        let mut values = self.values.clone();

        for mut column in values.columns_mut() {
            let (min, max) = column
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let range = max - min;
            column.mapv_inplace(|v| {
                if range == 0.0 {
                    0.5 // Constant column
                } else {
                    (v - min) / range
                }
            });
        }

        Self {
            names: self.names.clone(),
            values,
        }
    }
}

impl ColumnSelection {
    /// Concatenate half-open index ranges
    #[must_use]
    pub fn from_ranges(ranges: &[std::ops::Range<usize>]) -> Self {
        Self(ranges.iter().cloned().flatten().collect())
    }
}

/// Parses `6..9,10..21`, `0..=12` or `3, 5, 7`
impl FromStr for ColumnSelection {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self> {
        let mut indices = Vec::new();

        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            if let Some((start, end)) = item.split_once("..=") {
                let (start, end) = (parse_index(start)?, parse_index(end)?);
                if end < start {
                    return Err(bad_range(item));
                }
                indices.extend(start..=end);
            } else if let Some((start, end)) = item.split_once("..") {
                let (start, end) = (parse_index(start)?, parse_index(end)?);
                if end < start {
                    return Err(bad_range(item));
                }
                indices.extend(start..end);
            } else {
                indices.push(parse_index(item)?);
            }
        }

        Ok(Self(indices))
    }
}

fn parse_index(s: &str) -> Result<usize> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| RunError::Config(format!("Invalid column index: '{}'", s.trim())))
}

fn bad_range(item: &str) -> RunError {
    RunError::Config(format!("Column range '{item}' ends before it starts"))
}

/// Writes runs of consecutive indices back in `a..b` form
impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let mut iter = self.indices().iter().copied().peekable();

        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if end == start {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{start}..{}", end + 1));
            }
        }

        write!(f, "{}", parts.join(","))
    }
}

/// Accepted JSON shapes for `columns`
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ColumnsRepr {
    List(Vec<usize>),
    Ranges(String),
}

impl TryFrom<ColumnsRepr> for ColumnSelection {
    type Error = RunError;

    fn try_from(repr: ColumnsRepr) -> Result<Self> {
        match repr {
            ColumnsRepr::List(indices) => Ok(Self(indices)),
            ColumnsRepr::Ranges(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> DataMatrix {
        DataMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
            vec![9.0, 10.0, 11.0, 12.0],
            vec![13.0, 14.0, 15.0, 16.0],
            vec![17.0, 18.0, 19.0, 20.0],
        ])
        .expect("matrix")
        .with_names(vec!["a".into(), "b".into(), "c".into(), "d".into()])
    }

    #[test]
    fn test_select_columns() {
        let m = sample_matrix();
        let selected = m.select(&ColumnSelection::new(vec![0, 2])).expect("select");

        let expected = DataMatrix::from_rows(&[
            vec![1.0, 3.0],
            vec![5.0, 7.0],
            vec![9.0, 11.0],
            vec![13.0, 15.0],
            vec![17.0, 19.0],
        ])
        .expect("matrix");

        assert_eq!(selected.values, expected.values);
        assert_eq!(selected.names, vec!["a", "c"]);
    }

    #[test]
    fn test_select_reorders_and_duplicates() {
        let m = sample_matrix();
        let indices = vec![3, 0, 3];
        let selected = m.select(&ColumnSelection::new(indices.clone())).expect("select");

        assert_eq!(selected.n_columns(), indices.len());
        assert_eq!(selected.n_rows(), m.n_rows());
        for r in 0..m.n_rows() {
            for (j, &i) in indices.iter().enumerate() {
                assert_eq!(selected.get(r, j), m.get(r, i));
            }
        }
    }

    #[test]
    fn test_select_out_of_range() {
        let m = sample_matrix();
        let err = m.select(&ColumnSelection::new(vec![1, 4])).unwrap_err();
        assert!(matches!(
            err,
            RunError::IndexOutOfRange {
                index: 4,
                columns: 4
            }
        ));
    }

    #[test]
    fn test_select_with_inconsistent_names() {
        let mut m = sample_matrix();
        m.names.truncate(1);
        let selected = m.select(&ColumnSelection::new(vec![0, 3])).expect("select");

        assert_eq!(selected.n_columns(), 2);
        assert!(selected.names.is_empty());
    }

    #[test]
    fn test_select_empty() {
        let m = sample_matrix();
        let selected = m.select(&ColumnSelection::default()).expect("select");
        assert_eq!(selected.n_columns(), 0);
        assert_eq!(selected.n_rows(), 5);
    }

    #[test]
    fn test_parse_ranges() {
        let sel: ColumnSelection = "6..9, 10..21".parse().expect("parse");
        assert_eq!(sel, ColumnSelection::from_ranges(&[6..9, 10..21]));
        assert_eq!(sel.len(), 14);

        let sel: ColumnSelection = "0..=2,7".parse().expect("parse");
        assert_eq!(sel.indices(), &[0, 1, 2, 7]);

        let sel: ColumnSelection = "".parse().expect("parse");
        assert!(sel.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("5..2".parse::<ColumnSelection>().is_err());
        assert!("a..3".parse::<ColumnSelection>().is_err());
        assert!("-1".parse::<ColumnSelection>().is_err());
    }

    #[test]
    fn test_display_collapses_runs() {
        let sel = ColumnSelection::from_ranges(&[4..7, 8..18]);
        assert_eq!(sel.to_string(), "4..7,8..18");
        assert_eq!(ColumnSelection::new(vec![3, 1]).to_string(), "3,1");
    }

    #[test]
    fn test_min_max_scaled() {
        let m = DataMatrix::from_rows(&[vec![1.0, 4.0], vec![3.0, 4.0], vec![2.0, 4.0]])
            .expect("matrix");
        let scaled = m.min_max_scaled();

        assert!((scaled.get(0, 0).unwrap() - 0.0).abs() < 1e-12);
        assert!((scaled.get(1, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!((scaled.get(2, 0).unwrap() - 0.5).abs() < 1e-12);
        assert!((scaled.get(0, 1).unwrap() - 0.5).abs() < 1e-12);
    }
}
