//! Two-column log parsing.
//!
//! Input lines look like `"<timestamp>, <value>"`; any mix of commas and
//! whitespace separates the columns.  Timestamps are shifted so the first
//! point sits at `x = 0`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected `<timestamp>, <value>`, got {content:?}")]
    Malformed { line: usize, content: String },
}

/// Points of one line series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    /// Timestamps relative to the first one.
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

fn parse_line(line: &str) -> Option<(f64, f64)> {
    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty());
    let t = fields.next()?.parse().ok()?;
    let v = fields.next()?.parse().ok()?;
    match fields.next() {
        Some(_) => None,
        None => Some((t, v)),
    }
}

impl Series {
    /// Parse log text.  Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, PlotError> {
        let mut series = Series::default();
        let mut t0 = None;

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (t, v) = parse_line(line).ok_or_else(|| PlotError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            })?;
            let t0 = *t0.get_or_insert(t);
            series.xs.push(t - t0);
            series.ys.push(v);
        }

        Ok(series)
    }

    pub fn read(path: &Path) -> Result<Self, PlotError> {
        let text = std::fs::read_to_string(path).map_err(|source| PlotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.xs.iter().copied().zip(self.ys.iter().copied()).collect()
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        bounds(&self.xs)
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        bounds(&self.ys)
    }
}

/// `[min, max]`, widened by one on each side when flat.
fn bounds(values: &[f64]) -> [f64; 2] {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if min == max {
        return [min - 1.0, max + 1.0];
    }
    [min, max]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_space_columns() {
        let series = Series::parse("0, 1\n1, 2\n2, 3\n").unwrap();
        assert_eq!(series.xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(series.ys, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn timestamps_start_at_zero() {
        let series = Series::parse("1600000000.5, 10\n1600000002.5, 11\n").unwrap();
        assert_eq!(series.xs, vec![0.0, 2.0]);
        assert_eq!(series.ys, vec![10.0, 11.0]);
    }

    #[test]
    fn accepts_csv_and_whitespace_separators() {
        let series = Series::parse("1000,41\n2000 42\n3000 ,\t43\n").unwrap();
        assert_eq!(series.xs, vec![0.0, 1000.0, 2000.0]);
        assert_eq!(series.ys, vec![41.0, 42.0, 43.0]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let series = Series::parse("\n5, 1\n\n6, 2\n").unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn malformed_line_names_its_number() {
        match Series::parse("0, 1\nnot a number\n") {
            Err(PlotError::Malformed { line, content }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "not a number");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
        assert!(Series::parse("1, 2, 3\n").is_err());
        assert!(Series::parse("1\n").is_err());
    }

    #[test]
    fn empty_input_is_empty_series() {
        let series = Series::parse("").unwrap();
        assert!(series.is_empty());
        assert_eq!(series.x_bounds(), [0.0, 1.0]);
    }

    #[test]
    fn flat_series_gets_padded_bounds() {
        let series = Series::parse("0, 5\n1, 5\n").unwrap();
        assert_eq!(series.x_bounds(), [0.0, 1.0]);
        assert_eq!(series.y_bounds(), [4.0, 6.0]);
    }

    #[test]
    fn points_pair_columns() {
        let series = Series::parse("3, 1\n4, 2\n").unwrap();
        assert_eq!(series.points(), vec![(0.0, 1.0), (1.0, 2.0)]);
    }
}
