// External crates
use polars::prelude::*;
use serde::{Deserialize, Serialize};

// Local modules
use crate::data::{parse_dates, PriceHistory};
use chrono::Datelike;

/// Row-major matrix: one `Vec<f64>` per time step, one entry per column
pub type Matrix = Vec<Vec<f64>>;

/// Splits a frame into training and test rows by calendar year
///
/// Training rows are those whose year is in `[tstart, tend]`, test rows those
/// whose year is after `tend`. Rows before `tstart` are in neither set.
///
/// # Arguments
///
/// * `df` - Frame with a `date` column and the requested numeric columns
/// * `tstart` - First training year
/// * `tend` - Last training year
/// * `columns` - Columns to extract, in output order
///
/// # Returns
///
/// Returns `(training, test)` matrices
pub fn train_test_split_frame(
    df: &DataFrame,
    tstart: i32,
    tend: i32,
    columns: &[&str],
) -> PolarsResult<(Matrix, Matrix)> {
    let years: Vec<i32> = parse_dates(df)?.iter().map(|d| d.year()).collect();

    let mut values = Vec::with_capacity(columns.len());
    for &col in columns {
        let series = df.column(col)?.cast(&DataType::Float64)?;
        values.push(
            series
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect::<Vec<f64>>(),
        );
    }

    let mut training = Vec::new();
    let mut test = Vec::new();
    for (row, &year) in years.iter().enumerate() {
        let record: Vec<f64> = values.iter().map(|column| column[row]).collect();
        if year >= tstart && year <= tend {
            training.push(record);
        } else if year > tend {
            test.push(record);
        }
    }

    Ok((training, test))
}

/// [`train_test_split_frame`] over a price history
pub fn train_test_split(
    history: &PriceHistory,
    tstart: i32,
    tend: i32,
    columns: &[&str],
) -> PolarsResult<(Matrix, Matrix)> {
    train_test_split_frame(history.frame(), tstart, tend, columns)
}

/// Builds overlapping windows over a sequence
///
/// For every `i` with `i + n_steps < sequence.len()` the window
/// `sequence[i..i + n_steps]` is paired with the next element
/// `sequence[i + n_steps]`.
///
/// # Returns
///
/// Returns `(windows, targets)`; both are empty when the sequence is not
/// longer than `n_steps`
pub fn split_sequence<T: Clone>(sequence: &[T], n_steps: usize) -> (Vec<Vec<T>>, Vec<T>) {
    if n_steps == 0 || sequence.len() <= n_steps {
        return (Vec::new(), Vec::new());
    }

    sequence
        .windows(n_steps + 1)
        .map(|window| (window[..n_steps].to_vec(), window[n_steps].clone()))
        .unzip()
}

/// Per-column min-max scaler onto `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MinMaxScaler {
    /// Learns the per-column minimum and maximum, ignoring NaN
    pub fn fit(data: &[Vec<f64>]) -> Self {
        let width = data.first().map(Vec::len).unwrap_or(0);
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];

        for row in data {
            for (j, &value) in row.iter().enumerate().take(width) {
                if value.is_nan() {
                    continue;
                }
                min[j] = min[j].min(value);
                max[j] = max[j].max(value);
            }
        }

        // All-NaN columns map to the identity
        for j in 0..width {
            if !min[j].is_finite() || !max[j].is_finite() {
                min[j] = 0.0;
                max[j] = 1.0;
            }
        }

        Self { min, max }
    }

    pub fn fit_transform(data: &[Vec<f64>]) -> (Self, Matrix) {
        let scaler = Self::fit(data);
        let scaled = scaler.transform(data);
        (scaler, scaled)
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    fn range(&self, column: usize) -> f64 {
        let range = self.max[column] - self.min[column];
        // Avoid division by zero
        if range.abs() < f64::EPSILON {
            1.0
        } else {
            range
        }
    }

    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.min[column]) / self.range(column)
    }

    pub fn inverse_transform_value(&self, column: usize, value: f64) -> f64 {
        value * self.range(column) + self.min[column]
    }

    pub fn transform(&self, data: &[Vec<f64>]) -> Matrix {
        data.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, &v)| self.transform_value(j, v))
                    .collect()
            })
            .collect()
    }
}

/// Flattens a single-column matrix
pub fn column_vector(matrix: &[Vec<f64>], column: usize) -> Vec<f64> {
    matrix.iter().map(|row| row[column]).collect()
}

/// Wraps each value in its own row, the shape returned to API clients
pub fn as_column_matrix(values: &[f64]) -> Matrix {
    values.iter().map(|&v| vec![v]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                "date".into(),
                vec!["2015-12-31", "2016-01-04", "2020-06-01", "2023-12-29", "2024-01-02", "2025-03-03"],
            )
            .into(),
            Series::new("high".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).into(),
            Series::new("open".into(), vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_train_test_split_by_year() {
        let (training, test) = train_test_split_frame(&frame(), 2016, 2023, &["high"]).unwrap();
        assert_eq!(training, vec![vec![2.0], vec![3.0], vec![4.0]]);
        assert_eq!(test, vec![vec![5.0], vec![6.0]]);
    }

    #[test]
    fn test_train_test_split_multiple_columns() {
        let (training, test) =
            train_test_split_frame(&frame(), 2016, 2016, &["open", "high"]).unwrap();
        assert_eq!(training, vec![vec![20.0, 2.0]]);
        assert_eq!(test.len(), 4);
        assert_eq!(test[0], vec![30.0, 3.0]);
    }

    #[test]
    fn test_train_test_split_missing_column() {
        assert!(train_test_split_frame(&frame(), 2016, 2023, &["volume"]).is_err());
    }

    #[test]
    fn test_split_sequence() {
        let (x, y) = split_sequence(&[1, 2, 3, 4, 5], 2);
        assert_eq!(x, vec![vec![1, 2], vec![2, 3], vec![3, 4]]);
        assert_eq!(y, vec![3, 4, 5]);

        let (x, y) = split_sequence(&[1.0, 2.0], 1);
        assert_eq!(x, vec![vec![1.0]]);
        assert_eq!(y, vec![2.0]);
    }

    #[test]
    fn test_split_sequence_too_short() {
        let (x, y) = split_sequence(&[1, 2], 2);
        assert!(x.is_empty());
        assert!(y.is_empty());

        let (x, _) = split_sequence::<i32>(&[], 1);
        assert!(x.is_empty());
    }

    #[test]
    fn test_min_max_scaler() {
        let data = vec![vec![10.0, 5.0], vec![20.0, 5.0], vec![15.0, 5.0]];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&data);

        assert_eq!(scaler.n_features(), 2);
        assert_eq!(column_vector(&scaled, 0), vec![0.0, 1.0, 0.5]);
        // Constant column does not divide by zero
        assert_eq!(column_vector(&scaled, 1), vec![0.0, 0.0, 0.0]);

        assert_eq!(scaler.transform(&data), scaled);
        assert!((scaler.inverse_transform_value(0, 0.25) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_scaler_extrapolates_outside_fit_range() {
        let scaler = MinMaxScaler::fit(&[vec![0.0], vec![10.0]]);
        assert!((scaler.transform_value(0, 20.0) - 2.0).abs() < 1e-12);
        assert!((scaler.transform_value(0, -5.0) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_as_column_matrix() {
        assert_eq!(as_column_matrix(&[1.5, 2.5]), vec![vec![1.5], vec![2.5]]);
    }
}
