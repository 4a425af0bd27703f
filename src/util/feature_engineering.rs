// External crates
use log::{debug, info};
use polars::prelude::*;

// Local modules
use super::pre_processor::{train_test_split_frame, Matrix, MinMaxScaler};
use crate::constants::{
    EMA_FAST_LENGTH, EMA_MEDIUM_LENGTH, EMA_SLOW_LENGTH, MV_FEATURE_COLUMNS, MV_TARGET_COLUMN,
    RSI_LENGTH,
};
use crate::data::PriceHistory;

/// Exponential moving average seeded with the simple average of the first `length` values
///
/// Entries before the first full window are `None`.
pub fn calculate_ema(values: &[f64], length: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if length == 0 || values.len() < length {
        return result;
    }

    let alpha = 2.0 / (length as f64 + 1.0);
    let mut ema = values[..length].iter().sum::<f64>() / length as f64;
    result[length - 1] = Some(ema);

    for i in length..values.len() {
        ema = alpha * values[i] + (1.0 - alpha) * ema;
        result[i] = Some(ema);
    }

    result
}

/// Relative Strength Index with Wilder smoothing
///
/// The first `length` entries are `None` since a change needs a previous value.
pub fn calculate_rsi(values: &[f64], length: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if length == 0 || values.len() <= length {
        return result;
    }

    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);
    for pair in values.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = gains[..length].iter().sum::<f64>() / length as f64;
    let mut avg_loss = losses[..length].iter().sum::<f64>() / length as f64;

    let rsi = |gain: f64, loss: f64| {
        if loss == 0.0 {
            if gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };

    result[length] = Some(rsi(avg_gain, avg_loss));
    for i in length..gains.len() {
        avg_gain = (avg_gain * (length as f64 - 1.0) + gains[i]) / length as f64;
        avg_loss = (avg_loss * (length as f64 - 1.0) + losses[i]) / length as f64;
        result[i + 1] = Some(rsi(avg_gain, avg_loss));
    }

    result
}

/// Next-day `adj_close - open`; the last row has no target
pub fn calculate_next_day_target(adj_close: &[f64], open: &[f64]) -> Vec<Option<f64>> {
    let n = adj_close.len().min(open.len());
    (0..n)
        .map(|i| {
            if i + 1 < n {
                Some(adj_close[i + 1] - open[i + 1])
            } else {
                None
            }
        })
        .collect()
}

/// Adds RSI, the three EMAs and the next-day target to the price frame
///
/// # Returns
///
/// Returns a new frame with rows containing any missing value removed
pub fn add_multivariate_features(history: &PriceHistory) -> PolarsResult<DataFrame> {
    let mut df = history.frame().clone();
    let close = history.column_values("close")?;
    let open = history.column_values("open")?;
    let adj_close = history.column_values("adj_close")?;

    df.with_column(Series::new("rsi".into(), calculate_rsi(&close, RSI_LENGTH)))?;
    df.with_column(Series::new(
        "ema_fast".into(),
        calculate_ema(&close, EMA_FAST_LENGTH),
    ))?;
    df.with_column(Series::new(
        "ema_medium".into(),
        calculate_ema(&close, EMA_MEDIUM_LENGTH),
    ))?;
    df.with_column(Series::new(
        "ema_slow".into(),
        calculate_ema(&close, EMA_SLOW_LENGTH),
    ))?;
    df.with_column(Series::new(
        MV_TARGET_COLUMN.into(),
        calculate_next_day_target(&adj_close, &open),
    ))?;

    // Drop rows with nulls introduced by the indicator warm-up and the target shift
    let df = df.drop_nulls::<String>(None)?;
    debug!(
        "Multivariate frame: {} of {} rows after dropping warm-up rows",
        df.height(),
        history.len()
    );
    Ok(df)
}

/// Windows of consecutive feature rows, each paired with the target of its last row
pub fn window_rows(rows: &[Vec<f64>], targets: &[f64], n_steps: usize) -> (Vec<Matrix>, Vec<f64>) {
    if n_steps == 0 || rows.len() < n_steps {
        return (Vec::new(), Vec::new());
    }

    (0..=rows.len() - n_steps)
        .map(|i| (rows[i..i + n_steps].to_vec(), targets[i + n_steps - 1]))
        .unzip()
}

/// Scaled, windowed training and test sets for the multivariate model
#[derive(Debug, Clone)]
pub struct MultivariateSplit {
    pub x_train: Vec<Matrix>,
    pub y_train: Vec<f64>,
    pub x_test: Vec<Matrix>,
    pub y_test: Vec<f64>,
    pub target_scaler: MinMaxScaler,
}

/// Builds the multivariate training and test sets
///
/// # Arguments
///
/// * `history` - Daily price history
/// * `tstart` - First training year
/// * `tend` - Last training year
/// * `mv_features` - Expected number of feature columns
/// * `n_steps` - Window length
///
/// # Returns
///
/// Returns the split with features scaled by a scaler fitted on the
/// training rows, and targets scaled by a separate target scaler
pub fn process_and_split_multivariate_data(
    history: &PriceHistory,
    tstart: i32,
    tend: i32,
    mv_features: usize,
    n_steps: usize,
) -> PolarsResult<MultivariateSplit> {
    if mv_features != MV_FEATURE_COLUMNS.len() {
        return Err(PolarsError::ComputeError(
            format!(
                "Multivariate model expects {} features, got {}",
                MV_FEATURE_COLUMNS.len(),
                mv_features
            )
            .into(),
        ));
    }

    let df = add_multivariate_features(history)?;

    let mut columns: Vec<&str> = MV_FEATURE_COLUMNS.to_vec();
    columns.push(MV_TARGET_COLUMN);
    let (training, test) = train_test_split_frame(&df, tstart, tend, &columns)?;

    let split_features_target = |set: &Matrix| -> (Matrix, Matrix) {
        set.iter()
            .map(|row| (row[..mv_features].to_vec(), vec![row[mv_features]]))
            .unzip()
    };
    let (train_features, train_targets) = split_features_target(&training);
    let (test_features, test_targets) = split_features_target(&test);

    let (feature_scaler, train_features) = MinMaxScaler::fit_transform(&train_features);
    let test_features = feature_scaler.transform(&test_features);
    let (target_scaler, train_targets) = MinMaxScaler::fit_transform(&train_targets);
    let test_targets = target_scaler.transform(&test_targets);

    let flatten = |m: Matrix| m.into_iter().map(|row| row[0]).collect::<Vec<f64>>();
    let (x_train, y_train) = window_rows(&train_features, &flatten(train_targets), n_steps);
    let (x_test, y_test) = window_rows(&test_features, &flatten(test_targets), n_steps);

    info!(
        "Multivariate data: {} training windows, {} test windows",
        x_train.len(),
        x_test.len()
    );

    Ok(MultivariateSplit {
        x_train,
        y_train,
        x_test,
        y_test,
        target_scaler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::test_utils::synthetic_history;

    #[test]
    fn test_calculate_ema_seeded_with_sma() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(ema[0], None);
        assert_eq!(ema[1], None);
        assert_eq!(ema[2], Some(2.0));
        // alpha = 0.5
        assert_eq!(ema[3], Some(3.0));
    }

    #[test]
    fn test_calculate_ema_short_input() {
        assert!(calculate_ema(&[1.0, 2.0], 3).iter().all(Option::is_none));
    }

    #[test]
    fn test_calculate_rsi_bounds() {
        let rising: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let rsi = calculate_rsi(&rising, 14);
        assert!(rsi[..14].iter().all(Option::is_none));
        assert_eq!(rsi[14], Some(100.0));
        assert_eq!(rsi[29], Some(100.0));

        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert_eq!(calculate_rsi(&falling, 14)[20], Some(0.0));

        let zigzag: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        for value in calculate_rsi(&zigzag, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_next_day_target() {
        let target = calculate_next_day_target(&[5.0, 7.0, 9.0], &[4.0, 6.0, 10.0]);
        assert_eq!(target, vec![Some(1.0), Some(-1.0), None]);
    }

    #[test]
    fn test_window_rows() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let (x, y) = window_rows(&rows, &[10.0, 20.0, 30.0], 2);
        assert_eq!(x, vec![vec![vec![1.0], vec![2.0]], vec![vec![2.0], vec![3.0]]]);
        assert_eq!(y, vec![20.0, 30.0]);

        let (x, _) = window_rows(&rows, &[10.0, 20.0, 30.0], 1);
        assert_eq!(x.len(), 3);
    }

    #[test]
    fn test_add_multivariate_features_drops_warm_up_rows() {
        let history = synthetic_history(2016, 2018);
        let df = add_multivariate_features(&history).unwrap();

        for col in MV_FEATURE_COLUMNS {
            assert!(df.schema().contains(col), "Missing column {}", col);
        }
        // The slow EMA needs EMA_SLOW_LENGTH rows and the last row has no target
        assert_eq!(df.height(), history.len() - (EMA_SLOW_LENGTH - 1) - 1);
        assert_eq!(df.column("rsi").unwrap().null_count(), 0);
    }

    #[test]
    fn test_process_and_split_multivariate_data() {
        let history = synthetic_history(2016, 2024);
        let split = process_and_split_multivariate_data(&history, 2016, 2023, 6, 1).unwrap();

        assert!(!split.x_train.is_empty());
        assert!(!split.x_test.is_empty());
        assert_eq!(split.x_train.len(), split.y_train.len());
        assert_eq!(split.x_test.len(), split.y_test.len());
        assert_eq!(split.x_train[0].len(), 1);
        assert_eq!(split.x_train[0][0].len(), 6);
        assert_eq!(split.target_scaler.n_features(), 1);

        // Training features are scaled onto [0, 1]
        for window in &split.x_train {
            for row in window {
                assert!(row.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
        assert!(split.y_train.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_process_and_split_rejects_wrong_feature_count() {
        let history = synthetic_history(2016, 2017);
        assert!(process_and_split_multivariate_data(&history, 2016, 2023, 5, 1).is_err());
    }
}
