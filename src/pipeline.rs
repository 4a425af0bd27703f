//! The fetch -> preprocess -> train -> predict sequence behind `/predict`.
//!
//! Everything here is blocking and CPU-bound; the HTTP layer runs it on a
//! blocking thread.

use anyhow::Context;
use burn::module::Module;
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::constants::{
    DATE_FORMAT, FUTURE_STEPS, HIDDEN_UNITS, MODEL_OUTPUT_DIR, MV_FEATURES, MV_N_STEPS, N_STEPS,
    TRAIN_END_YEAR, TRAIN_START_YEAR, UNIVARIATE_COLUMN,
};
use crate::data::PriceHistory;
use crate::error::{ForecastError, ForecastResult};
use crate::model_family::{ModelKind, SequenceRegressor};
use crate::training::step_1_tensor_preparation::WindowedSeries;
use crate::training::step_4_train_model::{
    train_lstm_model, train_multivariate_lstm, train_rnn_model, TrainingConfig,
};
use crate::training::step_5_prediction::{forecast_recursive, predict_series, rmse};
use crate::training::step_6_model_serialization::{
    load_lstm_regressor, load_rnn_regressor, ModelMetadata,
};
use crate::util::feature_engineering::process_and_split_multivariate_data;
use crate::util::model_utils::{find_current_model, save_trained_model};
use crate::util::pre_processor::{
    as_column_matrix, column_vector, split_sequence, train_test_split, Matrix, MinMaxScaler,
};

/// Backend every model is trained and evaluated on
pub type TrainBackend = Autodiff<NdArray<f32>>;

/// Tunables of a forecasting run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub train_start_year: i32,
    pub train_end_year: i32,
    pub n_steps: usize,
    pub mv_n_steps: usize,
    pub mv_features: usize,
    pub hidden_units: usize,
    pub future_steps: usize,
    pub univariate_training: TrainingConfig,
    pub multivariate_training: TrainingConfig,
    pub output_dir: PathBuf,
    pub save_models: bool,
    pub reuse_models: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            train_start_year: TRAIN_START_YEAR,
            train_end_year: TRAIN_END_YEAR,
            n_steps: N_STEPS,
            mv_n_steps: MV_N_STEPS,
            mv_features: MV_FEATURES,
            hidden_units: HIDDEN_UNITS,
            future_steps: FUTURE_STEPS,
            univariate_training: TrainingConfig::univariate(),
            multivariate_training: TrainingConfig::multivariate(),
            output_dir: PathBuf::from(MODEL_OUTPUT_DIR),
            save_models: true,
            reuse_models: false,
        }
    }
}

/// Inverse-transformed predictions, each value wrapped in its own row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub rnn_predictions: Matrix,
    pub lstm_predictions: Matrix,
    pub multivariate_lstm_predictions: Matrix,
    pub future_predictions: Matrix,
}

/// Test-set RMSE of each model in price units; absent when the test set is empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub rnn_test_rmse: Option<f64>,
    pub lstm_test_rmse: Option<f64>,
    pub multivariate_lstm_test_rmse: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    pub predictions: Predictions,
    pub metrics: EvaluationMetrics,
}

/// Values shared by every model of one run
struct RunContext<'a> {
    ticker: &'a str,
    reference_date: String,
    settings: &'a PipelineSettings,
    device: NdArrayDevice,
}

impl RunContext<'_> {
    fn metadata(&self, kind: ModelKind, input_size: usize, n_steps: usize) -> ModelMetadata {
        ModelMetadata::new(
            kind,
            self.ticker,
            &self.reference_date,
            input_size,
            self.settings.hidden_units,
            n_steps,
        )
    }

    /// Existing artifact with the expected shape, when reuse is enabled
    fn reusable_model(&self, kind: ModelKind) -> Option<PathBuf> {
        if !self.settings.reuse_models {
            return None;
        }
        find_current_model(
            &self.settings.output_dir,
            self.ticker,
            &self.reference_date,
            kind,
        )
    }
}

/// Scaled windows of the univariate price column
struct UnivariateData {
    scaler: MinMaxScaler,
    train: WindowedSeries,
    test: WindowedSeries,
    test_actual: Vec<f64>,
    seed_window: Vec<f64>,
}

struct UnivariateOutcome<M> {
    model: M,
    train_predictions: Vec<f64>,
    test_rmse: Option<f64>,
}

fn prepare_univariate(history: &PriceHistory, settings: &PipelineSettings) -> ForecastResult<UnivariateData> {
    let n_steps = settings.n_steps;
    let (training_set, test_set) = train_test_split(
        history,
        settings.train_start_year,
        settings.train_end_year,
        &[UNIVARIATE_COLUMN],
    )?;

    if training_set.len() <= n_steps {
        return Err(ForecastError::InsufficientData {
            model: "univariate",
            rows: training_set.len(),
            required: n_steps + 1,
        });
    }

    // Scale with the training range only
    let (scaler, training_scaled) = MinMaxScaler::fit_transform(&training_set);
    let (x_train, y_train) = split_sequence(&column_vector(&training_scaled, 0), n_steps);
    let train = WindowedSeries::from_univariate(&x_train, &y_train)?;

    // Test windows start n_steps rows before the first test row
    let all_values = history.column_values(UNIVARIATE_COLUMN)?;
    let scaled_all: Vec<f64> = all_values
        .iter()
        .map(|&v| scaler.transform_value(0, v))
        .collect();
    let test_inputs_start = all_values.len().saturating_sub(test_set.len() + n_steps);
    let (x_test, y_test) = if test_set.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        split_sequence(&scaled_all[test_inputs_start..], n_steps)
    };
    let test = WindowedSeries::from_univariate(&x_test, &y_test)?;

    // The forecast continues from the latest observations before the reference date
    let seed_window = scaled_all[scaled_all.len() - n_steps..].to_vec();

    info!(
        "Univariate data: {} training windows, {} test windows",
        train.len(),
        test.len()
    );

    Ok(UnivariateData {
        scaler,
        train,
        test,
        test_actual: column_vector(&test_set, 0),
        seed_window,
    })
}

/// Saved model and its final loss, when reuse is on and the artifact matches `expected`
fn load_reusable<M, L>(
    ctx: &RunContext<'_>,
    expected: &ModelMetadata,
    load_fn: L,
) -> Option<(M, Option<f64>)>
where
    L: FnOnce(&Path) -> anyhow::Result<(M, ModelMetadata)>,
{
    let kind = expected.kind;
    let path = ctx.reusable_model(kind)?;
    match load_fn(&path) {
        Ok((model, metadata))
            if metadata.input_size == expected.input_size
                && metadata.hidden_size == expected.hidden_size
                && metadata.n_steps == expected.n_steps =>
        {
            info!("Reusing saved {} model from {}", kind, path.display());
            Some((model, metadata.final_loss))
        }
        Ok(_) => {
            warn!("Saved {} model at {} has a different shape, retraining", kind, path.display());
            None
        }
        Err(e) => {
            warn!("Could not load saved {} model: {:#}", kind, e);
            None
        }
    }
}

/// Loads a reusable artifact or trains, evaluates and saves a univariate model
fn fit_univariate<M, T, L>(
    kind: ModelKind,
    ctx: &RunContext<'_>,
    data: &UnivariateData,
    train_fn: T,
    load_fn: L,
) -> anyhow::Result<UnivariateOutcome<M>>
where
    M: Module<TrainBackend> + SequenceRegressor<TrainBackend>,
    T: FnOnce() -> anyhow::Result<(M, Vec<f64>)>,
    L: FnOnce(&Path) -> anyhow::Result<(M, ModelMetadata)>,
{
    let started = Instant::now();
    let expected = ctx.metadata(kind, data.train.n_features(), data.train.n_steps());

    let reused = load_reusable(ctx, &expected, load_fn);
    let trained = reused.is_none();

    let (model, final_loss) = match reused {
        Some(found) => found,
        None => {
            let (model, history) = train_fn()?;
            (model, history.last().copied())
        }
    };

    let unscale = |values: Vec<f64>| -> Vec<f64> {
        values
            .into_iter()
            .map(|v| data.scaler.inverse_transform_value(0, v))
            .collect()
    };

    let train_predictions = unscale(predict_series(&model, &data.train, &ctx.device)?);
    let test_predictions = unscale(predict_series(&model, &data.test, &ctx.device)?);
    let test_rmse = rmse(&test_predictions, &data.test_actual);
    match test_rmse {
        Some(value) => info!("{} test RMSE: {:.4}", kind, value),
        None => info!("{} has no test data after {}", kind, ctx.settings.train_end_year),
    }

    if trained && ctx.settings.save_models {
        let metadata = expected
            .with_final_loss(final_loss)
            .with_test_rmse(test_rmse);
        save_trained_model(&model, &ctx.settings.output_dir, &metadata)
            .with_context(|| format!("Failed to save {} model", kind))?;
    }

    info!("{} model ready in {:.1}s", kind, started.elapsed().as_secs_f64());
    Ok(UnivariateOutcome {
        model,
        train_predictions,
        test_rmse,
    })
}

/// Trains (or reloads) the multivariate LSTM and predicts the test windows
fn fit_multivariate(
    ctx: &RunContext<'_>,
    history: &PriceHistory,
) -> ForecastResult<(Vec<f64>, Option<f64>)> {
    let kind = ModelKind::MultivariateLstm;
    let settings = ctx.settings;
    let split = process_and_split_multivariate_data(
        history,
        settings.train_start_year,
        settings.train_end_year,
        settings.mv_features,
        settings.mv_n_steps,
    )?;

    if split.x_train.is_empty() {
        return Err(ForecastError::InsufficientData {
            model: "multivariate LSTM",
            rows: split.x_train.len(),
            required: 1,
        });
    }

    let train = WindowedSeries::from_multivariate(&split.x_train, &split.y_train)?;
    let test = WindowedSeries::from_multivariate(&split.x_test, &split.y_test)?;
    let expected = ctx.metadata(kind, train.n_features(), train.n_steps());

    let reused = load_reusable(ctx, &expected, |path| {
        load_lstm_regressor::<TrainBackend>(path, &ctx.device)
    });
    let trained = reused.is_none();

    let (model, final_loss) = match reused {
        Some(found) => found,
        None => {
            let (model, history) = train_multivariate_lstm::<TrainBackend>(
                &train,
                settings.hidden_units,
                &settings.multivariate_training,
                &ctx.device,
            )?;
            (model, history.last().copied())
        }
    };

    let predictions: Vec<f64> = predict_series(&model, &test, &ctx.device)?
        .into_iter()
        .map(|v| split.target_scaler.inverse_transform_value(0, v))
        .collect();
    let actual: Vec<f64> = split
        .y_test
        .iter()
        .map(|&v| split.target_scaler.inverse_transform_value(0, v))
        .collect();
    let test_rmse = rmse(&predictions, &actual);

    if trained && settings.save_models {
        let metadata = expected
            .with_final_loss(final_loss)
            .with_test_rmse(test_rmse);
        save_trained_model(&model, &settings.output_dir, &metadata)
            .context("Failed to save multivariate LSTM model")?;
    }

    Ok((predictions, test_rmse))
}

/// Runs the whole forecast for one ticker
///
/// # Arguments
///
/// * `history` - Daily prices up to and including the reference date
/// * `ticker` - Stock symbol, used in artifact paths and messages
/// * `reference_date` - Cutoff date of the history
/// * `settings` - Run tunables
///
/// # Returns
///
/// Returns the predictions of the three models, the LSTM forecast and the
/// test-set metrics
pub fn run_forecast(
    history: &PriceHistory,
    ticker: &str,
    reference_date: NaiveDate,
    settings: &PipelineSettings,
) -> ForecastResult<ForecastReport> {
    if history.is_empty() {
        return Err(ForecastError::NoData {
            ticker: ticker.to_string(),
        });
    }
    if settings.n_steps == 0 || settings.mv_n_steps == 0 {
        return Err(ForecastError::InvalidInput(
            "Window length must be at least one step".to_string(),
        ));
    }

    let started = Instant::now();
    if let Some(last) = history.last_date()? {
        info!("Data loaded: {} rows for {} up to {}", history.len(), ticker, last);
    }

    let ctx = RunContext {
        ticker,
        reference_date: reference_date.format(DATE_FORMAT).to_string(),
        settings,
        device: NdArrayDevice::Cpu,
    };

    let univariate = prepare_univariate(history, settings)?;

    // The two univariate models are independent
    let (rnn, lstm) = rayon::join(
        || {
            fit_univariate(
                ModelKind::Rnn,
                &ctx,
                &univariate,
                || {
                    train_rnn_model::<TrainBackend>(
                        &univariate.train,
                        settings.hidden_units,
                        &settings.univariate_training,
                        &ctx.device,
                    )
                },
                |path| load_rnn_regressor::<TrainBackend>(path, &ctx.device),
            )
        },
        || {
            fit_univariate(
                ModelKind::Lstm,
                &ctx,
                &univariate,
                || {
                    train_lstm_model::<TrainBackend>(
                        &univariate.train,
                        settings.hidden_units,
                        &settings.univariate_training,
                        &ctx.device,
                    )
                },
                |path| load_lstm_regressor::<TrainBackend>(path, &ctx.device),
            )
        },
    );
    let rnn = rnn?;
    let lstm = lstm?;

    let (multivariate_predictions, multivariate_rmse) = fit_multivariate(&ctx, history)?;

    let future: Vec<f64> = forecast_recursive(
        &lstm.model,
        &univariate.seed_window,
        settings.future_steps,
        &ctx.device,
    )?
    .into_iter()
    .map(|v| univariate.scaler.inverse_transform_value(0, v))
    .collect();

    info!(
        "Forecast for {} finished in {:.1}s",
        ticker,
        started.elapsed().as_secs_f64()
    );

    Ok(ForecastReport {
        predictions: Predictions {
            rnn_predictions: as_column_matrix(&rnn.train_predictions),
            lstm_predictions: as_column_matrix(&lstm.train_predictions),
            multivariate_lstm_predictions: as_column_matrix(&multivariate_predictions),
            future_predictions: as_column_matrix(&future),
        },
        metrics: EvaluationMetrics {
            rnn_test_rmse: rnn.test_rmse,
            lstm_test_rmse: lstm.test_rmse,
            multivariate_lstm_test_rmse: multivariate_rmse,
        },
    })
}
