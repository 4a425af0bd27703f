// External imports
use anyhow::{bail, Result};
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer, RmsPropConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_1_tensor_preparation::WindowedSeries;
use crate::constants::{
    ADAM_LEARNING_RATE, BATCH_SIZE, EPOCHS, MV_BATCH_SIZE, RMSPROP_LEARNING_RATE, SHUFFLE_SEED,
};
use crate::lstm::step_3_lstm_model_arch::{LstmRegressor, LstmRegressorConfig};
use crate::model_family::SequenceRegressor;
use crate::rnn::step_3_rnn_model_arch::{RnnRegressor, RnnRegressorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    RmsProp,
    Adam,
}

/// Configuration for training a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    pub shuffle_seed: u64,
}

impl TrainingConfig {
    /// RMSprop settings used by the univariate RNN and LSTM
    pub fn univariate() -> Self {
        Self {
            epochs: EPOCHS,
            batch_size: BATCH_SIZE,
            learning_rate: RMSPROP_LEARNING_RATE,
            optimizer: OptimizerKind::RmsProp,
            shuffle_seed: SHUFFLE_SEED,
        }
    }

    /// Adam settings used by the multivariate LSTM
    pub fn multivariate() -> Self {
        Self {
            epochs: EPOCHS,
            batch_size: MV_BATCH_SIZE,
            learning_rate: ADAM_LEARNING_RATE,
            optimizer: OptimizerKind::Adam,
            shuffle_seed: SHUFFLE_SEED,
        }
    }
}

/// Trains a regressor with mean squared error
///
/// # Arguments
///
/// * `model` - Freshly initialised model
/// * `data` - Training windows
/// * `config` - Optimiser and schedule
/// * `device` - Device the tensors are built on
/// * `label` - Model name used in log lines
///
/// # Returns
///
/// Returns the trained model and the mean loss of every epoch
pub fn train_regressor<B, M>(
    model: M,
    data: &WindowedSeries,
    config: &TrainingConfig,
    device: &B::Device,
    label: &str,
) -> Result<(M, Vec<f64>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceRegressor<B>,
{
    if data.is_empty() {
        bail!("No training windows for the {} model", label);
    }
    if config.batch_size == 0 {
        bail!("Batch size must be greater than zero");
    }

    match config.optimizer {
        OptimizerKind::RmsProp => {
            // Keras-style RMSprop decay
            let optimizer = RmsPropConfig::new().with_alpha(0.9).init::<B, M>();
            run_epochs(model, optimizer, data, config, device, label)
        }
        OptimizerKind::Adam => {
            let optimizer = AdamConfig::new().init::<B, M>();
            run_epochs(model, optimizer, data, config, device, label)
        }
    }
}

fn run_epochs<B, M, O>(
    mut model: M,
    mut optimizer: O,
    data: &WindowedSeries,
    config: &TrainingConfig,
    device: &B::Device,
    label: &str,
) -> Result<(M, Vec<f64>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceRegressor<B>,
    O: Optimizer<M, B>,
{
    info!(
        "Training {} model: {} windows, {} epochs, batch size {}",
        label,
        data.len(),
        config.epochs,
        config.batch_size
    );

    let mut rng = StdRng::seed_from_u64(config.shuffle_seed);
    let mut indices: Vec<usize> = (0..data.len()).collect();
    let mut loss_history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        indices.shuffle(&mut rng);

        let mut epoch_loss = 0.0;
        let mut num_batches = 0usize;
        for batch in indices.chunks(config.batch_size) {
            let (features, targets) = data.batch_tensors::<B>(batch, device);

            // Forward pass and MSE loss
            let predictions = model.regress(features);
            let diff = predictions - targets;
            let loss = (diff.clone() * diff).mean();
            epoch_loss += loss.clone().into_scalar().to_f64();
            num_batches += 1;

            // Backward pass and optimizer step
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        let avg_loss = epoch_loss / num_batches as f64;
        if !avg_loss.is_finite() {
            bail!("{} training diverged at epoch {} (loss = {})", label, epoch, avg_loss);
        }
        info!("{} epoch {}/{}: loss = {:.6}", label, epoch, config.epochs, avg_loss);
        loss_history.push(avg_loss);
    }

    debug!("{} training finished", label);
    Ok((model, loss_history))
}

/// Builds and trains the univariate RNN
pub fn train_rnn_model<B: AutodiffBackend>(
    data: &WindowedSeries,
    hidden_size: usize,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(RnnRegressor<B>, Vec<f64>)> {
    let model = RnnRegressorConfig::new(data.n_features(), hidden_size).init::<B>(device);
    train_regressor(model, data, config, device, "RNN")
}

/// Builds and trains the univariate LSTM
pub fn train_lstm_model<B: AutodiffBackend>(
    data: &WindowedSeries,
    hidden_size: usize,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(LstmRegressor<B>, Vec<f64>)> {
    let model = LstmRegressorConfig::new(data.n_features(), hidden_size).init::<B>(device);
    train_regressor(model, data, config, device, "LSTM")
}

/// Builds and trains the multivariate LSTM, one input per feature column
pub fn train_multivariate_lstm<B: AutodiffBackend>(
    data: &WindowedSeries,
    hidden_size: usize,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(LstmRegressor<B>, Vec<f64>)> {
    let model = LstmRegressorConfig::new(data.n_features(), hidden_size).init::<B>(device);
    train_regressor(model, data, config, device, "multivariate LSTM")
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn::tensor::Tensor;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn linear_series(n: usize) -> WindowedSeries {
        let values: Vec<f64> = (0..=n).map(|i| i as f64 / n as f64).collect();
        let windows: Vec<Vec<f64>> = values[..n].iter().map(|&v| vec![v]).collect();
        WindowedSeries::from_univariate(&windows, &values[1..]).unwrap()
    }

    fn quick_config(optimizer: OptimizerKind) -> TrainingConfig {
        TrainingConfig {
            epochs: 15,
            batch_size: 8,
            learning_rate: 0.01,
            optimizer,
            shuffle_seed: 7,
        }
    }

    #[test]
    fn test_train_lstm_reduces_loss() {
        let device = NdArrayDevice::Cpu;
        let data = linear_series(64);

        let (_, history) =
            train_lstm_model::<TestBackend>(&data, 8, &quick_config(OptimizerKind::RmsProp), &device)
                .unwrap();

        assert_eq!(history.len(), 15);
        assert!(history.iter().all(|l| l.is_finite()));
        assert!(
            history[history.len() - 1] < history[0],
            "Loss should decrease: {:?}",
            history
        );
    }

    #[test]
    fn test_train_rnn_with_adam() {
        let device = NdArrayDevice::Cpu;
        let data = linear_series(32);

        let (model, history) =
            train_rnn_model::<TestBackend>(&data, 4, &quick_config(OptimizerKind::Adam), &device)
                .unwrap();

        assert_eq!(history.len(), 15);
        let (x, _) = data.to_tensors::<TestBackend>(&device);
        assert_eq!(model.regress(x).dims(), [32, 1]);
    }

    #[test]
    fn test_train_multivariate_lstm_uses_feature_count() {
        let device = NdArrayDevice::Cpu;
        let windows: Vec<Vec<Vec<f64>>> = (0..20)
            .map(|i| vec![vec![i as f64 / 20.0; 6]])
            .collect();
        let targets: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();
        let data = WindowedSeries::from_multivariate(&windows, &targets).unwrap();

        let mut config = TrainingConfig::multivariate();
        config.epochs = 2;
        let (model, history) =
            train_multivariate_lstm::<TestBackend>(&data, 4, &config, &device).unwrap();

        let x = Tensor::<TestBackend, 3>::zeros([3, 1, 6], &device);
        assert_eq!(model.regress(x).dims(), [3, 1]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_data_fails() {
        let device = NdArrayDevice::Cpu;
        let data = WindowedSeries::from_univariate(&[], &[]).unwrap();
        let result = train_rnn_model::<TestBackend>(&data, 4, &TrainingConfig::univariate(), &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_configs() {
        let univariate = TrainingConfig::univariate();
        assert_eq!(univariate.epochs, 10);
        assert_eq!(univariate.batch_size, 32);
        assert_eq!(univariate.optimizer, OptimizerKind::RmsProp);
        assert_eq!(TrainingConfig::multivariate().optimizer, OptimizerKind::Adam);
    }
}
