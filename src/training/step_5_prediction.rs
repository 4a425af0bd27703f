// External imports
use anyhow::{anyhow, bail, Result};
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use super::step_1_tensor_preparation::WindowedSeries;
use crate::model_family::SequenceRegressor;

const PREDICTION_BATCH_SIZE: usize = 256;

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>> {
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Failed to read prediction tensor: {:?}", e))?;
    Ok(values.into_iter().map(f64::from).collect())
}

/// Predicts one value per window, in window order
///
/// # Arguments
///
/// * `model` - Trained model
/// * `data` - Windows to predict from
/// * `device` - Device to run prediction on
///
/// # Returns
///
/// Returns the scaled predictions
pub fn predict_series<B, M>(model: &M, data: &WindowedSeries, device: &B::Device) -> Result<Vec<f64>>
where
    B: Backend,
    M: SequenceRegressor<B>,
{
    let mut predictions = Vec::with_capacity(data.len());
    let indices: Vec<usize> = (0..data.len()).collect();

    for batch in indices.chunks(PREDICTION_BATCH_SIZE) {
        let (features, _) = data.batch_tensors::<B>(batch, device);
        predictions.extend(tensor_values(model.regress(features))?);
    }

    Ok(predictions)
}

/// Generates a multi-step forecast by feeding each prediction back as input
///
/// # Arguments
///
/// * `model` - Trained univariate model
/// * `seed_window` - The last `n_steps` scaled observations, oldest first
/// * `steps` - Number of values to forecast
/// * `device` - Device to run prediction on
///
/// # Returns
///
/// Returns `steps` scaled predictions
pub fn forecast_recursive<B, M>(
    model: &M,
    seed_window: &[f64],
    steps: usize,
    device: &B::Device,
) -> Result<Vec<f64>>
where
    B: Backend,
    M: SequenceRegressor<B>,
{
    if seed_window.is_empty() {
        bail!("Forecast needs at least one observation to start from");
    }

    let n_steps = seed_window.len();
    let mut window: Vec<f32> = seed_window.iter().map(|&v| v as f32).collect();
    let mut forecasts = Vec::with_capacity(steps);

    for _ in 0..steps {
        let x = Tensor::<B, 1>::from_data(window.as_slice(), device).reshape([1, n_steps, 1]);
        let next = tensor_values(model.regress(x))?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Model returned an empty prediction"))?;
        forecasts.push(next);

        // Slide the window forward by one step
        window.remove(0);
        window.push(next as f32);
    }

    Ok(forecasts)
}

/// Root mean squared error, `None` when there is nothing to compare
pub fn rmse(predictions: &[f64], actual: &[f64]) -> Option<f64> {
    let n = predictions.len().min(actual.len());
    if n == 0 {
        return None;
    }
    let mse = predictions
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / n as f64;
    Some(mse.sqrt())
}
