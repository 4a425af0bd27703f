// External imports
use anyhow::{bail, Result};
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::util::pre_processor::Matrix;

/// Input windows and their targets, stored host-side as `f32`
///
/// `inputs` holds `len() * n_steps * n_features` values laid out as
/// `[sample][step][feature]`; `targets` holds one value per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSeries {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    n_steps: usize,
    n_features: usize,
}

impl WindowedSeries {
    /// Windows over a single feature, as produced by `split_sequence`
    pub fn from_univariate(windows: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        let matrices: Vec<Matrix> = windows
            .iter()
            .map(|window| window.iter().map(|&v| vec![v]).collect())
            .collect();
        Self::from_multivariate(&matrices, targets)
    }

    /// Windows of feature rows
    pub fn from_multivariate(windows: &[Matrix], targets: &[f64]) -> Result<Self> {
        if windows.len() != targets.len() {
            bail!(
                "Number of windows ({}) does not match number of targets ({})",
                windows.len(),
                targets.len()
            );
        }

        let n_steps = windows.first().map(Vec::len).unwrap_or(0);
        let n_features = windows
            .first()
            .and_then(|w| w.first())
            .map(Vec::len)
            .unwrap_or(0);

        let mut inputs = Vec::with_capacity(windows.len() * n_steps * n_features);
        for (i, window) in windows.iter().enumerate() {
            if window.len() != n_steps {
                bail!("Window {} has {} steps, expected {}", i, window.len(), n_steps);
            }
            for row in window {
                if row.len() != n_features {
                    bail!("Window {} has a row with {} features, expected {}", i, row.len(), n_features);
                }
                inputs.extend(row.iter().map(|&v| v as f32));
            }
        }

        Ok(Self {
            inputs,
            targets: targets.iter().map(|&v| v as f32).collect(),
            n_steps,
            n_features,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// The window of sample `index` as `[step][feature]` values
    pub fn window(&self, index: usize) -> &[f32] {
        let size = self.n_steps * self.n_features;
        &self.inputs[index * size..(index + 1) * size]
    }

    /// Builds `[batch, n_steps, n_features]` inputs and `[batch, 1]` targets
    /// for the given sample indices
    pub fn batch_tensors<B: Backend>(
        &self,
        indices: &[usize],
        device: &B::Device,
    ) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let mut x_data = Vec::with_capacity(indices.len() * self.n_steps * self.n_features);
        let mut y_data = Vec::with_capacity(indices.len());
        for &i in indices {
            x_data.extend_from_slice(self.window(i));
            y_data.push(self.targets[i]);
        }

        let features = Tensor::<B, 1>::from_data(x_data.as_slice(), device).reshape([
            indices.len(),
            self.n_steps,
            self.n_features,
        ]);
        let targets =
            Tensor::<B, 1>::from_data(y_data.as_slice(), device).reshape([indices.len(), 1]);

        (features, targets)
    }

    /// Tensors for every sample, in order
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let indices: Vec<usize> = (0..self.len()).collect();
        self.batch_tensors(&indices, device)
    }
}
