// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_lstm_cell::LstmCell;
use crate::model_family::SequenceRegressor;

/// LSTM model architecture for next-value price regression
///
/// The same architecture serves the univariate model (`input_size = 1`) and
/// the multivariate model (one input per engineered feature).
#[derive(Module, Debug)]
pub struct LstmRegressor<B: Backend> {
    hidden_size: usize,
    lstm: LstmCell<B>,
    output_layer: Linear<B>,
}

impl<B: Backend> LstmRegressor<B> {
    /// Create a new LSTM regressor
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of input features
    /// * `hidden_size` - Size of hidden state
    /// * `output_size` - Size of output (usually 1 for regression)
    /// * `device` - Device to place tensors on
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        device: &B::Device,
    ) -> Self {
        let lstm = LstmCell::new(input_size, hidden_size, device);
        let output_layer = LinearConfig::new(hidden_size, output_size).init(device);

        Self {
            hidden_size,
            lstm,
            output_layer,
        }
    }

    /// Forward pass through the model
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape [batch_size, sequence_length, input_size]
    ///
    /// # Returns
    ///
    /// Returns the output tensor of shape [batch_size, output_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, sequence_length, _] = x.dims();

        // We only need the last output from the sequence
        let last_output = self
            .lstm
            .forward(x)
            .narrow(1, sequence_length - 1, 1)
            .reshape([batch_size, self.hidden_size]);

        self.output_layer.forward(last_output)
    }
}

impl<B: Backend> SequenceRegressor<B> for LstmRegressor<B> {
    fn regress(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward(x)
    }
}

/// Configuration for the LstmRegressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmRegressorConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl LstmRegressorConfig {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size: 1,
        }
    }

    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmRegressor<B> {
        LstmRegressor::new(self.input_size, self.hidden_size, self.output_size, device)
    }
}
