// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_rnn_cell::SimpleRnn;
use crate::model_family::SequenceRegressor;

/// Recurrent layer followed by a dense output, reading the last hidden state
#[derive(Module, Debug)]
pub struct RnnRegressor<B: Backend> {
    hidden_size: usize,
    rnn: SimpleRnn<B>,
    output_layer: Linear<B>,
}

impl<B: Backend> RnnRegressor<B> {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, device: &B::Device) -> Self {
        Self {
            hidden_size,
            rnn: SimpleRnn::new(input_size, hidden_size, device),
            output_layer: LinearConfig::new(hidden_size, output_size).init(device),
        }
    }

    /// `x` has shape [batch_size, sequence_length, input_size]; returns [batch_size, output_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, sequence_length, _] = x.dims();

        let last_output = self
            .rnn
            .forward(x)
            .narrow(1, sequence_length - 1, 1)
            .reshape([batch_size, self.hidden_size]);

        self.output_layer.forward(last_output)
    }
}

impl<B: Backend> SequenceRegressor<B> for RnnRegressor<B> {
    fn regress(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward(x)
    }
}

/// Configuration for the RnnRegressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnRegressorConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl RnnRegressorConfig {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size: 1,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RnnRegressor<B> {
        RnnRegressor::new(self.input_size, self.hidden_size, self.output_size, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_rnn_regressor_output_shape() {
        let device = NdArrayDevice::Cpu;
        let model = RnnRegressorConfig::new(1, 16).init::<NdArray>(&device);
        let x = Tensor::<NdArray, 3>::zeros([7, 1, 1], &device);

        assert_eq!(model.regress(x).dims(), [7, 1]);
    }
}
