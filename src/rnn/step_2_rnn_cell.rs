// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// Elman recurrent layer: `h_t = tanh(W x_t + U h_{t-1} + b)`
#[derive(Module, Debug)]
pub struct SimpleRnn<B: Backend> {
    input_size: usize,
    hidden_size: usize,

    // Input projection carries the bias
    input_weights: Linear<B>,
    recurrent_weights: Linear<B>,
}

impl<B: Backend> SimpleRnn<B> {
    /// Create a new recurrent layer
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of input features
    /// * `hidden_size` - Size of hidden state
    /// * `device` - Device to place tensors on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let input_weights = LinearConfig::new(input_size, hidden_size).init(device);
        let recurrent_weights = LinearConfig::new(hidden_size, hidden_size)
            .with_bias(false)
            .init(device);

        Self {
            input_size,
            hidden_size,
            input_weights,
            recurrent_weights,
        }
    }

    /// Forward pass through the layer
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape [batch_size, sequence_length, input_size]
    ///
    /// # Returns
    ///
    /// Returns the hidden states of shape [batch_size, sequence_length, hidden_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let device = x.device();
        let [batch_size, sequence_length, _] = x.dims();

        let mut h = Tensor::<B, 2>::zeros([batch_size, self.hidden_size], &device);
        let mut outputs = Vec::with_capacity(sequence_length);

        for t in 0..sequence_length {
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            h = activation::tanh(self.input_weights.forward(x_t) + self.recurrent_weights.forward(h));
            outputs.push(h.clone().reshape([batch_size, 1, self.hidden_size]));
        }

        Tensor::cat(outputs, 1)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
