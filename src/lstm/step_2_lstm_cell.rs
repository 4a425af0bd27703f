// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// LSTM layer with the four gates computed by one pair of projections
///
/// The input projection produces `[i, f, g, o]` stacked along the feature
/// axis, each `hidden_size` wide.
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,

    input_gates: Linear<B>,
    recurrent_gates: Linear<B>,
}

impl<B: Backend> LstmCell<B> {
    /// Create a new LSTM layer
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of input features
    /// * `hidden_size` - Size of hidden and cell state
    /// * `device` - Device to place tensors on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let input_gates = LinearConfig::new(input_size, 4 * hidden_size).init(device);
        let recurrent_gates = LinearConfig::new(hidden_size, 4 * hidden_size)
            .with_bias(false)
            .init(device);

        Self {
            input_size,
            hidden_size,
            input_gates,
            recurrent_gates,
        }
    }

    /// Forward pass through the LSTM layer
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

        // Initialize hidden and cell states
        let mut h = Tensor::<B, 2>::zeros([batch_size, self.hidden_size], &device);
        let mut c = Tensor::<B, 2>::zeros([batch_size, self.hidden_size], &device);
        let mut outputs = Vec::with_capacity(sequence_length);

        for t in 0..sequence_length {
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            let gates = self.input_gates.forward(x_t) + self.recurrent_gates.forward(h.clone());
            let gate = |index: usize| gates.clone().narrow(1, index * self.hidden_size, self.hidden_size);

            let i_t = activation::sigmoid(gate(0));
            let f_t = activation::sigmoid(gate(1));
            let g_t = activation::tanh(gate(2));
            let o_t = activation::sigmoid(gate(3));

            c = f_t * c + i_t * g_t;
            h = o_t * activation::tanh(c.clone());

            outputs.push(h.clone().reshape([batch_size, 1, self.hidden_size]));
        }

        Tensor::cat(outputs, 1)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
