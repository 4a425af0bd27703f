use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recurrent network that maps a window to a single next value
pub trait SequenceRegressor<B: Backend> {
    /// `x` has shape `[batch, n_steps, n_features]`; the result is `[batch, 1]`
    fn regress(&self, x: Tensor<B, 3>) -> Tensor<B, 2>;
}

/// The three models trained for every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Rnn,
    Lstm,
    MultivariateLstm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Rnn, ModelKind::Lstm, ModelKind::MultivariateLstm];

    /// Artifact file stem
    pub fn file_stem(self) -> &'static str {
        match self {
            ModelKind::Rnn => "model_rnn",
            ModelKind::Lstm => "model_lstm",
            ModelKind::MultivariateLstm => "model_mv_lstm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Rnn => "RNN",
            ModelKind::Lstm => "LSTM",
            ModelKind::MultivariateLstm => "multivariate LSTM",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
