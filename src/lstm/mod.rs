/// # LSTM Implementation Module
///
/// 1. **step_2_lstm_cell**: LSTM layer with fused gate projections
/// 2. **step_3_lstm_model_arch**: LSTM layer plus dense output, shared by the
///    univariate and multivariate models
pub mod step_2_lstm_cell;
pub mod step_3_lstm_model_arch;
