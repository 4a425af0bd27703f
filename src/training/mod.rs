/// # Training and Inference Module
///
/// Shared by the RNN and LSTM models:
///
/// 1. **step_1_tensor_preparation**: windowed samples and batch tensors
/// 2. **step_4_train_model**: mini-batch training with MSE loss
/// 3. **step_5_prediction**: batched and recursive prediction, RMSE
/// 4. **step_6_model_serialization**: model weights plus JSON metadata
///
pub mod step_1_tensor_preparation;
pub mod step_4_train_model;
pub mod step_5_prediction;
pub mod step_6_model_serialization;
