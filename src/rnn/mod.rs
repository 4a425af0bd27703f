pub mod step_2_rnn_cell;
pub mod step_3_rnn_model_arch;
