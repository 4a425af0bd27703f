use anyhow::{bail, Context, Result};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

use crate::constants::{METADATA_FILE_EXTENSION, MODEL_FILE_EXTENSION};
use crate::lstm::step_3_lstm_model_arch::{LstmRegressor, LstmRegressorConfig};
use crate::model_family::ModelKind;
use crate::rnn::step_3_rnn_model_arch::{RnnRegressor, RnnRegressorConfig};

type Recorder = BinFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub timestamp: u64,
    pub kind: ModelKind,
    pub ticker: String,
    pub reference_date: String,
    pub input_size: usize,
    pub hidden_size: usize,
    pub n_steps: usize,
    pub final_loss: Option<f64>,
    pub test_rmse: Option<f64>,
}

impl ModelMetadata {
    pub fn new(
        kind: ModelKind,
        ticker: &str,
        reference_date: &str,
        input_size: usize,
        hidden_size: usize,
        n_steps: usize,
    ) -> Self {
        Self {
            version: crate::built_info::PKG_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            kind,
            ticker: ticker.to_string(),
            reference_date: reference_date.to_string(),
            input_size,
            hidden_size,
            n_steps,
            final_loss: None,
            test_rmse: None,
        }
    }

    pub fn with_final_loss(mut self, loss: Option<f64>) -> Self {
        self.final_loss = loss;
        self
    }

    pub fn with_test_rmse(mut self, rmse: Option<f64>) -> Self {
        self.test_rmse = rmse;
        self
    }
}

/// Save the model weights to `<path>.bin` and the metadata to `<path>.meta.json`
pub fn save_model_with_metadata<B: Backend, M: Module<B>>(
    model: &M,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).context("Failed to create model parent directory")?;
    }
    // Save model artifact
    let model_path = path.as_ref().with_extension(MODEL_FILE_EXTENSION);
    model
        .clone()
        .save_file::<Recorder, _>(&model_path, &Default::default())
        .context("Failed to save model")?;
    // Save metadata
    let metadata_path = path.as_ref().with_extension(METADATA_FILE_EXTENSION);
    let metadata_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&metadata_path, metadata_json).context("Failed to write metadata file")?;
    Ok(())
}

/// Read the metadata sidecar of a saved model
pub fn load_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    let metadata_path = path.as_ref().with_extension(METADATA_FILE_EXTENSION);
    let metadata_json =
        std::fs::read_to_string(&metadata_path).context("Failed to read metadata file")?;
    serde_json::from_str(&metadata_json).context("Failed to parse metadata")
}

fn expect_kind(metadata: &ModelMetadata, expected: &[ModelKind]) -> Result<()> {
    if !expected.contains(&metadata.kind) {
        bail!("Saved model is a {} model, expected one of {:?}", metadata.kind, expected);
    }
    Ok(())
}

/// Load a saved RNN and its metadata
pub fn load_rnn_regressor<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(RnnRegressor<B>, ModelMetadata)> {
    let metadata = load_metadata(&path)?;
    expect_kind(&metadata, &[ModelKind::Rnn])?;

    let model_path = path.as_ref().with_extension(MODEL_FILE_EXTENSION);
    let model = RnnRegressorConfig::new(metadata.input_size, metadata.hidden_size)
        .init::<B>(device)
        .load_file::<Recorder, _>(&model_path, &Default::default(), device)
        .context("Failed to load model")?;
    Ok((model, metadata))
}

/// Load a saved univariate or multivariate LSTM and its metadata
pub fn load_lstm_regressor<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(LstmRegressor<B>, ModelMetadata)> {
    let metadata = load_metadata(&path)?;
    expect_kind(&metadata, &[ModelKind::Lstm, ModelKind::MultivariateLstm])?;

    let model_path = path.as_ref().with_extension(MODEL_FILE_EXTENSION);
    let model = LstmRegressorConfig::new(metadata.input_size, metadata.hidden_size)
        .init::<B>(device)
        .load_file::<Recorder, _>(&model_path, &Default::default(), device)
        .context("Failed to load model")?;
    Ok((model, metadata))
}

/// Check that both artifact files exist and the metadata was written by this crate version
pub fn is_model_version_current(path: impl AsRef<Path>, current_version: &str) -> bool {
    let model_path = path.as_ref().with_extension(MODEL_FILE_EXTENSION);
    if !model_path.exists() {
        return false;
    }
    match load_metadata(&path) {
        Ok(metadata) => metadata.version == current_version,
        Err(_) => false,
    }
}
