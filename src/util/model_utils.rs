use anyhow::{Context, Result};
use burn::module::Module;
use burn::prelude::Backend;
use log::info;
use std::path::{Path, PathBuf};

use crate::model_family::ModelKind;
use crate::training::step_6_model_serialization::{
    is_model_version_current, save_model_with_metadata, ModelMetadata,
};

/// Directory holding the artifacts trained for one ticker and reference date
pub fn get_model_dir(output_dir: &Path, ticker: &str, reference_date: &str) -> PathBuf {
    output_dir.join(ticker.to_uppercase()).join(reference_date)
}

/// Artifact base path (without extension) for a model
pub fn get_model_path(
    output_dir: &Path,
    ticker: &str,
    reference_date: &str,
    kind: ModelKind,
) -> PathBuf {
    get_model_dir(output_dir, ticker, reference_date).join(kind.file_stem())
}

/// Save a trained model with its metadata under `output_dir`
pub fn save_trained_model<B: Backend, M: Module<B>>(
    model: &M,
    output_dir: &Path,
    metadata: &ModelMetadata,
) -> Result<PathBuf> {
    let model_path = get_model_path(
        output_dir,
        &metadata.ticker,
        &metadata.reference_date,
        metadata.kind,
    );
    save_model_with_metadata(model, metadata, &model_path).context("Failed to save model")?;

    info!("Model saved successfully to: {}", model_path.display());
    Ok(model_path)
}

/// Path of a reusable artifact, if one exists for this crate version
pub fn find_current_model(
    output_dir: &Path,
    ticker: &str,
    reference_date: &str,
    kind: ModelKind,
) -> Option<PathBuf> {
    let model_path = get_model_path(output_dir, ticker, reference_date, kind);
    is_model_version_current(&model_path, crate::built_info::PKG_VERSION).then_some(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::step_3_lstm_model_arch::LstmRegressorConfig;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use tempfile::tempdir;

    #[test]
    fn test_model_paths() {
        let path = get_model_path(Path::new("output"), "aapl", "2024-01-02", ModelKind::Rnn);
        assert_eq!(path, PathBuf::from("output/AAPL/2024-01-02/model_rnn"));
    }

    #[test]
    fn test_save_and_find_trained_model() -> Result<()> {
        let temp_dir = tempdir()?;
        let device = NdArrayDevice::Cpu;
        let model = LstmRegressorConfig::new(1, 4).init::<NdArray>(&device);
        let metadata = ModelMetadata::new(ModelKind::Lstm, "AAPL", "2024-01-02", 1, 4, 1);

        assert!(find_current_model(temp_dir.path(), "AAPL", "2024-01-02", ModelKind::Lstm).is_none());

        let saved_path = save_trained_model(&model, temp_dir.path(), &metadata)?;
        assert!(saved_path.with_extension("bin").exists());

        let found = find_current_model(temp_dir.path(), "AAPL", "2024-01-02", ModelKind::Lstm);
        assert_eq!(found, Some(saved_path));
        assert!(find_current_model(temp_dir.path(), "AAPL", "2024-01-02", ModelKind::Rnn).is_none());
        Ok(())
    }
}
