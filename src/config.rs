//! Command line and environment configuration of the service

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::constants::{
    ADAM_LEARNING_RATE, BATCH_SIZE, DATE_FORMAT, DEFAULT_CSV_DIR, DEFAULT_HOST, DEFAULT_PORT,
    EPOCHS, FUTURE_STEPS, HIDDEN_UNITS, HISTORY_START, MODEL_OUTPUT_DIR, MV_BATCH_SIZE, N_STEPS,
    RMSPROP_LEARNING_RATE, TRAIN_END_YEAR, TRAIN_START_YEAR,
};
use crate::pipeline::PipelineSettings;
use crate::training::step_4_train_model::TrainingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataSourceKind {
    /// Yahoo Finance daily quotes
    Yahoo,
    /// `<TICKER>.csv` files in a local directory
    Csv,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "claw-foxy-forecast", version, about = "Stock price forecasting service")]
pub struct ServiceConfig {
    #[arg(long, env = "FORECAST_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "FORECAST_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "FORECAST_DATA_SOURCE", value_enum, default_value_t = DataSourceKind::Yahoo)]
    pub data_source: DataSourceKind,

    /// Directory of `<TICKER>.csv` files for the csv data source
    #[arg(long, env = "FORECAST_CSV_DIR", default_value = DEFAULT_CSV_DIR)]
    pub csv_dir: PathBuf,

    /// Where trained models are written
    #[arg(long, env = "FORECAST_OUTPUT_DIR", default_value = MODEL_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// First date of the fetched history
    #[arg(long, env = "FORECAST_HISTORY_START", default_value = HISTORY_START, value_parser = parse_date)]
    pub history_start: NaiveDate,

    #[arg(long, env = "FORECAST_TRAIN_START_YEAR", default_value_t = TRAIN_START_YEAR)]
    pub train_start_year: i32,

    #[arg(long, env = "FORECAST_TRAIN_END_YEAR", default_value_t = TRAIN_END_YEAR)]
    pub train_end_year: i32,

    #[arg(long, env = "FORECAST_N_STEPS", default_value_t = N_STEPS)]
    pub n_steps: usize,

    #[arg(long, env = "FORECAST_EPOCHS", default_value_t = EPOCHS)]
    pub epochs: usize,

    #[arg(long, env = "FORECAST_BATCH_SIZE", default_value_t = BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, env = "FORECAST_MV_BATCH_SIZE", default_value_t = MV_BATCH_SIZE)]
    pub mv_batch_size: usize,

    #[arg(long, env = "FORECAST_HIDDEN_UNITS", default_value_t = HIDDEN_UNITS)]
    pub hidden_units: usize,

    /// RMSprop learning rate of the univariate models
    #[arg(long, env = "FORECAST_LEARNING_RATE", default_value_t = RMSPROP_LEARNING_RATE)]
    pub learning_rate: f64,

    /// Adam learning rate of the multivariate model
    #[arg(long, env = "FORECAST_MV_LEARNING_RATE", default_value_t = ADAM_LEARNING_RATE)]
    pub mv_learning_rate: f64,

    #[arg(long, env = "FORECAST_FUTURE_STEPS", default_value_t = FUTURE_STEPS)]
    pub future_steps: usize,

    /// Load saved models for the same ticker and reference date instead of retraining
    #[arg(long, env = "FORECAST_REUSE_MODELS")]
    pub reuse_models: bool,

    /// Do not write trained models to the output directory
    #[arg(long, env = "FORECAST_NO_SAVE")]
    pub no_save: bool,
}

impl ServiceConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.train_start_year > self.train_end_year {
            return Err(format!(
                "train start year {} is after train end year {}",
                self.train_start_year, self.train_end_year
            ));
        }
        if self.n_steps == 0 {
            return Err("n-steps must be at least 1".to_string());
        }
        if self.batch_size == 0 || self.mv_batch_size == 0 {
            return Err("batch sizes must be greater than zero".to_string());
        }
        if self.hidden_units == 0 {
            return Err("hidden units must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let mut univariate_training = TrainingConfig::univariate();
        univariate_training.epochs = self.epochs;
        univariate_training.batch_size = self.batch_size;
        univariate_training.learning_rate = self.learning_rate;

        let mut multivariate_training = TrainingConfig::multivariate();
        multivariate_training.epochs = self.epochs;
        multivariate_training.batch_size = self.mv_batch_size;
        multivariate_training.learning_rate = self.mv_learning_rate;

        PipelineSettings {
            train_start_year: self.train_start_year,
            train_end_year: self.train_end_year,
            n_steps: self.n_steps,
            hidden_units: self.hidden_units,
            future_steps: self.future_steps,
            univariate_training,
            multivariate_training,
            output_dir: self.output_dir.clone(),
            save_models: !self.no_save,
            reuse_models: self.reuse_models,
            ..PipelineSettings::default()
        }
    }
}
