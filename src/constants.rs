// Historical data window
pub const HISTORY_START: &str = "2012-01-01";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Year-based train/test split: train on [TRAIN_START_YEAR, TRAIN_END_YEAR], test on later years
pub const TRAIN_START_YEAR: i32 = 2016;
pub const TRAIN_END_YEAR: i32 = 2023;

// Univariate models read a single price column
pub const UNIVARIATE_COLUMN: &str = "high";
pub const N_STEPS: usize = 1; // Number of time steps to look back

// Multivariate model
pub const MV_FEATURES: usize = 6;
pub const MV_N_STEPS: usize = 1;
pub const MV_FEATURE_COLUMNS: [&str; MV_FEATURES] =
    ["open", "high", "rsi", "ema_fast", "ema_medium", "ema_slow"];
pub const MV_TARGET_COLUMN: &str = "target";
pub const RSI_LENGTH: usize = 15;
pub const EMA_FAST_LENGTH: usize = 20;
pub const EMA_MEDIUM_LENGTH: usize = 100;
pub const EMA_SLOW_LENGTH: usize = 150;

// Model parameters
pub const HIDDEN_UNITS: usize = 125;
pub const EPOCHS: usize = 10;
pub const BATCH_SIZE: usize = 32;
pub const MV_BATCH_SIZE: usize = 16;
pub const RMSPROP_LEARNING_RATE: f64 = 0.001;
pub const ADAM_LEARNING_RATE: f64 = 0.001;
pub const SHUFFLE_SEED: u64 = 42;

// Forecast
pub const FUTURE_STEPS: usize = 25;

// Model paths
pub const MODEL_OUTPUT_DIR: &str = "output";
pub const MODEL_FILE_EXTENSION: &str = "bin";
pub const METADATA_FILE_EXTENSION: &str = "meta.json";

// Service
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CSV_DIR: &str = "data";
