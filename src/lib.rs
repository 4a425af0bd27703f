pub mod api;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod lstm;
pub mod model_family;
pub mod pipeline;
pub mod rnn;
#[cfg(test)]
pub mod test;
pub mod training;
pub mod util {
    pub mod feature_engineering;
    pub mod model_utils;
    pub mod pre_processor;
}

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
