pub mod batting;
pub mod bowling;
pub mod config;
pub mod dataset;
pub mod delivery;
pub mod encoding;
pub mod error;
pub mod export;
pub mod features;
pub mod head_to_head;
pub mod logging;
pub mod metrics;
pub mod predictor;
pub mod sequence;
pub mod simulator;
pub mod stats;

pub use dataset::DeliveryStore;
pub use error::{CricketError, Result};
pub use stats::Analysis;
