// Library exports for testing and reuse

pub mod chips;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod raster;
pub mod train;
pub mod trainset;
pub mod validate;
pub mod vector;

// Re-export commonly used types
pub use config::{read_config_file, TrainConfig};
pub use error::{Result, TrainError};
pub use train::run;
pub use trainset::{ChipTrainsetBuilder, TrainsetBuilder, TrainsetRequest};
pub use validate::validate_rasters_band_count;
