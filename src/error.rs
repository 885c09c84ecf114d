use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Cannot read rasters directory {path}: {source}")]
    RastersDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Config file {path} has no [{section}] section")]
    MissingSection { section: String, path: PathBuf },

    #[error("Option '{key}' appears more than once in [{section}] of {path}")]
    DuplicateOption {
        key: String,
        section: String,
        path: PathBuf,
    },

    #[error("Invalid value for config option '{key}': {value:?} ({reason})")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Rasters must have exactly {expected} bands (was {count}): {path}")]
    WrongBandCount {
        path: PathBuf,
        count: usize,
        expected: usize,
    },

    #[error("Raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Pixel size is non-positive: {0}")]
    InvalidPixelSize(f64),

    #[error("Invalid compression type: {0}")]
    InvalidCompression(String),

    #[error("Vector file has no layers: {0}")]
    NoVectorLayer(PathBuf),
}

pub type Result<T> = std::result::Result<T, TrainError>;
