use crate::chips::{ChipGrid, ChipWindow};
use crate::config::TrainConfig;
use crate::error::{Result, TrainError};
use crate::raster::{self, RasterMetadata};
use crate::vector::{read_label_polygons, LabelPolygons};
use gdal::vector::Geometry;
use gdal::Dataset;
use log::{debug, info, warn};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the directory created under the temp dir
pub const TRAINSET_DIR: &str = "trainset";

/// Everything a training-set builder receives once rasters are validated
#[derive(Debug, Clone)]
pub struct TrainsetRequest<'a> {
    pub rasters: &'a [PathBuf],
    pub vector: &'a Path,
    pub config: &'a TrainConfig,
    pub temp_dir: &'a Path,
    pub seed: Option<u64>,
}

/// Builds training data from validated rasters and vector labels
pub trait TrainsetBuilder {
    fn build(&self, request: &TrainsetRequest<'_>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainsetOptions {
    pub size: usize,
    pub step_size: usize,
    pub label_threshold: f64,
    pub balancing_multiplier: f64,
    pub validation_size: f64,
    pub test_size: f64,
    pub rescale_intensity: bool,
    pub lower_cut: f64,
    pub upper_cut: f64,
    pub compression: String,
}

impl Default for TrainsetOptions {
    fn default() -> Self {
        Self {
            size: 256,
            step_size: 256,
            label_threshold: 0.0,
            balancing_multiplier: 1.0,
            validation_size: 0.15,
            test_size: 0.15,
            rescale_intensity: true,
            lower_cut: 2.0,
            upper_cut: 98.0,
            compression: "DEFLATE".to_string(),
        }
    }
}

impl TrainsetOptions {
    /// Read builder options from the `[train]` mapping, falling back to defaults.
    /// Keys the builder does not know about are ignored.
    pub fn from_config(config: &TrainConfig) -> Result<Self> {
        let defaults = Self::default();

        let size = parse_option(config, "size")?.unwrap_or(defaults.size);
        let options = Self {
            size,
            step_size: parse_option(config, "step_size")?.unwrap_or(size),
            label_threshold: parse_option(config, "label_threshold")?
                .unwrap_or(defaults.label_threshold),
            balancing_multiplier: parse_option(config, "balancing_multiplier")?
                .unwrap_or(defaults.balancing_multiplier),
            validation_size: parse_option(config, "validation_size")?
                .unwrap_or(defaults.validation_size),
            test_size: parse_option(config, "test_size")?.unwrap_or(defaults.test_size),
            rescale_intensity: match config.get("rescale_intensity") {
                Some(value) => parse_bool("rescale_intensity", value)?,
                None => defaults.rescale_intensity,
            },
            lower_cut: parse_option(config, "lower_cut")?.unwrap_or(defaults.lower_cut),
            upper_cut: parse_option(config, "upper_cut")?.unwrap_or(defaults.upper_cut),
            compression: config
                .get("compression")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.compression),
        };

        options.validate(config)?;
        Ok(options)
    }

    fn validate(&self, config: &TrainConfig) -> Result<()> {
        let invalid = |key: &str, reason: &str| TrainError::InvalidConfigValue {
            key: key.to_string(),
            value: config.get(key).cloned().unwrap_or_default(),
            reason: reason.to_string(),
        };

        if self.size == 0 {
            return Err(invalid("size", "must be positive"));
        }
        if self.step_size == 0 {
            return Err(invalid("step_size", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.label_threshold) {
            return Err(invalid("label_threshold", "must be in [0, 1)"));
        }
        if !(self.balancing_multiplier >= 0.0) {
            return Err(invalid("balancing_multiplier", "must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.validation_size) {
            return Err(invalid("validation_size", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.test_size) {
            return Err(invalid("test_size", "must be in [0, 1)"));
        }
        if self.validation_size + self.test_size >= 1.0 {
            return Err(invalid(
                "test_size",
                "validation_size + test_size must be below 1",
            ));
        }
        if !(0.0..=100.0).contains(&self.lower_cut) {
            return Err(invalid("lower_cut", "must be a percentile in [0, 100]"));
        }
        if !(0.0..=100.0).contains(&self.upper_cut) || self.upper_cut <= self.lower_cut {
            return Err(invalid("upper_cut", "must be a percentile above lower_cut"));
        }
        raster::validate_compression(&self.compression)
    }
}

fn parse_option<T: FromStr>(config: &TrainConfig, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| TrainError::InvalidConfigValue {
                key: key.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
    }
}

/// Boolean spellings accepted by INI configs
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(TrainError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "not a boolean".to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }
}

/// A chip window with its label coverage
#[derive(Debug, Clone, PartialEq)]
pub struct ChipCandidate {
    pub raster_idx: usize,
    pub window: ChipWindow,
    pub coverage: f64,
    pub positive: bool,
}

impl ChipCandidate {
    pub fn class_dir(&self) -> &'static str {
        if self.positive {
            "t"
        } else {
            "f"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainsetSummary {
    pub candidates: usize,
    pub positives: usize,
    pub negatives: usize,
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Keep all positive chips and at most `round(positives * multiplier)` random negatives
pub fn balance_candidates(
    candidates: Vec<ChipCandidate>,
    multiplier: f64,
    rng: &mut StdRng,
) -> Vec<ChipCandidate> {
    let (positives, mut negatives): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(|c| c.positive);

    let keep = ((positives.len() as f64) * multiplier).round() as usize;
    negatives.shuffle(rng);
    negatives.truncate(keep);

    debug!(
        "Balanced chips: {} positives, {} negatives kept",
        positives.len(),
        negatives.len()
    );

    let mut selected = positives;
    selected.extend(negatives);
    selected
}

/// Shuffle samples and assign test, validation and train splits, in that order
pub fn split_samples(
    mut samples: Vec<ChipCandidate>,
    validation_size: f64,
    test_size: f64,
    rng: &mut StdRng,
) -> Vec<(Split, ChipCandidate)> {
    samples.shuffle(rng);

    let n = samples.len();
    let n_test = ((n as f64) * test_size).round() as usize;
    let n_test = n_test.min(n);
    let n_validation = (((n as f64) * validation_size).round() as usize).min(n - n_test);

    samples
        .into_iter()
        .enumerate()
        .map(|(i, sample)| {
            let split = if i < n_test {
                Split::Test
            } else if i < n_test + n_validation {
                Split::Validation
            } else {
                Split::Train
            };
            (split, sample)
        })
        .collect()
}

/// Percentile of sorted values with linear interpolation between ranks
fn percentile(sorted: &[f32], p: f64) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Stretch a band between its `lower_cut` and `upper_cut` percentiles onto 0..=255.
/// Nodata and NaN pixels are excluded from the percentiles and written as 0.
pub fn rescale_band(
    band: &Array2<f32>,
    lower_cut: f64,
    upper_cut: f64,
    nodata: Option<f64>,
) -> Array2<u8> {
    let is_valid = |v: f32| !v.is_nan() && nodata.map_or(true, |nd| (v as f64) != nd);

    let mut values: Vec<f32> = band.iter().copied().filter(|&v| is_valid(v)).collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let low = percentile(&values, lower_cut);
    let high = percentile(&values, upper_cut);
    let range = high - low;

    band.mapv(|v| {
        if !is_valid(v) || range <= 0.0 {
            0
        } else {
            (((v - low) / range).clamp(0.0, 1.0) * 255.0).round() as u8
        }
    })
}

/// Polygon covering `window` in the raster's world coordinates
fn window_geometry(metadata: &RasterMetadata, window: &ChipWindow) -> Result<Geometry> {
    let corners = window.corners();
    let ring: Vec<String> = corners
        .iter()
        .chain(corners.first())
        .map(|&(x, y)| {
            let (wx, wy) = metadata.pixel_to_world(x, y);
            format!("{} {}", wx, wy)
        })
        .collect();
    Ok(Geometry::from_wkt(&format!("POLYGON(({}))", ring.join(",")))?)
}

/// Fraction of `window` covered by `labels`, in [0, 1]
fn window_coverage(window: &Geometry, labels: Option<&Geometry>) -> f64 {
    let labels = match labels {
        Some(l) => l,
        None => return 0.0,
    };
    let area = window.area();
    if area <= 0.0 || !window.intersects(labels) {
        return 0.0;
    }
    window
        .intersection(labels)
        .map(|overlap| (overlap.area() / area).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Slices rasters into chips, labels them against the vector polygons and writes
/// balanced train/validation/test GeoTIFF chips under `<temp_dir>/trainset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChipTrainsetBuilder;

impl ChipTrainsetBuilder {
    pub fn build_trainset(&self, request: &TrainsetRequest<'_>) -> Result<TrainsetSummary> {
        let options = TrainsetOptions::from_config(request.config)?;
        info!(
            "Building training set: chip size {}, step {}",
            options.size, options.step_size
        );

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let labels = read_label_polygons(request.vector)?;

        let mut metadata = Vec::with_capacity(request.rasters.len());
        let mut candidates = Vec::new();
        for (raster_idx, raster_path) in request.rasters.iter().enumerate() {
            let (meta, raster_candidates) =
                label_raster(raster_idx, raster_path, &labels, &options)?;
            candidates.extend(raster_candidates);
            metadata.push(meta);
        }

        let positives = candidates.iter().filter(|c| c.positive).count();
        let mut summary = TrainsetSummary {
            candidates: candidates.len(),
            positives,
            ..Default::default()
        };
        if positives == 0 {
            warn!("No chip intersects the label polygons, training set will be empty");
        }

        let selected = balance_candidates(candidates, options.balancing_multiplier, &mut rng);
        summary.negatives = selected.len() - positives;

        let samples = split_samples(
            selected,
            options.validation_size,
            options.test_size,
            &mut rng,
        );
        for (split, _) in &samples {
            match split {
                Split::Train => summary.train += 1,
                Split::Validation => summary.validation += 1,
                Split::Test => summary.test += 1,
            }
        }

        let output_dir = request.temp_dir.join(TRAINSET_DIR);
        write_samples(&output_dir, request.rasters, &metadata, &samples, &options)?;

        info!(
            "Training set written to {}: {} train, {} validation, {} test ({} positive, {} negative)",
            output_dir.display(),
            summary.train,
            summary.validation,
            summary.test,
            summary.positives,
            summary.negatives
        );
        Ok(summary)
    }
}

impl TrainsetBuilder for ChipTrainsetBuilder {
    fn build(&self, request: &TrainsetRequest<'_>) -> Result<()> {
        self.build_trainset(request).map(|_| ())
    }
}

fn label_raster(
    raster_idx: usize,
    raster_path: &Path,
    labels: &LabelPolygons,
    options: &TrainsetOptions,
) -> Result<(RasterMetadata, Vec<ChipCandidate>)> {
    debug!("Labeling chips of {}", raster_path.display());
    let dataset = Dataset::open(raster_path)?;
    let metadata = raster::extract_metadata_from_dataset(&dataset)?;

    let raster_srs = dataset.spatial_ref().ok();
    let polygons = labels.in_crs(raster_srs.as_ref())?;

    let grid = ChipGrid::new(metadata.width, metadata.height, options.size, options.step_size);
    if grid.total_chips == 0 {
        warn!(
            "{} ({}x{}) is smaller than a {}px chip, skipping",
            raster_path.display(),
            metadata.width,
            metadata.height,
            options.size
        );
    }

    let mut candidates = Vec::with_capacity(grid.total_chips);
    for window in grid.iter() {
        let geometry = window_geometry(&metadata, &window)?;
        let coverage = window_coverage(&geometry, polygons.as_ref());
        candidates.push(ChipCandidate {
            raster_idx,
            window,
            coverage,
            positive: coverage > options.label_threshold,
        });
    }

    debug!(
        "{}: {} chips, {} positive",
        raster_path.display(),
        candidates.len(),
        candidates.iter().filter(|c| c.positive).count()
    );
    Ok((metadata, candidates))
}

/// `<raster index>_<raster stem>_<x>_<y>.tif`; the index keeps rasters sharing a stem apart
pub fn chip_file_name(raster_idx: usize, raster_path: &Path, window: &ChipWindow) -> String {
    let stem = raster_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_{}_{}_{}.tif", raster_idx, stem, window.x, window.y)
}

fn write_samples(
    output_dir: &Path,
    rasters: &[PathBuf],
    metadata: &[RasterMetadata],
    samples: &[(Split, ChipCandidate)],
    options: &TrainsetOptions,
) -> Result<()> {
    // Chips of an earlier build would leak across splits
    if output_dir.exists() {
        debug!("Removing previous training set {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }
    for split in [Split::Train, Split::Validation, Split::Test] {
        for class_dir in ["t", "f"] {
            fs::create_dir_all(output_dir.join(split.dir_name()).join(class_dir))?;
        }
    }

    for (raster_idx, raster_path) in rasters.iter().enumerate() {
        let raster_samples: Vec<_> = samples
            .iter()
            .filter(|(_, c)| c.raster_idx == raster_idx)
            .collect();
        if raster_samples.is_empty() {
            continue;
        }

        let dataset = Dataset::open(raster_path)?;
        let meta = &metadata[raster_idx];
        debug!(
            "Writing {} chips from {}",
            raster_samples.len(),
            raster_path.display()
        );

        for (split, candidate) in raster_samples {
            let window = &candidate.window;
            let chip_path = output_dir
                .join(split.dir_name())
                .join(candidate.class_dir())
                .join(chip_file_name(raster_idx, raster_path, window));

            let bands = raster::read_window(&dataset, window)?;
            let geotransform = meta.window_geotransform(window);

            if options.rescale_intensity {
                let rescaled: Vec<Array2<u8>> = bands
                    .par_iter()
                    .map(|band| {
                        rescale_band(band, options.lower_cut, options.upper_cut, meta.nodata)
                    })
                    .collect();
                raster::write_chip(
                    &chip_path,
                    &rescaled,
                    &geotransform,
                    &meta.projection,
                    &options.compression,
                )?;
            } else {
                raster::write_chip(
                    &chip_path,
                    &bands,
                    &geotransform,
                    &meta.projection,
                    &options.compression,
                )?;
            }
        }
    }

    Ok(())
}
