use crate::chips::ChipWindow;
use crate::error::{Result, TrainError};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager};
use log::debug;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions recognized as rasters (compared case-insensitively)
pub const RASTER_EXTENSIONS: [&str; 5] = ["tif", "tiff", "jp2", "img", "vrt"];

#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    /// Map a pixel coordinate to world coordinates through the geotransform
    pub fn pixel_to_world(&self, x: f64, y: f64) -> (f64, f64) {
        let gt = &self.geotransform;
        (gt[0] + x * gt[1] + y * gt[2], gt[3] + x * gt[4] + y * gt[5])
    }

    /// Geotransform of a chip cut at `window`
    pub fn window_geotransform(&self, window: &ChipWindow) -> [f64; 6] {
        let (origin_x, origin_y) = self.pixel_to_world(window.x as f64, window.y as f64);
        let gt = &self.geotransform;
        [origin_x, gt[1], gt[2], origin_y, gt[4], gt[5]]
    }
}

/// List raster files in `dir`, sorted by path. Subdirectories are not visited.
pub fn all_raster_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| TrainError::RastersDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut rasters = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_raster_extension(&path) {
            rasters.push(path);
        }
    }
    rasters.sort();

    debug!("Found {} rasters in {}", rasters.len(), dir.display());
    Ok(rasters)
}

fn has_raster_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            RASTER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Return band count of `raster_path` without reading pixel data
pub fn get_raster_band_count(raster_path: &Path) -> Result<usize> {
    let dataset = Dataset::open(raster_path)?;
    Ok(dataset.raster_count() as usize)
}

/// Extract metadata from a dataset without reading all data
pub fn extract_metadata_from_dataset(dataset: &Dataset) -> Result<RasterMetadata> {
    let rasterband = dataset.rasterband(1)?;

    let width = rasterband.x_size() as usize;
    let height = rasterband.y_size() as usize;

    if width == 0 || height == 0 {
        return Err(TrainError::InvalidDimensions(width, height));
    }

    let geotransform = dataset.geo_transform()?;
    if geotransform[1] == 0.0 {
        return Err(TrainError::InvalidPixelSize(geotransform[1]));
    }

    Ok(RasterMetadata {
        width,
        height,
        band_count: dataset.raster_count() as usize,
        geotransform,
        projection: dataset.projection(),
        nodata: rasterband.no_data_value(),
    })
}

/// Read every band of `window` as `f32`, one array per band
pub fn read_window(dataset: &Dataset, window: &ChipWindow) -> Result<Vec<Array2<f32>>> {
    let band_count = dataset.raster_count() as usize;
    let mut bands = Vec::with_capacity(band_count);

    for band_index in 1..=band_count {
        let rasterband = dataset.rasterband(band_index)?;
        let buffer = rasterband.read_as::<f32>(
            (window.x as isize, window.y as isize),
            (window.size, window.size),
            (window.size, window.size),
            None,
        )?;
        let data_vec: Vec<f32> = buffer.into_iter().collect();
        bands.push(Array2::from_shape_vec((window.size, window.size), data_vec)?);
    }

    debug!(
        "Read {} bands at ({},{}) size {}",
        band_count, window.x, window.y, window.size
    );
    Ok(bands)
}

/// Validate compression type for chip GeoTIFFs
pub fn validate_compression(compression: &str) -> Result<()> {
    let valid_types = ["DEFLATE", "LZW", "ZSTD", "NONE"];
    if !valid_types.contains(&compression) {
        return Err(TrainError::InvalidCompression(compression.to_string()));
    }
    Ok(())
}

/// Write `bands` as a multi-band GeoTIFF chip georeferenced by `geotransform`
pub fn write_chip<T: GdalType + Copy>(
    path: &Path,
    bands: &[Array2<T>],
    geotransform: &[f64; 6],
    projection: &str,
    compression: &str,
) -> Result<()> {
    let (height, width) = bands.first().map(|b| b.dim()).unwrap_or((0, 0));
    if width == 0 || height == 0 {
        return Err(TrainError::InvalidDimensions(width, height));
    }

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut options = CslStringList::new();
    options.add_string(&format!("COMPRESS={}", compression))?;

    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        path,
        width,
        height,
        bands.len(),
        &options,
    )?;

    dataset.set_geo_transform(geotransform)?;
    if !projection.is_empty() {
        dataset.set_projection(projection)?;
    }

    for (i, band_data) in bands.iter().enumerate() {
        let mut raster_band = dataset.rasterband(i + 1)?;
        // Array2 is row-major, which is the layout GDAL expects
        let data: Vec<T> = band_data.iter().copied().collect();
        let mut buffer = Buffer::new((width, height), data);
        raster_band.write((0, 0), (width, height), &mut buffer)?;
    }

    debug!("Wrote {}-band chip {}", bands.len(), path.display());
    Ok(())
}
