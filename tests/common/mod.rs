#![allow(dead_code)]

use gdal::raster::Buffer;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::DriverManager;
use std::fs;
use std::path::{Path, PathBuf};

pub const EPSG: u32 = 32721;
pub const ORIGIN: (f64, f64) = (500000.0, 6000000.0);
pub const PIXEL_SIZE: f64 = 10.0;

/// Write a `size`x`size` GeoTIFF with `bands` bands of a diagonal gradient
pub fn write_raster(path: &Path, size: usize, bands: usize) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u16, _>(path, size, size, bands)
        .unwrap();
    dataset
        .set_geo_transform(&[ORIGIN.0, PIXEL_SIZE, 0.0, ORIGIN.1, 0.0, -PIXEL_SIZE])
        .unwrap();
    let wkt = SpatialRef::from_epsg(EPSG).unwrap().to_wkt().unwrap();
    dataset.set_projection(&wkt).unwrap();

    for band_index in 1..=bands {
        let data: Vec<u16> = (0..size * size)
            .map(|i| ((i % size + i / size) * band_index) as u16)
            .collect();
        let mut buffer = Buffer::new((size, size), data);
        let mut band = dataset.rasterband(band_index).unwrap();
        band.write((0, 0), (size, size), &mut buffer).unwrap();
    }
}

/// GeoJSON with one square polygon covering pixels `[x0, x1) x [y0, y1)` of the fixture grid
pub fn write_labels(path: &Path, pixels: (usize, usize, usize, usize)) {
    let (x0, y0, x1, y1) = pixels;
    let wx = |x: usize| ORIGIN.0 + x as f64 * PIXEL_SIZE;
    let wy = |y: usize| ORIGIN.1 - y as f64 * PIXEL_SIZE;
    let ring = format!(
        "[[{},{}],[{},{}],[{},{}],[{},{}],[{},{}]]",
        wx(x0), wy(y0), wx(x1), wy(y0), wx(x1), wy(y1), wx(x0), wy(y1), wx(x0), wy(y0)
    );
    let geojson = format!(
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":[{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[{}]}}}}]}}"#,
        EPSG, ring
    );
    fs::write(path, geojson).unwrap();
}

/// Same square as `write_labels`, as lon/lat GeoJSON with no `crs` member (WGS84)
pub fn write_labels_lonlat(path: &Path, pixels: (usize, usize, usize, usize)) {
    let (x0, y0, x1, y1) = pixels;
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)];
    let mut xs: Vec<f64> = corners
        .iter()
        .map(|&(x, _)| ORIGIN.0 + x as f64 * PIXEL_SIZE)
        .collect();
    let mut ys: Vec<f64> = corners
        .iter()
        .map(|&(_, y)| ORIGIN.1 - y as f64 * PIXEL_SIZE)
        .collect();
    let mut zs = vec![0.0; corners.len()];

    let utm = SpatialRef::from_epsg(EPSG).unwrap();
    let lonlat = SpatialRef::from_definition("OGC:CRS84").unwrap();
    CoordTransform::new(&utm, &lonlat)
        .unwrap()
        .transform_coords(&mut xs, &mut ys, &mut zs)
        .unwrap();

    let ring: Vec<String> = xs
        .iter()
        .zip(&ys)
        .map(|(lon, lat)| format!("[{},{}]", lon, lat))
        .collect();
    let geojson = format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[{}]]}}}}]}}"#,
        ring.join(",")
    );
    fs::write(path, geojson).unwrap();
}

pub fn write_config(path: &Path, body: &str) {
    fs::write(path, format!("[train]\n{}", body)).unwrap();
}

/// List files under `dir`, relative to it, sorted
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path.strip_prefix(dir).unwrap().to_path_buf());
            }
        }
    }
    files.sort();
    files
}
