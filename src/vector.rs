use crate::error::{Result, TrainError};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::vector::{Geometry, LayerAccess};
use gdal::Dataset;
use log::{debug, info, warn};
use std::path::Path;

/// Label polygons of a vector file, merged into one geometry
pub struct LabelPolygons {
    pub geometry: Option<Geometry>,
    pub spatial_ref: Option<SpatialRef>,
    pub feature_count: usize,
}

impl LabelPolygons {
    /// Return the polygons expressed in `target`, reprojecting when the CRSs differ
    pub fn in_crs(&self, target: Option<&SpatialRef>) -> Result<Option<Geometry>> {
        let geometry = match &self.geometry {
            Some(g) => g,
            None => return Ok(None),
        };

        match (&self.spatial_ref, target) {
            (Some(source), Some(target)) if source != target => {
                debug!(
                    "Reprojecting labels from {} to {}",
                    describe_spatial_ref(source),
                    describe_spatial_ref(target)
                );
                let transform = CoordTransform::new(source, target)?;
                Ok(Some(geometry.transform(&transform)?))
            }
            _ => Ok(Some(geometry.clone())),
        }
    }
}

/// Short human-readable name of a CRS, "AUTHORITY:CODE" when known
pub fn describe_spatial_ref(spatial_ref: &SpatialRef) -> String {
    match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
        (Ok(name), Ok(code)) => format!("{}:{}", name, code),
        _ => spatial_ref
            .to_proj4()
            .unwrap_or_else(|_| "unknown CRS".to_string()),
    }
}

/// Return CRS of `vector_path`, `None` if its first layer carries none
pub fn get_vector_crs(vector_path: &Path) -> Result<Option<SpatialRef>> {
    let dataset = Dataset::open(vector_path)?;
    if dataset.layer_count() == 0 {
        return Err(TrainError::NoVectorLayer(vector_path.to_path_buf()));
    }
    let layer = dataset.layer(0)?;
    Ok(layer.spatial_ref())
}

/// Load every geometry of the first layer of `vector_path` and union them
pub fn read_label_polygons(vector_path: &Path) -> Result<LabelPolygons> {
    info!("Reading label polygons: {}", vector_path.display());
    let dataset = Dataset::open(vector_path)?;
    if dataset.layer_count() == 0 {
        return Err(TrainError::NoVectorLayer(vector_path.to_path_buf()));
    }

    let mut layer = dataset.layer(0)?;
    let spatial_ref = layer.spatial_ref();

    let mut merged: Option<Geometry> = None;
    let mut feature_count = 0;
    for feature in layer.features() {
        let geometry = match feature.geometry() {
            Some(g) => g,
            None => continue,
        };
        feature_count += 1;
        merged = match merged {
            None => Some(geometry.clone()),
            Some(acc) => match acc.union(geometry) {
                Some(union) => Some(union),
                None => {
                    warn!("Failed to merge feature {} into label set", feature_count);
                    Some(acc)
                }
            },
        };
    }

    if feature_count == 0 {
        warn!("No geometries found in {}", vector_path.display());
    }
    debug!("Loaded {} label geometries", feature_count);

    Ok(LabelPolygons {
        geometry: merged,
        spatial_ref,
        feature_count,
    })
}
