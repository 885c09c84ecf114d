use crate::error::{Result, TrainError};
use crate::raster::get_raster_band_count;
use log::debug;
use std::path::{Path, PathBuf};

/// Band count every input raster must have (R, G, B, NIR)
pub const REQUIRED_BAND_COUNT: usize = 4;

/// Check that all rasters have exactly 4 bands, stopping at the first one that does not
pub fn validate_rasters_band_count(rasters: &[PathBuf]) -> Result<()> {
    debug!("Validate rasters band count");
    validate_band_counts(rasters, get_raster_band_count)
}

/// Band-count gate over any band-count reader
pub fn validate_band_counts<F>(rasters: &[PathBuf], mut band_count: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<usize>,
{
    for raster_path in rasters {
        let count = band_count(raster_path)?;
        debug!("{}: {} bands", raster_path.display(), count);
        if count != REQUIRED_BAND_COUNT {
            return Err(TrainError::WrongBandCount {
                path: raster_path.clone(),
                count,
                expected: REQUIRED_BAND_COUNT,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_all_four_bands() {
        let rasters = paths(&["a.tif", "b.tif", "c.tif"]);
        let mut seen = Vec::new();
        let result = validate_band_counts(&rasters, |p| {
            seen.push(p.to_path_buf());
            Ok(4)
        });
        assert!(result.is_ok());
        assert_eq!(seen, rasters);
    }

    #[test]
    fn test_wrong_count_reported() {
        for count in [0, 1, 3, 5, 8] {
            let err = validate_band_counts(&paths(&["a.tif"]), |_| Ok(count)).unwrap_err();
            assert!(err.to_string().contains(&format!("(was {})", count)));
        }
    }

    #[test]
    fn test_stops_at_first_mismatch() {
        let counts: HashMap<_, _> = [("a.tif", 4), ("b.tif", 3), ("c.tif", 5)].into();
        let mut visited = 0;
        let err = validate_band_counts(&paths(&["a.tif", "b.tif", "c.tif"]), |p| {
            visited += 1;
            Ok(counts[p.to_str().unwrap()])
        })
        .unwrap_err();

        assert_eq!(visited, 2);
        match err {
            TrainError::WrongBandCount { path, count, .. } => {
                assert_eq!(path, PathBuf::from("b.tif"));
                assert_eq!(count, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_set_is_valid() {
        assert!(validate_band_counts(&[], |_| Ok(1)).is_ok());
    }

    #[test]
    fn test_reader_error_propagates() {
        let err = validate_band_counts(&paths(&["a.tif"]), |_| {
            Err(TrainError::InvalidDimensions(0, 0))
        })
        .unwrap_err();
        assert!(matches!(err, TrainError::InvalidDimensions(0, 0)));
    }
}
