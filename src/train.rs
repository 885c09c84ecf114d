use crate::cli::Args;
use crate::config::read_config_file;
use crate::error::Result;
use crate::raster::all_raster_files;
use crate::trainset::{TrainsetBuilder, TrainsetRequest};
use crate::validate::validate_rasters_band_count;
use crate::vector::{describe_spatial_ref, get_vector_crs};
use log::{debug, info, warn};

/// Read the config, validate every raster, then hand off to `builder`.
///
/// Any failure aborts the run before the builder is reached.
pub fn run<B: TrainsetBuilder + ?Sized>(args: &Args, builder: &B) -> Result<()> {
    let config = read_config_file(&args.config_file)?;

    debug!("Collect all rasters");
    let rasters = all_raster_files(&args.rasters_dir)?;
    if rasters.is_empty() {
        warn!("No rasters found in {}", args.rasters_dir.display());
    }

    validate_rasters_band_count(&rasters)?;

    match get_vector_crs(&args.vector)? {
        Some(crs) => info!("Vector CRS: {}", describe_spatial_ref(&crs)),
        None => warn!("Vector file {} has no CRS", args.vector.display()),
    }

    debug!("Output model: {}", args.output_model.display());

    builder.build(&TrainsetRequest {
        rasters: &rasters,
        vector: &args.vector,
        config: &config,
        temp_dir: &args.temp_dir,
        // Negative seeds keep their bit pattern
        seed: args.seed.map(|seed| seed as u64),
    })?;

    info!("Done");
    Ok(())
}
