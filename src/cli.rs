use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "aplatam")]
#[command(about = "Train a detection model from a set of preprocessed rasters and a vector file of polygons")]
#[command(version)]
pub struct Args {
    /// Directory containing raster images
    #[arg(value_name = "RASTERS_DIR")]
    pub rasters_dir: PathBuf,

    /// Vector file of polygons
    #[arg(value_name = "VECTOR")]
    pub vector: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "default.cfg")]
    pub config_file: PathBuf,

    /// Filename for output model
    #[arg(short, long, value_name = "FILE", default_value = "model.h5")]
    pub output_model: PathBuf,

    /// Seed number for the random number generator
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Path to temporary files
    #[arg(long, value_name = "DIR", default_value_os_t = std::env::temp_dir())]
    pub temp_dir: PathBuf,

    /// Set loglevel to INFO (-vv sets it to DEBUG)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Set loglevel to DEBUG
    #[arg(long)]
    pub very_verbose: bool,
}

impl Args {
    /// Log level requested on the command line, `None` when no flag was given
    pub fn loglevel(&self) -> Option<LevelFilter> {
        if self.very_verbose || self.verbose >= 2 {
            Some(LevelFilter::Debug)
        } else if self.verbose == 1 {
            Some(LevelFilter::Info)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["aplatam", "rasters/", "labels.geojson"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.rasters_dir, PathBuf::from("rasters/"));
        assert_eq!(args.vector, PathBuf::from("labels.geojson"));
        assert_eq!(args.config_file, PathBuf::from("default.cfg"));
        assert_eq!(args.output_model, PathBuf::from("model.h5"));
        assert_eq!(args.temp_dir, std::env::temp_dir());
        assert_eq!(args.seed, None);
        assert_eq!(args.loglevel(), None);
    }

    #[test]
    fn test_seed_and_verbose() {
        let args = parse(&["--seed", "42", "--verbose"]);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.loglevel(), Some(LevelFilter::Info));
    }

    #[test]
    fn test_very_verbose() {
        assert_eq!(parse(&["--very-verbose"]).loglevel(), Some(LevelFilter::Debug));
        assert_eq!(parse(&["-vv"]).loglevel(), Some(LevelFilter::Debug));
    }

    #[test]
    fn test_short_options() {
        let args = parse(&["-c", "train.cfg", "-o", "out.h5", "--temp-dir", "/scratch"]);
        assert_eq!(args.config_file, PathBuf::from("train.cfg"));
        assert_eq!(args.output_model, PathBuf::from("out.h5"));
        assert_eq!(args.temp_dir, PathBuf::from("/scratch"));
    }

    #[test]
    fn test_missing_positionals() {
        let err = Args::try_parse_from(["aplatam", "rasters/"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_negative_seed() {
        assert_eq!(parse(&["--seed", "-1"]).seed, Some(-1));
    }

    #[test]
    fn test_invalid_seed() {
        assert!(Args::try_parse_from(["aplatam", "r", "v", "--seed", "abc"]).is_err());
    }
}
