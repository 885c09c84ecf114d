use aplatam_train::cli::Args;
use aplatam_train::error::Result;
use aplatam_train::{logging, train, ChipTrainsetBuilder};
use clap::Parser;

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.loglevel());

    train::run(&args, &ChipTrainsetBuilder)
}
