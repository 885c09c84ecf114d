use crate::error::{Result, TrainError};
use configparser::ini::Ini;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Section holding the training options
pub const TRAIN_SECTION: &str = "train";

const DEFAULT_SECTION: &str = "DEFAULT";

/// Key-value options of the `[train]` section, all values as strings
pub type TrainConfig = BTreeMap<String, String>;

/// Read `config_file` and return the options of its `[train]` section
pub fn read_config_file(config_file: &Path) -> Result<TrainConfig> {
    debug!("Reading config file: {}", config_file.display());
    let text = fs::read_to_string(config_file).map_err(|source| TrainError::ConfigRead {
        path: config_file.to_path_buf(),
        source,
    })?;
    parse_train_section(&text, config_file)
}

fn parse_train_section(text: &str, config_file: &Path) -> Result<TrainConfig> {
    // Case-sensitive section names, option names are folded below
    let mut ini = Ini::new_cs();
    // Indented lines continue the previous value; only full-line comments are dropped
    ini.set_multiline(true);
    let no_inline_comments: &[char] = &[];
    ini.set_inline_comment_symbols(Some(no_inline_comments));
    let sections = ini
        .read(text.to_string())
        .map_err(|message| TrainError::ConfigParse {
            path: config_file.to_path_buf(),
            message,
        })?;

    let train = sections
        .get(TRAIN_SECTION)
        .ok_or_else(|| TrainError::MissingSection {
            section: TRAIN_SECTION.to_string(),
            path: config_file.to_path_buf(),
        })?;

    let mut config = match sections.get(DEFAULT_SECTION) {
        Some(defaults) => fold_section(defaults, DEFAULT_SECTION, config_file)?,
        None => TrainConfig::new(),
    };
    config.extend(fold_section(train, TRAIN_SECTION, config_file)?);

    debug!("Config options: {:?}", config);
    Ok(config)
}

/// Lower-case option names, rejecting options that only differ in case
fn fold_section(
    section: &HashMap<String, Option<String>>,
    name: &str,
    config_file: &Path,
) -> Result<TrainConfig> {
    let mut folded = TrainConfig::new();
    for (key, value) in section {
        let key = key.to_lowercase();
        let value = value.clone().unwrap_or_default();
        if folded.insert(key.clone(), value).is_some() {
            return Err(TrainError::DuplicateOption {
                key,
                section: name.to_string(),
                path: config_file.to_path_buf(),
            });
        }
    }
    Ok(folded)
}
