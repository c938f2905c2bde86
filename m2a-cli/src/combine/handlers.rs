use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use m2a_features::{FeatureSchema, FeatureTable, ResponseTable, combine};
use m2a_io::write_npz;

use crate::config::load_config;

pub fn run_combine(matches: &ArgMatches) -> Result<()> {
    let features = matches
        .get_one::<String>("features")
        .context("A path to window features is required.")?;
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;
    let response = matches.get_one::<String>("response");

    let mut config = load_config(matches)?;
    if let Some(range) = matches.get_many::<f64>("scale-range") {
        let range: Vec<f64> = range.copied().collect();
        if let [low, high] = range[..] {
            config.scale_range = (low, high);
        }
    }
    if let Some(fill) = matches.get_one::<f64>("missing-fill") {
        config.missing_fill = *fill;
    }
    config.validate().context("Invalid pipeline configuration")?;

    let schema = FeatureSchema::new(&config.window_sizes, config.num_windows);
    let table = FeatureTable::read_tsv(features, schema)
        .with_context(|| format!("Failed to load features from {}", features))?;

    let response = match response {
        Some(path) => Some(
            ResponseTable::try_from(Path::new(path))
                .with_context(|| format!("Failed to load response from {}", path))?,
        ),
        None => None,
    };

    let bundle = combine(&table, &config, response.as_ref())?;
    write_npz(&bundle, output).with_context(|| format!("Failed to write tensor to {}", output))?;

    Ok(())
}
