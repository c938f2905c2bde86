use anyhow::{Context, Result};
use clap::ArgMatches;

use m2a_core::models::{MethylationSet, PromoterSet};
use m2a_features::extract_features;

use crate::config::load_config;

pub fn run_features(matches: &ArgMatches) -> Result<()> {
    let promoters = matches
        .get_one::<String>("promoters")
        .context("A path to promoter definitions is required.")?;
    let methylation = matches
        .get_one::<String>("methylation")
        .context("A path to methylation data is required.")?;
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    let config = load_config(matches)?;

    let promoters = PromoterSet::try_from(promoters.as_str())
        .with_context(|| format!("Failed to load promoters from {}", promoters))?;
    let methylation = MethylationSet::try_from(methylation.as_str())
        .with_context(|| format!("Failed to load methylation data from {}", methylation))?;

    let table = extract_features(&promoters, &methylation, &config)?;
    table
        .write_tsv(output)
        .with_context(|| format!("Failed to write features to {}", output))?;

    Ok(())
}
