use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use m2a_core::models::PromoterSet;
use m2a_features::{compute_response, write_response_tsv};

pub fn run_response(matches: &ArgMatches) -> Result<()> {
    let promoters = matches
        .get_one::<String>("promoters")
        .context("A path to promoter definitions is required.")?;
    let chip = matches
        .get_one::<String>("chip")
        .context("A path to the ChIP bigWig is required.")?;
    let input = matches
        .get_one::<String>("input")
        .context("A path to the Input bigWig is required.")?;
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    let promoters = PromoterSet::try_from(promoters.as_str())
        .with_context(|| format!("Failed to load promoters from {}", promoters))?;

    let response = compute_response(Path::new(chip), Path::new(input), &promoters.promoters)
        .context("Failed to compute the response variable")?;

    write_response_tsv(output, &promoters.promoters, &response)
        .with_context(|| format!("Failed to write response to {}", output))?;

    Ok(())
}
