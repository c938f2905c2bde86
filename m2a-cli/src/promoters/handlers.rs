use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use m2a_core::models::PromoterSet;

use crate::config::load_config;

pub fn run_promoters(matches: &ArgMatches) -> Result<()> {
    let gff = matches
        .get_one::<String>("gff")
        .context("A path to a GFF3 file is required.")?;
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    let mut config = load_config(matches)?;
    if let Some(chromosomes) = matches.get_many::<String>("chromosomes") {
        config.keep_chromosomes = chromosomes.cloned().collect();
    }
    if let Some(spacing) = matches.get_one::<i64>("min-tss-spacing") {
        config.min_tss_spacing = *spacing;
    }
    if let Some(window) = matches.get_one::<i64>("response-window") {
        config.response_window = *window;
    }
    config.validate().context("Invalid pipeline configuration")?;

    let promoters = PromoterSet::from_gff(
        Path::new(gff),
        &config.keep_chromosomes,
        config.min_tss_spacing,
        config.response_window,
    )
    .with_context(|| format!("Failed to derive promoters from {}", gff))?;

    promoters
        .write_tsv(output)
        .with_context(|| format!("Failed to write promoters to {}", output))?;

    Ok(())
}
