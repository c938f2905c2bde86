//! ChIP over Input enrichment at each promoter's response window.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bigtools::BigWigRead;
use fxhash::{FxHashMap, FxHashSet};
use log::{info, warn};

use m2a_core::models::{PROMOTER_COLUMNS, Promoter};
use m2a_core::utils::normalize_chrom;

use crate::errors::{FeatureError, Result};
use crate::metadata::RESPONSE_COLUMN;
use crate::utils::progress_bar;

/// Quantile of the Input sums used as the pseudo-count.
pub const ALPHA_QUANTILE: f64 = 0.25;

///
/// Quantile with linear interpolation between the closest ranks. `0.0` for empty input.
///
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

///
/// `log2((chip + alpha) / (input + alpha))`; anything non-finite becomes `0.0`.
///
pub fn log2_enrichment(chip: f64, input: f64, alpha: f64) -> f64 {
    let ratio = ((chip + alpha) / (input + alpha)).log2();
    if ratio.is_finite() { ratio } else { 0.0 }
}

///
/// Response variable of every promoter from its ChIP and Input signal sums.
///
pub fn response_variable(chip: &[f64], input: &[f64]) -> Result<Vec<f64>> {
    if chip.len() != input.len() {
        return Err(FeatureError::ShapeMismatch(format!(
            "{} ChIP sums but {} Input sums",
            chip.len(),
            input.len()
        )));
    }
    let alpha = quantile(input, ALPHA_QUANTILE);
    info!("Using pseudo-count alpha = {}", alpha);

    Ok(chip
        .iter()
        .zip(input)
        .map(|(c, i)| log2_enrichment(*c, *i, alpha))
        .collect())
}

///
/// Sum of the defined bigWig values over each promoter's `[RStart, REnd)`.
///
/// Windows are clipped to the chromosome. Promoters on a chromosome the file
/// doesn't contain get `0.0`.
///
pub fn signal_sums(path: &Path, promoters: &[Promoter]) -> Result<Vec<f64>> {
    let path_str = path.to_string_lossy();
    let mut bigwig = BigWigRead::open_file(&*path_str)
        .map_err(|e| FeatureError::BigWigError(format!("{}: {:?}", path.display(), e)))?;

    // normalized name -> (name in the file, length)
    let chroms: FxHashMap<String, (String, u32)> = bigwig
        .chroms()
        .iter()
        .map(|c| (normalize_chrom(&c.name).to_string(), (c.name.clone(), c.length)))
        .collect();

    let bar = progress_bar(promoters.len() as u64);
    bar.set_message(format!("{}", path.display()));

    let mut warned: FxHashSet<&str> = FxHashSet::default();
    let mut sums = Vec::with_capacity(promoters.len());
    for promoter in promoters {
        bar.inc(1);
        let Some((name, length)) = chroms.get(normalize_chrom(&promoter.chr)) else {
            if warned.insert(promoter.chr.as_str()) {
                warn!(
                    "Chromosome {} is missing from {}; its promoters get a signal of 0",
                    promoter.chr,
                    path.display()
                );
            }
            sums.push(0.0);
            continue;
        };

        let start = promoter.response_start.clamp(0, *length as i64) as u32;
        let end = promoter.response_end.clamp(0, *length as i64) as u32;
        if start >= end {
            sums.push(0.0);
            continue;
        }

        let values = bigwig
            .values(name, start, end)
            .map_err(|e| FeatureError::BigWigError(format!("{}:{}-{}: {:?}", name, start, end, e)))?;
        sums.push(
            values
                .iter()
                .filter(|v| !v.is_nan())
                .map(|v| *v as f64)
                .sum(),
        );
    }
    bar.finish_and_clear();

    Ok(sums)
}

///
/// Response variable of every promoter from a ChIP and an Input bigWig.
///
pub fn compute_response(chip: &Path, input: &Path, promoters: &[Promoter]) -> Result<Vec<f64>> {
    let chip_sums = signal_sums(chip, promoters)?;
    let input_sums = signal_sums(input, promoters)?;
    response_variable(&chip_sums, &input_sums)
}

///
/// Write promoter columns plus the response column as TSV.
///
pub fn write_response_tsv<T: AsRef<Path>>(
    path: T,
    promoters: &[Promoter],
    response: &[f64],
) -> Result<()> {
    if promoters.len() != response.len() {
        return Err(FeatureError::ShapeMismatch(format!(
            "{} promoters but {} response values",
            promoters.len(),
            response.len()
        )));
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}\t{}", PROMOTER_COLUMNS.join("\t"), RESPONSE_COLUMN)?;
    for (promoter, value) in promoters.iter().zip(response) {
        writeln!(writer, "{}\t{}", promoter.as_string(), value)?;
    }
    writer.flush()?;

    info!("Wrote {} response values to {}", response.len(), path.display());
    Ok(())
}
