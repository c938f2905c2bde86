use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use m2a_core::models::{MethylationSet, MethylationTrack, Promoter, PromoterSet};

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::schema::FeatureSchema;
use crate::table::FeatureTable;
use crate::utils::{progress_bar, thread_pool};
use crate::windows::{WindowLayout, promoter_window_stats};

///
/// Every feature of one promoter, in [FeatureSchema::index] order.
///
pub fn promoter_features(
    promoter: &Promoter,
    track: Option<&MethylationTrack>,
    layouts: &[WindowLayout],
    schema: &FeatureSchema,
) -> Vec<Option<f64>> {
    let mut row = vec![None; schema.width()];
    for (r, layout) in layouts.iter().enumerate() {
        let stats = promoter_window_stats(promoter.tss(), promoter.strand, track, layout);
        for (w, window) in stats.iter().enumerate() {
            for (c, stat) in schema.statistics.iter().enumerate() {
                row[schema.index(r, w, c)] = window.map(|s| s.get(*stat));
            }
        }
    }
    row
}

///
/// Compute the window statistics of every promoter at every resolution.
///
/// Chromosomes are handled one at a time in order of first appearance in
/// `promoters`; within a chromosome promoters are processed in parallel and
/// keep their file order. Promoters on a chromosome without methylation data
/// get undefined features.
///
/// # Arguments
/// - promoters: promoter definitions
/// - methylation: methylation values, partitioned by chromosome
/// - config: window sizes, window count and thread count
pub fn extract_features(
    promoters: &PromoterSet,
    methylation: &MethylationSet,
    config: &PipelineConfig,
) -> Result<FeatureTable> {
    config.validate()?;

    let schema = FeatureSchema::new(&config.window_sizes, config.num_windows);
    let layouts: Vec<WindowLayout> = config
        .window_sizes
        .iter()
        .map(|&size| WindowLayout::new(size, config.num_windows))
        .collect();
    let pool = thread_pool(config.threads)?;

    let chromosomes = promoters.chromosomes();
    info!(
        "Extracting {} features for {} promoters on {} chromosomes",
        schema.width(),
        promoters.len(),
        chromosomes.len()
    );

    let bar = progress_bar(chromosomes.len() as u64);
    let mut table = FeatureTable::new(schema);
    for chrom in chromosomes {
        let start = Instant::now();
        bar.set_message(chrom.to_string());

        let on_chrom = promoters.on_chromosome(chrom);
        let track = methylation.track(chrom);
        if track.is_none() {
            warn!(
                "No methylation data for {}; {} promoters get undefined features",
                chrom,
                on_chrom.len()
            );
        }

        let schema = &table.schema;
        let rows: Vec<Vec<Option<f64>>> = pool.install(|| {
            on_chrom
                .par_iter()
                .map(|p| promoter_features(p, track, &layouts, schema))
                .collect()
        });
        for (promoter, row) in on_chrom.into_iter().zip(rows) {
            table.push_row(promoter.clone(), row)?;
        }

        debug!("{} done in {:.2?}", chrom, start.elapsed());
        bar.inc(1);
    }
    bar.finish_and_clear();

    info!("Extracted features for {} promoters", table.len());
    Ok(table)
}
