//! Assembly of normalised features into a `(promoter, resolution, window, channel)` tensor.
//!
//! The normalised table is split into one block per resolution. Blocks are
//! then regrouped per promoter in an arena keyed by transcript ID, which
//! gives every promoter exactly one row slice per resolution, and the arena
//! is written out in `<key>_<resolution>` order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter;

use log::info;
use ndarray::Array4;

use crate::errors::{FeatureError, Result};
use crate::normalize::NormalizedTable;
use crate::schema::FeatureSchema;

///
/// The columns of one resolution: one row per promoter, each row in
/// (window, channel) order.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionBlock {
    pub window_size: u32,
    pub keys: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

///
/// Split a normalised table into one [ResolutionBlock] per resolution, in schema order.
///
pub fn split_resolutions(table: &NormalizedTable) -> Vec<ResolutionBlock> {
    let width = table.schema.resolution_width();
    let keys: Vec<String> = table
        .promoters
        .iter()
        .map(|p| p.transcript_id.clone())
        .collect();

    table
        .schema
        .window_sizes
        .iter()
        .enumerate()
        .map(|(r, &window_size)| ResolutionBlock {
            window_size,
            keys: keys.clone(),
            rows: table
                .values
                .iter()
                .map(|row| row[r * width..(r + 1) * width].to_vec())
                .collect(),
        })
        .collect()
}

///
/// Derive `(promoters, channels)` from the stacked row and column counts,
/// failing unless both divide evenly.
///
/// # Arguments
/// - total_rows: rows across all resolution blocks
/// - row_width: values per row of one block
/// - num_resolutions: number of blocks
/// - num_windows: windows per block row
pub fn tensor_dims(
    total_rows: usize,
    row_width: usize,
    num_resolutions: usize,
    num_windows: usize,
) -> Result<(usize, usize)> {
    if num_resolutions == 0 || num_windows == 0 {
        return Err(FeatureError::ShapeMismatch(
            "at least one resolution and one window are required".to_string(),
        ));
    }
    if total_rows % num_resolutions != 0 {
        return Err(FeatureError::ShapeMismatch(format!(
            "{} rows can't be split evenly across {} resolutions",
            total_rows, num_resolutions
        )));
    }
    if row_width % num_windows != 0 {
        return Err(FeatureError::ShapeMismatch(format!(
            "{} columns can't be split evenly across {} windows",
            row_width, num_windows
        )));
    }
    Ok((total_rows / num_resolutions, row_width / num_windows))
}

///
/// The assembled tensor and the promoter key of each of its rows.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTensor {
    pub tensor: Array4<f32>,
    pub keys: Vec<String>,
}

///
/// Order of two promoter keys once each is tagged as `<key>_<resolution>`.
/// Differs from plain key order when one key prefixes the other and the next
/// byte sorts below `_`: `AB` comes before `A`.
///
pub fn tagged_key_order(a: &str, b: &str) -> Ordering {
    let tagged = |key: &str| key.bytes().chain(iter::once(b'_')).collect::<Vec<u8>>();
    tagged(a).cmp(&tagged(b))
}

///
/// Regroup resolution blocks per promoter and lay them out as a 4D tensor.
///
/// Blocks must come in schema resolution order. Every promoter must appear
/// exactly once in every block; anything else is a shape mismatch (or a
/// duplicate key) rather than being padded or dropped.
///
pub fn assemble(blocks: &[ResolutionBlock], schema: &FeatureSchema) -> Result<AssembledTensor> {
    let num_resolutions = schema.num_resolutions();
    let width = schema.resolution_width();

    let block_sizes: Vec<u32> = blocks.iter().map(|b| b.window_size).collect();
    if block_sizes != schema.window_sizes {
        return Err(FeatureError::ShapeMismatch(format!(
            "expected resolutions {:?}, got {:?}",
            schema.window_sizes, block_sizes
        )));
    }

    // promoter key -> one row slice per resolution
    let mut arena: BTreeMap<&str, Vec<Option<&[f64]>>> = BTreeMap::new();
    let mut total_rows = 0;
    for (r, block) in blocks.iter().enumerate() {
        if block.keys.len() != block.rows.len() {
            return Err(FeatureError::ShapeMismatch(format!(
                "resolution {} has {} keys but {} rows",
                block.window_size,
                block.keys.len(),
                block.rows.len()
            )));
        }
        for (key, row) in block.keys.iter().zip(&block.rows) {
            if row.len() != width {
                return Err(FeatureError::ShapeMismatch(format!(
                    "promoter `{}` has {} values at resolution {}, expected {}",
                    key,
                    row.len(),
                    block.window_size,
                    width
                )));
            }
            let slots = arena
                .entry(key.as_str())
                .or_insert_with(|| vec![None; num_resolutions]);
            if slots[r].is_some() {
                return Err(FeatureError::DuplicatePromoter(key.clone()));
            }
            slots[r] = Some(row.as_slice());
            total_rows += 1;
        }
    }

    let (num_promoters, num_channels) =
        tensor_dims(total_rows, width, num_resolutions, schema.num_windows())?;
    if num_promoters != arena.len() || num_channels != schema.num_channels() {
        return Err(FeatureError::ShapeMismatch(format!(
            "{} rows over {} resolutions don't cover {} distinct promoters",
            total_rows,
            num_resolutions,
            arena.len()
        )));
    }

    let mut tensor = Array4::<f32>::zeros((
        num_promoters,
        num_resolutions,
        schema.num_windows(),
        num_channels,
    ));
    let mut entries: Vec<_> = arena.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| tagged_key_order(a, b));

    let mut keys = Vec::with_capacity(num_promoters);
    for (n, (key, slots)) in entries.into_iter().enumerate() {
        for (r, slot) in slots.into_iter().enumerate() {
            let row = slot.ok_or_else(|| {
                FeatureError::ShapeMismatch(format!(
                    "promoter `{}` has no values at resolution {}",
                    key, schema.window_sizes[r]
                ))
            })?;
            for w in 0..schema.num_windows() {
                for c in 0..num_channels {
                    tensor[[n, r, w, c]] = row[w * num_channels + c] as f32;
                }
            }
        }
        keys.push(key.to_string());
    }

    info!("Assembled tensor of shape {:?}", tensor.shape());
    Ok(AssembledTensor { tensor, keys })
}

///
/// Split `table` by resolution and assemble the tensor.
///
pub fn assemble_table(table: &NormalizedTable) -> Result<AssembledTensor> {
    assemble(&split_resolutions(table), &table.schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    use m2a_core::models::{Promoter, Strand};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn promoter(id: &str) -> Promoter {
        Promoter {
            transcript_id: id.to_string(),
            gene_id: "G".to_string(),
            gene_name: "g".to_string(),
            strand: Strand::Plus,
            chr: "chr1".to_string(),
            start: 1000,
            end: 2000,
            response_start: 0,
            response_end: 2000,
        }
    }

    // value encodes (promoter, resolution, window, channel) so misplacement is visible
    fn encoded(p: usize, r: usize, w: usize, c: usize) -> f64 {
        (p * 1000 + r * 100 + w * 10 + c) as f64
    }

    #[fixture]
    fn table() -> NormalizedTable {
        let schema = FeatureSchema::new(&[250, 2500], 4);
        let ids = ["T2", "T0", "T1"];
        let values = (0..ids.len())
            .map(|p| {
                let mut row = vec![0.0; schema.width()];
                for r in 0..2 {
                    for w in 0..4 {
                        for c in 0..4 {
                            row[schema.index(r, w, c)] = encoded(p, r, w, c);
                        }
                    }
                }
                row
            })
            .collect();
        NormalizedTable {
            schema,
            promoters: ids.iter().map(|id| promoter(id)).collect(),
            values,
        }
    }

    #[rstest]
    fn test_tensor_dims_divisibility() {
        assert_eq!(tensor_dims(6, 80, 2, 20).unwrap(), (3, 4));
        assert!(matches!(tensor_dims(5, 80, 2, 20), Err(FeatureError::ShapeMismatch(_))));
        assert!(matches!(tensor_dims(6, 81, 2, 20), Err(FeatureError::ShapeMismatch(_))));
    }

    #[rstest]
    fn test_split_keeps_column_order(table: NormalizedTable) {
        let blocks = split_resolutions(&table);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].window_size, 2500);
        assert_eq!(blocks[1].keys, vec!["T2", "T0", "T1"]);

        // re-deriving the resolution's columns from the block reproduces the table values
        let width = table.schema.resolution_width();
        for (p, row) in table.values.iter().enumerate() {
            assert_eq!(blocks[1].rows[p], row[width..2 * width].to_vec());
        }
    }

    #[rstest]
    fn test_assemble_shape_and_order(table: NormalizedTable) {
        let assembled = assemble_table(&table).unwrap();
        assert_eq!(assembled.tensor.shape(), &[3, 2, 4, 4]);
        assert_eq!(assembled.keys, vec!["T0", "T1", "T2"]);

        // T0 was the second input row
        for r in 0..2 {
            for w in 0..4 {
                for c in 0..4 {
                    assert_eq!(assembled.tensor[[0, r, w, c]], encoded(1, r, w, c) as f32);
                    assert_eq!(assembled.tensor[[2, r, w, c]], encoded(0, r, w, c) as f32);
                }
            }
        }
    }

    #[rstest]
    #[case("A", "AB", Ordering::Greater)]
    #[case("A", "A.1", Ordering::Greater)]
    #[case("A", "Aa", Ordering::Less)]
    #[case("T0", "T1", Ordering::Less)]
    #[case("T1", "T1", Ordering::Equal)]
    fn test_tagged_key_order(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(tagged_key_order(a, b), expected);
    }

    #[rstest]
    fn test_prefix_key_sorts_after_longer_key(mut table: NormalizedTable) {
        table.promoters[0].transcript_id = "A".to_string();
        table.promoters[1].transcript_id = "AB".to_string();
        table.promoters[2].transcript_id = "B".to_string();

        let assembled = assemble_table(&table).unwrap();
        assert_eq!(assembled.keys, vec!["AB", "A", "B"]);
        assert_eq!(assembled.tensor[[0, 1, 2, 3]], encoded(1, 1, 2, 3) as f32);
        assert_eq!(assembled.tensor[[1, 1, 2, 3]], encoded(0, 1, 2, 3) as f32);
    }

    #[rstest]
    fn test_duplicate_key_is_rejected(mut table: NormalizedTable) {
        table.promoters[2].transcript_id = "T2".to_string();
        assert!(matches!(
            assemble_table(&table),
            Err(FeatureError::DuplicatePromoter(key)) if key == "T2"
        ));
    }

    #[rstest]
    fn test_promoter_missing_from_a_resolution(table: NormalizedTable) {
        let mut blocks = split_resolutions(&table);
        blocks[1].keys.pop();
        blocks[1].rows.pop();
        assert!(matches!(
            assemble(&blocks, &table.schema),
            Err(FeatureError::ShapeMismatch(_))
        ));
    }

    #[rstest]
    fn test_wrong_row_width(table: NormalizedTable) {
        let mut blocks = split_resolutions(&table);
        blocks[0].rows[0].pop();
        assert!(matches!(
            assemble(&blocks, &table.schema),
            Err(FeatureError::ShapeMismatch(_))
        ));
    }

    #[rstest]
    fn test_blocks_out_of_order(table: NormalizedTable) {
        let mut blocks = split_resolutions(&table);
        blocks.reverse();
        assert!(matches!(
            assemble(&blocks, &table.schema),
            Err(FeatureError::ShapeMismatch(_))
        ));
    }
}
