use std::io::BufRead;
use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use log::{debug, info};

use crate::errors::{M2aCoreError, Result};
use crate::utils::{HeaderIndex, get_dynamic_reader, normalize_chrom, parse_optional_f64};

pub const METHYLATION_CHROM_COLUMN: &str = "chrom";
pub const METHYLATION_POS_COLUMN: &str = "pos";
pub const METHYLATION_VALUE_COLUMN: &str = "mval";

///
/// A single methylation measurement. The value may be absent.
///
#[derive(PartialEq, Debug, Clone)]
pub struct MethylationRecord {
    pub chr: String,
    pub pos: i64,
    pub value: Option<f64>,
}

///
/// All defined methylation values on one chromosome, sorted by position.
///
/// Absent and non-finite values are dropped on construction; they never take part in a statistic.
///
#[derive(Debug, Clone, Default)]
pub struct MethylationTrack {
    positions: Vec<i64>,
    values: Vec<f64>,
}

impl MethylationTrack {
    pub fn new(records: impl IntoIterator<Item = (i64, Option<f64>)>) -> Self {
        let mut pairs: Vec<(i64, f64)> = records
            .into_iter()
            .filter_map(|(pos, value)| value.filter(|v| v.is_finite()).map(|v| (pos, v)))
            .collect();
        // stable, so duplicated positions keep file order
        pairs.sort_by_key(|(pos, _)| *pos);

        let (positions, values) = pairs.into_iter().unzip();
        MethylationTrack { positions, values }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    ///
    /// Values whose position lies in the half-open interval `[start, end)`.
    ///
    pub fn range(&self, start: i64, end: i64) -> &[f64] {
        if start >= end {
            return &[];
        }
        let lo = self.positions.partition_point(|&p| p < start);
        let hi = self.positions.partition_point(|&p| p < end);
        &self.values[lo..hi]
    }
}

///
/// Methylation input partitioned by chromosome.
///
/// Chromosome keys are stored without a `chr` prefix.
///
#[derive(Debug, Clone, Default)]
pub struct MethylationSet {
    tracks: FxHashMap<String, MethylationTrack>,
    pub path: Option<PathBuf>,
}

impl TryFrom<&Path> for MethylationSet {
    type Error = M2aCoreError;

    ///
    /// Load a tab-delimited methylation file with `chrom`, `pos` and `mval` columns.
    ///
    /// Column order does not matter and extra columns are ignored.
    ///
    /// # Arguments:
    /// - value: path to the methylation file on disk.
    fn try_from(value: &Path) -> Result<Self> {
        let reader = get_dynamic_reader(value)?;
        let source = value.display().to_string();
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => HeaderIndex::new(&line?, &source),
            None => return Err(M2aCoreError::EmptyInput(source)),
        };
        let chrom_col = header.require(METHYLATION_CHROM_COLUMN)?;
        let pos_col = header.require(METHYLATION_POS_COLUMN)?;
        let value_col = header.require(METHYLATION_VALUE_COLUMN)?;

        let mut records = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let parts: Vec<&str> = line.split('\t').collect();
            let get = |col: usize, name: &str| -> Result<&str> {
                parts.get(col).copied().ok_or_else(|| M2aCoreError::MalformedRecord {
                    line: line_no,
                    reason: format!("missing column `{}`", name),
                })
            };

            let chr = get(chrom_col, METHYLATION_CHROM_COLUMN)?.trim().to_string();
            let raw_pos = get(pos_col, METHYLATION_POS_COLUMN)?.trim();
            let pos = raw_pos
                .parse::<i64>()
                .map_err(|_| M2aCoreError::MalformedRecord {
                    line: line_no,
                    reason: format!("can't parse position `{}`", raw_pos),
                })?;
            let value = parse_optional_f64(get(value_col, METHYLATION_VALUE_COLUMN)?)
                .map_err(|reason| M2aCoreError::MalformedRecord {
                    line: line_no,
                    reason,
                })?;

            records.push(MethylationRecord { chr, pos, value });
        }

        info!("Methylation data loaded, total positions: {}", records.len());

        let set = MethylationSet::from_records(records);
        Ok(MethylationSet {
            path: Some(value.to_owned()),
            ..set
        })
    }
}

impl TryFrom<&str> for MethylationSet {
    type Error = M2aCoreError;

    fn try_from(value: &str) -> Result<Self> {
        MethylationSet::try_from(Path::new(value))
    }
}

impl MethylationSet {
    pub fn from_records(records: impl IntoIterator<Item = MethylationRecord>) -> Self {
        let mut by_chrom: FxHashMap<String, Vec<(i64, Option<f64>)>> = FxHashMap::default();
        for record in records {
            by_chrom
                .entry(normalize_chrom(&record.chr).to_string())
                .or_default()
                .push((record.pos, record.value));
        }

        let tracks = by_chrom
            .into_iter()
            .map(|(chrom, records)| {
                let track = MethylationTrack::new(records);
                debug!("chr{} methylation values: {}", chrom, track.len());
                (chrom, track)
            })
            .collect();

        MethylationSet { tracks, path: None }
    }

    ///
    /// The track for a chromosome; `chr1` and `1` are the same key.
    ///
    pub fn track(&self, chrom: &str) -> Option<&MethylationTrack> {
        self.tracks.get(normalize_chrom(chrom))
    }

    pub fn num_chromosomes(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn track() -> MethylationTrack {
        MethylationTrack::new(vec![
            (1100, Some(3.0)),
            (900, Some(1.0)),
            (950, None),
            (1000, Some(2.0)),
            (1199, Some(4.0)),
            (1200, Some(5.0)),
        ])
    }

    #[rstest]
    fn test_absent_values_dropped(track: MethylationTrack) {
        assert_eq!(track.len(), 5);
    }

    #[rstest]
    fn test_non_finite_values_dropped() {
        let track = MethylationTrack::new(vec![
            (850, Some(f64::INFINITY)),
            (900, Some(f64::NAN)),
            (950, Some(1.0)),
        ]);
        assert_eq!(track.range(800, 1000), &[1.0]);
    }

    #[rstest]
    fn test_infinite_value_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meth.tsv");
        std::fs::write(&path, "chrom\tpos\tmval\n1\t800\t0.5\n1\t850\tinf\n").unwrap();

        let result = MethylationSet::try_from(path.as_path());
        assert!(matches!(result, Err(M2aCoreError::MalformedRecord { line: 3, .. })));
    }

    #[rstest]
    fn test_range_is_half_open(track: MethylationTrack) {
        assert_eq!(track.range(900, 1000), &[1.0]);
        assert_eq!(track.range(1000, 1200), &[2.0, 3.0, 4.0]);
        assert_eq!(track.range(1200, 1300), &[5.0]);
    }

    #[rstest]
    fn test_range_outside_track(track: MethylationTrack) {
        assert!(track.range(-500, 0).is_empty());
        assert!(track.range(5000, 6000).is_empty());
        assert!(track.range(1100, 1100).is_empty());
    }

    #[rstest]
    fn test_set_matches_chr_prefix() {
        let set = MethylationSet::from_records(vec![
            MethylationRecord {
                chr: "1".to_string(),
                pos: 10,
                value: Some(0.5),
            },
            MethylationRecord {
                chr: "chr1".to_string(),
                pos: 20,
                value: Some(0.7),
            },
        ]);

        assert_eq!(set.num_chromosomes(), 1);
        assert_eq!(set.track("chr1").unwrap().len(), 2);
        assert!(set.track("chr2").is_none());
    }
}
