use std::io::BufRead;
use std::path::Path;

use fxhash::{FxHashMap, FxHashSet};
use log::info;

use m2a_core::models::Promoter;
use m2a_core::utils::{HeaderIndex, get_dynamic_reader};

use crate::errors::{FeatureError, Result};

/// Promoter key column shared by every table.
pub const KEY_COLUMN: &str = "EnsmblID_T";

/// Column holding the response variable.
pub const RESPONSE_COLUMN: &str = "log2_ChipDivInput";

///
/// Response variable per promoter key, as read from a response TSV.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTable {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

impl TryFrom<&Path> for ResponseTable {
    type Error = FeatureError;

    fn try_from(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let reader = get_dynamic_reader(path)?;
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => HeaderIndex::new(&line?, &source),
            None => return Err(m2a_core::M2aCoreError::EmptyInput(source).into()),
        };
        let key_col = header.require(KEY_COLUMN)?;
        let value_col = header.require(RESPONSE_COLUMN)?;

        let mut table = ResponseTable {
            keys: Vec::new(),
            values: Vec::new(),
        };
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let parts: Vec<&str> = line.split('\t').collect();
            let (Some(key), Some(raw)) = (parts.get(key_col), parts.get(value_col)) else {
                return Err(FeatureError::MalformedRecord {
                    line: line_no,
                    reason: format!("expected at least {} columns", key_col.max(value_col) + 1),
                });
            };
            let value = raw.trim().parse::<f64>().map_err(|_| FeatureError::MalformedRecord {
                line: line_no,
                reason: format!("can't parse response `{}`", raw),
            })?;
            table.keys.push(key.trim().to_string());
            table.values.push(value);
        }

        info!("Loaded {} response values from {}", table.keys.len(), source);
        Ok(table)
    }
}

impl TryFrom<&str> for ResponseTable {
    type Error = FeatureError;

    fn try_from(value: &str) -> Result<Self> {
        ResponseTable::try_from(Path::new(value))
    }
}

///
/// Metadata reordered to follow the tensor's promoter axis row for row.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedMetadata {
    pub promoters: Vec<Promoter>,
    pub response: Option<Vec<f64>>,
}

///
/// Pick `index[key]` for every key, in key order. Both directions are strict:
/// a key without an entry and an entry without a key are errors.
///
fn align<T: Clone>(keys: &[String], index: &FxHashMap<&str, T>, what: &str) -> Result<Vec<T>> {
    let aligned = keys
        .iter()
        .map(|key| {
            index
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| FeatureError::MissingMetadata(format!("{} ({})", key, what)))
        })
        .collect::<Result<Vec<T>>>()?;

    let wanted: FxHashSet<&str> = keys.iter().map(|k| k.as_str()).collect();
    let mut unmatched: Vec<&str> = index.keys().filter(|k| !wanted.contains(*k)).copied().collect();
    if !unmatched.is_empty() {
        unmatched.sort_unstable();
        return Err(FeatureError::UnmatchedMetadata {
            count: unmatched.len(),
            first: unmatched[0].to_string(),
        });
    }
    Ok(aligned)
}

///
/// Reindex promoter metadata (and optionally the response variable) to the
/// tensor's key order.
///
/// # Arguments
/// - keys: promoter key of each tensor row
/// - promoters: metadata rows, any order
/// - response: response variable per key, any order
pub fn align_metadata(
    keys: &[String],
    promoters: &[Promoter],
    response: Option<&ResponseTable>,
) -> Result<AlignedMetadata> {
    let mut by_key: FxHashMap<&str, &Promoter> = FxHashMap::default();
    for promoter in promoters {
        if by_key.insert(promoter.transcript_id.as_str(), promoter).is_some() {
            return Err(FeatureError::DuplicatePromoter(promoter.transcript_id.clone()));
        }
    }
    let promoters = align(keys, &by_key, "promoter metadata")?
        .into_iter()
        .cloned()
        .collect();

    let response = match response {
        Some(table) => {
            let mut by_key: FxHashMap<&str, f64> = FxHashMap::default();
            for (key, value) in table.keys.iter().zip(&table.values) {
                if by_key.insert(key.as_str(), *value).is_some() {
                    return Err(FeatureError::DuplicatePromoter(key.clone()));
                }
            }
            Some(align(keys, &by_key, RESPONSE_COLUMN)?)
        }
        None => None,
    };

    Ok(AlignedMetadata { promoters, response })
}

#[cfg(test)]
mod tests {
    use super::*;

    use m2a_core::models::Strand;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn promoter(id: &str) -> Promoter {
        Promoter {
            transcript_id: id.to_string(),
            gene_id: format!("G{}", id),
            gene_name: "g".to_string(),
            strand: Strand::Minus,
            chr: "chr2".to_string(),
            start: 1000,
            end: 2000,
            response_start: 1000,
            response_end: 3000,
        }
    }

    fn keys(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[fixture]
    fn response() -> ResponseTable {
        ResponseTable {
            keys: keys(&["b", "c", "a"]),
            values: vec![2.0, 3.0, 1.0],
        }
    }

    #[rstest]
    fn test_aligns_to_key_order(response: ResponseTable) {
        let promoters = vec![promoter("c"), promoter("a"), promoter("b")];
        let aligned = align_metadata(&keys(&["a", "b", "c"]), &promoters, Some(&response)).unwrap();

        let ids: Vec<&str> = aligned.promoters.iter().map(|p| p.transcript_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(aligned.response, Some(vec![1.0, 2.0, 3.0]));
    }

    #[rstest]
    fn test_missing_metadata_is_fatal() {
        let promoters = vec![promoter("a")];
        let result = align_metadata(&keys(&["a", "b"]), &promoters, None);
        assert!(matches!(result, Err(FeatureError::MissingMetadata(_))));
    }

    #[rstest]
    fn test_extra_metadata_is_fatal() {
        let promoters = vec![promoter("a"), promoter("z"), promoter("b")];
        let result = align_metadata(&keys(&["a", "b"]), &promoters, None);
        assert!(matches!(
            result,
            Err(FeatureError::UnmatchedMetadata { count: 1, first }) if first == "z"
        ));
    }

    #[rstest]
    fn test_response_must_cover_every_key(response: ResponseTable) {
        let promoters = vec![promoter("a"), promoter("b"), promoter("c"), promoter("d")];
        let result = align_metadata(&keys(&["a", "b", "c", "d"]), &promoters, Some(&response));
        assert!(matches!(result, Err(FeatureError::MissingMetadata(_))));
    }

    #[rstest]
    fn test_read_response_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.tsv");
        std::fs::write(
            &path,
            "EnsmblID_T\tEnsmblID_G\tlog2_ChipDivInput\nT1\tG1\t0.5\nT2\tG2\t-1.25\n",
        )
        .unwrap();

        let table = ResponseTable::try_from(path.as_path()).unwrap();
        assert_eq!(table.keys, keys(&["T1", "T2"]));
        assert_eq!(table.values, vec![0.5, -1.25]);
    }

    #[rstest]
    fn test_read_response_requires_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.tsv");
        std::fs::write(&path, "EnsmblID_T\tscore\nT1\t0.5\n").unwrap();

        let result = ResponseTable::try_from(path.as_path());
        assert!(matches!(result, Err(FeatureError::Core(_))));
    }
}
