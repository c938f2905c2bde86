use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use fxhash::FxHashMap;

use crate::errors::{M2aCoreError, Result};

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)
        .map_err(|e| M2aCoreError::FileReadError(format!("{}: {}", path.display(), e)))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(flate2::read::MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Strip a leading `chr` so that `chr1` and `1` refer to the same chromosome.
///
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

///
/// Parse a possibly-absent floating point field. Empty strings, `NA`, `NaN`
/// and `.` are treated as absent, as is any value that parses to NaN.
/// Infinite values are rejected.
///
pub fn parse_optional_f64(field: &str) -> std::result::Result<Option<f64>, String> {
    let field = field.trim();
    match field {
        "" | "." | "NA" | "na" | "NaN" | "nan" | "NAN" => Ok(None),
        _ => {
            let value = field
                .parse::<f64>()
                .map_err(|e| format!("can't parse `{}` as a number: {}", field, e))?;
            if value.is_nan() {
                Ok(None)
            } else if value.is_infinite() {
                Err(format!("`{}` is not a finite number", field))
            } else {
                Ok(Some(value))
            }
        }
    }
}

///
/// Lookup from column name to column position, built from a tab-delimited header line.
///
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    pub columns: Vec<String>,
    positions: FxHashMap<String, usize>,
    source: String,
}

impl HeaderIndex {
    pub fn new(header: &str, source: &str) -> Self {
        let columns: Vec<String> = header
            .trim_end_matches(['\r', '\n'])
            .split('\t')
            .map(|s| s.trim().to_string())
            .collect();
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        HeaderIndex {
            columns,
            positions,
            source: source.to_string(),
        }
    }

    pub fn get(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn require(&self, column: &str) -> Result<usize> {
        self.get(column).ok_or_else(|| M2aCoreError::MissingColumn {
            column: column.to_string(),
            file: self.source.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("chr1", "1")]
    #[case("1", "1")]
    #[case("chrX", "X")]
    fn test_normalize_chrom(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_chrom(input), expected);
    }

    #[rstest]
    #[case("", None)]
    #[case("NA", None)]
    #[case("nan", None)]
    #[case("0.25", Some(0.25))]
    #[case(" -1.5 ", Some(-1.5))]
    fn test_parse_optional_f64(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_optional_f64(input).unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("inf")]
    #[case("-inf")]
    #[case("Infinity")]
    #[case("1e999")]
    fn test_parse_optional_f64_rejects_garbage(#[case] input: &str) {
        assert!(parse_optional_f64(input).is_err());
    }

    #[rstest]
    fn test_header_index_lookup() {
        let header = HeaderIndex::new("pos\tchrom\tmval\n", "meth.tsv");
        assert_eq!(header.require("chrom").unwrap(), 1);
        assert_eq!(header.get("mval"), Some(2));
        assert!(matches!(
            header.require("strand"),
            Err(M2aCoreError::MissingColumn { .. })
        ));
    }
}
