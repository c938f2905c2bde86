use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use log::{debug, info};

use m2a_core::models::{PROMOTER_COLUMNS, Promoter, parse_promoter_fields};
use m2a_core::utils::{HeaderIndex, get_dynamic_reader, parse_optional_f64};

use crate::errors::{FeatureError, Result};
use crate::schema::{FeatureSchema, parse_column_name};

/// How an undefined feature value is written to disk.
pub const MISSING_VALUE: &str = "NaN";

///
/// Per-promoter window features before normalisation.
///
/// `values[i]` holds promoter `i`'s features in [FeatureSchema::index] order;
/// `None` marks a window without methylation data.
///
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub promoters: Vec<Promoter>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl FeatureTable {
    pub fn new(schema: FeatureSchema) -> Self {
        FeatureTable {
            schema,
            promoters: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.promoters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promoters.is_empty()
    }

    pub fn push_row(&mut self, promoter: Promoter, row: Vec<Option<f64>>) -> Result<()> {
        if row.len() != self.schema.width() {
            return Err(FeatureError::ShapeMismatch(format!(
                "promoter `{}` has {} feature values, expected {}",
                promoter.transcript_id,
                row.len(),
                self.schema.width()
            )));
        }
        self.promoters.push(promoter);
        self.values.push(row);
        Ok(())
    }

    ///
    /// Write the table as TSV: promoter columns, then one column per feature in schema order.
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    pub fn write_tsv<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        let mut header: Vec<String> = PROMOTER_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(self.schema.column_names());
        writeln!(writer, "{}", header.join("\t"))?;

        for (promoter, row) in self.promoters.iter().zip(&self.values) {
            write!(writer, "{}", promoter.as_string())?;
            for value in row {
                match value {
                    Some(v) => write!(writer, "\t{}", v)?,
                    None => write!(writer, "\t{}", MISSING_VALUE)?,
                }
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        info!("Wrote {} promoter feature rows to {}", self.len(), path.display());
        Ok(())
    }

    ///
    /// Read a feature TSV written by [FeatureTable::write_tsv] (or any file with the
    /// same column naming), mapping each feature column onto `schema`.
    ///
    /// Column order doesn't matter. Every schema column must be present exactly
    /// once, and a feature column the schema doesn't know about is an error.
    /// Non-feature columns besides the promoter columns are ignored.
    ///
    pub fn read_tsv<T: AsRef<Path>>(path: T, schema: FeatureSchema) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let reader = get_dynamic_reader(path)?;
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => HeaderIndex::new(&line?, &source),
            None => {
                return Err(FeatureError::SchemaMismatch(format!(
                    "{} is empty",
                    source
                )));
            }
        };
        let promoter_columns: Vec<usize> = PROMOTER_COLUMNS
            .iter()
            .map(|c| header.require(c))
            .collect::<m2a_core::Result<_>>()?;

        // file column -> schema slot
        let mut feature_columns: Vec<(usize, usize)> = Vec::with_capacity(schema.width());
        let mut covered = vec![false; schema.width()];
        for (col, name) in header.columns.iter().enumerate() {
            let Some((size, offset, stat)) = parse_column_name(name) else {
                if !PROMOTER_COLUMNS.contains(&name.as_str()) {
                    debug!("Ignoring non-feature column `{}`", name);
                }
                continue;
            };
            let slot = schema.position(size, offset, stat).ok_or_else(|| {
                FeatureError::SchemaMismatch(format!("column `{}` is not part of the schema", name))
            })?;
            if covered[slot] {
                return Err(FeatureError::SchemaMismatch(format!(
                    "column `{}` appears twice",
                    name
                )));
            }
            covered[slot] = true;
            feature_columns.push((col, slot));
        }
        if let Some(missing) = covered.iter().position(|c| !c) {
            return Err(FeatureError::SchemaMismatch(format!(
                "missing column `{}`",
                schema.column_names()[missing]
            )));
        }

        let mut table = FeatureTable::new(schema);
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let parts: Vec<&str> = line.split('\t').collect();
            let promoter = parse_promoter_fields(&parts, &promoter_columns, line_no)?;

            let mut row = vec![None; table.schema.width()];
            for &(col, slot) in &feature_columns {
                let raw = parts.get(col).ok_or_else(|| FeatureError::MalformedRecord {
                    line: line_no,
                    reason: format!("missing column `{}`", header.columns[col]),
                })?;
                row[slot] = parse_optional_f64(raw)
                    .map_err(|reason| FeatureError::MalformedRecord { line: line_no, reason })?;
            }
            table.push_row(promoter, row)?;
        }

        info!("Loaded {} promoter feature rows from {}", table.len(), source);
        Ok(table)
    }
}
