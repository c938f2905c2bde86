use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use fxhash::{FxHashMap, FxHashSet};
use log::{debug, info};

use crate::errors::{M2aCoreError, Result};
use crate::models::promoter::{PROMOTER_COLUMNS, Promoter, Strand};
use crate::utils::{HeaderIndex, get_dynamic_reader, normalize_chrom};

///
/// PromoterSet struct, the in-memory representation of a promoter definition file.
///
/// Promoter order is the order of the file. Transcript IDs are unique.
///
#[derive(Clone, Debug)]
pub struct PromoterSet {
    pub promoters: Vec<Promoter>,
    pub path: Option<PathBuf>,
}

impl TryFrom<&Path> for PromoterSet {
    type Error = M2aCoreError;

    ///
    /// Create a new [PromoterSet] from a tab-delimited promoter definition file.
    ///
    /// The file must have a header naming the columns in [PROMOTER_COLUMNS];
    /// column order does not matter and extra columns are ignored. Any row that
    /// can't be parsed fails the whole load.
    ///
    /// # Arguments:
    /// - value: path to the promoter definition file on disk.
    fn try_from(value: &Path) -> Result<Self> {
        let reader = get_dynamic_reader(value)?;
        let source = value.display().to_string();
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => HeaderIndex::new(&line?, &source),
            None => return Err(M2aCoreError::EmptyInput(source)),
        };
        let columns: Vec<usize> = PROMOTER_COLUMNS
            .iter()
            .map(|c| header.require(c))
            .collect::<Result<_>>()?;

        let mut promoters = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // header is line 1
            let line_no = idx + 2;
            let parts: Vec<&str> = line.split('\t').collect();
            promoters.push(parse_promoter_fields(&parts, &columns, line_no)?);
        }

        if promoters.is_empty() {
            return Err(M2aCoreError::EmptyInput(source));
        }

        let set = PromoterSet::new(promoters)?;
        info!("Loaded {} promoter definitions from {}", set.len(), source);

        Ok(PromoterSet {
            path: Some(value.to_owned()),
            ..set
        })
    }
}

impl TryFrom<&str> for PromoterSet {
    type Error = M2aCoreError;

    fn try_from(value: &str) -> Result<Self> {
        PromoterSet::try_from(Path::new(value))
    }
}

///
/// Parse one promoter row. `columns` holds the position of each [PROMOTER_COLUMNS]
/// entry within `parts`.
///
pub fn parse_promoter_fields(parts: &[&str], columns: &[usize], line: usize) -> Result<Promoter> {
    let field = |i: usize| -> Result<&str> {
        parts
            .get(columns[i])
            .map(|s| s.trim())
            .ok_or_else(|| M2aCoreError::MalformedRecord {
                line,
                reason: format!("missing column `{}`", PROMOTER_COLUMNS[i]),
            })
    };
    let coordinate = |i: usize| -> Result<i64> {
        let raw = field(i)?;
        raw.parse::<i64>().map_err(|_| M2aCoreError::MalformedRecord {
            line,
            reason: format!("can't parse {} `{}` as an integer", PROMOTER_COLUMNS[i], raw),
        })
    };

    let transcript_id = field(0)?;
    if transcript_id.is_empty() {
        return Err(M2aCoreError::MalformedRecord {
            line,
            reason: "empty transcript ID".to_string(),
        });
    }

    Ok(Promoter {
        transcript_id: transcript_id.to_string(),
        gene_id: field(1)?.to_string(),
        gene_name: field(2)?.to_string(),
        strand: field(3)?
            .parse::<Strand>()
            .map_err(|e| M2aCoreError::MalformedRecord {
                line,
                reason: e.to_string(),
            })?,
        chr: field(4)?.to_string(),
        start: coordinate(5)?,
        end: coordinate(6)?,
        response_start: coordinate(7)?,
        response_end: coordinate(8)?,
    })
}

impl PromoterSet {
    ///
    /// Build a set from already-parsed promoters, rejecting duplicate transcript IDs.
    ///
    pub fn new(promoters: Vec<Promoter>) -> Result<Self> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for promoter in &promoters {
            if !seen.insert(promoter.transcript_id.as_str()) {
                return Err(M2aCoreError::DuplicatePromoter(
                    promoter.transcript_id.clone(),
                ));
            }
        }
        Ok(PromoterSet {
            promoters,
            path: None,
        })
    }

    pub fn len(&self) -> usize {
        self.promoters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promoters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Promoter> {
        self.promoters.iter()
    }

    ///
    /// Chromosome names in order of first appearance. Names that differ only by
    /// a `chr` prefix are reported once, under the first spelling seen.
    ///
    pub fn chromosomes(&self) -> Vec<&str> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        self.promoters
            .iter()
            .map(|p| p.chr.as_str())
            .filter(|chr| seen.insert(normalize_chrom(chr)))
            .collect()
    }

    ///
    /// Promoters on one chromosome, in file order. `chr1` and `1` match each other.
    ///
    pub fn on_chromosome(&self, chrom: &str) -> Vec<&Promoter> {
        let wanted = normalize_chrom(chrom);
        self.promoters
            .iter()
            .filter(|p| normalize_chrom(&p.chr) == wanted)
            .collect()
    }

    ///
    /// Write the promoter definitions to disk with a [PROMOTER_COLUMNS] header.
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    pub fn write_tsv<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", PROMOTER_COLUMNS.join("\t"))?;
        for promoter in &self.promoters {
            writeln!(writer, "{}", promoter.as_string())?;
        }
        writer.flush()?;
        Ok(())
    }

    ///
    /// Derive promoter definitions from the `transcript` records of a GFF3 file.
    ///
    /// Transcripts are kept per chromosome and strand, walking in the direction of
    /// transcription: a transcript is kept only when its TSS lies more than
    /// `min_tss_spacing` bp past the last kept TSS. The response window is
    /// centred on the TSS and `response_window` bp wide.
    ///
    /// Output order is all plus-strand promoters by chromosome, then all minus-strand ones.
    ///
    /// # Arguments
    /// - path: GFF3 (optionally gzipped) file
    /// - keep_chromosomes: chromosomes to keep, in output order
    /// - min_tss_spacing: minimum distance between kept TSSs on one strand
    /// - response_window: width of the response-variable window
    pub fn from_gff<T: AsRef<Path>>(
        path: T,
        keep_chromosomes: &[String],
        min_tss_spacing: i64,
        response_window: i64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let reader = get_dynamic_reader(path)?;
        let keep: FxHashSet<&str> = keep_chromosomes.iter().map(|c| c.as_str()).collect();

        let mut transcripts: FxHashMap<(String, Strand), Vec<Promoter>> = FxHashMap::default();
        let mut total = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 9 {
                return Err(M2aCoreError::MalformedRecord {
                    line: line_no,
                    reason: format!("expected 9 GFF columns, found {}", fields.len()),
                });
            }
            if fields[2] != "transcript" || !keep.contains(fields[0]) {
                continue;
            }

            let promoter = parse_gff_transcript(&fields, line_no, response_window)?;
            total += 1;
            transcripts
                .entry((promoter.chr.clone(), promoter.strand))
                .or_default()
                .push(promoter);
        }

        let mut promoters = Vec::new();
        for strand in [Strand::Plus, Strand::Minus] {
            for chrom in keep_chromosomes {
                if let Some(candidates) = transcripts.remove(&(chrom.clone(), strand)) {
                    let kept = space_transcripts(candidates, strand, min_tss_spacing);
                    debug!("{} {}: kept {} transcripts", chrom, strand, kept.len());
                    promoters.extend(kept);
                }
            }
        }

        info!(
            "Kept {} of {} transcripts with TSS spacing > {}bp",
            promoters.len(),
            total,
            min_tss_spacing
        );

        let set = PromoterSet::new(promoters)?;
        Ok(PromoterSet {
            path: Some(path.to_owned()),
            ..set
        })
    }
}

fn parse_gff_transcript(fields: &[&str], line: usize, response_window: i64) -> Result<Promoter> {
    let malformed = |reason: String| M2aCoreError::MalformedRecord { line, reason };

    let start = fields[3]
        .parse::<i64>()
        .map_err(|_| malformed(format!("can't parse start `{}`", fields[3])))?;
    let end = fields[4]
        .parse::<i64>()
        .map_err(|_| malformed(format!("can't parse end `{}`", fields[4])))?;
    let strand = fields[6]
        .parse::<Strand>()
        .map_err(|e| malformed(e.to_string()))?;

    let attribute = |key: &str| -> Result<String> {
        fields[8]
            .split(';')
            .filter_map(|kv| kv.trim().split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .ok_or_else(|| malformed(format!("missing `{}` attribute", key)))
    };

    let tss = match strand {
        Strand::Plus => start,
        Strand::Minus => end,
    };
    let half = response_window / 2;

    Ok(Promoter {
        transcript_id: attribute("ID")?,
        gene_id: attribute("Parent")?,
        gene_name: attribute("gene_name")?,
        strand,
        chr: fields[0].to_string(),
        start,
        end,
        response_start: tss - half,
        response_end: tss + half,
    })
}

///
/// Walk transcripts in transcription order, keeping one only when its TSS is
/// past the exclusion zone left by the previously kept one.
///
fn space_transcripts(mut candidates: Vec<Promoter>, strand: Strand, spacing: i64) -> Vec<Promoter> {
    // on the minus strand the walk runs from high to low coordinates, so
    // positions are negated to reuse the ascending walk
    let directed = |p: &Promoter| match strand {
        Strand::Plus => p.tss(),
        Strand::Minus => -p.tss(),
    };
    candidates.sort_by_key(|p| directed(p));

    let mut boundary = match strand {
        Strand::Plus => 0,
        Strand::Minus => i64::MIN,
    };
    let mut kept = Vec::new();
    for promoter in candidates {
        let position = directed(&promoter);
        if position > boundary {
            boundary = position + spacing;
            kept.push(promoter);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn promoter(id: &str, strand: Strand, start: i64, end: i64) -> Promoter {
        Promoter {
            transcript_id: id.to_string(),
            gene_id: "G".to_string(),
            gene_name: "g".to_string(),
            strand,
            chr: "chr1".to_string(),
            start,
            end,
            response_start: 0,
            response_end: 0,
        }
    }

    #[rstest]
    fn test_duplicate_transcripts_rejected() {
        let result = PromoterSet::new(vec![
            promoter("T1", Strand::Plus, 10, 20),
            promoter("T1", Strand::Plus, 30, 40),
        ]);
        assert!(matches!(result, Err(M2aCoreError::DuplicatePromoter(id)) if id == "T1"));
    }

    #[rstest]
    fn test_space_transcripts_plus() {
        let kept = space_transcripts(
            vec![
                promoter("a", Strand::Plus, 5000, 9000),
                promoter("b", Strand::Plus, 5500, 9000),
                promoter("c", Strand::Plus, 6001, 9000),
                promoter("d", Strand::Plus, 6500, 9000),
            ],
            Strand::Plus,
            1000,
        );
        let ids: Vec<&str> = kept.iter().map(|p| p.transcript_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[rstest]
    fn test_space_transcripts_minus_walks_downwards() {
        let kept = space_transcripts(
            vec![
                promoter("a", Strand::Minus, 0, 5000),
                promoter("b", Strand::Minus, 0, 9000),
                promoter("c", Strand::Minus, 0, 8500),
                promoter("d", Strand::Minus, 0, 7999),
            ],
            Strand::Minus,
            1000,
        );
        let ids: Vec<&str> = kept.iter().map(|p| p.transcript_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[rstest]
    fn test_chromosomes_in_first_seen_order() {
        let mut a = promoter("a", Strand::Plus, 1, 2);
        a.chr = "chr2".to_string();
        let b = promoter("b", Strand::Plus, 1, 2);
        let mut c = promoter("c", Strand::Plus, 1, 2);
        c.chr = "chr2".to_string();
        let set = PromoterSet::new(vec![a, b, c]).unwrap();

        assert_eq!(set.chromosomes(), vec!["chr2", "chr1"]);
        assert_eq!(set.on_chromosome("2").len(), 2);
    }
}
