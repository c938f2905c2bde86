use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::M2aCoreError;

/// Column names of a promoter definition file, in output order.
pub const PROMOTER_COLUMNS: [&str; 9] = [
    "EnsmblID_T",
    "EnsmblID_G",
    "Gene",
    "Strand",
    "Chr",
    "Start",
    "End",
    "RStart",
    "REnd",
];

#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum Strand {
    Plus,
    Minus,
}

impl FromStr for Strand {
    type Err = M2aCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            other => Err(M2aCoreError::InvalidStrand(other.to_string())),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

///
/// One promoter region, keyed by its transcript ID.
///
/// Coordinates are signed so that feature regions reaching past the start
/// of a chromosome can still be represented.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Promoter {
    pub transcript_id: String,
    pub gene_id: String,
    pub gene_name: String,
    pub strand: Strand,
    pub chr: String,
    pub start: i64,
    pub end: i64,
    pub response_start: i64,
    pub response_end: i64,
}

impl Promoter {
    ///
    /// The transcription start site: `start` on the plus strand, `end` on the minus strand.
    ///
    pub fn tss(&self) -> i64 {
        match self.strand {
            Strand::Plus => self.start,
            Strand::Minus => self.end,
        }
    }

    ///
    /// The promoter's fields rendered as strings, in [PROMOTER_COLUMNS] order.
    ///
    pub fn fields(&self) -> [String; 9] {
        [
            self.transcript_id.clone(),
            self.gene_id.clone(),
            self.gene_name.clone(),
            self.strand.to_string(),
            self.chr.clone(),
            self.start.to_string(),
            self.end.to_string(),
            self.response_start.to_string(),
            self.response_end.to_string(),
        ]
    }

    pub fn as_string(&self) -> String {
        self.fields().join("\t")
    }
}

impl Display for Promoter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
