//! The explicit feature layout shared by every stage.
//!
//! A feature is addressed by (resolution, window offset, statistic). The
//! schema fixes the order of each axis once; extraction, the feature table,
//! normalisation and tensor assembly all index through it instead of
//! re-deriving the order from column names.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::{FeatureError, Result};

/// Per-window statistics, in channel order.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum Statistic {
    /// Mean methylation value.
    Ave,
    /// Window SSD as a fraction of the whole feature region's SSD.
    FracSsd,
    /// Sum of squared deviations from the window mean.
    Ssd,
    /// SSD divided by the number of values.
    Var,
}

impl Statistic {
    /// Channel order. Sorted by column-name suffix, which is the order the
    /// trained models expect.
    pub const ALL: [Statistic; 4] = [
        Statistic::Ave,
        Statistic::FracSsd,
        Statistic::Ssd,
        Statistic::Var,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Ave => "Ave",
            Statistic::FracSsd => "FracSSD",
            Statistic::Ssd => "SSD",
            Statistic::Var => "Var",
        }
    }

    pub fn channel(&self) -> usize {
        match self {
            Statistic::Ave => 0,
            Statistic::FracSsd => 1,
            Statistic::Ssd => 2,
            Statistic::Var => 3,
        }
    }
}

impl FromStr for Statistic {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        Statistic::ALL
            .iter()
            .find(|stat| stat.name() == s)
            .copied()
            .ok_or_else(|| FeatureError::SchemaMismatch(format!("unknown statistic `{}`", s)))
    }
}

impl Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// Signed window offsets for `num_windows` windows: `-n/2..=-1` then `1..=n/2`.
///
pub fn window_offsets(num_windows: usize) -> Vec<i32> {
    let half = (num_windows / 2) as i32;
    (-half..0).chain(1..=half).collect()
}

///
/// Ordered axes of the feature layout.
///
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    pub window_sizes: Vec<u32>,
    pub offsets: Vec<i32>,
    pub statistics: Vec<Statistic>,
}

/// Column name of one feature: `{windowSize}_W{offset}_M_{stat}`.
pub fn column_name(window_size: u32, offset: i32, stat: Statistic) -> String {
    format!("{}_W{}_M_{}", window_size, offset, stat.name())
}

///
/// Parse a feature column name back into (window size, offset, statistic).
/// Returns `None` for anything that isn't a feature column.
///
pub fn parse_column_name(name: &str) -> Option<(u32, i32, Statistic)> {
    let mut parts = name.splitn(4, '_');
    let window_size = parts.next()?.parse::<u32>().ok()?;
    let offset = parts.next()?.strip_prefix('W')?.parse::<i32>().ok()?;
    if parts.next()? != "M" {
        return None;
    }
    let stat = parts.next()?.parse::<Statistic>().ok()?;
    Some((window_size, offset, stat))
}

impl FeatureSchema {
    pub fn new(window_sizes: &[u32], num_windows: usize) -> Self {
        FeatureSchema {
            window_sizes: window_sizes.to_vec(),
            offsets: window_offsets(num_windows),
            statistics: Statistic::ALL.to_vec(),
        }
    }

    pub fn num_resolutions(&self) -> usize {
        self.window_sizes.len()
    }

    pub fn num_windows(&self) -> usize {
        self.offsets.len()
    }

    pub fn num_channels(&self) -> usize {
        self.statistics.len()
    }

    /// Number of feature values one resolution contributes per promoter.
    pub fn resolution_width(&self) -> usize {
        self.num_windows() * self.num_channels()
    }

    /// Total number of feature values per promoter.
    pub fn width(&self) -> usize {
        self.num_resolutions() * self.resolution_width()
    }

    ///
    /// Flat position of (resolution, window, channel): resolution-major,
    /// then window, then channel.
    ///
    pub fn index(&self, resolution: usize, window: usize, channel: usize) -> usize {
        (resolution * self.num_windows() + window) * self.num_channels() + channel
    }

    ///
    /// Locate a parsed column within the schema.
    ///
    pub fn position(&self, window_size: u32, offset: i32, stat: Statistic) -> Option<usize> {
        let r = self.window_sizes.iter().position(|&w| w == window_size)?;
        let w = self.offsets.iter().position(|&o| o == offset)?;
        let c = self.statistics.iter().position(|&s| s == stat)?;
        Some(self.index(r, w, c))
    }

    ///
    /// All column names, in flat index order.
    ///
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for &window_size in &self.window_sizes {
            for &offset in &self.offsets {
                for &stat in &self.statistics {
                    names.push(column_name(window_size, offset, stat));
                }
            }
        }
        names
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.statistics.iter().map(|s| s.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn schema() -> FeatureSchema {
        FeatureSchema::new(&[250, 2500], 20)
    }

    #[rstest]
    fn test_window_offsets_skip_zero() {
        assert_eq!(window_offsets(4), vec![-2, -1, 1, 2]);
        assert_eq!(window_offsets(20).len(), 20);
        assert!(!window_offsets(20).contains(&0));
    }

    #[rstest]
    fn test_columns_per_resolution(schema: FeatureSchema) {
        assert_eq!(schema.resolution_width(), 20 * 4);
        assert_eq!(schema.width(), 160);
        assert_eq!(schema.column_names().len(), 160);
    }

    #[rstest]
    fn test_column_names_order(schema: FeatureSchema) {
        let names = schema.column_names();
        assert_eq!(names[0], "250_W-10_M_Ave");
        assert_eq!(names[1], "250_W-10_M_FracSSD");
        assert_eq!(names[2], "250_W-10_M_SSD");
        assert_eq!(names[3], "250_W-10_M_Var");
        assert_eq!(names[4], "250_W-9_M_Ave");
        assert_eq!(names[80], "2500_W-10_M_Ave");
        assert_eq!(names[159], "2500_W10_M_Var");
    }

    #[rstest]
    #[case("250_W-10_M_Ave", Some((250, -10, Statistic::Ave)))]
    #[case("2500_W3_M_FracSSD", Some((2500, 3, Statistic::FracSsd)))]
    #[case("EnsmblID_T", None)]
    #[case("250_W1_X_Ave", None)]
    #[case("250_W1_M_Mean", None)]
    fn test_parse_column_name(#[case] name: &str, #[case] expected: Option<(u32, i32, Statistic)>) {
        assert_eq!(parse_column_name(name), expected);
    }

    #[rstest]
    fn test_position_matches_column_names(schema: FeatureSchema) {
        let names = schema.column_names();
        for (i, name) in names.iter().enumerate() {
            let (size, offset, stat) = parse_column_name(name).unwrap();
            assert_eq!(schema.position(size, offset, stat), Some(i));
        }
        assert_eq!(schema.position(500, 1, Statistic::Ave), None);
    }
}
