//! Min-max scaling of window features.
//!
//! Every (resolution, statistic) pair is one group: all windows of all
//! promoters at that resolution share a single transform. Undefined values
//! take no part in fitting and are replaced by a fill value afterwards.

use log::debug;

use m2a_core::models::Promoter;

use crate::errors::{FeatureError, Result};
use crate::schema::FeatureSchema;
use crate::table::FeatureTable;

/// Observed bounds of one group. `None` when the group holds no defined value.
type GroupBounds = Option<(f64, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    pub range: (f64, f64),
    schema: FeatureSchema,
    // indexed by resolution * num_channels + channel
    bounds: Vec<GroupBounds>,
}

impl MinMaxScaler {
    ///
    /// Learn the bounds of every (resolution, statistic) group of `table`.
    ///
    /// # Arguments
    /// - table: features to fit on
    /// - range: target `(low, high)`, `low < high`
    pub fn fit(table: &FeatureTable, range: (f64, f64)) -> Result<Self> {
        let (low, high) = range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(FeatureError::InvalidConfig(format!(
                "scale range must satisfy low < high, got ({}, {})",
                low, high
            )));
        }

        let schema = &table.schema;
        let mut bounds: Vec<GroupBounds> =
            vec![None; schema.num_resolutions() * schema.num_channels()];

        for row in &table.values {
            for r in 0..schema.num_resolutions() {
                for w in 0..schema.num_windows() {
                    for c in 0..schema.num_channels() {
                        let Some(value) = row[schema.index(r, w, c)] else {
                            continue;
                        };
                        let group = &mut bounds[r * schema.num_channels() + c];
                        *group = match *group {
                            None => Some((value, value)),
                            Some((min, max)) => Some((min.min(value), max.max(value))),
                        };
                    }
                }
            }
        }

        for (r, &window_size) in schema.window_sizes.iter().enumerate() {
            for (c, stat) in schema.statistics.iter().enumerate() {
                debug!(
                    "Scaling group {}/{}: {:?}",
                    window_size,
                    stat,
                    bounds[r * schema.num_channels() + c]
                );
            }
        }

        Ok(MinMaxScaler {
            range,
            schema: schema.clone(),
            bounds,
        })
    }

    ///
    /// Scale one value of the group at (resolution, channel).
    ///
    /// A constant group maps to `low`. The result is clamped to the target
    /// range, so values outside the fitted bounds can't escape it.
    ///
    pub fn scale(&self, resolution: usize, channel: usize, value: f64) -> f64 {
        let (low, high) = self.range;
        let Some((min, max)) = self.bounds[resolution * self.schema.num_channels() + channel] else {
            return low;
        };
        let scaled = if max > min {
            low + (value - min) / (max - min) * (high - low)
        } else {
            low
        };
        scaled.clamp(low, high)
    }

    ///
    /// Scale every defined value of `table` and replace undefined values with `fill`.
    ///
    pub fn transform(&self, table: &FeatureTable, fill: f64) -> Result<NormalizedTable> {
        if table.schema != self.schema {
            return Err(FeatureError::SchemaMismatch(
                "table layout differs from the layout the scaler was fitted on".to_string(),
            ));
        }

        let schema = &self.schema;
        let values = table
            .values
            .iter()
            .map(|row| {
                let mut scaled = vec![fill; row.len()];
                for r in 0..schema.num_resolutions() {
                    for w in 0..schema.num_windows() {
                        for c in 0..schema.num_channels() {
                            let i = schema.index(r, w, c);
                            if let Some(value) = row[i] {
                                scaled[i] = self.scale(r, c, value);
                            }
                        }
                    }
                }
                scaled
            })
            .collect();

        Ok(NormalizedTable {
            schema: schema.clone(),
            promoters: table.promoters.clone(),
            values,
        })
    }
}

///
/// Scaled features: every value defined, same layout as the source [FeatureTable].
///
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub schema: FeatureSchema,
    pub promoters: Vec<Promoter>,
    pub values: Vec<Vec<f64>>,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.promoters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promoters.is_empty()
    }
}

///
/// Fit a scaler on `table` and apply it.
///
pub fn normalize(table: &FeatureTable, range: (f64, f64), fill: f64) -> Result<NormalizedTable> {
    MinMaxScaler::fit(table, range)?.transform(table, fill)
}
