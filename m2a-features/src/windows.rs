//! Window placement and per-window methylation statistics.
//!
//! Windows are fixed-width, half-open and tile a feature region centred on
//! the TSS. The region bounds never depend on strand; strand only decides
//! the order in which the windows are reported.

use m2a_core::models::{MethylationTrack, Strand};

use crate::schema::Statistic;

/// Decimal digits kept for every statistic.
pub const STAT_DECIMALS: i32 = 3;

///
/// Round half-to-even at [STAT_DECIMALS] digits.
///
pub fn round_stat(value: f64) -> f64 {
    let scale = 10f64.powi(STAT_DECIMALS);
    (value * scale).round_ties_even() / scale
}

/// Window geometry of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub window_size: u32,
    pub num_windows: usize,
}

impl WindowLayout {
    pub fn new(window_size: u32, num_windows: usize) -> Self {
        WindowLayout {
            window_size,
            num_windows,
        }
    }

    /// Half-open feature region `[tss - size*n/2, tss + size*n/2)`.
    pub fn feature_region(&self, tss: i64) -> (i64, i64) {
        let half = self.window_size as i64 * self.num_windows as i64 / 2;
        (tss - half, tss + half)
    }

    ///
    /// Windows in ascending genomic order, starting at the region's lower bound.
    ///
    pub fn genomic_windows(&self, tss: i64) -> Vec<(i64, i64)> {
        let (start, _) = self.feature_region(tss);
        let size = self.window_size as i64;
        (0..self.num_windows as i64)
            .map(|i| (start + i * size, start + (i + 1) * size))
            .collect()
    }

    ///
    /// Windows in offset order (most upstream first). On the minus strand the
    /// genomic order is reversed; the coordinates are unchanged.
    ///
    pub fn windows(&self, tss: i64, strand: Strand) -> Vec<(i64, i64)> {
        let mut windows = self.genomic_windows(tss);
        if strand == Strand::Minus {
            windows.reverse();
        }
        windows
    }
}

/// The four statistics of one non-empty window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub ave: f64,
    pub frac_ssd: f64,
    pub ssd: f64,
    pub var: f64,
}

impl WindowStats {
    pub fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Ave => self.ave,
            Statistic::FracSsd => self.frac_ssd,
            Statistic::Ssd => self.ssd,
            Statistic::Var => self.var,
        }
    }
}

///
/// Summarise the values of one window. `None` when the window holds no finite
/// value or a statistic overflows.
///
/// When the whole-region SSD is zero the dispersion statistics are all zero;
/// the mean is still reported.
///
pub fn summarize(values: &[f64], region_ssd: f64) -> Option<WindowStats> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let ave = values.iter().sum::<f64>() / n;

    let (ssd, frac_ssd, var) = if region_ssd == 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        let ssd: f64 = values.iter().map(|v| (v - ave).powi(2)).sum();
        (ssd, ssd / region_ssd, ssd / n)
    };

    if ![ave, ssd, frac_ssd, var].iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(WindowStats {
        ave: round_stat(ave),
        frac_ssd: round_stat(frac_ssd),
        ssd: round_stat(ssd),
        var: round_stat(var),
    })
}

///
/// SSD over the whole feature region, rounded like every other statistic.
/// `None` when the region holds no values.
///
pub fn region_ssd(values: &[f64]) -> Option<f64> {
    // a unit denominator makes summarize compute the plain SSD
    summarize(values, 1.0).map(|stats| stats.ssd)
}

///
/// Statistics of every window of one promoter at one resolution, in offset order.
///
/// # Arguments
/// - tss: transcription start site
/// - strand: promoter strand, decides window order
/// - track: methylation values of the promoter's chromosome, if any
/// - layout: window geometry
pub fn promoter_window_stats(
    tss: i64,
    strand: Strand,
    track: Option<&MethylationTrack>,
    layout: &WindowLayout,
) -> Vec<Option<WindowStats>> {
    let Some(track) = track else {
        return vec![None; layout.num_windows];
    };

    let (region_start, region_end) = layout.feature_region(tss);
    let Some(region_ssd) = region_ssd(track.range(region_start, region_end)) else {
        return vec![None; layout.num_windows];
    };

    layout
        .windows(tss, strand)
        .into_iter()
        .map(|(start, end)| summarize(track.range(start, end), region_ssd))
        .collect()
}
