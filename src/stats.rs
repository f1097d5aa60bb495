//! Summary statistics for a posterior sample.

use ndarray::Array1;
use ndarray_stats::SummaryStatisticsExt;

/// Location and spread of a 1-D posterior sample. The credible interval is
/// the 16th/84th-percentile range.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSummary {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
    pub median: f64,
    pub lower_68: f64,
    pub upper_68: f64,
}

/// Summarizes a posterior sample; `None` when the sample holds fewer than
/// two points.
pub fn summarize(sample: &Array1<f64>) -> Option<PosteriorSummary> {
    let n = sample.len();
    if n < 2 {
        return None;
    }

    let mean = sample.mean()?;
    let variance = sample.central_moment(2).ok()?;
    let sd = (variance * n as f64 / (n as f64 - 1.0)).sqrt();

    let mut sorted = sample.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    Some(PosteriorSummary {
        n,
        mean,
        sd,
        median: percentile(&sorted, 0.5),
        lower_68: percentile(&sorted, 0.16),
        upper_68: percentile(&sorted, 0.84),
    })
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx]
}
