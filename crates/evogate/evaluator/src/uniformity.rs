//! Uniformity diagnostic over p-values of earlier bundles.

use evogate_types::Uniformity;

/// One-sample Kolmogorov–Smirnov distance from U(0, 1).
///
/// Values are clamped to [0, 1]; non-finite values are ignored. `None`
/// with fewer than two usable values.
pub fn ks_statistic(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .collect();
    if sorted.len() < 2 {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let d = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let above = (i as f64 + 1.0) / n - x;
            let below = x - i as f64 / n;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);
    Some(d)
}

/// Population variance. `None` with fewer than two finite values.
pub fn variance(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    Some(finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
}

pub fn uniformity(prior_p_values: &[f64]) -> Uniformity {
    Uniformity {
        samples: prior_p_values.len() as u64,
        ks_statistic: ks_statistic(prior_p_values),
        variance: variance(prior_p_values),
    }
}
