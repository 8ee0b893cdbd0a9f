//! Integer-millisecond summary statistics.

/// Median of `values`. For an even count the two middle values are averaged,
/// rounding toward the lower one so the result stays on the millisecond grid.
pub fn median(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        let lo = sorted[mid - 1];
        let hi = sorted[mid];
        Some(lo + (hi - lo) / 2)
    }
}

/// Arithmetic mean truncated to whole milliseconds.
pub fn mean_truncated(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    Some((sum / values.len() as i128) as i64)
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Needs at least two values.
pub fn sample_std_dev(values: &[i64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Standard deviation divided by the mean. Undefined for fewer than two
/// values or a non-positive mean.
pub fn coefficient_of_variation(values: &[i64]) -> Option<f64> {
    let mean = mean(values)?;
    if mean <= 0.0 {
        return None;
    }
    sample_std_dev(values).map(|sd| sd / mean)
}
