/// Values of the trailing window ending at `end`, or `None` when the window
/// is incomplete or holds an undefined value.
fn trailing_window(values: &[Option<f64>], end: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || end + 1 < window {
        return None;
    }
    values[end + 1 - window..=end].iter().copied().collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            trailing_window(values, i, window)
                .map(|w| w.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator) over a trailing window.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let w = trailing_window(values, i, window)?;
            if w.len() < 2 {
                return None;
            }
            let n = w.len() as f64;
            let mean = w.iter().sum::<f64>() / n;
            let variance = w.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(variance.sqrt())
        })
        .collect()
}

/// `values[i] - values[i - 1]`, undefined at position 0.
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| match i {
            0 => None,
            _ => Some(values[i]? - values[i - 1]?),
        })
        .collect()
}

/// `values[i] / values[i - 1] - 1`. A zero previous value has no defined return.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            let prev = values[i - 1]?;
            let current = values[i]?;
            if prev == 0.0 {
                None
            } else {
                Some(current / prev - 1.0)
            }
        })
        .collect()
}
