use crate::statistics::{diff, rolling_mean};

/// Relative Strength Index over simple trailing averages of gains and losses.
///
/// The first `length` positions are undefined. A window without losses is
/// pinned at 100 and a window without gains (but with losses) at 0.
pub fn rsi(close: &[Option<f64>], length: usize) -> Vec<Option<f64>> {
    let delta = diff(close);
    let gain: Vec<Option<f64>> = delta.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let loss: Vec<Option<f64>> = delta.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = rolling_mean(&gain, length);
    let avg_loss = rolling_mean(&loss, length);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(g, l)| Some(strength_index(g?, l?)))
        .collect()
}

fn strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
