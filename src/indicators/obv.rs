use crate::statistics::diff;

/// On-balance volume. Undefined price changes or volumes add nothing, so the
/// series is defined from the first bar.
pub fn obv(close: &[Option<f64>], volume: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    diff(close)
        .into_iter()
        .zip(volume)
        .map(|(delta, volume)| {
            let step = match (delta, volume) {
                (Some(d), Some(v)) if d > 0.0 => *v,
                (Some(d), Some(v)) if d < 0.0 => -*v,
                _ => 0.0,
            };
            total += step;
            Some(total)
        })
        .collect()
}
