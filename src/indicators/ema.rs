//! Exponential moving average.
//!
//! The smoothing factor is `alpha = 2 / (span + 1)`. Two weightings are
//! supported and they only differ during warm-up:
//!
//! * [`EmaWeighting::Recursive`] seeds the average with the first observation
//!   and then applies `y[i] = alpha * x[i] + (1 - alpha) * y[i - 1]`.
//! * [`EmaWeighting::BiasAdjusted`] divides by the accumulated weights,
//!   `y[i] = sum((1 - alpha)^k * x[i - k]) / sum((1 - alpha)^k)`, so early
//!   values are not pulled toward the seed.
//!
//! Both are defined from the first observation onward.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmaWeighting {
    #[default]
    Recursive,
    BiasAdjusted,
}

pub fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// EMA of `values`. An undefined input leaves the running average untouched
/// and yields `None` at that position.
pub fn ema(values: &[Option<f64>], span: usize, weighting: EmaWeighting) -> Vec<Option<f64>> {
    let alpha = alpha(span.max(1));
    let decay = 1.0 - alpha;
    let mut result = Vec::with_capacity(values.len());

    match weighting {
        EmaWeighting::Recursive => {
            let mut prev: Option<f64> = None;
            for value in values {
                let Some(x) = *value else {
                    result.push(None);
                    continue;
                };
                let next = match prev {
                    Some(p) => alpha * x + decay * p,
                    None => x,
                };
                prev = Some(next);
                result.push(prev);
            }
        }
        EmaWeighting::BiasAdjusted => {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for value in values {
                let Some(x) = *value else {
                    result.push(None);
                    continue;
                };
                numerator = x + decay * numerator;
                denominator = 1.0 + decay * denominator;
                result.push(Some(numerator / denominator));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_recursive_seed_is_first_observation() {
        let out = ema(&defined(&[10.0, 11.0, 12.0]), 3, EmaWeighting::Recursive);
        // alpha = 0.5
        assert_relative_eq!(out[0].unwrap(), 10.0);
        assert_relative_eq!(out[1].unwrap(), 10.5);
        assert_relative_eq!(out[2].unwrap(), 11.25);
    }

    #[test]
    fn test_bias_adjusted_weights() {
        let out = ema(&defined(&[10.0, 11.0, 12.0]), 3, EmaWeighting::BiasAdjusted);
        assert_relative_eq!(out[0].unwrap(), 10.0);
        // (11 + 0.5 * 10) / 1.5
        assert_relative_eq!(out[1].unwrap(), 16.0 / 1.5, epsilon = 1e-12);
        // (12 + 0.5 * 11 + 0.25 * 10) / 1.75
        assert_relative_eq!(out[2].unwrap(), 20.0 / 1.75, epsilon = 1e-12);
    }

    #[test]
    fn test_fully_defined_and_same_length() {
        let values = defined(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        for weighting in [EmaWeighting::Recursive, EmaWeighting::BiasAdjusted] {
            for span in [1, 2, 5, 50] {
                let out = ema(&values, span, weighting);
                assert_eq!(out.len(), values.len());
                assert!(out.iter().all(Option::is_some));
            }
        }
    }

    #[test]
    fn test_span_one_tracks_input() {
        let values = defined(&[3.0, 1.0, 4.0]);
        assert_eq!(ema(&values, 1, EmaWeighting::Recursive), values);
    }

    #[test]
    fn test_constant_series_is_constant() {
        let out = ema(&defined(&[7.0; 20]), 9, EmaWeighting::BiasAdjusted);
        for value in out {
            assert_relative_eq!(value.unwrap(), 7.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gaps_keep_state() {
        let out = ema(&[None, Some(10.0), None, Some(12.0)], 3, EmaWeighting::Recursive);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(10.0));
        assert_eq!(out[2], None);
        assert_relative_eq!(out[3].unwrap(), 11.0);
    }

    #[test]
    fn test_single_value_and_empty() {
        assert_eq!(ema(&[Some(42.0)], 12, EmaWeighting::Recursive), vec![Some(42.0)]);
        assert!(ema(&[], 12, EmaWeighting::BiasAdjusted).is_empty());
    }
}
