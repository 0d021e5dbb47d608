use crate::error::{LearnError, Result};

/// Index of the first maximum. The scan runs in increasing index order with a
/// strict `>`, so ties go to the lowest index.
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

pub fn max(row: &[f64]) -> f64 {
    row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Half the summed squared difference between paired rows.
pub fn total_error(expected: &[Vec<f64>], actual: &[Vec<f64>]) -> Result<f64> {
    if expected.len() != actual.len() {
        return Err(LearnError::Dimension { what: "error rows".into(), expected: expected.len(), actual: actual.len() });
    }
    let mut error = 0.0;
    for (e, a) in expected.iter().zip(actual) {
        if e.len() != a.len() {
            return Err(LearnError::Dimension { what: "error row".into(), expected: e.len(), actual: a.len() });
        }
        error += e.iter().zip(a).map(|(e, a)| (a - e).powi(2)).sum::<f64>();
    }
    Ok(0.5 * error)
}

/// Maps `value` from `[min, max]` onto `[-1, 1]`.
pub fn normalize_to_unit(value: f64, min: f64, max: f64) -> f64 {
    let half_span = (max - min) / 2.0;
    if half_span == 0.0 {
        return 0.0;
    }
    let mid = (max + min) / 2.0;
    (value - mid) / half_span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[-5.0, -5.0]), 0);
        assert_eq!(max(&[1.0, 3.0, 2.0]), 3.0);
    }

    #[test]
    fn total_error_is_half_sum_of_squares() {
        let expected = vec![vec![0.0], vec![1.0]];
        let actual = vec![vec![0.5], vec![0.0]];
        assert_eq!(total_error(&expected, &actual).unwrap(), 0.5 * (0.25 + 1.0));
        assert!(total_error(&expected, &actual[..1]).is_err());
    }

    #[test]
    fn normalization_spans_unit_interval() {
        assert_eq!(normalize_to_unit(0.0, 0.0, 100.0), -1.0);
        assert_eq!(normalize_to_unit(100.0, 0.0, 100.0), 1.0);
        assert_eq!(normalize_to_unit(50.0, 0.0, 100.0), 0.0);
        assert_eq!(normalize_to_unit(3.0, 3.0, 3.0), 0.0);
    }
}
