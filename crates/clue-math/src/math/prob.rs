//! Discrete distribution helpers: normalization, first-max argmax, and
//! exponential moving averages.

/// Normalize non-negative weights into a probability vector.
///
/// Returns `None` when the total mass is zero or not finite; callers treat
/// that as a degenerate case with their own fallback.
pub fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// Index of the maximum value; ties resolve to the earliest index.
///
/// NaN entries are never selected. Returns `None` for an empty slice or a
/// slice of only NaNs.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// One step of an exponential moving average: `(1 - weight) * prev + weight * obs`.
pub fn ema(prev: f64, observation: f64, weight: f64) -> f64 {
    (1.0 - weight) * prev + weight * observation
}

/// Ratio `numer / (numer + other)`, or `fallback` when the total is zero.
pub fn count_ratio(numer: f64, other: f64, fallback: f64) -> f64 {
    let total = numer + other;
    if total > 0.0 && total.is_finite() {
        numer / total
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sums_to_one() {
        let p = normalize(&[1.0, 3.0]).unwrap();
        assert_eq!(p, vec![0.25, 0.75]);
    }

    #[test]
    fn normalize_rejects_zero_mass() {
        assert!(normalize(&[0.0, 0.0]).is_none());
        assert!(normalize(&[]).is_none());
        assert!(normalize(&[f64::INFINITY, 1.0]).is_none());
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax_first(&[1.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(argmax_first(&[f64::NAN, 0.0]), Some(1));
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn ema_moves_toward_observation() {
        assert_eq!(ema(0.5, 1.0, 0.5), 0.75);
        assert_eq!(ema(0.5, 0.0, 1.0), 0.0);
    }

    #[test]
    fn count_ratio_falls_back_on_empty() {
        assert_eq!(count_ratio(0.0, 0.0, 0.5), 0.5);
        assert_eq!(count_ratio(3.0, 1.0, 0.5), 0.75);
    }
}
