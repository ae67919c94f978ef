//! Numerically stable primitives for log-domain Bayesian math.

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for v in values {
        sum += (*v - max).exp();
    }
    max + sum.ln()
}

/// Normalize unnormalized log-probabilities so that they exponentiate to a
/// distribution summing to one.
///
/// Returns an empty vector for empty input. If every entry is -inf the
/// output is all -inf (there is no mass to distribute).
pub fn normalize_log_probs(log_values: &[f64]) -> Vec<f64> {
    let lse = log_sum_exp(log_values);
    if !lse.is_finite() {
        return log_values.to_vec();
    }
    log_values.iter().map(|v| v - lse).collect()
}

/// Index of the maximum value, first occurrence wins on ties.
///
/// NaN entries are never selected. Returns None when the slice is empty or
/// contains only NaN.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Natural log that maps zero to -inf instead of raising.
///
/// Negative and NaN inputs yield NaN.
pub fn safe_ln(p: f64) -> f64 {
    if p.is_nan() || p < 0.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    p.ln()
}

/// Whether `sum` lies within `tolerance` of one. NaN never passes.
pub fn sums_to_one(sum: f64, tolerance: f64) -> bool {
    (sum - 1.0).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_sum_exp_basic() {
        let v = [0.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_dominance() {
        let v = [-1000.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_all_neg_inf() {
        let v = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        let out = log_sum_exp(&v);
        assert!(out.is_infinite() && out.is_sign_negative());
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        let out = log_sum_exp(&[0.0, f64::NAN]);
        assert!(out.is_nan());
    }

    #[test]
    fn normalize_log_probs_sums_to_one() {
        let out = normalize_log_probs(&[-800.0, -801.0, -805.0]);
        let total: f64 = out.iter().map(|v| v.exp()).sum();
        assert!(approx_eq(total, 1.0, 1e-12));
        assert!(out[0] > out[1] && out[1] > out[2]);
    }

    #[test]
    fn normalize_log_probs_all_neg_inf_is_unchanged() {
        let out = normalize_log_probs(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert!(out.iter().all(|v| *v == f64::NEG_INFINITY));
    }

    #[test]
    fn argmax_first_breaks_ties_low() {
        assert_eq!(argmax_first(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax_first(&[-2.0, -2.0]), Some(0));
    }

    #[test]
    fn argmax_first_skips_nan_and_handles_empty() {
        assert_eq!(argmax_first(&[f64::NAN, -1.0]), Some(1));
        assert_eq!(argmax_first(&[f64::NAN]), None);
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn argmax_first_accepts_neg_infinity() {
        let v = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(argmax_first(&v), Some(0));
    }

    #[test]
    fn safe_ln_edges() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert!(safe_ln(-0.1).is_nan());
        assert!(approx_eq(safe_ln(1.0), 0.0, 1e-15));
    }

    #[test]
    fn sums_to_one_rejects_nan() {
        assert!(sums_to_one(1.0 + 1e-9, 1e-6));
        assert!(!sums_to_one(1.1, 1e-6));
        assert!(!sums_to_one(f64::NAN, 1e-6));
    }
}
