//! Beta distribution utilities for reliability beliefs.
//!
//! An expert's reliability belief is a Beta posterior over the probability
//! that its advice is optimal. The CDF uses the regularized incomplete beta
//! function evaluated by Lentz's continued fraction.

use super::stable::log_beta;

const CF_MAX_ITERS: usize = 200;
const CF_EPS: f64 = 3.0e-12;
const CF_TINY: f64 = 1.0e-300;

fn valid_shape(alpha: f64, beta: f64) -> bool {
    alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0
}

/// Regularized incomplete beta function I_x(alpha, beta).
pub fn beta_cdf(x: f64, alpha: f64, beta: f64) -> f64 {
    if x.is_nan() || !valid_shape(alpha, beta) {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (alpha * x.ln() + beta * (-x).ln_1p() - log_beta(alpha, beta)).exp();
    // The continued fraction converges fastest on the side of the mean.
    if x < (alpha + 1.0) / (alpha + beta + 2.0) {
        front * continued_fraction(alpha, beta, x) / alpha
    } else {
        1.0 - front * continued_fraction(beta, alpha, 1.0 - x) / beta
    }
}

/// Quantile of Beta(alpha, beta) by bisection on the CDF.
pub fn beta_inv_cdf(p: f64, alpha: f64, beta: f64) -> f64 {
    if p.is_nan() || !valid_shape(alpha, beta) {
        return f64::NAN;
    }
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return 1.0;
    }
    let (mut low, mut high) = (0.0f64, 1.0f64);
    for _ in 0..100 {
        let mid = 0.5 * (low + high);
        if beta_cdf(mid, alpha, beta) < p {
            low = mid;
        } else {
            high = mid;
        }
        if high - low < 1e-12 {
            break;
        }
    }
    0.5 * (low + high)
}

/// Equal-tailed credible interval of Beta(alpha, beta) at `level` (e.g. 0.95).
pub fn beta_credible_interval(alpha: f64, beta: f64, level: f64) -> Option<(f64, f64)> {
    if !valid_shape(alpha, beta) || !(0.0..1.0).contains(&level) {
        return None;
    }
    let tail = 0.5 * (1.0 - level);
    Some((
        beta_inv_cdf(tail, alpha, beta),
        beta_inv_cdf(1.0 - tail, alpha, beta),
    ))
}

fn continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let clamp = |v: f64| if v.abs() < CF_TINY { CF_TINY } else { v };
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / clamp(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=CF_MAX_ITERS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / clamp(1.0 + even * d);
        c = clamp(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / clamp(1.0 + odd * d);
        c = clamp(1.0 + odd / c);
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < CF_EPS {
            break;
        }
    }
    h
}
