//! GARCH(1,1) conditional-variance model on percentage returns.
//!
//! σ²_{t+1} = ω + α·r²_t + β·σ²_t
//!
//! ω is tied to the sample variance by variance targeting
//! (ω = var·(1 − α − β)); (α, β) are fitted by a deterministic coarse-grid
//! search with local refinement, maximizing the Gaussian log-likelihood.
//! Stationarity (α + β < 1) is enforced by the search domain.

use serde::Serialize;
use thiserror::Error;

/// Minimum number of returns required to attempt a fit.
pub const MIN_OBSERVATIONS: usize = 30;

#[derive(Debug, Error)]
pub enum GarchError {
    #[error("insufficient data: {n} returns, need at least {min}")]
    InsufficientData { n: usize, min: usize },

    #[error("degenerate returns: sample variance is zero")]
    DegenerateReturns,

    #[error("fit failed: no parameter set produced a finite likelihood")]
    FitFailed,
}

/// Fitted GARCH(1,1) model. Parameter units follow the input scale
/// (percentage returns → percentage-squared variance).
#[derive(Debug, Clone, Serialize)]
pub struct Garch11 {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub n_obs: usize,
    /// One-step-ahead variance at the end of the sample.
    next_variance: f64,
    sample_variance: f64,
}

impl Garch11 {
    /// Fit on percentage returns (fraction × 100). NaN values are dropped.
    pub fn fit(returns_pct: &[f64]) -> Result<Self, GarchError> {
        let clean: Vec<f64> = returns_pct
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        if clean.len() < MIN_OBSERVATIONS {
            return Err(GarchError::InsufficientData {
                n: clean.len(),
                min: MIN_OBSERVATIONS,
            });
        }
        let mean = clean.iter().sum::<f64>() / clean.len() as f64;
        let sample_variance =
            clean.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / clean.len() as f64;
        if sample_variance <= 1e-12 {
            return Err(GarchError::DegenerateReturns);
        }

        // Coarse grid, then two refinement rounds around the incumbent.
        let mut best: Option<(f64, f64, f64)> = None; // (alpha, beta, ll)
        let consider = |alpha: f64, beta: f64, best: &mut Option<(f64, f64, f64)>| {
            if alpha <= 0.0 || beta < 0.0 || alpha + beta >= 0.999 {
                return;
            }
            let ll = log_likelihood(&clean, sample_variance, alpha, beta);
            if !ll.is_finite() {
                return;
            }
            if best.map_or(true, |(_, _, b)| ll > b) {
                *best = Some((alpha, beta, ll));
            }
        };

        for ai in 1..=15 {
            let alpha = ai as f64 * 0.02; // 0.02 .. 0.30
            for bi in 0..=19 {
                let beta = 0.50 + bi as f64 * 0.025; // 0.50 .. 0.975
                consider(alpha, beta, &mut best);
            }
        }
        let (mut a0, mut b0, _) = best.ok_or(GarchError::FitFailed)?;
        let mut step = 0.01;
        for _ in 0..2 {
            for da in -4..=4 {
                for db in -4..=4 {
                    consider(
                        a0 + da as f64 * step,
                        b0 + db as f64 * step,
                        &mut best,
                    );
                }
            }
            let (a, b, _) = best.expect("incumbent survives refinement");
            a0 = a;
            b0 = b;
            step /= 4.0;
        }

        let (alpha, beta, ll) = best.ok_or(GarchError::FitFailed)?;
        let omega = sample_variance * (1.0 - alpha - beta);
        let next_variance = last_variance_step(&clean, sample_variance, omega, alpha, beta);
        tracing::debug!(alpha, beta, omega, ll, "GARCH(1,1) fit complete");

        Ok(Self {
            omega,
            alpha,
            beta,
            log_likelihood: ll,
            aic: 2.0 * 3.0 - 2.0 * ll,
            n_obs: clean.len(),
            next_variance,
            sample_variance,
        })
    }

    /// In-sample conditional volatility (σ_t, input scale), aligned to the
    /// input series; non-finite input positions stay NaN.
    pub fn conditional_volatility(&self, returns_pct: &[f64]) -> Vec<f64> {
        let mut sigma2 = self.sample_variance;
        returns_pct
            .iter()
            .map(|&r| {
                if !r.is_finite() {
                    return f64::NAN;
                }
                let out = sigma2.sqrt();
                sigma2 = self.omega + self.alpha * r * r + self.beta * sigma2;
                out
            })
            .collect()
    }

    /// Forecast σ for 1..=horizon days ahead (input scale).
    ///
    /// E[σ²_{t+h}] = ω + (α + β)·E[σ²_{t+h−1}], seeded with the one-step
    /// variance at the end of the sample.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let persistence = self.alpha + self.beta;
        let mut sigma2 = self.next_variance;
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            out.push(sigma2.sqrt());
            sigma2 = self.omega + persistence * sigma2;
        }
        out
    }
}

fn log_likelihood(returns: &[f64], sample_variance: f64, alpha: f64, beta: f64) -> f64 {
    let omega = sample_variance * (1.0 - alpha - beta);
    let mut sigma2 = sample_variance;
    let mut ll = 0.0;
    for &r in returns {
        if sigma2 <= 0.0 {
            return f64::NEG_INFINITY;
        }
        ll += -0.5 * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + r * r / sigma2);
        sigma2 = omega + alpha * r * r + beta * sigma2;
    }
    ll
}

fn last_variance_step(
    returns: &[f64],
    sample_variance: f64,
    omega: f64,
    alpha: f64,
    beta: f64,
) -> f64 {
    let mut sigma2 = sample_variance;
    for &r in returns {
        sigma2 = omega + alpha * r * r + beta * sigma2;
    }
    sigma2
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simulate a GARCH-like series with volatility clustering via a
    /// deterministic sign/scale pattern.
    fn clustered_returns(n: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let regime_scale = if (i / 50) % 2 == 0 { 0.5 } else { 2.5 };
            let base = match i % 4 {
                0 => 0.8,
                1 => -0.6,
                2 => 1.1,
                _ => -0.9,
            };
            out.push(base * regime_scale);
        }
        out
    }

    #[test]
    fn fit_requires_enough_data() {
        let short = vec![0.5; 10];
        assert!(matches!(
            Garch11::fit(&short),
            Err(GarchError::InsufficientData { n: 10, .. })
        ));
    }

    #[test]
    fn fit_rejects_flat_returns() {
        let flat = vec![0.0; 100];
        assert!(matches!(
            Garch11::fit(&flat),
            Err(GarchError::DegenerateReturns)
        ));
    }

    #[test]
    fn fit_is_stationary_and_finite() {
        let model = Garch11::fit(&clustered_returns(200)).unwrap();
        assert!(model.alpha > 0.0);
        assert!(model.beta >= 0.0);
        assert!(model.alpha + model.beta < 1.0);
        assert!(model.omega > 0.0);
        assert!(model.log_likelihood.is_finite());
    }

    #[test]
    fn fit_is_deterministic() {
        let returns = clustered_returns(200);
        let m1 = Garch11::fit(&returns).unwrap();
        let m2 = Garch11::fit(&returns).unwrap();
        assert_eq!(m1.alpha, m2.alpha);
        assert_eq!(m1.beta, m2.beta);
        assert_eq!(m1.log_likelihood, m2.log_likelihood);
    }

    #[test]
    fn conditional_volatility_aligns_with_input() {
        let returns = clustered_returns(120);
        let model = Garch11::fit(&returns).unwrap();
        let cond = model.conditional_volatility(&returns);
        assert_eq!(cond.len(), returns.len());
        assert!(cond.iter().all(|v| v.is_nan() || *v > 0.0));
    }

    #[test]
    fn conditional_volatility_rises_in_volatile_stretch() {
        let returns = clustered_returns(200);
        let model = Garch11::fit(&returns).unwrap();
        let cond = model.conditional_volatility(&returns);
        // Calm block [0,50) vs wild block [50,100): conditional vol should
        // average higher in the wild block's second half.
        let calm: f64 = cond[30..50].iter().sum::<f64>() / 20.0;
        let wild: f64 = cond[80..100].iter().sum::<f64>() / 20.0;
        assert!(wild > calm);
    }

    #[test]
    fn forecast_converges_toward_long_run_vol() {
        let returns = clustered_returns(200);
        let model = Garch11::fit(&returns).unwrap();
        let fc = model.forecast(100);
        assert_eq!(fc.len(), 100);
        let long_run = (model.omega / (1.0 - model.alpha - model.beta)).sqrt();
        let tail = fc[99];
        assert!((tail - long_run).abs() < (fc[0] - long_run).abs() + 1e-9);
    }

    #[test]
    fn nan_returns_are_dropped_not_fatal() {
        let mut returns = clustered_returns(100);
        returns[10] = f64::NAN;
        returns[20] = f64::INFINITY;
        assert!(Garch11::fit(&returns).is_ok());
    }
}
