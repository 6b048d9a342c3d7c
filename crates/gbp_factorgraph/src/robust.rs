use gbp_linalg::Float;

use crate::error::FactorGraphError;

/// Robust M-estimator applied to a factor's Mahalanobis residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Loss {
    #[display(fmt = "none")]
    None,
    #[display(fmt = "huber")]
    Huber,
    #[display(fmt = "constant")]
    Constant,
}

impl std::str::FromStr for Loss {
    type Err = FactorGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "huber" => Ok(Self::Huber),
            "constant" => Ok(Self::Constant),
            other => Err(FactorGraphError::UnknownLoss(other.to_owned())),
        }
    }
}

/// Compute the adaptive noise variance for a factor given its current
/// Mahalanobis distance `d` from the measurement, the robust loss kind, the
/// gating `threshold`, and the nominal `gauss_noise_var`.
///
/// These are the exact reweighting formulas used by the reference GBP
/// implementation: below `threshold` every loss behaves like plain L2; above
/// it, `Huber` grows the adaptive variance linearly in `d`, while `Constant`
/// grows it quadratically (capping the effective weight at a constant).
#[must_use]
pub fn adaptive_variance(loss: Loss, d: Float, threshold: Float, gauss_noise_var: Float) -> Float {
    match loss {
        Loss::None => gauss_noise_var,
        Loss::Huber => {
            if d > threshold {
                gauss_noise_var * d * d / (2.0 * (threshold * d - 0.5 * threshold * threshold))
            } else {
                gauss_noise_var
            }
        }
        Loss::Constant => {
            if d > threshold {
                d * d
            } else {
                gauss_noise_var
            }
        }
    }
}
