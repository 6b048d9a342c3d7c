use gbp_linalg::{Float, Matrix, Vector};
use gbp_multivariate_normal::MultivariateNormal;

use crate::{error::Result, factor::Factor, id::FactorId, id::VariableId};

/// A node in the factor graph holding an immutable prior and a belief that
/// is refined every iteration by messages from adjacent factors.
///
/// `mu`/`sigma` cache the belief's mean and covariance, recomputed once per
/// [`Self::update_belief`] call. The belief itself is also pushed into
/// every adjacent factor's `adj_beliefs` snapshot at the end of that call,
/// which is what those factors read from during their own message-passing
/// phase (see [`Factor::adjacent_means`]).
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VariableId,
    pub dofs: usize,
    pub prior: MultivariateNormal,
    pub belief: MultivariateNormal,
    pub mu: Vector<Float>,
    pub sigma: Matrix<Float>,
    pub adj_factors: Vec<FactorId>,
    /// Used only by the trajectory exporter; `None` for landmarks.
    pub timestamp: Option<Float>,
}

impl Variable {
    #[must_use]
    pub fn new(id: VariableId, prior: MultivariateNormal, timestamp: Option<Float>) -> Self {
        let dofs = prior.len();
        Self {
            id,
            dofs,
            belief: prior.clone(),
            mu: Vector::zeros(dofs),
            sigma: Matrix::zeros((dofs, dofs)),
            prior,
            adj_factors: Vec::new(),
            timestamp,
        }
    }

    /// Recompute this variable's belief from its prior and every incoming
    /// factor message, then push the new belief back into each adjacent
    /// factor's cached snapshot of it.
    ///
    /// Mirrors the reference algorithm exactly: start from the prior, fold
    /// in each neighbor's message (an empty message contributes nothing),
    /// derive the mean/covariance (failing if the resulting precision is
    /// singular), and publish the result to every neighbor.
    pub fn update_belief(&mut self, factors: &mut [Factor]) -> Result<()> {
        let mut accum = self.prior.clone();
        for &fid in &self.adj_factors {
            let factor = &factors[fid.0];
            let slot = factor.slot_of(self.id);
            if let Some(payload) = factor.messages[slot].payload() {
                // SAFETY: `payload`'s vector/matrix were produced for this
                // variable's block, so they match `accum`'s dimension.
                unsafe {
                    accum.add_assign_information_vector(&payload.information_vector);
                    accum.add_assign_precision_matrix(&payload.precision_matrix);
                }
            }
        }
        accum.update()?;
        self.mu = accum.mean()?.clone();
        self.sigma = accum.covariance()?;
        self.belief = accum;

        for &fid in &self.adj_factors {
            let factor = &mut factors[fid.0];
            let slot = factor.slot_of(self.id);
            factor.adj_beliefs[slot] = self.belief.clone();
        }
        Ok(())
    }
}
