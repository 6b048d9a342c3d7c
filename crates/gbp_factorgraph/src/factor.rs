use gbp_linalg::{Float, Matrix, Vector, VectorNorm};
use gbp_multivariate_normal::MultivariateNormal;

use crate::{
    error::{FactorGraphError, Result},
    id::{FactorId, VariableId},
    message::{Message, MessageSink},
    robust::{self, Loss},
};

/// A measurement model: predicts a measurement from a stacked state vector
/// and (optionally) supplies its own Jacobian.
///
/// Factors are generic over this trait rather than an enum of measurement
/// kinds, so that new sensor models can be added without touching the
/// factor graph itself. A factor owns one boxed implementation.
pub trait MeasurementModel: std::fmt::Debug {
    /// Dimension of the predicted measurement `h(x)`.
    fn measurement_dim(&self) -> usize;

    /// Predict the measurement `h(x)` at state `x`.
    fn predict(&self, x: &Vector<Float>) -> Vector<Float>;

    /// The step size used by the default finite-difference Jacobian.
    fn jacobian_delta(&self) -> Float {
        1e-6
    }

    /// Jacobian of `predict` at `x`. The default implementation uses a
    /// central finite difference; models with an analytic Jacobian should
    /// override this.
    fn jacobian(&self, x: &Vector<Float>) -> Matrix<Float> {
        let delta = self.jacobian_delta();
        let m = self.measurement_dim();
        let n = x.len();
        let mut jac = Matrix::zeros((m, n));
        for col in 0..n {
            let mut x_plus = x.clone();
            x_plus[col] += delta;
            let mut x_minus = x.clone();
            x_minus[col] -= delta;
            let h_plus = self.predict(&x_plus);
            let h_minus = self.predict(&x_minus);
            let d = (&h_plus - &h_minus) / (2.0 * delta);
            jac.column_mut(col).assign(&d);
        }
        jac
    }
}

/// A factor node: a noisy measurement connecting one or more variables.
#[derive(Debug)]
pub struct Factor {
    pub id: FactorId,
    pub adj_vars: Vec<VariableId>,
    /// Degrees of freedom of each adjacent variable, parallel to `adj_vars`.
    pub dofs: Vec<usize>,
    /// Offset of each adjacent variable's block within this factor's
    /// `factor_dist`, precomputed once at construction (prefix sum of
    /// `dofs`).
    pub offsets: Vec<usize>,
    pub model: Box<dyn MeasurementModel + Send + Sync>,
    pub measurement: Vector<Float>,
    pub gauss_noise_var: Float,
    pub adaptive_gauss_noise_var: Float,
    pub loss: Loss,
    pub mahalanobis_threshold: Float,
    pub linpoint: Vector<Float>,
    pub factor_dist: MultivariateNormal,
    pub adj_beliefs: Vec<MultivariateNormal>,
    pub messages: Vec<Message>,
    pub iters_since_relin: u32,
    pub eta_damping: Float,
    pub active: bool,
}

impl Factor {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: FactorId,
        adj_vars: Vec<VariableId>,
        adj_dofs: Vec<usize>,
        model: Box<dyn MeasurementModel + Send + Sync>,
        measurement: Vector<Float>,
        gauss_noise_var: Float,
        loss: Loss,
        mahalanobis_threshold: Float,
        linpoint: Vector<Float>,
        adj_beliefs: Vec<MultivariateNormal>,
    ) -> Self {
        let mut offsets = Vec::with_capacity(adj_dofs.len());
        let mut running = 0;
        for &d in &adj_dofs {
            offsets.push(running);
            running += d;
        }
        let total_dim = running;
        let k = adj_vars.len();
        Self {
            id,
            adj_vars,
            dofs: adj_dofs,
            offsets,
            model,
            measurement,
            gauss_noise_var,
            adaptive_gauss_noise_var: gauss_noise_var,
            loss,
            mahalanobis_threshold,
            linpoint,
            factor_dist: MultivariateNormal::identity(total_dim),
            adj_beliefs,
            messages: vec![Message::empty(); k],
            iters_since_relin: 1,
            eta_damping: 0.0,
            active: true,
        }
    }

    /// Position of `vid` within `adj_vars`. Panics if `vid` is not adjacent,
    /// which would mean the graph's bidirectional adjacency is already
    /// broken.
    #[must_use]
    pub fn slot_of(&self, vid: VariableId) -> usize {
        self.adj_vars
            .iter()
            .position(|&v| v == vid)
            .expect("factor/variable adjacency must be mutual")
    }

    /// Concatenate the current belief means of every adjacent variable, in
    /// `adj_vars` order, from this factor's own cached `adj_beliefs`
    /// snapshots (refreshed by each variable at the end of every
    /// iteration, see [`crate::variable::Variable::update_belief`]).
    pub fn adjacent_means(&mut self) -> Result<Vector<Float>> {
        let total: usize = self.dofs.iter().sum();
        let mut x = Vector::zeros(total);
        for i in 0..self.adj_beliefs.len() {
            let (start, len) = (self.offsets[i], self.dofs[i]);
            let mean = self.adj_beliefs[i].mean()?.clone();
            x.slice_mut(ndarray::s![start..start + len]).assign(&mean);
        }
        Ok(x)
    }

    /// Linearize the measurement model about `x0` and store the resulting
    /// canonical Gaussian as `factor_dist`.
    pub fn compute_factor_at(&mut self, x0: Vector<Float>) -> Result<()> {
        let jacobian = self.model.jacobian(&x0);
        let predicted = self.model.predict(&x0);
        if predicted.len() != self.measurement.len() {
            return Err(FactorGraphError::DimensionMismatch {
                expected: self.measurement.len(),
                got: predicted.len(),
                context: "measurement model output vs. stored measurement",
            });
        }

        let w = 1.0 / self.adaptive_gauss_noise_var;
        let precision = jacobian.t().dot(&jacobian) * w;
        let target = jacobian.dot(&x0) + &self.measurement - &predicted;
        let information = jacobian.t().dot(&target) * w;

        self.factor_dist = MultivariateNormal::from_information_and_precision(information, precision)?;
        self.linpoint = x0;
        Ok(())
    }

    /// Linearize about the current adjacent belief means.
    pub fn compute_factor(&mut self) -> Result<()> {
        let x0 = self.adjacent_means()?;
        self.compute_factor_at(x0)
    }

    /// Mahalanobis distance of the measurement residual at the current
    /// linearization point.
    #[must_use]
    pub fn mahalanobis_distance(&self) -> Float {
        let residual = &self.measurement - &self.model.predict(&self.linpoint);
        residual.euclidean_norm() / self.gauss_noise_var.sqrt()
    }

    /// Reweight the stored `factor_dist` in place according to `self.loss`.
    /// Does not relinearize.
    pub fn robustify_loss(&mut self) {
        let d = self.mahalanobis_distance();
        let sigma2_old = self.adaptive_gauss_noise_var;
        let sigma2_new = robust::adaptive_variance(
            self.loss,
            d,
            self.mahalanobis_threshold,
            self.gauss_noise_var,
        );
        if (sigma2_new - sigma2_old).abs() < Float::EPSILON {
            return;
        }
        let scale = sigma2_old / sigma2_new;
        let new_info = self.factor_dist.information_vector() * scale;
        let new_prec = self.factor_dist.precision_matrix() * scale;
        // SAFETY: `new_info`/`new_prec` have the same shape as the values
        // they replace, since `scale` is a pure elementwise rescale.
        unsafe {
            self.factor_dist.set_information_vector(&new_info);
            self.factor_dist.set_precision_matrix(&new_prec);
        }
        self.adaptive_gauss_noise_var = sigma2_new;
    }

    /// Current residual energy, `0.5 * ||h(mu) - z||^2 / sigma^2_adaptive`,
    /// evaluated at the current adjacent belief means (not the cached
    /// linearization point).
    pub fn energy(&mut self) -> Result<Float> {
        let x = self.adjacent_means()?;
        let residual = self.model.predict(&x) - &self.measurement;
        Ok(0.5 * residual.dot(&residual) / self.adaptive_gauss_noise_var)
    }

    /// Compute outgoing messages to every adjacent variable via the Schur
    /// complement of the factor's distribution combined with the cavity of
    /// every other neighbor (its cached belief snapshot minus the message
    /// it last received from this factor).
    pub fn compute_messages(&mut self, mut sink: Option<&mut dyn MessageSink>) -> Result<()> {
        let k = self.adj_vars.len();
        for i in 0..k {
            let mut info = self.factor_dist.information_vector().clone();
            let mut prec = self.factor_dist.precision_matrix().clone();

            for j in 0..k {
                if j == i {
                    continue;
                }
                let (start, len) = (self.offsets[j], self.dofs[j]);
                let belief = &self.adj_beliefs[j];
                let (delta_eta, delta_lambda) = match self.messages[j].payload() {
                    Some(p) => (
                        belief.information_vector() - &p.information_vector,
                        belief.precision_matrix() - &p.precision_matrix,
                    ),
                    None => (
                        belief.information_vector().clone(),
                        belief.precision_matrix().clone(),
                    ),
                };
                let mut info_block = info.slice_mut(ndarray::s![start..start + len]);
                info_block += &delta_eta;
                let mut prec_block =
                    prec.slice_mut(ndarray::s![start..start + len, start..start + len]);
                prec_block += &delta_lambda;
            }

            let augmented = MultivariateNormal::from_information_and_precision(info, prec)?;
            let keep: Vec<usize> =
                (self.offsets[i]..self.offsets[i] + self.dofs[i]).collect();
            let marginal = augmented.marginalize_to(&keep)?;

            let previous_eta = self.messages[i]
                .payload()
                .map(|p| p.information_vector.clone());
            let damping = self.eta_damping;
            let raw_eta = marginal.information_vector();
            let damped_eta = match previous_eta {
                Some(prev) => (1.0 - damping) * raw_eta + damping * &prev,
                None => raw_eta.clone(),
            };

            self.messages[i] = Message::new(damped_eta, marginal.precision_matrix().clone());
            if let Some(sink) = sink.as_deref_mut() {
                if let Some(payload) = self.messages[i].payload() {
                    sink.record(self.id, self.adj_vars[i], payload);
                }
            }
        }
        Ok(())
    }
}

