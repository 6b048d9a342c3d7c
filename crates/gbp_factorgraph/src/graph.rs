use gbp_linalg::{Float, Matrix, Vector, VectorNorm};
use gbp_multivariate_normal::MultivariateNormal;
use ndarray::s;

use crate::{
    error::Result,
    factor::{Factor, MeasurementModel},
    id::{FactorId, VariableId},
    message::MessageSink,
    variable::Variable,
};

/// Configuration shared by every factor in a graph; see the spec's
/// "Configuration" section for the meaning of each field.
#[derive(Debug, Clone, Copy)]
pub struct GbpConfig {
    pub nonlinear_factors: bool,
    pub eta_damping: Float,
    pub beta: Float,
    pub num_undamped_iters: u32,
    pub min_linear_iters: u32,
    pub outlier_threshold: Float,
}

impl Default for GbpConfig {
    fn default() -> Self {
        Self {
            nonlinear_factors: true,
            eta_damping: 0.1,
            beta: 0.01,
            num_undamped_iters: 5,
            min_linear_iters: 10,
            outlier_threshold: Float::INFINITY,
        }
    }
}

/// A Gaussian belief propagation factor graph: variables and factors are
/// owned in parallel vectors and reference each other by stable index-based
/// ids, never by pointer, so that pruning a factor never invalidates a
/// variable's other neighbors.
#[derive(Debug, Default)]
pub struct FactorGraph {
    variables: Vec<Variable>,
    factors: Vec<Factor>,
    pub config: GbpConfig,
}

impl FactorGraph {
    #[must_use]
    pub fn new(config: GbpConfig) -> Self {
        Self {
            variables: Vec::new(),
            factors: Vec::new(),
            config,
        }
    }

    pub fn add_variable(&mut self, prior: MultivariateNormal, timestamp: Option<Float>) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable::new(id, prior, timestamp));
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_factor(
        &mut self,
        adj_vars: Vec<VariableId>,
        model: Box<dyn MeasurementModel + Send + Sync>,
        measurement: Vector<Float>,
        gauss_noise_var: Float,
        loss: crate::robust::Loss,
        mahalanobis_threshold: Float,
    ) -> Result<FactorId> {
        let id = FactorId(self.factors.len());
        let adj_dofs: Vec<usize> = adj_vars.iter().map(|v| self.variables[v.0].dofs).collect();
        let linpoint = {
            let total: usize = adj_dofs.iter().sum();
            let mut x = Vector::zeros(total);
            let mut offset = 0;
            for (i, &vid) in adj_vars.iter().enumerate() {
                x.slice_mut(s![offset..offset + adj_dofs[i]])
                    .assign(&self.variables[vid.0].mu);
                offset += adj_dofs[i];
            }
            x
        };
        let adj_beliefs: Vec<MultivariateNormal> = adj_vars
            .iter()
            .map(|v| self.variables[v.0].belief.clone())
            .collect();
        let factor = Factor::new(
            id,
            adj_vars.clone(),
            adj_dofs,
            model,
            measurement,
            gauss_noise_var,
            loss,
            mahalanobis_threshold,
            linpoint,
            adj_beliefs,
        );
        self.factors.push(factor);
        self.factors[id.0].compute_factor()?;
        for &vid in &adj_vars {
            self.variables[vid.0].adj_factors.push(id);
        }
        Ok(id)
    }

    #[must_use]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn factor(&self, id: FactorId) -> &Factor {
        &self.factors[id.0]
    }

    pub fn factor_mut(&mut self, id: FactorId) -> &mut Factor {
        &mut self.factors[id.0]
    }

    #[must_use]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Run one synchronous GBP sweep: robustify, then (if enabled)
    /// relinearize, then compute every outgoing message, then update every
    /// variable's belief.
    pub fn synchronous_iteration(&mut self, local_relin: bool, robustify: bool) -> Result<()> {
        self.synchronous_iteration_with_sink(local_relin, robustify, None)
    }

    /// As [`Self::synchronous_iteration`], but notifies `sink` of every
    /// outgoing message computed during this sweep.
    pub fn synchronous_iteration_with_sink(
        &mut self,
        local_relin: bool,
        robustify: bool,
        mut sink: Option<&mut dyn MessageSink>,
    ) -> Result<()> {
        if robustify {
            self.robustify_all_factors();
        }
        if self.config.nonlinear_factors && local_relin {
            self.relinearise_factors()?;
        }
        self.compute_all_messages(local_relin, sink.as_deref_mut())?;
        self.update_all_beliefs()?;
        Ok(())
    }

    fn robustify_all_factors(&mut self) {
        for factor in &mut self.factors {
            if factor.active {
                factor.robustify_loss();
            }
        }
    }

    /// Relinearize each factor whose adjacent means have drifted past
    /// `config.beta` from its cached linearization point, provided it has
    /// sat at its current point for at least `config.min_linear_iters`.
    /// Relinearizing disarms damping on that factor.
    pub fn relinearise_factors(&mut self) -> Result<()> {
        let Self { factors, config, .. } = self;
        for factor in factors.iter_mut() {
            if !factor.active {
                continue;
            }
            let x_now = factor.adjacent_means()?;
            let drift = (&x_now - &factor.linpoint).euclidean_norm();
            if drift > config.beta && factor.iters_since_relin >= config.min_linear_iters {
                factor.compute_factor_at(x_now)?;
                factor.iters_since_relin = 0;
                factor.eta_damping = 0.0;
            } else {
                factor.iters_since_relin += 1;
            }
        }
        Ok(())
    }

    /// Arm or apply per-factor damping, then compute every factor's
    /// outgoing messages.
    pub fn compute_all_messages(
        &mut self,
        local_relin: bool,
        mut sink: Option<&mut dyn MessageSink>,
    ) -> Result<()> {
        let Self { factors, config, .. } = self;
        for factor in factors.iter_mut() {
            if !factor.active {
                continue;
            }
            if config.nonlinear_factors && local_relin {
                if factor.iters_since_relin == config.num_undamped_iters {
                    factor.eta_damping = config.eta_damping;
                }
            } else {
                factor.eta_damping = config.eta_damping;
            }
            factor.compute_messages(sink.as_deref_mut())?;
        }
        Ok(())
    }

    /// Update every variable's belief from its adjacent factors' messages,
    /// then push the new belief back into those factors' cached snapshots.
    pub fn update_all_beliefs(&mut self) -> Result<()> {
        let Self {
            variables, factors, ..
        } = self;
        for variable in variables.iter_mut() {
            variable.update_belief(factors)?;
        }
        Ok(())
    }

    /// Total energy of the graph: the sum of every active factor's
    /// residual energy, evaluated at current belief means.
    pub fn energy(&mut self) -> Result<Float> {
        let mut total = 0.0;
        for factor in self.factors.iter_mut().filter(|f| f.active) {
            total += factor.energy()?;
        }
        Ok(total)
    }

    fn variable_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.variables.len());
        let mut running = 0;
        for v in &self.variables {
            offsets.push(running);
            running += v.dofs;
        }
        offsets
    }

    /// Assemble the joint distribution over every variable in canonical
    /// form: priors on the block diagonal, plus every factor's linearized
    /// distribution folded into its adjacent (diagonal and off-diagonal)
    /// blocks.
    pub fn joint_distribution_inf(&self) -> Result<MultivariateNormal> {
        let offsets = self.variable_offsets();
        let total_dim: usize = self.variables.iter().map(|v| v.dofs).sum();
        let mut info = Vector::<Float>::zeros(total_dim);
        let mut prec = Matrix::<Float>::zeros((total_dim, total_dim));

        for v in &self.variables {
            let (start, len) = (offsets[v.id.0], v.dofs);
            info.slice_mut(s![start..start + len])
                .assign(v.prior.information_vector());
            prec.slice_mut(s![start..start + len, start..start + len])
                .scaled_add(1.0, v.prior.precision_matrix());
        }

        for factor in self.factors.iter().filter(|f| f.active) {
            for (i, &vi) in factor.adj_vars.iter().enumerate() {
                let (si, di) = (offsets[vi.0], factor.dofs[i]);
                let (fi_start, fi_len) = (factor.offsets[i], factor.dofs[i]);
                let eta_block = factor
                    .factor_dist
                    .information_vector()
                    .slice(s![fi_start..fi_start + fi_len]);
                info.slice_mut(s![si..si + di]).scaled_add(1.0, &eta_block);

                for (j, &vj) in factor.adj_vars.iter().enumerate() {
                    let (sj, dj) = (offsets[vj.0], factor.dofs[j]);
                    let (fj_start, fj_len) = (factor.offsets[j], factor.dofs[j]);
                    let lambda_block = factor.factor_dist.precision_matrix().slice(s![
                        fi_start..fi_start + fi_len,
                        fj_start..fj_start + fj_len
                    ]);
                    prec.slice_mut(s![si..si + di, sj..sj + dj])
                        .scaled_add(1.0, &lambda_block);
                }
            }
        }

        Ok(MultivariateNormal::from_information_and_precision(info, prec)?)
    }

    /// Drop every factor whose `losses[i]` exceeds `config.outlier_threshold`,
    /// removing it from its adjacent variables' adjacency in the same step.
    /// Returns the ids of the pruned factors.
    ///
    /// `losses` must be parallel to [`Self::factors`].
    pub fn remove_outlier(&mut self, losses: &[Float]) -> Vec<FactorId> {
        let threshold = self.config.outlier_threshold;
        let mut pruned = Vec::new();
        for (idx, &loss) in losses.iter().enumerate() {
            if loss <= threshold {
                continue;
            }
            let fid = FactorId(idx);
            if !self.factors[idx].active {
                continue;
            }
            for &vid in &self.factors[idx].adj_vars.clone() {
                self.variables[vid.0].adj_factors.retain(|&f| f != fid);
            }
            self.factors[idx].active = false;
            self.factors[idx].adj_vars.clear();
            pruned.push(fid);
        }
        pruned
    }
}
