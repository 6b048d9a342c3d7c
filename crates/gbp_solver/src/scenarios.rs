//! Builders for the canonical toy problems, shared between the CLI and its
//! own tests.

use gbp_factorgraph::prelude::*;
use gbp_linalg::{Float, Matrix, Vector};
use gbp_multivariate_normal::MultivariateNormal;
use ndarray::array;

/// `h(x) = x[0] - x[1]`, an affine difference between two 1-D variables.
#[derive(Debug)]
pub struct Difference;

impl MeasurementModel for Difference {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn predict(&self, x: &Vector<Float>) -> Vector<Float> {
        array![x[0] - x[1]]
    }

    fn jacobian(&self, _x: &Vector<Float>) -> Matrix<Float> {
        array![[1.0, -1.0]]
    }
}

fn unit_prior_1d() -> MultivariateNormal {
    MultivariateNormal::from_information_and_precision(array![0.0], array![[1.0]])
        .expect("1x1 identity precision is always invertible")
}

/// Two 1-D variables with unit priors, joined by one `Difference` factor
/// with measurement `z=2`, `sigma=1`. Converges to `mu = (2/3, -2/3)`.
pub fn two_variable(config: GbpConfig) -> FactorGraph {
    let mut graph = FactorGraph::new(config);
    let v0 = graph.add_variable(unit_prior_1d(), None);
    let v1 = graph.add_variable(unit_prior_1d(), None);
    graph
        .add_factor(
            vec![v0, v1],
            Box::new(Difference),
            array![2.0],
            1.0,
            Loss::None,
            Float::INFINITY,
        )
        .expect("two fresh 1-D variables are a valid factor adjacency");
    graph
}

/// Three 1-D variables in a chain, `f01: x0-x1=1`, `f12: x1-x2=1`.
/// Converges to `mu = (0.5, 0.0, -0.5)`.
pub fn three_variable_chain(config: GbpConfig) -> FactorGraph {
    let mut graph = FactorGraph::new(config);
    let v0 = graph.add_variable(unit_prior_1d(), None);
    let v1 = graph.add_variable(unit_prior_1d(), None);
    let v2 = graph.add_variable(unit_prior_1d(), None);
    graph
        .add_factor(
            vec![v0, v1],
            Box::new(Difference),
            array![1.0],
            1.0,
            Loss::None,
            Float::INFINITY,
        )
        .expect("three fresh 1-D variables are a valid factor adjacency");
    graph
        .add_factor(
            vec![v1, v2],
            Box::new(Difference),
            array![1.0],
            1.0,
            Loss::None,
            Float::INFINITY,
        )
        .expect("three fresh 1-D variables are a valid factor adjacency");
    graph
}

/// A single unary 6-dof pose variable at the origin with a unit prior.
pub fn unary_pose(config: GbpConfig) -> FactorGraph {
    let mut graph = FactorGraph::new(config);
    let prior = MultivariateNormal::prior_from(Vector::zeros(6), Matrix::eye(6))
        .expect("identity covariance is always invertible");
    graph.add_variable(prior, Some(0.0));
    graph
}

/// Run `iterations` synchronous sweeps, reporting every outgoing message to
/// a [`LogSink`] at `trace!` level.
pub fn converge(graph: &mut FactorGraph, iterations: usize) {
    let mut sink = LogSink;
    for _ in 0..iterations {
        graph
            .synchronous_iteration_with_sink(true, true, Some(&mut sink))
            .expect("toy scenarios never produce a singular update");
    }
}
