//! Gaussian belief propagation over a factor graph of variable and factor
//! nodes, in canonical (information) form.
//!
//! The graph is synchronous: each [`graph::FactorGraph::synchronous_iteration`]
//! robustifies, optionally relinearizes, computes every factor's outgoing
//! messages, and folds them into every variable's belief, in that order.

pub mod error;
pub mod factor;
pub mod id;
pub mod message;
pub mod robust;
pub mod so3;
pub mod trajectory;
pub mod variable;

pub mod graph;

pub mod prelude {
    pub use crate::{
        error::{FactorGraphError, Result},
        factor::{Factor, MeasurementModel},
        graph::{FactorGraph, GbpConfig},
        id::{FactorId, VariableId},
        message::{LogSink, Message, MessageSink, Payload},
        robust::Loss,
        variable::Variable,
    };
}
