use gbp_linalg::{Float, Matrix, Vector};

use crate::id::{FactorId, VariableId};

/// The parameters of a message: a canonical Gaussian in the receiving
/// variable's block, without the bookkeeping of a full
/// [`gbp_multivariate_normal::MultivariateNormal`].
#[derive(Debug, Clone)]
pub struct Payload {
    pub information_vector: Vector<Float>,
    pub precision_matrix: Matrix<Float>,
}

/// An observer notified of every outgoing message a factor computes, for
/// tracing/debugging. The core never logs messages itself; a caller that
/// wants `trace!`-level visibility wires a sink that does.
pub trait MessageSink {
    fn record(&mut self, from: FactorId, to: VariableId, payload: &Payload);
}

/// A [`MessageSink`] that logs each message at `trace!` level.
#[derive(Debug, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn record(&mut self, from: FactorId, to: VariableId, payload: &Payload) {
        log::trace!(
            "{from} -> {to}: eta={:?} lambda={:?}",
            payload.information_vector,
            payload.precision_matrix
        );
    }
}

/// A message sent from a factor to one of its adjacent variables, or from a
/// variable's belief back to a factor's cached snapshot of it.
///
/// `empty()` represents "no message yet" — the state of every slot before
/// the first iteration, and the result of a marginalization that failed
/// because the cavity was singular.
#[derive(Debug, Clone, Default)]
pub struct Message {
    payload: Option<Payload>,
}

impl Message {
    #[must_use]
    pub fn empty() -> Self {
        Self { payload: None }
    }

    #[must_use]
    pub fn new(information_vector: Vector<Float>, precision_matrix: Matrix<Float>) -> Self {
        Self {
            payload: Some(Payload {
                information_vector,
                precision_matrix,
            }),
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    pub fn take(&mut self) -> Option<Payload> {
        self.payload.take()
    }
}
