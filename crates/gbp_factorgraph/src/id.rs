/// Stable identifier for a [`crate::variable::Variable`], equal to its index
/// in [`crate::graph::FactorGraph`]'s variable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display(fmt = "v{_0}")]
pub struct VariableId(pub usize);

/// Stable identifier for a [`crate::factor::Factor`], equal to its index in
/// [`crate::graph::FactorGraph`]'s factor storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display(fmt = "f{_0}")]
pub struct FactorId(pub usize);
