use gbp_multivariate_normal::MultivariateNormalError;

#[derive(Debug, thiserror::Error)]
pub enum FactorGraphError {
    #[error("matrix inversion required by {0} failed: not invertible")]
    NonInvertible(&'static str),
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: &'static str,
    },
    #[error("unknown robust loss tag: {0:?}")]
    UnknownLoss(String),
    #[error("invariant broken: {0}")]
    InvariantBroken(&'static str),
}

impl From<MultivariateNormalError> for FactorGraphError {
    fn from(err: MultivariateNormalError) -> Self {
        match err {
            MultivariateNormalError::NonInvertiblePrecisionMatrix => {
                Self::NonInvertible("precision matrix")
            }
            MultivariateNormalError::NonInvertibleCovarianceMatrix => {
                Self::NonInvertible("covariance matrix")
            }
            MultivariateNormalError::NonSquarePrecisionMatrix(rows, cols) => {
                Self::DimensionMismatch {
                    expected: rows,
                    got: cols,
                    context: "precision matrix is not square",
                }
            }
            MultivariateNormalError::VectorLengthNotEqualMatrixShape(vec_len, rows, _cols) => {
                Self::DimensionMismatch {
                    expected: rows,
                    got: vec_len,
                    context: "information vector length vs. precision matrix shape",
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FactorGraphError>;
