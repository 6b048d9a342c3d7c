//! A Gaussian distribution stored in canonical (information) form,
//! `(eta, Lambda)` such that `eta = Lambda * mean`. Products of two
//! distributions in this form are just sums of their parameters, which is
//! what makes the form convenient for belief propagation.

use gbp_linalg::{Float, Matrix, Vector};
use ndarray::Axis;
use ndarray_inverse::Inverse;

#[derive(Debug, thiserror::Error)]
pub enum MultivariateNormalError {
    #[error("the precision matrix is not square, it has shape {0}x{1}")]
    NonSquarePrecisionMatrix(usize, usize),
    #[error(
        "the length of the information vector ({0}) is not equal to the number of rows ({1}) or columns ({2}) of the precision matrix"
    )]
    VectorLengthNotEqualMatrixShape(usize, usize, usize),
    #[error(
        "the covariance matrix is not invertible, which is required to calculate the precision matrix"
    )]
    NonInvertibleCovarianceMatrix,
    #[error(
        "the precision matrix is not invertible, which is required to calculate the mean or covariance"
    )]
    NonInvertiblePrecisionMatrix,
}

pub type Result<T> = std::result::Result<T, MultivariateNormalError>;

/// A multivariate Gaussian in canonical/information form.
///
/// Unlike moment form (mean, covariance), canonical form lets two
/// distributions be combined by simply adding their parameters, which is
/// exactly the operation belief propagation needs when a variable combines
/// messages from several factors. The mean is derived lazily from `(eta,
/// Lambda)` since `Lambda` is allowed to be singular between updates (e.g.
/// [`MultivariateNormal::identity`], used as the zero element before any
/// messages have arrived).
#[allow(clippy::len_without_is_empty)]
#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    information: Vector<Float>,
    precision: Matrix<Float>,
    mean: Vector<Float>,
    /// Whether `mean` needs to be recomputed from `(information, precision)`.
    dirty: bool,
}

impl MultivariateNormal {
    /// Create a new multivariate normal distribution in information form.
    ///
    /// # Example:
    /// ```
    /// use gbp_multivariate_normal::{MultivariateNormal, Result};
    /// use ndarray::array;
    /// fn main() -> Result<()> {
    ///     let information = array![1.0, 2.0, 3.0];
    ///     let precision = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    ///     let normal = MultivariateNormal::from_information_and_precision(information, precision)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn from_information_and_precision(
        information_vector: Vector<Float>,
        precision_matrix: Matrix<Float>,
    ) -> Result<Self> {
        if !precision_matrix.is_square() {
            Err(MultivariateNormalError::NonSquarePrecisionMatrix(
                precision_matrix.nrows(),
                precision_matrix.ncols(),
            ))
        } else if information_vector.len() != precision_matrix.nrows()
            || information_vector.len() != precision_matrix.ncols()
        {
            Err(MultivariateNormalError::VectorLengthNotEqualMatrixShape(
                information_vector.len(),
                precision_matrix.nrows(),
                precision_matrix.ncols(),
            ))
        } else {
            let dim = information_vector.len();
            Ok(Self {
                information: information_vector,
                precision: precision_matrix,
                mean: Vector::zeros(dim),
                dirty: true,
            })
        }
    }

    /// Create a new multivariate normal distribution from a mean and covariance matrix.
    ///
    /// # Example:
    /// ```
    /// use gbp_multivariate_normal::{MultivariateNormal, Result};
    /// use ndarray::array;
    /// fn main() -> Result<()> {
    ///     let mean = array![1.0, 2.0, 3.0];
    ///     let covariance = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    ///     let normal = MultivariateNormal::from_mean_and_covariance(mean, covariance)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn from_mean_and_covariance(mean: Vector<Float>, covariance: Matrix<Float>) -> Result<Self> {
        if !covariance.is_square() {
            Err(MultivariateNormalError::NonSquarePrecisionMatrix(
                covariance.nrows(),
                covariance.ncols(),
            ))
        } else if mean.len() != covariance.nrows() || mean.len() != covariance.ncols() {
            Err(MultivariateNormalError::VectorLengthNotEqualMatrixShape(
                mean.len(),
                covariance.nrows(),
                covariance.ncols(),
            ))
        } else {
            let Some(precision) = covariance.inv() else {
                return Err(MultivariateNormalError::NonInvertibleCovarianceMatrix);
            };
            let information = precision.dot(&mean);
            Ok(Self {
                information,
                precision,
                mean,
                dirty: false,
            })
        }
    }

    /// The zero element of the canonical form: `eta = 0`, `Lambda = 0`.
    /// Used as the starting point before any prior or message has been
    /// folded in. Its `Lambda` is singular by construction, so `mean()`
    /// must not be called on it directly.
    pub fn identity(dim: usize) -> Self {
        Self {
            information: Vector::zeros(dim),
            precision: Matrix::zeros((dim, dim)),
            mean: Vector::zeros(dim),
            dirty: false,
        }
    }

    /// Construct a prior distribution from a mean and covariance. Alias of
    /// [`Self::from_mean_and_covariance`].
    pub fn prior_from(mean: Vector<Float>, covariance: Matrix<Float>) -> Result<Self> {
        Self::from_mean_and_covariance(mean, covariance)
    }

    /// Returns the dimension of the distribution: the length of the
    /// information vector, equal to the number of rows and columns of the
    /// precision matrix.
    pub fn len(&self) -> usize {
        self.information.len()
    }

    /// Get the information vector of the multivariate normal distribution.
    #[inline(always)]
    pub fn information_vector(&self) -> &Vector<Float> {
        &self.information
    }

    /// Get the precision matrix of the multivariate normal distribution.
    #[inline(always)]
    pub fn precision_matrix(&self) -> &Matrix<Float> {
        &self.precision
    }

    pub fn update_information_vector(&mut self, value: &Vector<Float>) {
        self.information.clone_from(value);
        self.dirty = true;
    }

    pub fn update_precision_matrix(&mut self, value: &Matrix<Float>) {
        self.precision.clone_from(value);
        self.dirty = true;
    }

    /// Recompute and cache the mean (`Lambda^-1 * eta`) if it is stale.
    /// Returns `Ok(true)` if it was recomputed, `Ok(false)` if the cache was
    /// already current.
    pub fn update(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let inv = self
            .precision
            .clone()
            .inv()
            .ok_or(MultivariateNormalError::NonInvertiblePrecisionMatrix)?;
        self.mean = inv.dot(&self.information);
        self.dirty = false;
        Ok(true)
    }

    /// Get the mean of the multivariate normal distribution.
    ///
    /// # Errors
    /// Returns [`MultivariateNormalError::NonInvertiblePrecisionMatrix`] if
    /// the precision matrix is singular.
    pub fn mean(&mut self) -> Result<&Vector<Float>> {
        self.update()?;
        Ok(&self.mean)
    }

    /// Get the covariance matrix of the multivariate normal distribution.
    /// Returns an owned value, as the covariance matrix is not stored
    /// internally.
    pub fn covariance(&self) -> Result<Matrix<Float>> {
        self.precision
            .clone()
            .inv()
            .ok_or(MultivariateNormalError::NonInvertiblePrecisionMatrix)
    }

    /// Set the information vector directly, without recomputing the mean.
    ///
    /// # Safety
    /// No checks are performed that `value` is the same length as the one
    /// stored. The mean is not updated; call [`Self::update`] afterwards
    /// if you need it.
    #[inline(always)]
    pub unsafe fn set_information_vector(&mut self, value: &Vector<Float>) {
        self.information.clone_from(value);
        self.dirty = true;
    }

    /// Set the precision matrix directly, without recomputing the mean.
    ///
    /// # Safety
    /// No checks are performed that `value` is square and the same
    /// dimension as the one stored. The mean is not updated; call
    /// [`Self::update`] afterwards if you need it.
    #[inline(always)]
    pub unsafe fn set_precision_matrix(&mut self, value: &Matrix<Float>) {
        self.precision.clone_from(value);
        self.dirty = true;
    }

    /// Add a vector into the information vector in place.
    ///
    /// # Safety
    /// No checks are performed that `value` is the same length as the one
    /// stored.
    pub unsafe fn add_assign_information_vector(&mut self, value: &Vector<Float>) {
        self.information += value;
        self.dirty = true;
    }

    /// Add a matrix into the precision matrix in place.
    ///
    /// # Safety
    /// No checks are performed that `value` is square and the same
    /// dimension as the one stored.
    pub unsafe fn add_assign_precision_matrix(&mut self, value: &Matrix<Float>) {
        self.precision += value;
        self.dirty = true;
    }

    /// The product of two canonical Gaussians is the componentwise sum of
    /// their parameters.
    #[must_use]
    pub fn product(&self, other: &Self) -> Self {
        self + other
    }

    /// Marginalize out every dimension not in `keep`, via the Schur
    /// complement of the precision matrix. `keep` need not be contiguous or
    /// sorted.
    ///
    /// # Errors
    /// Returns [`MultivariateNormalError::NonInvertiblePrecisionMatrix`] if
    /// the block of marginalized-out dimensions is singular.
    pub fn marginalize_to(&self, keep: &[usize]) -> Result<Self> {
        let total = self.len();
        let other: Vec<usize> = (0..total).filter(|i| !keep.contains(i)).collect();

        if other.is_empty() {
            return Ok(self.clone());
        }

        let lam_aa = self.precision.select(Axis(0), keep).select(Axis(1), keep);
        let lam_ab = self.precision.select(Axis(0), keep).select(Axis(1), &other);
        let lam_ba = self.precision.select(Axis(0), &other).select(Axis(1), keep);
        let lam_bb = self
            .precision
            .select(Axis(0), &other)
            .select(Axis(1), &other);

        let eta_a = self.information.select(Axis(0), keep);
        let eta_b = self.information.select(Axis(0), &other);

        let lam_bb_inv = lam_bb
            .inv()
            .ok_or(MultivariateNormalError::NonInvertiblePrecisionMatrix)?;

        let information = &eta_a - &lam_ab.dot(&lam_bb_inv).dot(&eta_b);
        let precision = &lam_aa - &lam_ab.dot(&lam_bb_inv).dot(&lam_ba);

        Ok(Self {
            information,
            precision,
            mean: Vector::zeros(keep.len()),
            dirty: true,
        })
    }
}

impl std::ops::Add<&MultivariateNormal> for MultivariateNormal {
    type Output = MultivariateNormal;

    fn add(self, rhs: &MultivariateNormal) -> Self::Output {
        let information = self.information + &rhs.information;
        let precision = self.precision + &rhs.precision;
        let dim = information.len();
        Self::Output {
            information,
            precision,
            mean: Vector::zeros(dim),
            dirty: true,
        }
    }
}

impl std::ops::Add<&MultivariateNormal> for &MultivariateNormal {
    type Output = MultivariateNormal;

    fn add(self, rhs: &MultivariateNormal) -> Self::Output {
        let information = &self.information + &rhs.information;
        let precision = &self.precision + &rhs.precision;
        let dim = information.len();
        Self::Output {
            information,
            precision,
            mean: Vector::zeros(dim),
            dirty: true,
        }
    }
}

impl std::ops::AddAssign<&MultivariateNormal> for MultivariateNormal {
    fn add_assign(&mut self, rhs: &MultivariateNormal) {
        self.information += &rhs.information;
        self.precision += &rhs.precision;
        self.dirty = true;
    }
}

impl std::ops::Sub<&MultivariateNormal> for MultivariateNormal {
    type Output = MultivariateNormal;

    fn sub(self, rhs: &MultivariateNormal) -> Self::Output {
        let information = self.information - &rhs.information;
        let precision = self.precision - &rhs.precision;
        let dim = information.len();
        Self::Output {
            information,
            precision,
            mean: Vector::zeros(dim),
            dirty: true,
        }
    }
}

impl std::ops::Sub<&MultivariateNormal> for &MultivariateNormal {
    type Output = MultivariateNormal;

    fn sub(self, rhs: &MultivariateNormal) -> Self::Output {
        let information = &self.information - &rhs.information;
        let precision = &self.precision - &rhs.precision;
        let dim = information.len();
        Self::Output {
            information,
            precision,
            mean: Vector::zeros(dim),
            dirty: true,
        }
    }
}

impl std::ops::SubAssign<&MultivariateNormal> for MultivariateNormal {
    fn sub_assign(&mut self, rhs: &MultivariateNormal) {
        self.information -= &rhs.information;
        self.precision -= &rhs.precision;
        self.dirty = true;
    }
}

impl std::ops::Mul<&MultivariateNormal> for MultivariateNormal {
    type Output = MultivariateNormal;

    /// In canonical form, the product of two Gaussians is the sum of their
    /// information vectors and the sum of their precision matrices.
    fn mul(self, rhs: &MultivariateNormal) -> Self::Output {
        self + rhs
    }
}

impl std::ops::MulAssign<&MultivariateNormal> for MultivariateNormal {
    fn mul_assign(&mut self, rhs: &MultivariateNormal) {
        *self += rhs;
    }
}
