//! The SO(3) exponential map, used only by the trajectory exporter to turn
//! a rotation vector into a rotation matrix (and back, for round-trip
//! tests). Not part of the solver core: factors never rotate anything
//! themselves, they only linearize whatever `MeasurementModel` they are
//! given.

use gbp_linalg::{Float, Matrix, Vector};

/// A unit quaternion in `(x, y, z, w)` layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: Float,
    pub y: Float,
    pub z: Float,
    pub w: Float,
}

/// The exponential map `so(3) -> SO(3)`, taking a rotation vector `omega`
/// to the quaternion of the rotation it generates.
///
/// Uses a small-angle Taylor expansion below `theta < 1e-2` to avoid
/// dividing by a near-zero angle.
#[must_use]
pub fn so3_exp(omega: &Vector<Float>) -> Quaternion {
    debug_assert_eq!(omega.len(), 3);
    let theta = (omega[0] * omega[0] + omega[1] * omega[1] + omega[2] * omega[2]).sqrt();

    if theta < 1e-2 {
        let scale = 1.0 - theta * theta / 6.0;
        Quaternion {
            x: omega[0] * scale,
            y: omega[1] * scale,
            z: omega[2] * scale,
            w: 1.0,
        }
    } else {
        let half = theta / 2.0;
        let sin_half = half.sin();
        Quaternion {
            x: omega[0] * sin_half / theta,
            y: omega[1] * sin_half / theta,
            z: omega[2] * sin_half / theta,
            w: half.cos(),
        }
    }
}

/// The inverse of [`so3_exp`]: recover a rotation vector from a quaternion.
#[must_use]
pub fn so3_log(q: Quaternion) -> Vector<Float> {
    let v_norm = (q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
    if v_norm < 1e-9 {
        return Vector::zeros(3);
    }
    let angle = 2.0 * v_norm.atan2(q.w);
    let scale = angle / v_norm;
    Vector::from(vec![q.x * scale, q.y * scale, q.z * scale])
}

/// Convert a unit quaternion to its 3x3 rotation matrix.
#[must_use]
pub fn quaternion_to_matrix(q: Quaternion) -> Matrix<Float> {
    let (x, y, z, w) = (q.x, q.y, q.z, q.w);
    Matrix::from_shape_vec(
        (3, 3),
        vec![
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    )
    .expect("3x3 shape matches the 9 supplied elements")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identity_rotation_is_identity_quaternion() {
        let q = so3_exp(&array![0.0, 0.0, 0.0]);
        assert!((q.x).abs() < 1e-12);
        assert!((q.y).abs() < 1e-12);
        assert!((q.z).abs() < 1e-12);
        assert!((q.w - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exp_log_round_trip() {
        let omega = array![0.3, -0.1, 0.2];
        let q = so3_exp(&omega);
        let recovered = so3_log(q);
        for i in 0..3 {
            assert!((recovered[i] - omega[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn quaternion_to_matrix_is_orthogonal() {
        let q = so3_exp(&array![0.1, 0.4, -0.2]);
        let r = quaternion_to_matrix(q);
        let rt_r = r.t().dot(&r);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((rt_r[[i, j]] - expected).abs() < 1e-9);
            }
        }
    }
}
