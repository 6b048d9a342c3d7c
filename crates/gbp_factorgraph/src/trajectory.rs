//! Trajectory export: turns every 6-dof pose variable in a graph into a
//! line of `timestamp tx ty tz qx qy qz qw`, in world-from-camera
//! convention, regardless of the camera-from-world convention the solver
//! itself works in.

use std::io::{self, Write};

use gbp_linalg::Float;

use crate::{
    graph::FactorGraph,
    so3::{quaternion_to_matrix, so3_exp},
};

/// Degrees of freedom of a pose variable: 3 for translation, 3 for a
/// rotation vector. Landmarks have `dofs == 3` and are skipped by the
/// exporter.
pub const POSE_DOFS: usize = 6;

/// Write one line per pose (`dofs == 6`) variable to `out`, ordered by
/// variable id. The stored pose is `(t_cw, omega_cw)` in
/// camera-from-world convention; the exported line is in
/// world-from-camera convention, as ORB-SLAM-style trajectory files
/// expect.
pub fn export_trajectory(graph: &FactorGraph, out: &mut impl Write) -> io::Result<()> {
    for variable in graph.variables() {
        if variable.dofs != POSE_DOFS {
            continue;
        }
        let timestamp = variable.timestamp.unwrap_or(0.0);
        let t_cw = variable.mu.slice(ndarray::s![0..3]).to_owned();
        let omega_cw = variable.mu.slice(ndarray::s![3..6]).to_owned();

        let q_cw = so3_exp(&omega_cw);
        let r_cw = quaternion_to_matrix(q_cw);
        let r_wc = r_cw.t();
        let t_wc = -r_wc.dot(&t_cw);
        let q_wc = rotation_matrix_to_quaternion(&r_wc.to_owned());

        writeln!(
            out,
            "{} {} {} {} {} {} {} {}",
            timestamp,
            t_wc[0],
            t_wc[1],
            t_wc[2],
            q_wc.x,
            q_wc.y,
            q_wc.z,
            q_wc.w
        )?;
    }
    Ok(())
}

/// Shepperd's method: recover a unit quaternion from an orthogonal 3x3
/// rotation matrix.
fn rotation_matrix_to_quaternion(m: &gbp_linalg::Matrix<Float>) -> crate::so3::Quaternion {
    let trace = m[[0, 0]] + m[[1, 1]] + m[[2, 2]];
    if trace > 0.0 {
        let s = 0.5 / (trace + 1.0).sqrt();
        crate::so3::Quaternion {
            w: 0.25 / s,
            x: (m[[2, 1]] - m[[1, 2]]) * s,
            y: (m[[0, 2]] - m[[2, 0]]) * s,
            z: (m[[1, 0]] - m[[0, 1]]) * s,
        }
    } else if m[[0, 0]] > m[[1, 1]] && m[[0, 0]] > m[[2, 2]] {
        let s = 2.0 * (1.0 + m[[0, 0]] - m[[1, 1]] - m[[2, 2]]).sqrt();
        crate::so3::Quaternion {
            w: (m[[2, 1]] - m[[1, 2]]) / s,
            x: 0.25 * s,
            y: (m[[0, 1]] + m[[1, 0]]) / s,
            z: (m[[0, 2]] + m[[2, 0]]) / s,
        }
    } else if m[[1, 1]] > m[[2, 2]] {
        let s = 2.0 * (1.0 + m[[1, 1]] - m[[0, 0]] - m[[2, 2]]).sqrt();
        crate::so3::Quaternion {
            w: (m[[0, 2]] - m[[2, 0]]) / s,
            x: (m[[0, 1]] + m[[1, 0]]) / s,
            y: 0.25 * s,
            z: (m[[1, 2]] + m[[2, 1]]) / s,
        }
    } else {
        let s = 2.0 * (1.0 + m[[2, 2]] - m[[0, 0]] - m[[1, 1]]).sqrt();
        crate::so3::Quaternion {
            w: (m[[1, 0]] - m[[0, 1]]) / s,
            x: (m[[0, 2]] + m[[2, 0]]) / s,
            y: (m[[1, 2]] + m[[2, 1]]) / s,
            z: 0.25 * s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FactorGraph, GbpConfig};
    use gbp_multivariate_normal::MultivariateNormal;
    use ndarray::array;

    #[test]
    fn unary_pose_at_origin_exports_identity_quaternion() {
        let mut graph = FactorGraph::new(GbpConfig::default());
        let prior = MultivariateNormal::prior_from(
            ndarray::Array1::zeros(6),
            ndarray::Array2::eye(6),
        )
        .unwrap();
        graph.add_variable(prior, Some(0.0));

        let mut buf = Vec::new();
        export_trajectory(&graph, &mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();
        let fields: Vec<&str> = line.trim().split_whitespace().collect();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0], "0");
        for f in &fields[1..4] {
            assert!((f.parse::<Float>().unwrap()).abs() < 1e-12);
        }
        assert!((fields[7].parse::<Float>().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn landmarks_are_skipped() {
        let mut graph = FactorGraph::new(GbpConfig::default());
        let prior =
            MultivariateNormal::prior_from(array![1.0, 2.0, 3.0], ndarray::Array2::eye(3)).unwrap();
        graph.add_variable(prior, None);

        let mut buf = Vec::new();
        export_trajectory(&graph, &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
