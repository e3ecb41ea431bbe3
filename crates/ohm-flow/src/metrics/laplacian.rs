//! Weighted Laplacian and grounded linear solves.
//!
//! The Laplacian `L` of a connected graph has a one-dimensional null space
//! (adding a constant to every potential changes nothing). Grounding node 0,
//! i.e. pinning its potential to zero and dropping its row and column, leaves
//! an `(n-1)×(n-1)` symmetric positive definite matrix.
//!
//! Two solve strategies sit on top of it:
//!
//! - [`potential_matrix`]: Cholesky-factor once and invert. Column `j` of the
//!   returned `n×n` matrix holds the node potentials when one unit of current
//!   enters at `j` and leaves at the ground; row and column 0 are zero.
//! - [`PairSolver`]: LU-factor once and solve a fresh right-hand side for
//!   each `(s, t)` pair.
//!
//! Pivots are compared to `tolerance` times the largest diagonal entry of
//! the grounded matrix, so multiplying every weight by the same positive
//! factor never changes whether a graph is accepted.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn, LU};
use ohm_core::error::ComputationError;
use petgraph::visit::EdgeRef;

use crate::graph::FlowGraph;

/// Build the `n×n` weighted Laplacian in graph node-index order.
#[must_use]
pub fn laplacian(graph: &FlowGraph) -> DMatrix<f64> {
    let g = graph.graph();
    let n = g.node_count();
    let mut l = DMatrix::zeros(n, n);

    for e in g.edge_references() {
        let (i, j) = (e.source().index(), e.target().index());
        let w = *e.weight();
        l[(i, i)] += w;
        l[(j, j)] += w;
        l[(i, j)] -= w;
        l[(j, i)] -= w;
    }

    l
}

/// Drop the ground node's row and column. Requires `n >= 2`.
fn grounded(l: &DMatrix<f64>) -> DMatrix<f64> {
    l.clone().remove_row(0).remove_column(0)
}

/// Smallest pivot magnitude accepted for `m`.
fn pivot_floor(m: &DMatrix<f64>, tolerance: f64) -> f64 {
    tolerance * m.diagonal().amax()
}

/// Invert the grounded Laplacian and embed it in an `n×n` matrix whose
/// ground row and column are zero.
///
/// # Errors
///
/// [`ComputationError::Singular`] if the grounded matrix is not positive
/// definite or a pivot falls below `tolerance` relative to its diagonal.
pub fn potential_matrix(l: &DMatrix<f64>, tolerance: f64) -> Result<DMatrix<f64>, ComputationError> {
    let n = l.nrows();
    if n < 2 {
        return Err(ComputationError::NoEdges);
    }

    let g = grounded(l);
    let floor = pivot_floor(&g, tolerance);
    let chol = Cholesky::new(g).ok_or(ComputationError::Singular)?;
    // Diagonal of the factor holds sqrt(pivot).
    if chol.l_dirty().diagonal().iter().any(|d| d * d < floor) {
        return Err(ComputationError::Singular);
    }
    let inverse = chol.inverse();

    let mut c = DMatrix::zeros(n, n);
    c.view_mut((1, 1), (n - 1, n - 1)).copy_from(&inverse);
    Ok(c)
}

/// One LU factorization of the grounded Laplacian, reused for every
/// `(s, t)` right-hand side.
pub struct PairSolver {
    lu: LU<f64, Dyn, Dyn>,
    n: usize,
}

impl PairSolver {
    /// Factor the grounded Laplacian.
    ///
    /// # Errors
    ///
    /// [`ComputationError::Singular`] if the matrix is not invertible or a
    /// pivot falls below `tolerance` relative to its diagonal.
    pub fn new(l: &DMatrix<f64>, tolerance: f64) -> Result<Self, ComputationError> {
        let n = l.nrows();
        if n < 2 {
            return Err(ComputationError::NoEdges);
        }

        let g = grounded(l);
        let floor = pivot_floor(&g, tolerance);
        let lu = g.lu();
        if !lu.is_invertible() || lu.u().diagonal().iter().any(|p| p.abs() < floor) {
            return Err(ComputationError::Singular);
        }
        Ok(Self { lu, n })
    }

    /// Node potentials (ground = 0) for one unit of current entering at
    /// node index `s` and leaving at node index `t`.
    ///
    /// # Errors
    ///
    /// [`ComputationError::Singular`] if the back-substitution fails.
    pub fn potentials(&self, s: usize, t: usize) -> Result<DVector<f64>, ComputationError> {
        let mut b = DVector::zeros(self.n - 1);
        if s > 0 {
            b[s - 1] += 1.0;
        }
        if t > 0 {
            b[t - 1] -= 1.0;
        }

        let x = self.lu.solve(&b).ok_or(ComputationError::Singular)?;
        let mut phi = DVector::zeros(self.n);
        phi.rows_mut(1, self.n - 1).copy_from(&x);
        Ok(phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohm_core::EdgeRecord;

    fn graph(edges: &[(i64, i64, f64)]) -> FlowGraph {
        let records: Vec<EdgeRecord> = edges.iter().copied().map(EdgeRecord::from).collect();
        FlowGraph::build(&records).expect("valid graph")
    }

    #[test]
    fn laplacian_rows_sum_to_zero() {
        let l = laplacian(&graph(&[(1, 2, 2.0), (2, 3, 0.5), (1, 3, 1.0)]));
        for i in 0..3 {
            assert!(l.row(i).sum().abs() < 1e-12);
        }
        assert!((l[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((l[(0, 1)] + 2.0).abs() < 1e-12);
        assert!((l[(1, 2)] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn potential_matrix_inverts_grounded_block() {
        let l = laplacian(&graph(&[(1, 2, 1.0), (2, 3, 1.0)]));
        let c = potential_matrix(&l, 1e-9).expect("connected path");

        // Ground row and column are zero.
        assert!(c.row(0).iter().all(|v| v.abs() < 1e-12));
        assert!(c.column(0).iter().all(|v| v.abs() < 1e-12));

        // Grounded block times its inverse is the identity.
        let block = l.view((1, 1), (2, 2)) * c.view((1, 1), (2, 2));
        assert!((block - DMatrix::<f64>::identity(2, 2)).abs().max() < 1e-12);
    }

    #[test]
    fn pair_solver_matches_series_resistance() {
        // Path 1-2-3 with conductances 1 and 1: unit current from 1 to 3
        // drops 1 volt across each edge.
        let l = laplacian(&graph(&[(1, 2, 1.0), (2, 3, 1.0)]));
        let solver = PairSolver::new(&l, 1e-9).expect("factorizable");
        let phi = solver.potentials(0, 2).expect("solve");

        assert!((phi[0] - phi[1] - 1.0).abs() < 1e-12);
        assert!((phi[1] - phi[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disconnected_laplacian_is_singular() {
        let l = laplacian(&graph(&[(1, 2, 1.0), (3, 4, 1.0)]));
        assert_eq!(
            potential_matrix(&l, 1e-9).expect_err("singular"),
            ComputationError::Singular
        );
        assert!(matches!(
            PairSolver::new(&l, 1e-9),
            Err(ComputationError::Singular)
        ));
    }

    #[test]
    fn uniformly_tiny_weights_are_solvable() {
        let l = laplacian(&graph(&[(1, 2, 1e-10), (2, 3, 1e-10)]));
        let c = potential_matrix(&l, 1e-9).expect("well conditioned");
        // Inverse of a 1e-10 conductance network is 1e10 scaled.
        assert!((c[(2, 2)] * 1e-10 - 2.0).abs() < 1e-9);

        let solver = PairSolver::new(&l, 1e-9).expect("well conditioned");
        let phi = solver.potentials(0, 2).expect("solve");
        assert!((1e-10 * (phi[0] - phi[1]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pivot_check_is_relative_to_matrix_scale() {
        // A conductance 1e14 times weaker than its neighbour leaves a pivot
        // at rounding-noise level compared with the diagonal.
        let l = laplacian(&graph(&[(1, 2, 1e-14), (2, 3, 1.0)]));
        assert_eq!(
            potential_matrix(&l, 1e-9).expect_err("ill-conditioned"),
            ComputationError::Singular
        );
        assert!(matches!(
            PairSolver::new(&l, 1e-9),
            Err(ComputationError::Singular)
        ));

        let scaled = laplacian(&graph(&[(1, 2, 1e-4), (2, 3, 1.0)])) * 1e-9;
        assert!(potential_matrix(&scaled, 1e-9).is_ok());
    }
}
