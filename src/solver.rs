//! Least-squares solvers for the strut forces.
//!
//! The equilibrium system has `2 × nodes` equations and one unknown per
//! strut, so it is solved in the least-squares sense. The iterative path is
//! a conjugate gradient on the normal equations (CGLS) with a column-norm
//! Jacobi preconditioner; the dense path uses an SVD pseudo-inverse.
//!
//! Neither path fails hard. Hitting the iteration cap or a breakdown simply
//! returns the current iterate with `converged == false`; the residual
//! penalty downstream then ranks the design accordingly.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

#[cfg(feature = "sprs-backend")]
use sprs::CsMat;

use crate::assembly::{assemble_equilibrium_dense, assemble_equilibrium_sparse};
use crate::config::SolverOptions;
use crate::topology::Topology;
use crate::types::{LinearSolver, Point, SparseBackend, DENSE_ENTRY_THRESHOLD, EQ_PER_NODE};

#[cfg(feature = "sprs-backend")]
use crate::assembly::assemble_equilibrium_sprs;

/// Singular values below this fraction of the largest are treated as zero.
const SVD_RCOND: f64 = 1e-10;

/// Matrix-free view of a rectangular coefficient matrix.
pub trait LinearOperator {
    fn num_rows(&self) -> usize;
    fn num_cols(&self) -> usize;
    /// `A · x`
    fn apply(&self, x: &DVector<f64>) -> DVector<f64>;
    /// `Aᵀ · y`
    fn apply_transpose(&self, y: &DVector<f64>) -> DVector<f64>;
    /// Squared Euclidean norm of every column.
    fn column_norms_squared(&self) -> DVector<f64>;
}

impl LinearOperator for CsrMatrix<f64> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    #[inline]
    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        self * x
    }

    fn apply_transpose(&self, y: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.ncols());
        for (i, row) in self.row_iter().enumerate() {
            for (&col, &val) in row.col_indices().iter().zip(row.values().iter()) {
                out[col] += val * y[i];
            }
        }
        out
    }

    fn column_norms_squared(&self) -> DVector<f64> {
        let mut out = DVector::zeros(self.ncols());
        for (&col, &val) in self.col_indices().iter().zip(self.values().iter()) {
            out[col] += val * val;
        }
        out
    }
}

impl LinearOperator for DMatrix<f64> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        self * x
    }

    fn apply_transpose(&self, y: &DVector<f64>) -> DVector<f64> {
        self.tr_mul(y)
    }

    fn column_norms_squared(&self) -> DVector<f64> {
        DVector::from_iterator(self.ncols(), self.column_iter().map(|c| c.norm_squared()))
    }
}

#[cfg(feature = "sprs-backend")]
fn for_each_sprs_entry(a: &CsMat<f64>, mut visit: impl FnMut(usize, usize, f64)) {
    let csr = a.is_csr();
    for (outer, lane) in a.outer_iterator().enumerate() {
        for (inner, &val) in lane.iter() {
            if csr {
                visit(outer, inner, val);
            } else {
                visit(inner, outer, val);
            }
        }
    }
}

#[cfg(feature = "sprs-backend")]
impl LinearOperator for CsMat<f64> {
    fn num_rows(&self) -> usize {
        self.rows()
    }

    fn num_cols(&self) -> usize {
        self.cols()
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.rows());
        for_each_sprs_entry(self, |r, c, v| y[r] += v * x[c]);
        y
    }

    fn apply_transpose(&self, y: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.cols());
        for_each_sprs_entry(self, |r, c, v| out[c] += v * y[r]);
        out
    }

    fn column_norms_squared(&self) -> DVector<f64> {
        let mut out = DVector::zeros(self.cols());
        for_each_sprs_entry(self, |_, c, v| out[c] += v * v);
        out
    }
}

/// Result of a least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresSolution {
    /// Axial force per strut, tension positive.
    pub forces: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// `‖A·f − b‖`
    pub residual_norm: f64,
}

fn finish<O: LinearOperator + ?Sized>(
    a: &O,
    b: &DVector<f64>,
    forces: DVector<f64>,
    iterations: usize,
    converged: bool,
) -> LeastSquaresSolution {
    let residual_norm = (a.apply(&forces) - b).norm();
    let converged = converged && forces.iter().all(|f| f.is_finite());
    if !converged {
        log::debug!(
            "least-squares solve stopped after {iterations} iterations without converging \
             (residual {residual_norm:.3e})"
        );
    }
    LeastSquaresSolution {
        forces,
        iterations,
        converged,
        residual_norm,
    }
}

/// Preconditioned CGLS: minimize `‖A·x − b‖` starting from `x = 0`.
///
/// Stops once `‖Aᵀr‖² < tolerance² · ‖Aᵀb‖²` or after `max_iterations`.
pub fn cgls<O: LinearOperator + ?Sized>(
    a: &O,
    b: &DVector<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> LeastSquaresSolution {
    let mut x = DVector::zeros(a.num_cols());

    let preconditioner = a
        .column_norms_squared()
        .map(|s| if s > 0.0 { 1.0 / s } else { 1.0 });

    let mut residual = b.clone();
    let mut normal_residual = a.apply_transpose(&residual);
    let rhs_norm2 = normal_residual.norm_squared();
    if rhs_norm2 == 0.0 {
        return finish(a, b, x, 0, true);
    }
    let threshold = tolerance * tolerance * rhs_norm2;

    let mut z = normal_residual.component_mul(&preconditioner);
    let mut p = z.clone();
    let mut abs_new = normal_residual.dot(&z);

    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iterations {
        let tmp = a.apply(&p);
        let tmp_norm2 = tmp.norm_squared();
        if !(tmp_norm2 > 0.0 && abs_new.is_finite()) {
            break;
        }
        let alpha = abs_new / tmp_norm2;
        x.axpy(alpha, &p, 1.0);
        residual.axpy(-alpha, &tmp, 1.0);
        normal_residual = a.apply_transpose(&residual);
        iterations += 1;

        if normal_residual.norm_squared() < threshold {
            converged = true;
            break;
        }

        z = normal_residual.component_mul(&preconditioner);
        let abs_old = abs_new;
        abs_new = normal_residual.dot(&z);
        let beta = abs_new / abs_old;
        p = &z + beta * &p;
    }

    finish(a, b, x, iterations, converged)
}

/// `solve(A, b)` with the iteration cap and tolerance taken from `options`.
pub fn solve_least_squares<O: LinearOperator + ?Sized>(
    a: &O,
    b: &DVector<f64>,
    options: &SolverOptions,
) -> LeastSquaresSolution {
    cgls(
        a,
        b,
        options.iteration_limit(a.num_cols()),
        options.tolerance,
    )
}

/// Minimum-norm least-squares solution via SVD.
pub fn solve_dense_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> LeastSquaresSolution {
    if a.ncols() == 0 || a.nrows() == 0 {
        return finish(a, b, DVector::zeros(a.ncols()), 0, true);
    }
    let svd = a.clone().svd(true, true);
    let largest = svd.singular_values.max();
    let eps = (SVD_RCOND * largest).max(f64::MIN_POSITIVE);

    match svd.solve(b, eps) {
        Ok(forces) => finish(a, b, forces, 1, true),
        Err(msg) => {
            log::debug!("dense least-squares solve failed: {msg}");
            finish(a, b, DVector::zeros(a.ncols()), 0, false)
        }
    }
}

/// Assemble and solve the equilibrium system for one layout.
///
/// Uses the solver and backend selected in `options`.
pub fn solve_equilibrium(
    nodes: &[Point],
    loads: &[f64],
    topology: &Topology,
    options: &SolverOptions,
    snap: f64,
) -> LeastSquaresSolution {
    let entries = EQ_PER_NODE * nodes.len() * topology.num_struts();
    let use_dense = match options.solver {
        LinearSolver::Dense => true,
        LinearSolver::Sparse => false,
        LinearSolver::Auto => entries <= DENSE_ENTRY_THRESHOLD,
    };

    if use_dense {
        let system = assemble_equilibrium_dense(nodes, loads, topology, snap);
        return solve_dense_least_squares(&system.matrix, &system.rhs);
    }

    match options.backend {
        SparseBackend::NalgebraSparse => {
            let system = assemble_equilibrium_sparse(nodes, loads, topology, snap);
            solve_least_squares(&system.matrix, &system.rhs, options)
        }
        #[cfg(feature = "sprs-backend")]
        SparseBackend::Sprs => {
            let system = assemble_equilibrium_sprs(nodes, loads, topology, snap);
            solve_least_squares(&system.matrix, &system.rhs, options)
        }
    }
}
