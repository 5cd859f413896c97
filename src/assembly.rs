//! Equilibrium system assembly in sparse and dense formats.
//!
//! Unknowns are the strut axial forces (tension positive). Rows `2i` and
//! `2i + 1` hold the x and y force balance at node `i`: for every strut
//! `(i, j)` the column of that strut carries the unit vector from `i`
//! towards `j`. The right-hand side carries the negated vertical load on
//! each y row.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

#[cfg(feature = "sprs-backend")]
use sprs::{CsMat, TriMat};

use crate::topology::Topology;
use crate::types::{Point, EQ_PER_NODE};

/// Coefficient matrix and right-hand side of `A · f = b`.
#[derive(Debug, Clone)]
pub struct EquilibriumSystem<M> {
    pub matrix: M,
    pub rhs: DVector<f64>,
}

/// Unit vector from node `i` towards node `j`, or zero for coincident nodes.
pub fn unit_vector(nodes: &[Point], i: usize, j: usize, snap: f64) -> Point {
    let r = nodes[j] - nodes[i];
    let length = r.norm();
    if length < snap {
        return Point::zeros();
    }
    r / length
}

/// [`unit_vector`] with components below `snap` set to exactly zero.
pub fn snapped_unit_vector(nodes: &[Point], i: usize, j: usize, snap: f64) -> Point {
    unit_vector(nodes, i, j, snap).map(|c| if c.abs() < snap { 0.0 } else { c })
}

/// Visit every non-zero coefficient as `(row, strut, value)`.
fn for_each_coefficient(
    nodes: &[Point],
    topology: &Topology,
    snap: f64,
    mut visit: impl FnMut(usize, usize, f64),
) {
    for (k, &[i, j]) in topology.struts().iter().enumerate() {
        for (from, to) in [(i, j), (j, i)] {
            let u = snapped_unit_vector(nodes, from, to, snap);
            let row = EQ_PER_NODE * from;
            if u.x != 0.0 {
                visit(row, k, u.x);
            }
            if u.y != 0.0 {
                visit(row + 1, k, u.y);
            }
        }
    }
}

/// Right-hand side: `-load` on each y row, zero elsewhere.
pub fn assemble_rhs(loads: &[f64], snap: f64) -> DVector<f64> {
    let mut rhs = DVector::zeros(EQ_PER_NODE * loads.len());
    for (i, &load) in loads.iter().enumerate() {
        if load.abs() >= snap {
            rhs[EQ_PER_NODE * i + 1] = -load;
        }
    }
    rhs
}

/// Sparse CSR assembly.
pub fn assemble_equilibrium_sparse(
    nodes: &[Point],
    loads: &[f64],
    topology: &Topology,
    snap: f64,
) -> EquilibriumSystem<CsrMatrix<f64>> {
    let mut coo = CooMatrix::new(EQ_PER_NODE * nodes.len(), topology.num_struts());
    for_each_coefficient(nodes, topology, snap, |row, col, val| coo.push(row, col, val));

    EquilibriumSystem {
        matrix: CsrMatrix::from(&coo),
        rhs: assemble_rhs(loads, snap),
    }
}

/// Dense assembly variant used for small trusses.
pub fn assemble_equilibrium_dense(
    nodes: &[Point],
    loads: &[f64],
    topology: &Topology,
    snap: f64,
) -> EquilibriumSystem<DMatrix<f64>> {
    let mut mat = DMatrix::zeros(EQ_PER_NODE * nodes.len(), topology.num_struts());
    for_each_coefficient(nodes, topology, snap, |row, col, val| mat[(row, col)] += val);

    EquilibriumSystem {
        matrix: mat,
        rhs: assemble_rhs(loads, snap),
    }
}

/// Assemble using sprs triplet format.
#[cfg(feature = "sprs-backend")]
pub fn assemble_equilibrium_sprs(
    nodes: &[Point],
    loads: &[f64],
    topology: &Topology,
    snap: f64,
) -> EquilibriumSystem<CsMat<f64>> {
    let mut tri = TriMat::new((EQ_PER_NODE * nodes.len(), topology.num_struts()));
    for_each_coefficient(nodes, topology, snap, |row, col, val| {
        tri.add_triplet(row, col, val)
    });

    EquilibriumSystem {
        matrix: tri.to_csr(),
        rhs: assemble_rhs(loads, snap),
    }
}
