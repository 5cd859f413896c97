//! Type aliases, constants, and core enums for truss fitness evaluation.

use nalgebra::Vector2;

/// 2-D node position (x along the span, y upward).
pub type Point = Vector2<f64>;

/// Equations per node in the equilibrium system (x row, y row).
pub const EQ_PER_NODE: usize = 2;

/// Largest node count a configuration may declare.
pub const MAX_NODES: usize = 1 << 16;

/// Default bits per decoded coordinate.
pub const DEFAULT_NODE_BITS: u32 = 16;

/// Widest coordinate chunk the codec accepts.
pub const MAX_NODE_BITS: u32 = 32;

/// Unit-vector components below this magnitude are snapped to zero.
pub const SNAP_TOL: f64 = 1e-6;

/// Band tolerance around the allowable force limits.
pub const FORCE_TOL: f64 = 0.005;

/// y value assigned to a support node whose decoded y is positive.
pub const SUPPORT_Y_CLAMP: f64 = 0.01;

/// Fixed-node x positions used by the text configuration format.
/// Fixed nodes past the end of this table sit at the span length.
pub const DECK_PANEL_POINTS: [f64; 5] = [0.0, 3.0, 6.0, 8.0, 11.0];

/// Default relative tolerance for the least-squares solve.
pub const LSQ_TOL: f64 = 1e-12;

/// Coefficient-matrix entry count (rows × cols) at or below which the
/// dense SVD path is chosen automatically.
pub const DENSE_ENTRY_THRESHOLD: usize = 4096;

/// Fitness returned for degenerate designs when maximizing.
pub const DEGENERATE_FITNESS: f64 = -1.0e9;

/// Least-squares solver used for the equilibrium system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LinearSolver {
    /// Dense SVD least squares. Best for small trusses.
    Dense,
    /// Preconditioned conjugate gradient on the normal equations (CGLS).
    #[default]
    Sparse,
    /// Choose based on the coefficient matrix size.
    Auto,
}

/// Backend for sparse matrix storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SparseBackend {
    /// Use nalgebra-sparse (always available).
    #[default]
    NalgebraSparse,
    /// Use sprs crate (requires "sprs-backend" feature).
    #[cfg(feature = "sprs-backend")]
    Sprs,
}

/// Optimization direction the fitness value is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

impl Sense {
    /// Sentinel fitness that ranks below every valid design.
    pub fn worst(self) -> f64 {
        match self {
            Sense::Maximize => DEGENERATE_FITNESS,
            Sense::Minimize => -DEGENERATE_FITNESS,
        }
    }

    /// Whether `a` ranks strictly ahead of `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Sense::Maximize => a > b,
            Sense::Minimize => a < b,
        }
    }
}
