//! Immutable per-run truss configuration.
//!
//! A [`TrussConfig`] is built once (programmatically or via
//! [`crate::config_file`]) and then shared by reference with every
//! evaluation. Nothing in the crate mutates it after construction.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrussError};
use crate::topology::Topology;
use crate::types::{
    LinearSolver, SparseBackend, DEFAULT_NODE_BITS, FORCE_TOL, LSQ_TOL, MAX_NODES, MAX_NODE_BITS,
    SNAP_TOL, SUPPORT_Y_CLAMP,
};

/// Closed coordinate interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Bounds for decoded free-node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanBounds {
    pub x: Interval,
    pub y: Interval,
}

impl SpanBounds {
    pub fn new(x: Interval, y: Interval) -> Self {
        Self { x, y }
    }
}

/// Node whose position comes from configuration rather than the genotype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedNode {
    pub x: f64,
    pub y: f64,
}

impl FixedNode {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The two support nodes. A sits at x = 0, B at x = span length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supports {
    pub a: usize,
    pub b: usize,
}

impl Supports {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }
}

/// Material prices, force limits and self-weight of the design problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Cost per joint (gusset plate).
    pub joint_plate_cost: f64,
    /// Cost per unit member length.
    pub member_cost_per_length: f64,
    /// Allowable compressive limit (negative).
    pub min_force: f64,
    /// Allowable tensile limit.
    pub max_force: f64,
    /// Deck self-weight per unit span length.
    pub weight_per_length: f64,
    /// Longest fixed-node spacing without penalty.
    pub max_panel_length: f64,
    /// Shortest member length without penalty.
    pub min_member_length: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            joint_plate_cost: 6.0,
            member_cost_per_length: 12.0,
            min_force: -13.0,
            max_force: 8.0,
            weight_per_length: 2.0,
            max_panel_length: 3.0,
            min_member_length: 1.0,
        }
    }
}

/// Numeric tolerances used during assembly and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Unit-vector components and loads below this are treated as zero.
    pub snap: f64,
    /// Band width around the force limits (FTOL).
    pub force: f64,
    /// y assigned to a free support node with positive decoded y.
    pub support_y_clamp: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            snap: SNAP_TOL,
            force: FORCE_TOL,
            support_y_clamp: SUPPORT_Y_CLAMP,
        }
    }
}

/// Parameters handed to the external search framework.
///
/// The evaluator itself only reads `node_bits`; the rest is carried so a
/// driver can configure its generational loop from the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub max_generations: usize,
    pub population_size: usize,
    pub tournament_size: usize,
    pub migration_size: usize,
    /// Generations between checkpoints written by the driver.
    pub writing_interval: usize,
    /// Bits per decoded coordinate.
    pub node_bits: u32,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            max_generations: 300,
            population_size: 1500,
            tournament_size: 2,
            migration_size: 2,
            writing_interval: 50,
            node_bits: DEFAULT_NODE_BITS,
        }
    }
}

/// Least-squares solve settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub solver: LinearSolver,
    pub backend: SparseBackend,
    /// Iteration cap for CGLS; `None` means twice the number of struts.
    pub max_iterations: Option<usize>,
    /// Relative stopping tolerance on the normal-equation residual.
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            solver: LinearSolver::Sparse,
            backend: SparseBackend::NalgebraSparse,
            max_iterations: None,
            tolerance: LSQ_TOL,
        }
    }
}

impl SolverOptions {
    pub fn iteration_limit(&self, num_unknowns: usize) -> usize {
        self.max_iterations.unwrap_or(2 * num_unknowns).max(1)
    }
}

/// Weights of the fitness heuristic
/// `numerator / cost - excess*e - nonzero*n - spacing*s - member*m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub numerator: f64,
    pub excess_force: f64,
    pub nonzero_sum: f64,
    pub fixed_spacing: f64,
    pub member_length: f64,
    /// Charge per unit of out-of-band force in the closed-form variant.
    pub force_offset: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            numerator: 30000.0,
            excess_force: 5.0,
            nonzero_sum: 15.0,
            fixed_spacing: 5.0,
            member_length: 10.0,
            force_offset: 12.0,
        }
    }
}

/// Everything an evaluation needs besides the genotype.
#[derive(Debug, Clone)]
pub struct TrussConfig {
    span_length: f64,
    fixed_nodes: Vec<FixedNode>,
    num_free: usize,
    bounds: SpanBounds,
    topology: Topology,
    supports: Supports,
    cost: CostModel,
    tolerances: Tolerances,
    search: SearchParameters,
    solver: SolverOptions,
    weights: FitnessWeights,
    genotype_len: usize,
}

/// Total node count, bounded by [`MAX_NODES`].
pub fn checked_node_count(num_fixed: usize, num_free: usize) -> Result<usize> {
    for (field, count) in [("fixed node count", num_fixed), ("free node count", num_free)] {
        if count > MAX_NODES {
            return Err(TrussError::InvalidValue {
                field,
                value: count.to_string(),
            });
        }
    }
    num_fixed
        .checked_add(num_free)
        .filter(|&n| n <= MAX_NODES)
        .ok_or_else(|| TrussError::InvalidValue {
            field: "node count",
            value: format!("{num_fixed} fixed + {num_free} free"),
        })
}

fn checked_genotype_len(node_bits: u32, num_free: usize) -> Result<usize> {
    (node_bits as usize)
        .checked_mul(2)
        .and_then(|per_node| per_node.checked_mul(num_free))
        .ok_or_else(|| TrussError::InvalidValue {
            field: "free node count",
            value: num_free.to_string(),
        })
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TrussError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }
}

fn check_interval(field: &'static str, interval: Interval) -> Result<()> {
    finite(field, interval.lo)?;
    finite(field, interval.hi)?;
    if interval.lo > interval.hi {
        return Err(TrussError::InvalidValue {
            field,
            value: format!("[{}, {}]", interval.lo, interval.hi),
        });
    }
    Ok(())
}

impl TrussConfig {
    /// Validate and assemble a configuration.
    ///
    /// Node indices `0..fixed_nodes.len()` are the fixed nodes in listed
    /// order; the `num_free` free nodes follow.
    pub fn new(
        span_length: f64,
        fixed_nodes: Vec<FixedNode>,
        num_free: usize,
        bounds: SpanBounds,
        topology: Topology,
        supports: Supports,
    ) -> Result<Self> {
        if finite("span length", span_length)? <= 0.0 {
            return Err(TrussError::InvalidValue {
                field: "span length",
                value: span_length.to_string(),
            });
        }
        for node in &fixed_nodes {
            finite("fixed node x", node.x)?;
            finite("fixed node y", node.y)?;
        }
        check_interval("x bounds", bounds.x)?;
        check_interval("y bounds", bounds.y)?;

        let num_nodes = checked_node_count(fixed_nodes.len(), num_free)?;
        let search = SearchParameters::default();
        let genotype_len = checked_genotype_len(search.node_bits, num_free)?;
        if topology.num_nodes() != num_nodes {
            return Err(TrussError::InvalidTopology(format!(
                "topology covers {} nodes but the configuration has {num_nodes}",
                topology.num_nodes()
            )));
        }
        for (name, index) in [("A", supports.a), ("B", supports.b)] {
            if index >= num_nodes {
                return Err(TrussError::InvalidTopology(format!(
                    "support {name} is node {index}, outside 0..{num_nodes}"
                )));
            }
        }
        if supports.a == supports.b {
            return Err(TrussError::InvalidTopology(format!(
                "both supports are node {}",
                supports.a
            )));
        }

        Ok(Self {
            span_length,
            fixed_nodes,
            num_free,
            bounds,
            topology,
            supports,
            cost: CostModel::default(),
            tolerances: Tolerances::default(),
            search,
            solver: SolverOptions::default(),
            weights: FitnessWeights::default(),
            genotype_len,
        })
    }

    pub fn with_cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Replace the search parameters; the node width must be 1..=32 bits.
    pub fn with_search(mut self, search: SearchParameters) -> Result<Self> {
        if search.node_bits == 0 || search.node_bits > MAX_NODE_BITS {
            return Err(TrussError::InvalidValue {
                field: "node bits",
                value: search.node_bits.to_string(),
            });
        }
        self.genotype_len = checked_genotype_len(search.node_bits, self.num_free)?;
        self.search = search;
        Ok(self)
    }

    pub fn span_length(&self) -> f64 {
        self.span_length
    }

    pub fn fixed_nodes(&self) -> &[FixedNode] {
        &self.fixed_nodes
    }

    pub fn num_fixed(&self) -> usize {
        self.fixed_nodes.len()
    }

    pub fn num_free(&self) -> usize {
        self.num_free
    }

    pub fn num_nodes(&self) -> usize {
        self.fixed_nodes.len() + self.num_free
    }

    pub fn num_struts(&self) -> usize {
        self.topology.num_struts()
    }

    pub fn bounds(&self) -> SpanBounds {
        self.bounds
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn supports(&self) -> Supports {
        self.supports
    }

    pub fn cost(&self) -> &CostModel {
        &self.cost
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn search(&self) -> &SearchParameters {
        &self.search
    }

    pub fn solver(&self) -> &SolverOptions {
        &self.solver
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Genotype length: an x and a y chunk per free node.
    pub fn genotype_len(&self) -> usize {
        self.genotype_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SpanBounds {
        SpanBounds::new(Interval::new(0.0, 14.0), Interval::new(0.0, 5.0))
    }

    fn simple(supports: Supports) -> Result<TrussConfig> {
        let fixed = vec![FixedNode::new(0.0, 0.0), FixedNode::new(14.0, 0.0)];
        let topology = Topology::new(3, &[(0, 1), (0, 2), (1, 2)])?;
        TrussConfig::new(14.0, fixed, 1, bounds(), topology, supports)
    }

    #[test]
    fn genotype_length_follows_node_bits() {
        let config = simple(Supports::new(0, 1)).unwrap();
        assert_eq!(config.genotype_len(), 32);

        let search = SearchParameters {
            node_bits: 10,
            ..Default::default()
        };
        let config = config.with_search(search).unwrap();
        assert_eq!(config.genotype_len(), 20);
        assert_eq!(config.num_nodes(), 3);
    }

    #[test]
    fn node_bits_out_of_range_are_rejected() {
        let config = simple(Supports::new(0, 1)).unwrap();
        let search = SearchParameters {
            node_bits: 40,
            ..Default::default()
        };
        assert!(config.with_search(search).is_err());
    }

    #[test]
    fn support_indices_are_validated() {
        assert!(simple(Supports::new(0, 3)).is_err());
        assert!(simple(Supports::new(1, 1)).is_err());
    }

    #[test]
    fn topology_must_cover_all_nodes() {
        let fixed = vec![FixedNode::new(0.0, 0.0), FixedNode::new(14.0, 0.0)];
        let topology = Topology::new(2, &[(0, 1)]).unwrap();
        let err = TrussConfig::new(14.0, fixed, 1, bounds(), topology, Supports::new(0, 1))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn oversized_node_counts_are_rejected() {
        let fixed = vec![FixedNode::new(0.0, 0.0), FixedNode::new(14.0, 0.0)];
        let topology = Topology::new(usize::MAX, &[(0, 1)]).unwrap();
        let supports = Supports::new(0, 1);
        let err = TrussConfig::new(14.0, fixed, usize::MAX - 1, bounds(), topology, supports)
            .unwrap_err();
        assert!(matches!(
            err,
            TrussError::InvalidValue {
                field: "free node count",
                ..
            }
        ));

        assert!(checked_node_count(MAX_NODES, 1).is_err());
        assert_eq!(checked_node_count(6, 2).unwrap(), 8);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let fixed = vec![FixedNode::new(0.0, 0.0), FixedNode::new(14.0, 0.0)];
        let topology = Topology::new(3, &[(0, 1), (0, 2), (1, 2)]).unwrap();
        let inverted = SpanBounds::new(Interval::new(5.0, 1.0), Interval::new(0.0, 5.0));
        assert!(
            TrussConfig::new(14.0, fixed, 1, inverted, topology, Supports::new(0, 1)).is_err()
        );
    }

    #[test]
    fn default_iteration_limit_is_twice_the_unknowns() {
        let options = SolverOptions::default();
        assert_eq!(options.iteration_limit(7), 14);
        let capped = SolverOptions {
            max_iterations: Some(3),
            ..Default::default()
        };
        assert_eq!(capped.iteration_limit(7), 3);
    }
}
