//! External vertical loads and the fixed-node spacing penalty.
//!
//! Loads are y-components of force applied at each node. Each support
//! carries half the deck self-weight as a (negative) reaction, and every
//! deck panel between adjacent fixed nodes hands half its own weight to
//! each of its two end nodes.

use crate::config::TrussConfig;
use crate::types::Point;

/// Per-node vertical loads plus the panel spacing penalty found on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCase {
    pub loads: Vec<f64>,
    /// Sum of `spacing - max_panel_length` over over-long deck panels.
    pub spacing_penalty: f64,
}

impl LoadCase {
    /// Net vertical load over all nodes.
    pub fn total(&self) -> f64 {
        self.loads.iter().sum()
    }
}

/// Reaction applied at each support: half the deck weight, downward sign.
pub fn support_reaction(config: &TrussConfig) -> f64 {
    -config.cost().weight_per_length * config.span_length() / 2.0
}

/// Build the load vector for a decoded layout.
pub fn compute_loads(nodes: &[Point], config: &TrussConfig) -> LoadCase {
    let cost = config.cost();
    let mut loads = vec![0.0; nodes.len()];

    let reaction = support_reaction(config);
    let supports = config.supports();
    loads[supports.a] += reaction;
    loads[supports.b] += reaction;

    let mut spacing_penalty = 0.0;
    for k in 0..config.num_fixed().saturating_sub(1) {
        let spacing = (nodes[k + 1].x - nodes[k].x).abs();
        if spacing > cost.max_panel_length {
            spacing_penalty += spacing - cost.max_panel_length;
        }
        let joint_share = spacing * cost.weight_per_length / 2.0;
        loads[k] += joint_share;
        loads[k + 1] += joint_share;
    }

    LoadCase {
        loads,
        spacing_penalty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FixedNode, Interval, SpanBounds, Supports};
    use crate::topology::Topology;

    const TOL: f64 = 1e-12;

    fn deck(xs: &[f64], supports: Supports) -> (TrussConfig, Vec<Point>) {
        let fixed: Vec<FixedNode> = xs.iter().map(|&x| FixedNode::new(x, 0.0)).collect();
        let n = fixed.len();
        let pairs: Vec<(usize, usize)> = (0..n - 1).map(|k| (k, k + 1)).collect();
        let span = xs[n - 1];
        let config = TrussConfig::new(
            span,
            fixed,
            0,
            SpanBounds::new(Interval::new(0.0, span), Interval::new(0.0, 1.0)),
            Topology::new(n, &pairs).unwrap(),
            supports,
        )
        .unwrap();
        let nodes = xs.iter().map(|&x| Point::new(x, 0.0)).collect();
        (config, nodes)
    }

    #[test]
    fn deck_weight_balances_support_reactions() {
        let xs = [0.0, 3.0, 6.0, 8.0, 11.0, 14.0];
        let (config, nodes) = deck(&xs, Supports::new(0, 5));
        let case = compute_loads(&nodes, &config);

        assert!(case.total().abs() < TOL);
        // supports: -14 reaction + 3 self-weight share
        assert!((case.loads[0] - -11.0).abs() < TOL);
        assert!((case.loads[5] - -11.0).abs() < TOL);
        // node 3 sits between panels of length 2 and 3
        assert!((case.loads[3] - 5.0).abs() < TOL);
        assert_eq!(case.spacing_penalty, 0.0);
    }

    #[test]
    fn long_panels_accumulate_spacing_penalty() {
        let xs = [0.0, 4.5, 6.0, 10.0];
        let (config, nodes) = deck(&xs, Supports::new(0, 3));
        let case = compute_loads(&nodes, &config);
        assert!((case.spacing_penalty - 2.5).abs() < TOL);
    }
}
