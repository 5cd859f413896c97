//! Material cost, structural penalties and the fitness heuristic.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::unit_vector;
use crate::config::{CostModel, FitnessWeights};
use crate::topology::Topology;
use crate::types::{Point, Sense};

/// Where a strut force sits relative to the allowable limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceBand {
    /// Within `[min - FTOL, max + FTOL]`.
    Allowed,
    /// Past a limit, but not past twice the limit.
    Mild,
    /// Past twice the limit.
    Severe,
}

impl ForceBand {
    pub fn is_over_limit(self) -> bool {
        self != ForceBand::Allowed
    }
}

/// Classify a force and return the overshoot beyond the severe band edge.
///
/// The overshoot is zero unless the band is [`ForceBand::Severe`].
pub fn classify_force(force: f64, cost: &CostModel, ftol: f64) -> (ForceBand, f64) {
    let severe_low = 2.0 * cost.min_force - ftol;
    let severe_high = 2.0 * cost.max_force + ftol;

    if force < severe_low {
        (ForceBand::Severe, severe_low - force)
    } else if force < cost.min_force - ftol {
        (ForceBand::Mild, 0.0)
    } else if force > severe_high {
        (ForceBand::Severe, force - severe_high)
    } else if force > cost.max_force + ftol {
        (ForceBand::Mild, 0.0)
    } else {
        (ForceBand::Allowed, 0.0)
    }
}

/// Per-strut scoring record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrutScore {
    pub length: f64,
    pub force: f64,
    pub band: ForceBand,
    /// Material cost charged for this strut, including any over-limit surcharge.
    pub cost: f64,
}

/// The four penalty terms folded into the fitness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    /// Summed overshoot of severely over-limit forces.
    pub excess_force: f64,
    /// Summed `|x| + |y|` force imbalance over all nodes.
    pub nonzero_sum: f64,
    /// Summed excess of fixed-node spacing over the panel limit.
    pub fixed_spacing: f64,
    /// Summed shortfall of member lengths below the minimum.
    pub member_length: f64,
}

/// Total cost plus per-strut detail.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSummary {
    pub total_cost: f64,
    pub struts: Vec<StrutScore>,
    pub excess_force: f64,
    pub member_length: f64,
}

/// Euclidean length of every strut.
pub fn member_lengths(nodes: &[Point], topology: &Topology) -> Vec<f64> {
    topology
        .struts()
        .iter()
        .map(|&[i, j]| (nodes[j] - nodes[i]).norm())
        .collect()
}

/// Joint plates, member material and over-limit surcharges.
///
/// Every strut pays its member cost once. A mild or severe violation
/// charges it again; a severe one also adds its overshoot to the excess
/// force penalty.
pub fn score_struts(
    nodes: &[Point],
    topology: &Topology,
    forces: &DVector<f64>,
    cost: &CostModel,
    ftol: f64,
) -> CostSummary {
    let mut total_cost = nodes.len() as f64 * cost.joint_plate_cost;
    let mut excess_force = 0.0;
    let mut member_length = 0.0;

    let struts = member_lengths(nodes, topology)
        .into_iter()
        .zip(forces.iter())
        .map(|(length, &force)| {
            let member_cost = length * cost.member_cost_per_length;
            let (band, overshoot) = classify_force(force, cost, ftol);
            let charged = if band.is_over_limit() {
                2.0 * member_cost
            } else {
                member_cost
            };
            total_cost += charged;
            excess_force += overshoot;

            if length < cost.min_member_length {
                member_length += cost.min_member_length - length;
            }

            StrutScore {
                length,
                force,
                band,
                cost: charged,
            }
        })
        .collect();

    CostSummary {
        total_cost,
        struts,
        excess_force,
        member_length,
    }
}

/// Sum of absolute x and y force imbalance over all nodes.
///
/// Each node starts from its applied vertical load; strut `(i, j)` pulls
/// `i` towards `j` and `j` towards `i` with its tension force. Unit
/// vectors are not snapped here, so snapping error in the solve shows up.
pub fn force_residual(
    nodes: &[Point],
    loads: &[f64],
    topology: &Topology,
    forces: &DVector<f64>,
    snap: f64,
) -> f64 {
    let mut net: Vec<Point> = loads.iter().map(|&load| Point::new(0.0, load)).collect();
    for (k, &[i, j]) in topology.struts().iter().enumerate() {
        let pull = unit_vector(nodes, i, j, snap) * forces[k];
        net[i] += pull;
        net[j] -= pull;
    }
    net.iter().map(|r| r.x.abs() + r.y.abs()).sum()
}

/// `numerator / cost` minus the weighted penalties.
///
/// Non-positive or non-finite cost, or a non-finite result, gives the
/// sentinel for `sense`.
pub fn heuristic_fitness(
    total_cost: f64,
    penalties: &PenaltyBreakdown,
    weights: &FitnessWeights,
    sense: Sense,
) -> f64 {
    if !total_cost.is_finite() || total_cost <= 0.0 {
        log::debug!("degenerate cost {total_cost}, using sentinel fitness");
        return sense.worst();
    }

    let fitness = weights.numerator / total_cost
        - weights.excess_force * penalties.excess_force
        - weights.nonzero_sum * penalties.nonzero_sum
        - weights.fixed_spacing * penalties.fixed_spacing
        - weights.member_length * penalties.member_length;

    if fitness.is_finite() {
        fitness
    } else {
        log::debug!("non-finite fitness for cost {total_cost}, using sentinel fitness");
        sense.worst()
    }
}
