//! Closed-form seven-force truss, scored for minimization.
//!
//! A fixed-shape deck truss over a 7-unit half span whose member forces
//! are analytic functions of five decoded coordinates, so no linear solve
//! is needed. Useful as a cheap benchmark for a search driver.

use serde::{Deserialize, Serialize};

use crate::config::{CostModel, FitnessWeights, Interval};
use crate::error::{Result, TrussError};
use crate::evaluator::FitnessFunction;
use crate::genotype::{ChunkReader, Genotype};
use crate::types::Sense;

/// Bits per decoded coordinate.
pub const COORD_BITS: u32 = 20;

/// Number of decoded coordinates.
pub const NUM_COORDS: usize = 5;

/// Length of a closed-form genotype.
pub const GENOTYPE_LEN: usize = NUM_COORDS * COORD_BITS as usize;

/// Decoded free coordinates of the closed-form truss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub y3: f64,
}

/// Coordinate intervals, in genotype order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBounds {
    pub x1: Interval,
    pub x2: Interval,
    pub y1: Interval,
    pub y2: Interval,
    pub y3: Interval,
}

impl Default for CoordinateBounds {
    fn default() -> Self {
        Self {
            x1: Interval::new(2.7, 2.8),
            x2: Interval::new(4.6, 4.7),
            y1: Interval::new(0.9, 1.0),
            y2: Interval::new(1.4, 1.5),
            y3: Interval::new(0.6, 0.8),
        }
    }
}

impl Coordinates {
    /// Decode five LSB-first 20-bit chunks: x1, x2, y1, y2, y3.
    pub fn decode(bits: &[bool], bounds: &CoordinateBounds) -> Result<Self> {
        if bits.len() != GENOTYPE_LEN {
            return Err(TrussError::GenotypeLength {
                expected: GENOTYPE_LEN,
                found: bits.len(),
            });
        }
        let mut reader = ChunkReader::new(bits, COORD_BITS);
        Ok(Self {
            x1: reader.next_in(bounds.x1),
            x2: reader.next_in(bounds.x2),
            y1: reader.next_in(bounds.y1),
            y2: reader.next_in(bounds.y2),
            y3: reader.next_in(bounds.y3),
        })
    }

    /// Summed length of the ten members.
    pub fn total_length(&self) -> f64 {
        let Self { x1, x2, y1, y2, y3 } = *self;
        let chord = 2.8;
        (7.0 - x2).hypot(y2)
            + chord
            + (x2 - 4.2).hypot(y2)
            + (x2 - x1).hypot(y2 - y1)
            + (4.2 - x1).hypot(y1)
            + chord
            + (x1 - 1.4).hypot(y1)
            + x1.hypot(y1 - y3)
            + 1.4f64.hypot(y3)
            + chord
    }

    /// Member forces A, B, C, D, E, F, G.
    pub fn forces(&self) -> [f64; 7] {
        let Self { x1, x2, y1, y2, .. } = *self;
        let third = 14.0 / 3.0;
        let rise = y2 - y1;
        let slope = (x1 - x2) / rise + (x2 - 7.0) / y2;
        let lever = x2 - 4.2 + y2 * (x1 - x2) / rise;

        let fa = third / y2 * (7.0 - x2).hypot(y2);
        let fb = third / y2 * (7.0 - x2);
        let fc = 14.0 * slope * (x2 - 4.2).hypot(y2) / (3.0 * lever);

        let run = x2 - x1;
        let fd = run.hypot(rise) / rise * 14.0 * (-run / rise + (x2 - 7.0) / y2)
            / (3.0 * ((x2 - 4.2) / y2 - run / rise));

        let fe = (4.2 - x1).hypot(y1) * (28.0 / 3.0 / y1 - third * y2 / y1 * (slope / lever));
        let ff = third * (x1 - 1.4) / y1;
        let fg = third * (x1 - 1.4).hypot(y1) / y1;

        [fa, fb, fc, fd, fe, ff, fg]
    }
}

/// Minimizing evaluator for the closed-form truss.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedFormEvaluator {
    pub bounds: CoordinateBounds,
    pub cost: CostModel,
    pub weights: FitnessWeights,
}

impl ClosedFormEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Penalty for forces outside `[min_force, max_force]`.
    pub fn force_offset(&self, forces: &[f64]) -> f64 {
        let per_unit = self.weights.force_offset;
        forces
            .iter()
            .map(|&f| {
                if f < self.cost.min_force {
                    per_unit * (self.cost.min_force - f)
                } else if f > self.cost.max_force {
                    per_unit * (f - self.cost.max_force)
                } else {
                    0.0
                }
            })
            .sum()
    }

    pub fn try_evaluate(&self, genotype: &Genotype) -> Result<f64> {
        let coords = Coordinates::decode(genotype.as_bits(), &self.bounds)?;
        let length = coords.total_length();
        if !length.is_finite() || length <= 0.0 {
            log::debug!("degenerate closed-form length {length}, using sentinel fitness");
            return Ok(self.sense().worst());
        }
        let value = self.weights.numerator / length - self.force_offset(&coords.forces());
        if value.is_finite() {
            Ok(value)
        } else {
            Ok(self.sense().worst())
        }
    }
}

impl FitnessFunction for ClosedFormEvaluator {
    fn genotype_len(&self) -> usize {
        GENOTYPE_LEN
    }

    fn sense(&self) -> Sense {
        Sense::Minimize
    }

    fn fitness(&self, genotype: &Genotype) -> f64 {
        match self.try_evaluate(genotype) {
            Ok(value) => value,
            Err(err) => panic!("closed-form evaluation failed: {err}"),
        }
    }
}
