//! Fitness evaluation for genetic truss optimization.
//!
//! A candidate truss is a fixed-length bit string holding the positions of
//! its free nodes. Evaluating it decodes the node layout, builds the deck
//! loads, solves the joint equilibrium equations for the strut forces in
//! the least-squares sense and folds material cost and structural
//! penalties into one scalar:
//!
//! ```text
//! genotype -> layout -> loads -> A·f = b -> forces -> cost, penalties -> fitness
//! ```
//!
//! The search loop itself lives outside this crate; it only needs a
//! [`FitnessFunction`].
//!
//! ```
//! use truss_fitness::{parse_config, FitnessFunction, Genotype, TrussEvaluator};
//!
//! let parsed = parse_config("4 2 1  0 4 1 3  3  0 1 0 2 1 2  0 1").unwrap();
//! let evaluator = TrussEvaluator::new(&parsed.config);
//! let genotype = Genotype::zeros(evaluator.genotype_len());
//! assert!(evaluator.fitness(&genotype).is_finite());
//! ```

pub mod assembly;
pub mod closed_form;
pub mod config;
pub mod config_file;
pub mod error;
pub mod evaluator;
pub mod genotype;
pub mod loads;
pub mod objective;
pub mod solver;
pub mod topology;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use assembly::{
    assemble_equilibrium_dense, assemble_equilibrium_sparse, unit_vector, EquilibriumSystem,
};
#[cfg(feature = "sprs-backend")]
pub use assembly::assemble_equilibrium_sprs;
pub use closed_form::{ClosedFormEvaluator, Coordinates};
pub use config::{
    CostModel, FitnessWeights, FixedNode, Interval, SearchParameters, SolverOptions, SpanBounds,
    Supports, Tolerances, TrussConfig,
};
pub use config_file::{append_best_of_run, load_config, parse_config, ConfigFile};
pub use error::{Result, TrussError};
pub use evaluator::{
    batch_evaluate, replay, FitnessFunction, SerializableEvaluation, TrussEvaluation,
    TrussEvaluator,
};
pub use genotype::{decode_bits, decode_layout, normalize, Genotype};
pub use loads::{compute_loads, LoadCase};
pub use objective::{heuristic_fitness, ForceBand, PenaltyBreakdown, StrutScore};
pub use solver::{cgls, solve_equilibrium, LeastSquaresSolution, LinearOperator};
pub use topology::Topology;
pub use types::{LinearSolver, Point, Sense, SparseBackend};
