pub mod belts;
pub mod factory;
pub mod planner;
pub mod throughput;
pub mod verify;

use thiserror::Error;

/// Everything that can stop a solve before a report is produced: malformed
/// problem documents, and the numerical failures the spec treats as internal
/// errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("target rate must be positive, got {0}")]
    NonPositiveTargetRate(f64),
    #[error("target item '{0}' is not produced by any recipe")]
    UnproducibleTarget(String),
    #[error("recipe '{recipe}' references unknown machine class '{machine}'")]
    UnknownMachine { recipe: String, machine: String },
    #[error("recipe '{0}' has non-positive craft time {1}")]
    NonPositiveCraftTime(String, f64),
    #[error("machine class '{0}' has non-positive crafts_per_min {1}")]
    NonPositiveCraftRate(String, f64),
    #[error("recipe '{recipe}' has a negative quantity for item '{item}'")]
    NegativeQuantity { recipe: String, item: String },
    #[error("recipe '{0}' has speed modifier below -1")]
    SpeedBelowFloor(String),
    #[error("recipe '{0}' has a negative productivity modifier")]
    NegativeProductivity(String),
    #[error("raw supply cap for '{0}' is negative")]
    NegativeRawCap(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("edge {0} references unknown node '{1}'")]
    UnknownNode(usize, String),
    #[error("edge {index} ({from} -> {to}) has lo {lo} greater than hi {hi}")]
    BoundsInverted {
        index: usize,
        from: String,
        to: String,
        lo: f64,
        hi: f64,
    },
    #[error("edge {0} has a negative lower bound {1}")]
    NegativeLowerBound(usize, f64),
    #[error("node '{0}' has a negative throughput cap {1}")]
    NegativeNodeCap(String, f64),
    #[error("no node is designated as the sink")]
    MissingSink,

    #[error("the linear program is unbounded")]
    UnboundedProgram,
    #[error("the solver exceeded its iteration budget")]
    IterationBudget,
    #[error("max-flow augmentation produced a non-finite value")]
    NonFiniteFlow,
}
