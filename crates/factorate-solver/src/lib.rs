mod maxflow;
mod network;
mod problem;
mod simplex;
mod solution;

pub use maxflow::FLOW_EPS;
pub use network::{EdgeId, FlowNetwork, NodeId};
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, Sense};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
