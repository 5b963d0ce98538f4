use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A bounded-flow instance, as read from the solver's stdin. Node and edge
/// order is preserved from the document; flows are reported per input edge
/// in that order.
#[derive(Debug, Clone, Deserialize)]
pub struct BeltsProblem {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub role: Role,
    /// Maximum throughput per minute; `null` or absent means uncapped
    #[serde(default)]
    pub cap: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Sink,
    #[default]
    Internal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub lo: f64,
    pub hi: f64,
}

/// The solver's answer, written to stdout as a tagged JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BeltsReport {
    Ok {
        max_flow_per_min: f64,
        /// One entry per input edge, in input order
        flows: Vec<FlowEntry>,
    },
    Infeasible {
        /// Source side of the minimum cut, sorted lexicographically
        cut_reachable: Vec<String>,
        deficit: Deficit,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub from: String,
    pub to: String,
    pub flow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deficit {
    /// How much mandatory flow could not be routed
    pub demand_balance: f64,
    pub tight_nodes: Vec<String>,
    pub tight_edges: Vec<EdgeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRef {
    pub from: String,
    pub to: String,
}

impl BeltsProblem {
    /// Check the structural invariants of the instance. Violations are
    /// malformed input, not infeasibility.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = std::collections::BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ModelError::DuplicateNode(node.id.clone()));
            }
            if let Some(cap) = node.cap {
                if cap < 0.0 {
                    return Err(ModelError::NegativeNodeCap(node.id.clone(), cap));
                }
            }
        }

        if !self.nodes.iter().any(|n| n.role == Role::Sink) {
            return Err(ModelError::MissingSink);
        }

        for (index, edge) in self.edges.iter().enumerate() {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(ModelError::UnknownNode(index, endpoint.clone()));
                }
            }
            if edge.lo < 0.0 {
                return Err(ModelError::NegativeLowerBound(index, edge.lo));
            }
            if edge.hi < edge.lo {
                return Err(ModelError::BoundsInverted {
                    index,
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    lo: edge.lo,
                    hi: edge.hi,
                });
            }
        }

        Ok(())
    }
}
