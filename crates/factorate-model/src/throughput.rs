//! Bounded flow as two Edmonds-Karp passes over a transformed graph.
//!
//! Capped nodes split into an entry/exit pair joined by a cap-sized edge.
//! Per-edge lower bounds move into node excesses, a super-source/super-sink
//! pair checks that the mandatory flow can circulate, and a second pass with
//! fresh terminals pushes whatever optional capacity remains toward the sink.

use std::collections::BTreeMap;

use factorate_solver::{EdgeId, FlowNetwork, NodeId, FLOW_EPS};
use itertools::Itertools;
use tracing::debug;

use crate::belts::{BeltsProblem, BeltsReport, Deficit, EdgeRef, FlowEntry, Role};
use crate::ModelError;

/// Residual capacity at or below this counts as saturated for diagnostics.
const SATURATION_TOL: f64 = 1e-7;

/// The transformed graph, with links back to the input it came from.
struct ExpandedGraph {
    net: FlowNetwork,
    /// Transformed node receiving an original node's inbound edges
    enter: Vec<NodeId>,
    /// Transformed node emitting an original node's outbound edges
    exit: Vec<NodeId>,
    /// Split edge per original node, present when the node is capped
    cap_edges: Vec<Option<EdgeId>>,
    /// Transformed edge per input edge, in input order
    edge_ids: Vec<EdgeId>,
    /// Input edge endpoints as node indices
    endpoints: Vec<(usize, usize)>,
    /// Lower-bound excess per transformed node
    excess: Vec<f64>,
    sources: Vec<usize>,
    sinks: Vec<usize>,
}

fn expand(problem: &BeltsProblem) -> ExpandedGraph {
    let index: BTreeMap<&str, usize> = problem
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut net = FlowNetwork::new();
    let mut enter = Vec::with_capacity(problem.nodes.len());
    let mut exit = Vec::with_capacity(problem.nodes.len());
    let mut cap_edges = Vec::with_capacity(problem.nodes.len());
    for node in &problem.nodes {
        match node.cap {
            Some(cap) => {
                let entry = net.add_node();
                let exit_side = net.add_node();
                cap_edges.push(Some(net.add_edge(entry, exit_side, cap)));
                enter.push(entry);
                exit.push(exit_side);
            }
            None => {
                let v = net.add_node();
                cap_edges.push(None);
                enter.push(v);
                exit.push(v);
            }
        }
    }

    let mut edge_ids = Vec::with_capacity(problem.edges.len());
    let mut endpoints = Vec::with_capacity(problem.edges.len());
    let mut excess = vec![0.0; net.node_count()];
    for edge in &problem.edges {
        let u = index[edge.from.as_str()];
        let v = index[edge.to.as_str()];
        edge_ids.push(net.add_edge(exit[u], enter[v], edge.hi - edge.lo));
        endpoints.push((u, v));
        excess[enter[v]] += edge.lo;
        excess[exit[u]] -= edge.lo;
    }

    let sources = role_indices(problem, Role::Source);
    let sinks = role_indices(problem, Role::Sink);

    ExpandedGraph {
        net,
        enter,
        exit,
        cap_edges,
        edge_ids,
        endpoints,
        excess,
        sources,
        sinks,
    }
}

fn role_indices(problem: &BeltsProblem, role: Role) -> Vec<usize> {
    problem
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.role == role)
        .map(|(i, _)| i)
        .collect()
}

/// Solve a validated belts instance.
pub fn solve(problem: &BeltsProblem) -> Result<BeltsReport, ModelError> {
    let mut g = expand(problem);
    debug!(
        nodes = problem.nodes.len(),
        edges = problem.edges.len(),
        transformed_nodes = g.net.node_count(),
        "expanded belts network"
    );

    // Close the circulation: every sink drains into a pre-source aggregator
    // that feeds every source.
    let mut helper_edges: Vec<EdgeId> = Vec::new();
    let aggregator = g.net.add_node();
    for &s in &g.sources {
        helper_edges.push(g.net.add_edge(aggregator, g.enter[s], f64::INFINITY));
    }
    for &k in &g.sinks {
        helper_edges.push(g.net.add_edge(g.exit[k], aggregator, f64::INFINITY));
    }

    // Super-source/super-sink absorbing the lower-bound excesses.
    let s_star = g.net.add_node();
    let t_star = g.net.add_node();
    let mut total_demand = 0.0;
    for w in 0..g.excess.len() {
        let excess = g.excess[w];
        if excess > FLOW_EPS {
            helper_edges.push(g.net.add_edge(s_star, w, excess));
            total_demand += excess;
        } else if excess < -FLOW_EPS {
            helper_edges.push(g.net.add_edge(w, t_star, -excess));
        }
    }

    let satisfied = g.net.max_flow(s_star, t_star);
    if !satisfied.is_finite() {
        return Err(ModelError::NonFiniteFlow);
    }
    debug!(satisfied, total_demand, "ran lower-bound feasibility pass");

    if satisfied + FLOW_EPS < total_demand {
        return Ok(infeasibility_certificate(
            problem,
            &g,
            s_star,
            total_demand - satisfied,
        ));
    }

    // The mandatory circulation stands. Pin every helper edge at its current
    // flow and push the optional capacity from fresh terminals.
    for &edge in &helper_edges {
        g.net.freeze_edge(edge);
    }
    let super_source = g.net.add_node();
    let super_sink = g.net.add_node();
    for &s in &g.sources {
        g.net.add_edge(super_source, g.enter[s], f64::INFINITY);
    }
    for &k in &g.sinks {
        g.net.add_edge(g.exit[k], super_sink, f64::INFINITY);
    }
    let pushed = g.net.max_flow(super_source, super_sink);
    if !pushed.is_finite() {
        return Err(ModelError::NonFiniteFlow);
    }
    debug!(pushed, "ran maximization pass");

    // Map the transformed flows back onto the input edges.
    let mut flows = Vec::with_capacity(problem.edges.len());
    let mut max_flow_per_min = 0.0;
    for (i, edge) in problem.edges.iter().enumerate() {
        let flow = edge.lo + g.net.flow(g.edge_ids[i]);
        if problem.nodes[g.endpoints[i].1].role == Role::Sink {
            max_flow_per_min += flow;
        }
        flows.push(FlowEntry {
            from: edge.from.clone(),
            to: edge.to.clone(),
            flow,
        });
    }

    Ok(BeltsReport::Ok {
        max_flow_per_min,
        flows,
    })
}

/// Read the minimum cut out of the residual graph after a failed
/// feasibility pass.
fn infeasibility_certificate(
    problem: &BeltsProblem,
    g: &ExpandedGraph,
    s_star: NodeId,
    shortfall: f64,
) -> BeltsReport {
    let reachable = g.net.residual_reachable(s_star);

    let cut_reachable: Vec<String> = problem
        .nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| reachable[g.enter[*i]] || reachable[g.exit[*i]])
        .map(|(_, node)| node.id.clone())
        .sorted()
        .collect();

    let tight_nodes: Vec<String> = problem
        .nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| match g.cap_edges[*i] {
            Some(edge) => g.net.residual(edge) <= SATURATION_TOL && reachable[g.enter[*i]],
            None => false,
        })
        .map(|(_, node)| node.id.clone())
        .sorted()
        .collect();

    let tight_edges: Vec<EdgeRef> = problem
        .edges
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let (u, v) = g.endpoints[*i];
            reachable[g.exit[u]]
                && !reachable[g.enter[v]]
                && g.net.residual(g.edge_ids[*i]) <= SATURATION_TOL
        })
        .map(|(_, edge)| EdgeRef {
            from: edge.from.clone(),
            to: edge.to.clone(),
        })
        .collect();

    BeltsReport::Infeasible {
        cut_reachable,
        deficit: Deficit {
            demand_balance: shortfall.max(0.0),
            tight_nodes,
            tight_edges,
        },
    }
}
