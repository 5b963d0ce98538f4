//! Independent re-checkers for solver reports.
//!
//! Each verifier reloads an input document and the solver's output and
//! re-derives every constraint from the mathematical definitions alone, so a
//! bug in the model builders cannot hide itself. Violations come back as
//! human-readable strings, one per broken constraint.

use std::collections::BTreeMap;

use crate::belts::{BeltsProblem, BeltsReport, Role};
use crate::factory::{FactoryProblem, FactoryReport, Recipe};

const ABS_TOL: f64 = 1e-9;
const REL_TOL: f64 = 1e-6;
/// Slop granted on one-sided bound checks.
const BOUND_TOL: f64 = 1e-6;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABS_TOL.max(REL_TOL * a.abs().max(b.abs()))
}

/// Re-derivation of the planner's rate formula, kept local on purpose.
fn effective_crafts_per_min(problem: &FactoryProblem, recipe: &Recipe) -> f64 {
    problem.machines[&recipe.machine].crafts_per_min * (1.0 + recipe.speed()) / recipe.time_s
}

/// Check a factory report against its input. Empty result means the report
/// is consistent.
pub fn verify_factory(problem: &FactoryProblem, report: &FactoryReport) -> Vec<String> {
    let mut violations = Vec::new();

    match report {
        FactoryReport::Ok {
            per_recipe_crafts_per_min,
            per_machine_counts,
            raw_consumption_per_min,
        } => {
            for (name, &rate) in per_recipe_crafts_per_min {
                if !problem.recipes.contains_key(name) {
                    violations.push(format!("report names unknown recipe '{name}'"));
                } else if !rate.is_finite() || rate < -BOUND_TOL {
                    violations.push(format!("recipe '{name}' has invalid rate {rate}"));
                }
            }

            let crafts = |name: &str| {
                per_recipe_crafts_per_min
                    .get(name)
                    .copied()
                    .unwrap_or(0.0)
                    .max(0.0)
            };

            // Item classification, re-derived from the input alone
            let mut produced: std::collections::BTreeSet<&str> = Default::default();
            let mut consumed: std::collections::BTreeSet<&str> = Default::default();
            for recipe in problem.recipes.values() {
                produced.extend(recipe.outputs.keys().map(String::as_str));
                consumed.extend(recipe.inputs.keys().map(String::as_str));
            }
            let mut items: std::collections::BTreeSet<&str> = &produced | &consumed;
            items.insert(problem.target.item.as_str());
            items.extend(problem.raw_supply_per_min.keys().map(String::as_str));
            let mut raw_items: std::collections::BTreeSet<&str> = problem
                .raw_supply_per_min
                .keys()
                .map(String::as_str)
                .collect();
            raw_items.extend(consumed.difference(&produced));

            let prod_mult = |recipe: &Recipe| {
                if problem.apply_productivity {
                    1.0 + recipe.prod()
                } else {
                    1.0
                }
            };

            for &item in &items {
                let mut net = 0.0;
                for (name, recipe) in &problem.recipes {
                    let x = crafts(name);
                    net += recipe.outputs.get(item).copied().unwrap_or(0.0) * prod_mult(recipe) * x;
                    net -= recipe.inputs.get(item).copied().unwrap_or(0.0) * x;
                }

                if item == problem.target.item {
                    if !close(net, problem.target.rate_per_min) {
                        violations.push(format!(
                            "target '{item}' nets {net} per minute, requested {}",
                            problem.target.rate_per_min
                        ));
                    }
                } else if raw_items.contains(item) {
                    let consumption = -net;
                    if consumption < -BOUND_TOL {
                        violations.push(format!(
                            "raw '{item}' is produced on net ({} per minute)",
                            -consumption
                        ));
                    }
                    if let Some(&cap) = problem.raw_supply_per_min.get(item) {
                        if consumption > cap + BOUND_TOL {
                            violations.push(format!(
                                "raw '{item}' consumption {consumption} exceeds cap {cap}"
                            ));
                        }
                    }
                    let reported = raw_consumption_per_min.get(item);
                    match reported {
                        Some(&value) if !close(value, consumption.max(0.0)) => {
                            violations.push(format!(
                                "raw '{item}' reported as {value}, computed {consumption}"
                            ));
                        }
                        None if consumption > BOUND_TOL => {
                            violations
                                .push(format!("raw '{item}' is consumed but missing from report"));
                        }
                        _ => {}
                    }
                } else if net.abs() > BOUND_TOL {
                    violations.push(format!("intermediate '{item}' is unbalanced by {net}"));
                }
            }

            for item in raw_consumption_per_min.keys() {
                if !raw_items.contains(item.as_str()) {
                    violations.push(format!("report names '{item}' which is not a raw item"));
                }
            }

            // Machine utilization against caps and reported counts
            for (class, spec) in &problem.machines {
                let mut usage = 0.0;
                for (name, recipe) in &problem.recipes {
                    if recipe.machine == *class {
                        let eff = effective_crafts_per_min(problem, recipe);
                        let x = crafts(name);
                        if eff > ABS_TOL {
                            usage += x / eff;
                        } else if x > BOUND_TOL {
                            violations.push(format!(
                                "recipe '{name}' runs at {x} on a stalled machine"
                            ));
                        }
                    }
                }

                if let Some(cap) = spec.max_machines {
                    if usage > cap as f64 + BOUND_TOL {
                        violations
                            .push(format!("machine '{class}' usage {usage} exceeds cap {cap}"));
                    }
                }

                let expected = (usage - ABS_TOL).ceil().max(0.0) as u64;
                match per_machine_counts.get(class) {
                    Some(&count) if count != expected => {
                        violations.push(format!(
                            "machine '{class}' count reported as {count}, computed {expected}"
                        ));
                    }
                    None if usage > BOUND_TOL => {
                        violations.push(format!(
                            "machine '{class}' is utilized but missing from report"
                        ));
                    }
                    _ => {}
                }
            }

            for class in per_machine_counts.keys() {
                if !problem.machines.contains_key(class) {
                    violations.push(format!("report names unknown machine class '{class}'"));
                }
            }
        }
        FactoryReport::Infeasible {
            max_feasible_target,
            ..
        } => {
            if !max_feasible_target.is_finite() || *max_feasible_target < -ABS_TOL {
                violations.push(format!(
                    "max_feasible_target {max_feasible_target} is not a rate"
                ));
            }
            if *max_feasible_target > problem.target.rate_per_min + BOUND_TOL {
                violations.push(format!(
                    "max_feasible_target {max_feasible_target} exceeds the requested rate {}",
                    problem.target.rate_per_min
                ));
            }
        }
    }

    violations
}

/// Check a belts report against its input. Empty result means the report is
/// consistent.
pub fn verify_belts(problem: &BeltsProblem, report: &BeltsReport) -> Vec<String> {
    let mut violations = Vec::new();

    match report {
        BeltsReport::Ok {
            max_flow_per_min,
            flows,
        } => {
            if flows.len() != problem.edges.len() {
                violations.push(format!(
                    "report carries {} flows for {} edges",
                    flows.len(),
                    problem.edges.len()
                ));
            }

            let mut inflow: BTreeMap<&str, f64> = BTreeMap::new();
            let mut outflow: BTreeMap<&str, f64> = BTreeMap::new();
            for (i, (edge, entry)) in problem.edges.iter().zip(flows).enumerate() {
                if entry.from != edge.from || entry.to != edge.to {
                    violations.push(format!(
                        "flow {i} is {} -> {}, expected {} -> {}",
                        entry.from, entry.to, edge.from, edge.to
                    ));
                    continue;
                }
                if !entry.flow.is_finite() {
                    violations.push(format!("flow {i} is not a number"));
                    continue;
                }
                if entry.flow < edge.lo - BOUND_TOL {
                    violations.push(format!(
                        "edge {} -> {} flow {} is below its lower bound {}",
                        edge.from, edge.to, entry.flow, edge.lo
                    ));
                }
                if entry.flow > edge.hi + BOUND_TOL {
                    violations.push(format!(
                        "edge {} -> {} flow {} is above its upper bound {}",
                        edge.from, edge.to, entry.flow, edge.hi
                    ));
                }
                *outflow.entry(edge.from.as_str()).or_default() += entry.flow;
                *inflow.entry(edge.to.as_str()).or_default() += entry.flow;
            }

            let mut sink_inflow = 0.0;
            for node in &problem.nodes {
                let into = inflow.get(node.id.as_str()).copied().unwrap_or(0.0);
                let out = outflow.get(node.id.as_str()).copied().unwrap_or(0.0);

                if node.role == Role::Internal && (into - out).abs() > BOUND_TOL {
                    violations.push(format!(
                        "node '{}' is unbalanced: inflow {into}, outflow {out}",
                        node.id
                    ));
                }
                if let Some(cap) = node.cap {
                    if into.max(out) > cap + BOUND_TOL {
                        violations.push(format!(
                            "node '{}' throughput {} exceeds cap {cap}",
                            node.id,
                            into.max(out)
                        ));
                    }
                }
                if node.role == Role::Sink {
                    sink_inflow += into;
                }
            }

            if !close(sink_inflow, *max_flow_per_min) {
                violations.push(format!(
                    "max_flow_per_min reported as {max_flow_per_min}, sink inflow is {sink_inflow}"
                ));
            }
        }
        BeltsReport::Infeasible {
            cut_reachable,
            deficit,
        } => {
            if !(deficit.demand_balance > ABS_TOL) {
                violations.push(format!(
                    "demand_balance {} does not witness a shortfall",
                    deficit.demand_balance
                ));
            }
            let known =
                |id: &str| -> bool { problem.nodes.iter().any(|node| node.id == id) };
            for id in cut_reachable {
                if !known(id) {
                    violations.push(format!("cut names unknown node '{id}'"));
                }
            }
            for id in &deficit.tight_nodes {
                let node = problem.nodes.iter().find(|node| node.id == *id);
                match node {
                    None => violations.push(format!("tight node '{id}' is not declared")),
                    Some(node) if node.cap.is_none() => {
                        violations.push(format!("tight node '{id}' has no cap"))
                    }
                    _ => {}
                }
            }
            for edge in &deficit.tight_edges {
                let declared = problem
                    .edges
                    .iter()
                    .any(|e| e.from == edge.from && e.to == edge.to);
                if !declared {
                    violations.push(format!(
                        "tight edge {} -> {} is not declared",
                        edge.from, edge.to
                    ));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::throughput;

    fn factory_problem() -> FactoryProblem {
        let problem: FactoryProblem = serde_json::from_str(
            r#"{
                "target": {"item": "iron", "rate_per_min": 60},
                "machines": {"furnace": {"crafts_per_min": 60, "max_machines": null}},
                "recipes": {
                    "smelt": {
                        "machine": "furnace",
                        "time_s": 1,
                        "in": {"iron_ore": 1},
                        "out": {"iron": 1}
                    }
                },
                "raw_supply_per_min": {"iron_ore": 1000}
            }"#,
        )
        .unwrap();
        problem.validate().unwrap();
        problem
    }

    fn belts_problem() -> BeltsProblem {
        let problem: BeltsProblem = serde_json::from_str(
            r#"{
                "nodes": [
                    {"id": "s", "role": "source"},
                    {"id": "m", "cap": 3},
                    {"id": "t", "role": "sink"}
                ],
                "edges": [
                    {"from": "s", "to": "m", "lo": 0, "hi": 10},
                    {"from": "m", "to": "t", "lo": 0, "hi": 10}
                ]
            }"#,
        )
        .unwrap();
        problem.validate().unwrap();
        problem
    }

    #[test]
    fn factory_solution_round_trips() {
        let problem = factory_problem();
        let report = planner::plan(&problem).unwrap();
        assert_eq!(verify_factory(&problem, &report), Vec::<String>::new());
    }

    #[test]
    fn factory_infeasible_report_round_trips() {
        let mut problem = factory_problem();
        problem
            .raw_supply_per_min
            .insert("iron_ore".to_string(), 30.0);
        let report = planner::plan(&problem).unwrap();
        assert!(matches!(report, FactoryReport::Infeasible { .. }));
        assert_eq!(verify_factory(&problem, &report), Vec::<String>::new());
    }

    #[test]
    fn factory_catches_broken_conservation() {
        let problem = factory_problem();
        let report = FactoryReport::Ok {
            per_recipe_crafts_per_min: [("smelt".to_string(), 45.0)].into(),
            per_machine_counts: [("furnace".to_string(), 1)].into(),
            raw_consumption_per_min: [("iron_ore".to_string(), 45.0)].into(),
        };
        let violations = verify_factory(&problem, &report);
        assert!(violations.iter().any(|v| v.contains("target 'iron'")));
    }

    #[test]
    fn factory_catches_wrong_machine_count() {
        let problem = factory_problem();
        let report = FactoryReport::Ok {
            per_recipe_crafts_per_min: [("smelt".to_string(), 60.0)].into(),
            per_machine_counts: [("furnace".to_string(), 3)].into(),
            raw_consumption_per_min: [("iron_ore".to_string(), 60.0)].into(),
        };
        let violations = verify_factory(&problem, &report);
        assert!(violations.iter().any(|v| v.contains("count")));
    }

    #[test]
    fn factory_catches_misreported_consumption() {
        let problem = factory_problem();
        let report = FactoryReport::Ok {
            per_recipe_crafts_per_min: [("smelt".to_string(), 60.0)].into(),
            per_machine_counts: [("furnace".to_string(), 1)].into(),
            raw_consumption_per_min: [("iron_ore".to_string(), 10.0)].into(),
        };
        let violations = verify_factory(&problem, &report);
        assert!(violations.iter().any(|v| v.contains("iron_ore")));
    }

    #[test]
    fn belts_solution_round_trips() {
        let problem = belts_problem();
        let report = throughput::solve(&problem).unwrap();
        assert_eq!(verify_belts(&problem, &report), Vec::<String>::new());
    }

    #[test]
    fn belts_infeasible_report_round_trips() {
        let mut problem = belts_problem();
        problem.edges[0].lo = 10.0;
        problem.edges[0].hi = 10.0;
        let report = throughput::solve(&problem).unwrap();
        assert!(matches!(report, BeltsReport::Infeasible { .. }));
        assert_eq!(verify_belts(&problem, &report), Vec::<String>::new());
    }

    #[test]
    fn belts_catches_bound_violations() {
        let problem = belts_problem();
        let report = BeltsReport::Ok {
            max_flow_per_min: 12.0,
            flows: vec![
                crate::belts::FlowEntry {
                    from: "s".to_string(),
                    to: "m".to_string(),
                    flow: 12.0,
                },
                crate::belts::FlowEntry {
                    from: "m".to_string(),
                    to: "t".to_string(),
                    flow: 12.0,
                },
            ],
        };
        let violations = verify_belts(&problem, &report);
        assert!(violations.iter().any(|v| v.contains("upper bound")));
        assert!(violations.iter().any(|v| v.contains("cap")));
    }

    #[test]
    fn belts_catches_unbalanced_node() {
        let problem = belts_problem();
        let report = BeltsReport::Ok {
            max_flow_per_min: 2.0,
            flows: vec![
                crate::belts::FlowEntry {
                    from: "s".to_string(),
                    to: "m".to_string(),
                    flow: 3.0,
                },
                crate::belts::FlowEntry {
                    from: "m".to_string(),
                    to: "t".to_string(),
                    flow: 2.0,
                },
            ],
        };
        let violations = verify_belts(&problem, &report);
        assert!(violations.iter().any(|v| v.contains("unbalanced")));
    }
}
