//! Steady-state production planning as a linear program.
//!
//! One variable per recipe (crafts per minute), conservation rows per item,
//! capacity rows per finitely-capped machine class. A feasible instance is
//! answered with the minimum-machine schedule; an infeasible one is re-solved
//! with the target rate freed and maximized, which yields the achievable
//! ceiling and the binding resources.

use std::collections::{BTreeMap, BTreeSet};

use factorate_solver::{ConstraintOp, LpProblem, Sense, SolutionStatus, Solver};
use tracing::debug;

use crate::factory::{FactoryProblem, FactoryReport, Recipe};
use crate::ModelError;

/// Absolute tolerance for every rate handled by the planner.
pub const RATE_TOL: f64 = 1e-9;

/// Slack at or below this marks an inequality as binding.
const BINDING_TOL: f64 = 1e-7;

/// Per-recipe data the LP rows are assembled from, in lexicographic recipe
/// order so the column layout is reproducible.
struct FactoryModel<'a> {
    recipes: Vec<(&'a str, &'a Recipe)>,
    eff: Vec<f64>,
    prod_mult: Vec<f64>,
    items: BTreeSet<&'a str>,
    raw_items: BTreeSet<&'a str>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TargetMode {
    /// Hold the target at the requested rate and minimize machines
    Fixed,
    /// Free the target rate and maximize it
    MaximizeTarget,
}

/// Effective crafts per minute of one machine running `recipe`.
fn effective_crafts_per_min(problem: &FactoryProblem, recipe: &Recipe) -> f64 {
    let base = problem.machines[&recipe.machine].crafts_per_min;
    base * (1.0 + recipe.speed()) / recipe.time_s
}

fn analyze(problem: &FactoryProblem) -> FactoryModel<'_> {
    let mut recipes = Vec::with_capacity(problem.recipes.len());
    let mut eff = Vec::with_capacity(problem.recipes.len());
    let mut prod_mult = Vec::with_capacity(problem.recipes.len());
    let mut produced: BTreeSet<&str> = BTreeSet::new();
    let mut consumed: BTreeSet<&str> = BTreeSet::new();

    for (name, recipe) in &problem.recipes {
        recipes.push((name.as_str(), recipe));
        eff.push(effective_crafts_per_min(problem, recipe));
        prod_mult.push(if problem.apply_productivity {
            1.0 + recipe.prod()
        } else {
            1.0
        });
        produced.extend(recipe.outputs.keys().map(String::as_str));
        consumed.extend(recipe.inputs.keys().map(String::as_str));
    }

    let mut items: BTreeSet<&str> = &produced | &consumed;
    items.insert(problem.target.item.as_str());
    items.extend(problem.raw_supply_per_min.keys().map(String::as_str));

    let mut raw_items: BTreeSet<&str> =
        problem.raw_supply_per_min.keys().map(String::as_str).collect();
    raw_items.extend(consumed.difference(&produced));

    FactoryModel {
        recipes,
        eff,
        prod_mult,
        items,
        raw_items,
    }
}

fn build_program(model: &FactoryModel, problem: &FactoryProblem, mode: TargetMode) -> LpProblem {
    let mut variables: Vec<String> = model
        .recipes
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    if mode == TargetMode::MaximizeTarget {
        variables.push("(max target)".to_string());
    }
    let n_cols = variables.len();
    let n_recipes = model.recipes.len();

    let mut lp = LpProblem::new(variables);

    let mut objective = vec![0.0; n_cols];
    match mode {
        TargetMode::Fixed => {
            for (i, &eff) in model.eff.iter().enumerate() {
                if eff > RATE_TOL {
                    objective[i] = 1.0 / eff;
                }
            }
            lp.set_objective(objective, Sense::Minimize);
        }
        TargetMode::MaximizeTarget => {
            objective[n_cols - 1] = 1.0;
            lp.set_objective(objective, Sense::Maximize);
        }
    }

    // Conservation rows, one per item
    for &item in &model.items {
        let mut net = vec![0.0; n_cols];
        for (i, (_, recipe)) in model.recipes.iter().enumerate() {
            let out = recipe.outputs.get(item).copied().unwrap_or(0.0) * model.prod_mult[i];
            let inq = recipe.inputs.get(item).copied().unwrap_or(0.0);
            net[i] = out - inq;
        }

        if item == problem.target.item {
            match mode {
                TargetMode::Fixed => {
                    lp.add_constraint(
                        format!("target_balance_{item}"),
                        net,
                        ConstraintOp::Eq,
                        problem.target.rate_per_min,
                    );
                }
                TargetMode::MaximizeTarget => {
                    net[n_cols - 1] = -1.0;
                    lp.add_constraint(format!("target_balance_{item}"), net, ConstraintOp::Eq, 0.0);
                }
            }
        } else if model.raw_items.contains(item) {
            // Raws may be consumed freely up to their cap but never produced
            // on net.
            lp.add_constraint(
                format!("raw_no_net_production_{item}"),
                net.clone(),
                ConstraintOp::Le,
                0.0,
            );
            if let Some(&cap) = problem.raw_supply_per_min.get(item) {
                let consumption: Vec<f64> = net.iter().map(|v| -v).collect();
                lp.add_constraint(format!("raw_cap_{item}"), consumption, ConstraintOp::Le, cap);
            }
        } else {
            lp.add_constraint(format!("balance_{item}"), net, ConstraintOp::Eq, 0.0);
        }
    }

    // Capacity rows, one per finitely-capped machine class
    for (class, spec) in &problem.machines {
        let Some(cap) = spec.max_machines else {
            continue;
        };
        let mut usage = vec![0.0; n_cols];
        let mut used = false;
        for (i, (_, recipe)) in model.recipes.iter().enumerate() {
            if recipe.machine == *class && model.eff[i] > RATE_TOL {
                usage[i] = 1.0 / model.eff[i];
                used = true;
            }
        }
        if used {
            lp.add_constraint(
                format!("machine_cap_{class}"),
                usage,
                ConstraintOp::Le,
                cap as f64,
            );
        }
    }

    // A speed modifier of -1 stalls the machine entirely
    for i in 0..n_recipes {
        if model.eff[i] <= RATE_TOL {
            let mut row = vec![0.0; n_cols];
            row[i] = 1.0;
            lp.add_constraint(
                format!("stalled_{}", model.recipes[i].0),
                row,
                ConstraintOp::Eq,
                0.0,
            );
        }
    }

    lp
}

fn machine_usage<'a>(
    model: &FactoryModel<'a>,
    problem: &'a FactoryProblem,
    crafts: &[f64],
) -> BTreeMap<&'a str, f64> {
    let mut usage: BTreeMap<&str, f64> = problem
        .machines
        .keys()
        .map(|class| (class.as_str(), 0.0))
        .collect();
    for (i, (_, recipe)) in model.recipes.iter().enumerate() {
        if model.eff[i] > RATE_TOL {
            *usage.get_mut(recipe.machine.as_str()).expect("validated") +=
                crafts[i] / model.eff[i];
        }
    }
    usage
}

fn raw_consumption(model: &FactoryModel, crafts: &[f64]) -> BTreeMap<String, f64> {
    let mut consumption = BTreeMap::new();
    for &item in &model.raw_items {
        let mut net_in = 0.0;
        for (i, (_, recipe)) in model.recipes.iter().enumerate() {
            net_in += recipe.inputs.get(item).copied().unwrap_or(0.0) * crafts[i];
            net_in -=
                recipe.outputs.get(item).copied().unwrap_or(0.0) * model.prod_mult[i] * crafts[i];
        }
        if net_in < 0.0 && net_in > -RATE_TOL {
            net_in = 0.0;
        }
        consumption.insert(item.to_string(), net_in);
    }
    consumption
}

fn extract_schedule(
    model: &FactoryModel,
    problem: &FactoryProblem,
    crafts: &[f64],
) -> FactoryReport {
    let per_recipe_crafts_per_min: BTreeMap<String, f64> = model
        .recipes
        .iter()
        .zip(crafts)
        .filter(|(_, &x)| x > RATE_TOL)
        .map(|((name, _), &x)| (name.to_string(), x))
        .collect();

    let per_machine_counts: BTreeMap<String, u64> = machine_usage(model, problem, crafts)
        .into_iter()
        .map(|(class, usage)| {
            let count = (usage - RATE_TOL).ceil().max(0.0) as u64;
            (class.to_string(), count)
        })
        .collect();

    FactoryReport::Ok {
        per_recipe_crafts_per_min,
        per_machine_counts,
        raw_consumption_per_min: raw_consumption(model, crafts),
    }
}

/// Hints naming every resource that is binding at the fallback optimum.
fn bottleneck_hints(model: &FactoryModel, problem: &FactoryProblem, crafts: &[f64]) -> Vec<String> {
    let mut hints = Vec::new();

    let consumption = raw_consumption(model, crafts);
    for (item, &cap) in &problem.raw_supply_per_min {
        let used = consumption.get(item).copied().unwrap_or(0.0);
        if used + BINDING_TOL >= cap {
            hints.push(format!("{item} supply"));
        }
    }

    let usage = machine_usage(model, problem, crafts);
    for (class, spec) in &problem.machines {
        if let Some(cap) = spec.max_machines {
            if usage[class.as_str()] + BINDING_TOL >= cap as f64 {
                hints.push(format!("{class} cap"));
            }
        }
    }

    hints
}

fn fallback_max_target(
    model: &FactoryModel,
    problem: &FactoryProblem,
    solver: &Solver,
) -> Result<FactoryReport, ModelError> {
    let lp = build_program(model, problem, TargetMode::MaximizeTarget);
    let solution = solver.solve(&lp);
    debug!(status = ?solution.status, "solved max-target fallback");

    match solution.status {
        SolutionStatus::Optimal => {
            let n = model.recipes.len();
            let mut max_feasible_target = solution.values[n];
            if max_feasible_target < RATE_TOL {
                max_feasible_target = 0.0;
            }
            let bottlenecks = bottleneck_hints(model, problem, &solution.values[..n]);
            Ok(FactoryReport::Infeasible {
                max_feasible_target,
                bottlenecks,
            })
        }
        // The fallback always admits the all-zero schedule; a solver that
        // still reports infeasible has nothing better to offer than zero.
        SolutionStatus::Infeasible => Ok(FactoryReport::Infeasible {
            max_feasible_target: 0.0,
            bottlenecks: Vec::new(),
        }),
        SolutionStatus::Unbounded => Err(ModelError::UnboundedProgram),
        SolutionStatus::IterationLimit => Err(ModelError::IterationBudget),
    }
}

/// Solve a validated factory instance.
pub fn plan(problem: &FactoryProblem) -> Result<FactoryReport, ModelError> {
    let model = analyze(problem);
    let lp = build_program(&model, problem, TargetMode::Fixed);
    debug!(
        recipes = model.recipes.len(),
        items = model.items.len(),
        constraints = lp.num_constraints(),
        "built factory program"
    );

    let solver = Solver::new();
    let solution = solver.solve(&lp);
    match solution.status {
        SolutionStatus::Optimal => Ok(extract_schedule(&model, problem, &solution.values)),
        SolutionStatus::Infeasible => fallback_max_target(&model, problem, &solver),
        SolutionStatus::Unbounded => Err(ModelError::UnboundedProgram),
        SolutionStatus::IterationLimit => Err(ModelError::IterationBudget),
    }
}
