use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A factory planning instance, as read from the solver's stdin.
///
/// Maps deserialize into `BTreeMap` so every later iteration over recipes,
/// machines, or items runs in lexicographic order.
#[derive(Debug, Clone, Deserialize)]
pub struct FactoryProblem {
    pub target: Target,
    pub machines: BTreeMap<String, MachineClass>,
    pub recipes: BTreeMap<String, Recipe>,
    #[serde(default)]
    pub raw_supply_per_min: BTreeMap<String, f64>,
    /// Apply productivity modules to recipe outputs. The reference behavior
    /// parses `prod` but leaves outputs unchanged, so this defaults to off.
    #[serde(default)]
    pub apply_productivity: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub item: String,
    pub rate_per_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineClass {
    /// Nominal base crafts per minute of one machine
    pub crafts_per_min: f64,
    /// Fleet size limit; `null` or absent means unbounded
    #[serde(default)]
    pub max_machines: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub machine: String,
    /// Seconds per craft
    pub time_s: f64,
    #[serde(default, rename = "in")]
    pub inputs: BTreeMap<String, f64>,
    #[serde(default, rename = "out")]
    pub outputs: BTreeMap<String, f64>,
    #[serde(default)]
    pub modules: Option<ModuleLoadout>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleLoadout {
    /// Multiplies the effective crafting rate; must be >= -1
    #[serde(default)]
    pub speed: f64,
    /// Multiplies output quantities when `apply_productivity` is on
    #[serde(default)]
    pub prod: f64,
}

/// The solver's answer, written to stdout as a tagged JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FactoryReport {
    Ok {
        /// Crafts per minute for every recipe running above tolerance
        per_recipe_crafts_per_min: BTreeMap<String, f64>,
        /// Whole machines per class that realize the schedule
        per_machine_counts: BTreeMap<String, u64>,
        /// Net consumption per raw item
        raw_consumption_per_min: BTreeMap<String, f64>,
    },
    Infeasible {
        max_feasible_target: f64,
        bottlenecks: Vec<String>,
    },
}

impl Recipe {
    pub fn speed(&self) -> f64 {
        self.modules.as_ref().map_or(0.0, |m| m.speed)
    }

    pub fn prod(&self) -> f64 {
        self.modules.as_ref().map_or(0.0, |m| m.prod)
    }
}

impl FactoryProblem {
    /// Check the structural invariants of the instance. Violations are
    /// malformed input, not infeasibility.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.target.rate_per_min <= 0.0 {
            return Err(ModelError::NonPositiveTargetRate(self.target.rate_per_min));
        }

        for (class, spec) in &self.machines {
            if spec.crafts_per_min <= 0.0 {
                return Err(ModelError::NonPositiveCraftRate(
                    class.clone(),
                    spec.crafts_per_min,
                ));
            }
        }

        let mut target_produced = false;
        for (name, recipe) in &self.recipes {
            if !self.machines.contains_key(&recipe.machine) {
                return Err(ModelError::UnknownMachine {
                    recipe: name.clone(),
                    machine: recipe.machine.clone(),
                });
            }
            if recipe.time_s <= 0.0 {
                return Err(ModelError::NonPositiveCraftTime(name.clone(), recipe.time_s));
            }
            for (item, &qty) in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if qty < 0.0 {
                    return Err(ModelError::NegativeQuantity {
                        recipe: name.clone(),
                        item: item.clone(),
                    });
                }
            }
            if recipe.speed() < -1.0 {
                return Err(ModelError::SpeedBelowFloor(name.clone()));
            }
            if recipe.prod() < 0.0 {
                return Err(ModelError::NegativeProductivity(name.clone()));
            }
            if recipe.outputs.contains_key(&self.target.item) {
                target_produced = true;
            }
        }
        if !target_produced {
            return Err(ModelError::UnproducibleTarget(self.target.item.clone()));
        }

        for (item, &cap) in &self.raw_supply_per_min {
            if cap < 0.0 {
                return Err(ModelError::NegativeRawCap(item.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smelter_instance() -> FactoryProblem {
        serde_json::from_str(
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
        .expect("sample parses")
    }

    #[test]
    fn parses_and_validates_sample() {
        let problem = smelter_instance();
        assert!(problem.validate().is_ok());
        assert!(!problem.apply_productivity);
        assert_eq!(problem.machines["furnace"].max_machines, None);
        assert_eq!(problem.recipes["smelt"].inputs["iron_ore"], 1.0);
    }

    #[test]
    fn missing_modules_default_to_neutral() {
        let problem = smelter_instance();
        let recipe = &problem.recipes["smelt"];
        assert_eq!(recipe.speed(), 0.0);
        assert_eq!(recipe.prod(), 0.0);
    }

    #[test]
    fn rejects_unknown_machine() {
        let mut problem = smelter_instance();
        problem.recipes.get_mut("smelt").unwrap().machine = "lathe".to_string();
        assert!(matches!(
            problem.validate(),
            Err(ModelError::UnknownMachine { .. })
        ));
    }

    #[test]
    fn rejects_unproducible_target() {
        let mut problem = smelter_instance();
        problem.target.item = "copper".to_string();
        assert!(matches!(
            problem.validate(),
            Err(ModelError::UnproducibleTarget(_))
        ));
    }

    #[test]
    fn rejects_negative_cap() {
        let mut problem = smelter_instance();
        problem
            .raw_supply_per_min
            .insert("iron_ore".to_string(), -5.0);
        assert!(matches!(
            problem.validate(),
            Err(ModelError::NegativeRawCap(_))
        ));
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = FactoryReport::Infeasible {
            max_feasible_target: 30.0,
            bottlenecks: vec!["iron_ore supply".to_string()],
        };
        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains("\"status\":\"infeasible\""));
        let back: FactoryReport = serde_json::from_str(&text).unwrap();
        assert!(matches!(back, FactoryReport::Infeasible { .. }));
    }
}
