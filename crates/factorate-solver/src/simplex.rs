use crate::problem::{ConstraintOp, LpProblem, Sense};
use crate::solution::{Solution, SolutionStatus};

/// Two-phase tableau simplex for small dense linear programs.
///
/// Pivot selection is Dantzig's rule with ties broken by column index, and
/// the ratio test breaks ties by row index, so repeated solves of the same
/// problem take identical pivot sequences.
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the LP problem using the two-phase simplex method.
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let mut tableau = self.build_tableau(problem);

        // Phase 1: drive the artificial variables out of the basis
        if tableau.has_artificial && !self.phase1(&mut tableau) {
            return Solution::infeasible();
        }

        // Phase 2: optimize the real objective
        match self.phase2(&mut tableau) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Solution::unbounded(),
            SimplexResult::IterationLimit => return Solution::iteration_limit(),
        }

        self.extract_solution(&tableau, problem)
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for c in &problem.constraints {
            match c.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            has_artificial: n_artificial > 0,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, c) in problem.constraints.iter().enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = coef;
            }

            // The tableau requires a non-negative RHS
            let mut rhs = c.rhs;
            let mut flip = false;
            if rhs < 0.0 {
                rhs = -rhs;
                flip = true;
                for j in 0..n_vars {
                    tableau.data[i][j] = -tableau.data[i][j];
                }
            }
            tableau.data[i][total_cols - 1] = rhs;

            match c.op {
                ConstraintOp::Le => {
                    let sign = if flip { -1.0 } else { 1.0 };
                    tableau.data[i][slack_idx] = sign;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    let sign = if flip { 1.0 } else { -1.0 };
                    tableau.data[i][slack_idx] = sign; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Objective row. The tableau always maximizes, so minimization
        // negates the coefficients.
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = match problem.objective.sense {
                Sense::Minimize => -coef,
                Sense::Maximize => coef,
            };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau) -> bool {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        // Swap in the auxiliary objective: maximize -(sum of artificials)
        let orig_obj = tableau.data[n_constraints].clone();
        for j in 0..n_cols {
            tableau.data[n_constraints][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Cancel the -1 entries of the artificials that start out basic
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        for _ in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column(tableau, 0) else {
                break;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                // Unbounded auxiliary problem means the original is infeasible
                return false;
            };
            self.pivot(tableau, pivot_row, pivot_col);
        }

        // Any artificial still carrying value means no feasible point exists
        let rhs_col = n_cols - 1;
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > self.tolerance
            {
                return false;
            }
        }

        // Restore the real objective, expressed in the current basis
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            if tableau.data[n_constraints][basic].abs() > self.tolerance {
                let ratio = tableau.data[n_constraints][basic];
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        true
    }

    fn phase2(&self, tableau: &mut Tableau) -> SimplexResult {
        // Artificial columns must never re-enter the basis
        let exclude_from = tableau.n_vars + tableau.n_slack;

        for _ in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };
            self.pivot(tableau, pivot_row, pivot_col);
        }
        SimplexResult::IterationLimit
    }

    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;
        // Skip the RHS column, and the artificial columns when excluded
        let n_cols = if exclude_from > 0 {
            exclude_from
        } else {
            tableau.data[0].len() - 1
        };

        let mut max_val = self.tolerance;
        let mut max_col = None;
        for j in 0..n_cols {
            if tableau.data[obj_row][j] > max_val {
                max_val = tableau.data[obj_row][j];
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;
        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = tableau.data[i][rhs_col] / val;
                if ratio >= 0.0 && ratio < min_ratio {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }
        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor != 0.0 {
                    for j in 0..n_cols {
                        tableau.data[i][j] -= factor * tableau.data[row][j];
                    }
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            if basic < n_vars {
                values[basic] = tableau.data[i][rhs_col];
            }
        }

        let objective_value = values
            .iter()
            .zip(&problem.objective.coefficients)
            .map(|(v, c)| v * c)
            .sum();

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
        }
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    has_artificial: bool,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximization_with_upper_bounds() {
        // Maximize 3x + 2y subject to x + y <= 4, x <= 3, y <= 3.
        // Optimum at x=3, y=1 with objective 11.
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], Sense::Maximize);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 11.0).abs() < 1e-6);
    }

    #[test]
    fn minimization_with_lower_bound() {
        // Minimize 2x + 3y subject to x + y >= 4, x <= 3, y <= 3.
        // Optimum at x=3, y=1 with objective 9.
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], Sense::Minimize);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 9.0).abs() < 1e-6);
    }

    #[test]
    fn conflicting_bounds_are_infeasible() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], Sense::Minimize);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn chained_balance_equalities() {
        // Two conversion stages feeding a fixed demand: a = 2b, b = 10.
        // Mirrors an item-balance system with a zero-RHS row.
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![1.0, 1.0], Sense::Minimize);
        problem.add_constraint("balance", vec![1.0, -2.0], ConstraintOp::Eq, 0.0);
        problem.add_constraint("demand", vec![0.0, 1.0], ConstraintOp::Eq, 10.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 20.0).abs() < 1e-6);
        assert!((solution.values[1] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn unbounded_maximization() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 0.0], Sense::Maximize);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);
        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }
}
