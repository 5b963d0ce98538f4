/// A linear program over continuous variables with implicit `x >= 0` bounds.
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names, fixing the column order of every coefficient vector
    pub variables: Vec<String>,
    /// Objective function
    pub objective: Objective,
    /// Constraint rows
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficient per variable, aligned with `LpProblem::variables`
    pub coefficients: Vec<f64>,
    pub sense: Sense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Label used in diagnostics
    pub name: String,
    /// Coefficient per variable, aligned with `LpProblem::variables`
    pub coefficients: Vec<f64>,
    pub op: ConstraintOp,
    /// Right-hand side
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl LpProblem {
    /// Create a program with a zero objective, minimized by default.
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                sense: Sense::Minimize,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, sense: Sense) {
        self.objective = Objective { coefficients, sense };
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<f64>,
        op: ConstraintOp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}
