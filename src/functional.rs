//! Differentiable scalar functions of several variables.
//!
//! A [`Functional`] packages an expression tree together with its variable
//! table and a compiled stack program. It can be evaluated at a point,
//! differentiated with respect to any of its variables (producing a new
//! `Functional` of the same arity), and asked for arbitrary-order mixed
//! partial derivatives through an order vector.
//!
//! Functionals come from two places:
//! - the built-in exchange-correlation library (see [`crate::functionals`]),
//!   constructed with [`Functional::define`] and the expression builders
//! - textual formulas parsed with [`Functional::parse`] /
//!   [`Functional::parse_with_vars`]
//!
//! # Example
//!
//! ```
//! use xcdiff::Functional;
//!
//! let f = Functional::parse("2*x + y^2").unwrap();
//! assert_eq!(f.eval(&[1.0, 2.0]).unwrap(), 6.0);                 // f(1, 2)
//! assert_eq!(f.gradient(&[1.0, 2.0]).unwrap(), vec![2.0, 4.0]);  // [∂/∂x, ∂/∂y]
//! assert_eq!(f.derv(&[1.0, 2.0], &[0, 2]).unwrap(), 2.0);        // ∂²f/∂y²
//! ```
//!
//! # Variable handling
//!
//! Variables are either extracted from a parsed formula and sorted
//! alphabetically (`parse`), or given explicitly in index order (`define`,
//! `parse_with_vars`). Evaluation points must follow that ordering.

use std::collections::{HashMap, HashSet};

use evalexpr::{build_operator_tree, Node, Operator};

use crate::convert::build_ast;
use crate::derv::{derv, derv_sequence, Differentiable};
use crate::errors::FunctionalError;
use crate::expr::Expr;
use crate::opt;
use crate::program::Program;
use colored::Colorize;
use itertools::Itertools;
use rayon::prelude::*;
use tracing::trace;

/// A scalar function of N real variables, compiled for evaluation and open
/// to exact differentiation with respect to any of its variables.
#[derive(Clone)]
pub struct Functional {
    name: String,
    ast: Box<Expr>,
    program: Program,
    var_map: HashMap<String, u32>,
    sorted_variables: Vec<String>,
}

impl std::fmt::Debug for Functional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Functional".cyan(), self.name)?;
        writeln!(
            f,
            "    {}: {:?}",
            "Variables".cyan(),
            self.sorted_variables
        )?;
        writeln!(f, "    {}: {}", "Formula".cyan(), self.ast)?;
        writeln!(f, "}}")?;
        Ok(())
    }
}

impl std::fmt::Display for Functional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({})",
            self.name.cyan(),
            self.sorted_variables.join(", ")
        )
    }
}

impl Functional {
    /// Creates a functional from a textual formula.
    ///
    /// Variable names are extracted from the formula and sorted
    /// alphabetically; evaluation points must use that order. Use
    /// [`parse_with_vars`](Self::parse_with_vars) for explicit control.
    ///
    /// # Example
    /// ```
    /// # use xcdiff::Functional;
    /// let f = Functional::parse("2*x + y^2").unwrap();
    /// assert_eq!(f.eval(&[1.0, 2.0]).unwrap(), 6.0); // x=1, y=2
    /// ```
    pub fn parse(expression: &str) -> Result<Self, FunctionalError> {
        let node = build_operator_tree(expression)?;
        let variables = extract_symbols(&node);
        Self::build(&variables, expression)
    }

    /// Creates a functional from a textual formula with an explicit variable
    /// ordering: `variables[i]` is the variable at index *i* of the
    /// evaluation point.
    ///
    /// # Example
    /// ```
    /// # use xcdiff::Functional;
    /// let f = Functional::parse_with_vars("2*x + y^2", &["y", "x"]).unwrap();
    /// assert_eq!(f.eval(&[2.0, 1.0]).unwrap(), 6.0); // y=2, x=1
    /// ```
    pub fn parse_with_vars(expression: &str, variables: &[&str]) -> Result<Self, FunctionalError> {
        let var_map: HashMap<String, u32> = variables
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index as u32))
            .collect();
        Self::build(&var_map, expression)
    }

    /// Creates a functional from an expression built in Rust.
    ///
    /// The closure receives one [`Expr`] per variable name, indexed in
    /// declaration order. This is how the built-in functional library is
    /// constructed:
    ///
    /// ```
    /// use xcdiff::Functional;
    ///
    /// let f = Functional::define("harmonic", ["x", "y"], |[x, y]| {
    ///     0.5 * (x.powi(2) + y.powi(2))
    /// });
    /// assert_eq!(f.eval(&[1.0, 2.0]).unwrap(), 2.5);
    /// ```
    pub fn define<const N: usize>(
        name: impl Into<String>,
        variables: [&str; N],
        build: impl FnOnce([Expr; N]) -> Expr,
    ) -> Functional {
        let var_map: HashMap<String, u32> = variables
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index as u32))
            .collect();
        let ast = build(Expr::vars(variables));
        Self::from_ast(name.into(), *ast.simplify(), var_map)
    }

    /// Core builder for the parsing constructors: validates the variable
    /// table against the formula, converts the parse tree and compiles.
    fn build(variables: &HashMap<String, u32>, expression: &str) -> Result<Self, FunctionalError> {
        let node = build_operator_tree(expression)?;

        let mut non_defined_variables = HashSet::new();
        for variable in extract_symbols(&node).keys() {
            if !variables.contains_key(variable) {
                non_defined_variables.insert(variable.clone());
            }
        }
        if !non_defined_variables.is_empty() {
            return Err(FunctionalError::VariableNotFound(
                non_defined_variables
                    .into_iter()
                    .collect::<Vec<String>>()
                    .join(", "),
            ));
        }

        let ast = build_ast(&node, variables)?;
        Ok(Self::from_ast(
            expression.to_string(),
            *ast.simplify(),
            variables.clone(),
        ))
    }

    fn from_ast(name: String, ast: Expr, var_map: HashMap<String, u32>) -> Functional {
        let sorted_variables: Vec<String> = var_map
            .iter()
            .sorted_by_key(|(_, &index)| index)
            .map(|(variable, _)| variable.clone())
            .collect();
        let program = opt::optimize(Program::compile(&ast));
        Functional {
            name,
            ast: Box::new(ast),
            program,
            var_map,
            sorted_variables,
        }
    }

    /// Evaluates the functional at the given point.
    ///
    /// # Errors
    /// `InvalidInputLength` if the point length does not match the number of
    /// variables; a domain `EvalError` if the point lies outside the domain
    /// of the formula.
    pub fn eval(&self, values: &[f64]) -> Result<f64, FunctionalError> {
        self.validate_input_length(values)?;
        Ok(self.program.run(values)?)
    }

    /// Returns the partial derivative with respect to a named variable, as a
    /// new functional of the same arity and variable table.
    pub fn partial(&self, variable: &str) -> Result<Functional, FunctionalError> {
        if !self.var_map.contains_key(variable) {
            return Err(FunctionalError::VariableNotFound(variable.to_string()));
        }
        trace!(functional = %self.name, variable, "differentiating");
        let derivative = self.ast.derivative(variable).simplify();
        Ok(Self::from_ast(
            self.name.clone(),
            *derivative,
            self.var_map.clone(),
        ))
    }

    /// Returns the partial derivative with respect to the variable at the
    /// given index of the evaluation point.
    pub fn partial_at(&self, index: usize) -> Result<Functional, FunctionalError> {
        let variable =
            self.sorted_variables
                .get(index)
                .ok_or(FunctionalError::VariableIndexOutOfRange {
                    index,
                    arity: self.sorted_variables.len(),
                })?;
        self.partial(variable)
    }

    /// Differentiates once with respect to each listed variable, in order.
    ///
    /// # Example
    /// ```
    /// # use xcdiff::Functional;
    /// let f = Functional::parse("x^2 * y^2").unwrap();
    /// let dxdy = f.derive_wrt(&["x", "y"]).unwrap();
    /// assert_eq!(dxdy.eval(&[2.0, 3.0]).unwrap(), 24.0); // 4xy
    /// ```
    pub fn derive_wrt(&self, variables: &[&str]) -> Result<Functional, FunctionalError> {
        let mut non_defined_variables = HashSet::new();
        for variable in variables {
            if !self.var_map.contains_key(*variable) {
                non_defined_variables.insert(variable.to_string());
            }
        }
        if !non_defined_variables.is_empty() {
            return Err(FunctionalError::VariableNotFound(
                non_defined_variables
                    .into_iter()
                    .collect::<Vec<String>>()
                    .join(", "),
            ));
        }

        let mut stage = self.clone();
        for variable in variables {
            stage = stage.partial(variable)?;
        }
        Ok(stage)
    }

    /// Evaluates the mixed partial derivative described by an order vector:
    /// `orders[i]` is the number of times to differentiate with respect to
    /// variable *i* before evaluating at `point`.
    ///
    /// # Example
    /// ```
    /// # use xcdiff::Functional;
    /// let f = Functional::parse("x^2 * y^2").unwrap();
    /// assert_eq!(f.derv(&[2.0, 3.0], &[1, 1]).unwrap(), 24.0); // ∂²f/∂x∂y
    /// ```
    pub fn derv(&self, point: &[f64], orders: &[usize]) -> Result<f64, FunctionalError> {
        derv(self, point, orders)
    }

    /// Computes all first order partial derivatives at the given point, in
    /// variable order.
    pub fn gradient(&self, values: &[f64]) -> Result<Vec<f64>, FunctionalError> {
        self.validate_input_length(values)?;
        self.sorted_variables
            .iter()
            .map(|variable| self.partial(variable).and_then(|d| d.eval(values)))
            .collect()
    }

    /// Computes the matrix of second order partial derivatives at the given
    /// point, in variable order.
    pub fn hessian(&self, values: &[f64]) -> Result<Vec<Vec<f64>>, FunctionalError> {
        self.validate_input_length(values)?;
        self.sorted_variables
            .iter()
            .map(|row_variable| {
                let first = self.partial(row_variable)?;
                self.sorted_variables
                    .iter()
                    .map(|col_variable| first.partial(col_variable).and_then(|d| d.eval(values)))
                    .collect::<Result<Vec<f64>, FunctionalError>>()
            })
            .collect()
    }

    /// Evaluates the functional at many independent points in parallel.
    pub fn eval_batch(&self, points: &[Vec<f64>]) -> Result<Vec<f64>, FunctionalError> {
        points.par_iter().map(|point| self.eval(point)).collect()
    }

    /// Evaluates one mixed partial derivative at many independent points in
    /// parallel.
    ///
    /// The differentiation pipeline is built once and its final stage shared
    /// across all points, which is observably equivalent to calling
    /// [`derv`](Self::derv) per point.
    pub fn derv_batch(
        &self,
        points: &[Vec<f64>],
        orders: &[usize],
    ) -> Result<Vec<f64>, FunctionalError> {
        if orders.len() != self.arity() {
            return Err(FunctionalError::InvalidOrderLength {
                expected: self.arity(),
                got: orders.len(),
            });
        }

        let mut stage = self.clone();
        for variable in derv_sequence(orders) {
            stage = stage.partial_at(variable)?;
        }
        points.par_iter().map(|point| stage.eval(point)).collect()
    }

    /// Returns the functional's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of input variables.
    pub fn arity(&self) -> usize {
        self.sorted_variables.len()
    }

    /// Returns the map of variable names to their indices.
    pub fn variables(&self) -> &HashMap<String, u32> {
        &self.var_map
    }

    /// Returns the variables in index order.
    pub fn sorted_variables(&self) -> &[String] {
        &self.sorted_variables
    }

    /// Returns the expression tree.
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Validates that the input length matches the number of variables.
    fn validate_input_length(&self, values: &[f64]) -> Result<(), FunctionalError> {
        if values.len() != self.sorted_variables.len() {
            return Err(FunctionalError::InvalidInputLength {
                expected: self.sorted_variables.len(),
                got: values.len(),
            });
        }
        Ok(())
    }
}

impl Differentiable for Functional {
    fn arity(&self) -> usize {
        self.arity()
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64, FunctionalError> {
        self.eval(point)
    }

    fn partial(&self, index: usize) -> Result<Self, FunctionalError> {
        self.partial_at(index)
    }
}

/// Extracts variables from a parsed formula and assigns them indices in
/// alphabetical order.
pub fn extract_symbols(node: &Node) -> HashMap<String, u32> {
    let mut symbols = HashSet::new();
    extract_symbols_from_node(node, &mut symbols);

    let mut symbols: Vec<String> = symbols.into_iter().collect();
    symbols.sort();

    symbols
        .into_iter()
        .enumerate()
        .map(|(index, variable)| (variable, index as u32))
        .collect()
}

/// Recursively collects variable names from a parse tree node.
fn extract_symbols_from_node(node: &Node, symbols: &mut HashSet<String>) {
    match node.operator() {
        Operator::VariableIdentifierRead { identifier } => {
            symbols.insert(identifier.to_string());
        }
        _ => {
            for child in node.children() {
                extract_symbols_from_node(child, symbols);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert_eq!(f.eval(&[1.0, 2.0]).unwrap(), 6.0);
    }

    #[test]
    fn test_eval_invalid_length() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert!(matches!(
            f.eval(&[1.0]),
            Err(FunctionalError::InvalidInputLength {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_gradient() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert_eq!(f.gradient(&[1.0, 2.0]).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_hessian() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert_eq!(
            f.hessian(&[1.0, 2.0]).unwrap(),
            vec![vec![0.0, 0.0], vec![0.0, 2.0]]
        );
    }

    #[test]
    fn test_partial() {
        let f = Functional::parse("2*x + y^2").unwrap();
        let dx = f.partial("x").unwrap();
        assert_eq!(dx.eval(&[1.0, 2.0]).unwrap(), 2.0);
        let dy = f.partial_at(1).unwrap();
        assert_eq!(dy.eval(&[1.0, 2.0]).unwrap(), 4.0);
    }

    #[test]
    fn test_partial_unknown_variable() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert!(matches!(
            f.partial("z"),
            Err(FunctionalError::VariableNotFound(_))
        ));
        assert!(matches!(
            f.partial_at(2),
            Err(FunctionalError::VariableIndexOutOfRange { index: 2, arity: 2 })
        ));
    }

    #[test]
    fn test_derive_wrt() {
        let f = Functional::parse("x^2 * y^2").unwrap();
        let dxdy = f.derive_wrt(&["x", "y"]).unwrap();
        assert_eq!(dxdy.eval(&[2.0, 3.0]).unwrap(), 24.0);
    }

    #[test]
    fn test_derive_wrt_invalid() {
        let f = Functional::parse("x^2 * y^2").unwrap();
        assert!(matches!(
            f.derive_wrt(&["x", "z"]),
            Err(FunctionalError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_mixed_partials_commute() {
        let f = Functional::parse("exp(x) * ln(y) + x^3 * y^2").unwrap();
        let point = [0.7, 1.3];
        let xy = f.derive_wrt(&["x", "y"]).unwrap().eval(&point).unwrap();
        let yx = f.derive_wrt(&["y", "x"]).unwrap().eval(&point).unwrap();
        assert!((xy - yx).abs() < 1e-12, "xy = {xy}, yx = {yx}");
    }

    #[test]
    fn test_parse_with_vars() {
        let f = Functional::parse_with_vars("2*x + y^2", &["y", "x"]).unwrap();
        assert_eq!(f.eval(&[2.0, 1.0]).unwrap(), 6.0);
        assert_eq!(f.sorted_variables(), ["y", "x"]);
    }

    #[test]
    fn test_parse_with_vars_invalid() {
        assert!(matches!(
            Functional::parse_with_vars("2*x + y^2", &["x", "z"]),
            Err(FunctionalError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_define() {
        let f = Functional::define("quartic", ["x", "y"], |[x, y]| {
            (x.powi(2) + y.powi(2)).powi(2)
        });
        assert_eq!(f.name(), "quartic");
        assert_eq!(f.arity(), 2);
        assert_eq!(f.eval(&[1.0, 1.0]).unwrap(), 4.0);
        // d/dx (x²+y²)² = 4x(x²+y²)
        assert_eq!(f.partial("x").unwrap().eval(&[1.0, 1.0]).unwrap(), 8.0);
    }

    #[test]
    fn test_batch_evaluation() {
        let f = Functional::parse("x^2 * y").unwrap();
        let points = vec![vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 4.0]];
        assert_eq!(f.eval_batch(&points).unwrap(), vec![2.0, 12.0, 36.0]);
        // ∂/∂x (x²y) = 2xy
        assert_eq!(
            f.derv_batch(&points, &[1, 0]).unwrap(),
            vec![4.0, 12.0, 24.0]
        );
    }

    #[test]
    fn test_extract_symbols_sorted() {
        let node = build_operator_tree("z + x^2 + y").unwrap();
        let symbols = extract_symbols(&node);
        assert_eq!(symbols["x"], 0);
        assert_eq!(symbols["y"], 1);
        assert_eq!(symbols["z"], 2);
    }

    #[test]
    fn test_display_and_debug() {
        let f = Functional::parse("2*x + y^2").unwrap();
        let display = format!("{f}");
        assert!(display.contains("2*x + y^2"));
        let debug = format!("{f:?}");
        assert!(debug.contains("Variables"));
    }
}
