//! Conversion of evalexpr parse trees into the internal expression AST.
//!
//! Custom functionals can be supplied as textual formulas (see
//! [`Functional::parse`](crate::functional::Functional::parse)); this module
//! maps the parsed operator tree onto [`Expr`]. Variables are resolved
//! against a name-to-index table, `^` becomes an integer power, a
//! real-constant power or an expression power depending on its exponent, and
//! the function calls understood by the differentiation engine (`abs`, `ln`,
//! `log`, `sqrt`, `exp`, `sin`, `cos`, `atan`, `asinh`) are mapped onto their
//! AST nodes.

use std::collections::HashMap;

use crate::{
    errors::ConvertError,
    expr::{Expr, VarRef},
};
use evalexpr::{Node, Operator};

/// Converts an evalexpr AST node into the internal expression representation.
///
/// # Arguments
/// * `node` - The evalexpr AST node to convert
/// * `var_map` - A mapping of variable names to their indices in the input
///   slice
///
/// # Returns
/// * `Result<Expr, ConvertError>` - The converted expression or an error if
///   the tree uses an operator or function the engine cannot differentiate
pub fn build_ast(node: &Node, var_map: &HashMap<String, u32>) -> Result<Expr, ConvertError> {
    match node.operator() {
        // Addition combines multiple children into a series of binary Adds
        Operator::Add => {
            let children = node.children();
            children
                .iter()
                .skip(1)
                .try_fold(build_ast(&children[0], var_map)?, |acc, child| {
                    Ok(Expr::Add(
                        Box::new(acc),
                        Box::new(build_ast(child, var_map)?),
                    ))
                })
        }
        // Multiplication combines multiple children into a series of binary Muls
        Operator::Mul => {
            let children = node.children();
            children.iter().skip(1).try_fold(
                build_ast(&children[0], var_map)?,
                |acc, child| -> Result<Expr, ConvertError> {
                    Ok(Expr::Mul(
                        Box::new(acc),
                        Box::new(build_ast(child, var_map)?),
                    ))
                },
            )
        }
        Operator::Div => {
            let children = node.children();
            Ok(Expr::Div(
                Box::new(build_ast(&children[0], var_map)?),
                Box::new(build_ast(&children[1], var_map)?),
            ))
        }
        Operator::Sub => {
            let children = node.children();
            Ok(Expr::Sub(
                Box::new(build_ast(&children[0], var_map)?),
                Box::new(build_ast(&children[1], var_map)?),
            ))
        }
        // Constant value - must be numeric
        Operator::Const { value } => match value {
            evalexpr::Value::Float(f) => Ok(Expr::Const(*f)),
            evalexpr::Value::Int(i) => Ok(Expr::Const(*i as f64)),
            _ => Err(ConvertError::ConstOperator(format!(
                "Expected numeric constant: {:?}",
                value
            ))),
        },
        // Variable reference - looks up the variable's index in var_map
        Operator::VariableIdentifierRead { identifier } => {
            let index = var_map
                .get(identifier.as_str())
                .ok_or(ConvertError::VariableNotFound(format!(
                    "Variable not found: {:?}",
                    identifier
                )))?;
            Ok(Expr::Var(VarRef {
                name: identifier.to_string(),
                index: *index,
            }))
        }
        Operator::Neg => {
            let children = node.children();
            Ok(Expr::Neg(Box::new(build_ast(&children[0], var_map)?)))
        }
        // Function calls understood by the differentiation engine
        Operator::FunctionIdentifier { identifier } => {
            let children = node.children();
            let argument = Box::new(build_ast(&children[0], var_map)?);
            match identifier.as_str() {
                "abs" => Ok(Expr::Abs(argument)),
                "ln" => Ok(Expr::Ln(argument)),
                "log" => Ok(Expr::Ln(argument)),
                "sqrt" => Ok(Expr::Sqrt(argument)),
                "exp" => Ok(Expr::Exp(argument)),
                "sin" => Ok(Expr::Sin(argument)),
                "cos" => Ok(Expr::Cos(argument)),
                "atan" => Ok(Expr::Atan(argument)),
                "asinh" => Ok(Expr::Asinh(argument)),
                _ => Err(ConvertError::UnsupportedFunction(format!(
                    "Unsupported function: {:?}",
                    identifier
                ))),
            }
        }
        // Root node - should have exactly one child
        Operator::RootNode => {
            let children = node.children();
            if children.len() == 1 {
                build_ast(&children[0], var_map)
            } else {
                Err(ConvertError::RootNode(format!(
                    "Expected single child for root node: {:?}",
                    children
                )))
            }
        }

        // Exponentiation: the exponent decides which power node is built
        Operator::Exp => {
            let children = node.children();
            if children.len() != 2 {
                return Err(ConvertError::UnsupportedOperator(format!(
                    "Expected 2 children for Exp operator: {:?}",
                    children
                )));
            }

            let base = Box::new(build_ast(&children[0], var_map)?);
            match children[1].operator() {
                Operator::Const {
                    value: evalexpr::Value::Int(exp),
                } => Ok(Expr::Pow(base, *exp)),
                Operator::Const {
                    value: evalexpr::Value::Float(exp),
                } => Ok(Expr::PowFloat(base, *exp)),
                _ => Ok(Expr::PowExpr(
                    base,
                    Box::new(build_ast(&children[1], var_map)?),
                )),
            }
        }
        // Any other operator is unsupported
        _ => Err(ConvertError::UnsupportedOperator(format!(
            "Unsupported operator: {:?}",
            node.operator()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalexpr::build_operator_tree;

    fn var_map(names: &[&str]) -> HashMap<String, u32> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32))
            .collect()
    }

    #[test]
    fn test_build_ast_arithmetic() {
        let node = build_operator_tree("2*x + y^2").unwrap();
        let ast = build_ast(&node, &var_map(&["x", "y"])).unwrap();
        assert_eq!(
            ast,
            Expr::Add(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(2.0)),
                    Box::new(Expr::var("x", 0))
                )),
                Box::new(Expr::Pow(Box::new(Expr::var("y", 1)), 2)),
            )
        );
    }

    #[test]
    fn test_build_ast_functions() {
        let node = build_operator_tree("atan(x) + asinh(sqrt(x))").unwrap();
        let ast = build_ast(&node, &var_map(&["x"])).unwrap();
        assert_eq!(
            ast,
            Expr::Add(
                Box::new(Expr::Atan(Box::new(Expr::var("x", 0)))),
                Box::new(Expr::Asinh(Box::new(Expr::Sqrt(Box::new(Expr::var(
                    "x", 0
                )))))),
            )
        );
    }

    #[test]
    fn test_build_ast_real_exponent() {
        let node = build_operator_tree("x^1.5").unwrap();
        let ast = build_ast(&node, &var_map(&["x"])).unwrap();
        assert_eq!(ast, Expr::PowFloat(Box::new(Expr::var("x", 0)), 1.5));
    }

    #[test]
    fn test_build_ast_unknown_function() {
        let node = build_operator_tree("tanh(x)").unwrap();
        let err = build_ast(&node, &var_map(&["x"])).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFunction(_)));
    }

    #[test]
    fn test_build_ast_unknown_variable() {
        let node = build_operator_tree("x + z").unwrap();
        let err = build_ast(&node, &var_map(&["x"])).unwrap_err();
        assert!(matches!(err, ConvertError::VariableNotFound(_)));
    }
}
