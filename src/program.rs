//! Flattened stack programs and their interpreter.
//!
//! Expression trees are compiled once into a linear sequence of stack-based
//! operations and then evaluated with a small interpreter. Flattening
//! eliminates tree traversal from the evaluation hot path and gives the
//! peephole optimizer (see `opt`) a convenient form to work on.
//!
//! The interpreter is also where the lazy domain checks live: a logarithm of
//! a non-positive value, a negative square root, a division by zero or an
//! undefined power is reported as a typed [`EvalError`] at the operation that
//! failed, never folded into a NaN result.

use crate::errors::EvalError;
use crate::expr::Expr;

/// Linear operation for flattened expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum LinearOp {
    /// Load constant value
    LoadConst(f64),
    /// Load variable by index
    LoadVar(u32),
    /// Add the two top stack values
    Add,
    /// Subtract the two top stack values
    Sub,
    /// Multiply the two top stack values
    Mul,
    /// Divide the two top stack values
    Div,
    /// Absolute value of stack top
    Abs,
    /// Negate stack top
    Neg,
    /// Power operation with integer constant exponent
    PowConst(i64),
    /// Power operation with floating point constant exponent
    PowFloat(f64),
    /// Power operation with expression exponent
    PowExpr,
    /// Exponential of stack top
    Exp,
    /// Natural log of stack top
    Ln,
    /// Square root of stack top
    Sqrt,
    /// Sine of stack top (argument in radians)
    Sin,
    /// Cosine of stack top (argument in radians)
    Cos,
    /// Arctangent of stack top
    Atan,
    /// Inverse hyperbolic sine of stack top
    Asinh,
    /// a × b + c  (fused)
    Fma,
    /// a × b − c  (fused)
    Fmsub,
}

/// A compiled expression: a linear sequence of stack operations.
#[derive(Debug, Clone)]
pub struct Program {
    /// Linear sequence of operations
    pub ops: Vec<LinearOp>,
    /// Maximum variable index accessed
    pub max_var_index: Option<u32>,
    /// Pre-computed result if the whole expression is constant
    pub constant_result: Option<f64>,
}

impl Program {
    /// Compiles an expression tree into a flat stack program.
    pub fn compile(expr: &Expr) -> Program {
        let mut ops = Vec::new();
        let mut max_var_index = None;
        flatten(expr, &mut ops, &mut max_var_index);

        let constant_result = match ops.as_slice() {
            [LinearOp::LoadConst(c)] => Some(*c),
            _ => None,
        };

        Program {
            ops,
            max_var_index,
            constant_result,
        }
    }

    /// Runs the program against one evaluation point.
    ///
    /// The stack is balanced by construction: every opcode pops its operands
    /// and pushes exactly one result, and compilation emits operands before
    /// their consumer.
    pub fn run(&self, values: &[f64]) -> Result<f64, EvalError> {
        if let Some(constant) = self.constant_result {
            return Ok(constant);
        }
        if let Some(index) = self.max_var_index {
            if values.len() <= index as usize {
                return Err(EvalError::MissingVariable {
                    index,
                    got: values.len(),
                });
            }
        }

        let mut stack: Vec<f64> = Vec::with_capacity(16);
        for op in &self.ops {
            match op {
                LinearOp::LoadConst(c) => stack.push(*c),
                LinearOp::LoadVar(index) => stack.push(values[*index as usize]),

                LinearOp::Add => {
                    let r = stack.pop().unwrap();
                    let l = stack.pop().unwrap();
                    stack.push(l + r);
                }
                LinearOp::Sub => {
                    let r = stack.pop().unwrap();
                    let l = stack.pop().unwrap();
                    stack.push(l - r);
                }
                LinearOp::Mul => {
                    let r = stack.pop().unwrap();
                    let l = stack.pop().unwrap();
                    stack.push(l * r);
                }
                LinearOp::Div => {
                    let r = stack.pop().unwrap();
                    let l = stack.pop().unwrap();
                    if r == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    stack.push(l / r);
                }
                LinearOp::Abs => {
                    let v = stack.pop().unwrap();
                    stack.push(v.abs());
                }
                LinearOp::Neg => {
                    let v = stack.pop().unwrap();
                    stack.push(-v);
                }

                LinearOp::PowConst(exp) => {
                    let base = stack.pop().unwrap();
                    if base == 0.0 && *exp < 0 {
                        return Err(EvalError::ZeroToNegativePower(*exp as f64));
                    }
                    stack.push(base.powi(*exp as i32));
                }
                LinearOp::PowFloat(exp) => {
                    let base = stack.pop().unwrap();
                    stack.push(checked_powf(base, *exp)?);
                }
                LinearOp::PowExpr => {
                    let exp = stack.pop().unwrap();
                    let base = stack.pop().unwrap();
                    stack.push(checked_powf(base, exp)?);
                }

                LinearOp::Exp => {
                    let v = stack.pop().unwrap();
                    stack.push(v.exp());
                }
                LinearOp::Ln => {
                    let v = stack.pop().unwrap();
                    if v <= 0.0 {
                        return Err(EvalError::LogNonPositive(v));
                    }
                    stack.push(v.ln());
                }
                LinearOp::Sqrt => {
                    let v = stack.pop().unwrap();
                    if v < 0.0 {
                        return Err(EvalError::SqrtNegative(v));
                    }
                    stack.push(v.sqrt());
                }
                LinearOp::Sin => {
                    let v = stack.pop().unwrap();
                    stack.push(v.sin());
                }
                LinearOp::Cos => {
                    let v = stack.pop().unwrap();
                    stack.push(v.cos());
                }
                LinearOp::Atan => {
                    let v = stack.pop().unwrap();
                    stack.push(v.atan());
                }
                LinearOp::Asinh => {
                    let v = stack.pop().unwrap();
                    stack.push(v.asinh());
                }

                LinearOp::Fma => {
                    let c = stack.pop().unwrap();
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a.mul_add(b, c));
                }
                LinearOp::Fmsub => {
                    let c = stack.pop().unwrap();
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a.mul_add(b, -c));
                }
            }
        }

        Ok(stack.pop().unwrap())
    }
}

/// Real power with the domain checks IEEE `powf` would paper over.
fn checked_powf(base: f64, exp: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exp < 0.0 {
        return Err(EvalError::ZeroToNegativePower(exp));
    }
    if base < 0.0 && exp.fract() != 0.0 {
        return Err(EvalError::FractionalPowOfNegative {
            base,
            exponent: exp,
        });
    }
    Ok(base.powf(exp))
}

/// Recursively flattens an expression into linear operations.
fn flatten(expr: &Expr, ops: &mut Vec<LinearOp>, max_var_index: &mut Option<u32>) {
    match expr {
        Expr::Const(val) => ops.push(LinearOp::LoadConst(*val)),

        Expr::Var(var_ref) => {
            let index = var_ref.index;
            *max_var_index = Some(max_var_index.unwrap_or(0).max(index));
            ops.push(LinearOp::LoadVar(index));
        }

        Expr::Add(left, right) => {
            flatten(left, ops, max_var_index);
            flatten(right, ops, max_var_index);
            ops.push(LinearOp::Add);
        }
        Expr::Sub(left, right) => {
            flatten(left, ops, max_var_index);
            flatten(right, ops, max_var_index);
            ops.push(LinearOp::Sub);
        }
        Expr::Mul(left, right) => {
            flatten(left, ops, max_var_index);
            flatten(right, ops, max_var_index);
            ops.push(LinearOp::Mul);
        }
        Expr::Div(left, right) => {
            flatten(left, ops, max_var_index);
            flatten(right, ops, max_var_index);
            ops.push(LinearOp::Div);
        }

        Expr::Abs(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Abs);
        }
        Expr::Neg(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Neg);
        }

        Expr::Pow(base, exp) => {
            flatten(base, ops, max_var_index);
            ops.push(LinearOp::PowConst(*exp));
        }
        Expr::PowFloat(base, exp) => {
            flatten(base, ops, max_var_index);
            ops.push(LinearOp::PowFloat(*exp));
        }
        Expr::PowExpr(base, exponent) => {
            flatten(base, ops, max_var_index);
            flatten(exponent, ops, max_var_index);
            ops.push(LinearOp::PowExpr);
        }

        Expr::Exp(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Exp);
        }
        Expr::Ln(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Ln);
        }
        Expr::Sqrt(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Sqrt);
        }
        Expr::Sin(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Sin);
        }
        Expr::Cos(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Cos);
        }
        Expr::Atan(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Atan);
        }
        Expr::Asinh(inner) => {
            flatten(inner, ops, max_var_index);
            ops.push(LinearOp::Asinh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvalError;
    use crate::expr::Expr;

    #[test]
    fn test_run_arithmetic() {
        let [x, y] = Expr::vars(["x", "y"]);
        let f = 2.0 * x + y.powi(2);
        let program = Program::compile(&f);
        assert_eq!(program.run(&[1.0, 2.0]).unwrap(), 6.0);
        assert_eq!(program.max_var_index, Some(1));
    }

    #[test]
    fn test_run_transcendentals() {
        let [x] = Expr::vars(["x"]);
        let f = x.clone().sqrt().ln() + x.clone().atan() + x.asinh();
        let program = Program::compile(&f);
        let got = program.run(&[2.0]).unwrap();
        let want = 2.0_f64.sqrt().ln() + 2.0_f64.atan() + 2.0_f64.asinh();
        assert_eq!(got, want);
    }

    #[test]
    fn test_constant_program() {
        let f = *(Expr::constant(2.0) + Expr::constant(3.0)).simplify();
        let program = Program::compile(&f);
        assert_eq!(program.constant_result, Some(5.0));
        assert_eq!(program.run(&[]).unwrap(), 5.0);
    }

    #[test]
    fn test_domain_errors() {
        let [x] = Expr::vars(["x"]);

        let program = Program::compile(&x.clone().ln());
        assert_eq!(
            program.run(&[-1.0]).unwrap_err(),
            EvalError::LogNonPositive(-1.0)
        );

        let program = Program::compile(&x.clone().sqrt());
        assert_eq!(
            program.run(&[-4.0]).unwrap_err(),
            EvalError::SqrtNegative(-4.0)
        );

        let program = Program::compile(&(1.0 / x.clone()));
        assert_eq!(program.run(&[0.0]).unwrap_err(), EvalError::DivisionByZero);

        let program = Program::compile(&x.clone().powf(1.0 / 3.0));
        assert!(matches!(
            program.run(&[-8.0]).unwrap_err(),
            EvalError::FractionalPowOfNegative { .. }
        ));

        let program = Program::compile(&x.clone().powi(-2));
        assert!(matches!(
            program.run(&[0.0]).unwrap_err(),
            EvalError::ZeroToNegativePower(_)
        ));

        // integer-valued real exponents of negative bases are fine
        let program = Program::compile(&x.powf(3.0));
        assert_eq!(program.run(&[-2.0]).unwrap(), -8.0);
    }

    #[test]
    fn test_missing_variable() {
        let [_, y] = Expr::vars(["x", "y"]);
        let program = Program::compile(&y);
        assert_eq!(
            program.run(&[1.0]).unwrap_err(),
            EvalError::MissingVariable { index: 1, got: 1 }
        );
    }
}
