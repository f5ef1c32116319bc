//! Expression tree representation and symbolic differentiation.
//!
//! This module defines the AST used to represent the closed-form functionals
//! in a form that supports exact differentiation. The tree is built
//! recursively using `Box<Expr>` for nested expressions and can be:
//! - Symbolically differentiated to compute derivatives (`derivative`)
//! - Simplified using algebraic rules (`simplify`)
//! - Compiled to a flat stack program for evaluation (see `program`)
//!
//! Supported operations:
//! - Basic arithmetic (+, -, *, /), negation, absolute value
//! - Integer, real-constant and expression exponents
//! - exp, ln, sqrt, sin, cos, atan, asinh
//!
//! Expressions are constructed either from a parsed formula (see `convert`)
//! or directly in Rust through the builder methods and the `std::ops`
//! overloads, which let a formula transcription read close to the mathematics:
//!
//! ```
//! use xcdiff::expr::Expr;
//!
//! let [x, y] = Expr::vars(["x", "y"]);
//! let f = 2.0 * x + y.powi(2);
//! assert_eq!(format!("{f}"), "((2 * x) + (y^2))");
//! ```
//!
//! # Symbolic differentiation
//! `derivative` recursively applies the sum, product, quotient, power and
//! chain rules. The derivative of a scalar expression of N variables is
//! itself a scalar expression of the same N variables, which is what allows
//! derivatives to be chained to arbitrary order.

use std::ops;

/// A reference to a named variable and its index in the input slice.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub index: u32,
}

/// An expression tree node representing mathematical operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant floating point value
    Const(f64),
    /// A reference to a variable
    Var(VarRef),
    /// Addition of two expressions
    Add(Box<Expr>, Box<Expr>),
    /// Multiplication of two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Subtraction of two expressions
    Sub(Box<Expr>, Box<Expr>),
    /// Division of two expressions
    Div(Box<Expr>, Box<Expr>),
    /// Absolute value of an expression
    Abs(Box<Expr>),
    /// Exponentiation of an expression by an integer constant
    Pow(Box<Expr>, i64),
    /// Exponentiation of an expression by a floating point constant
    PowFloat(Box<Expr>, f64),
    /// Exponentiation of an expression by another expression
    PowExpr(Box<Expr>, Box<Expr>),
    /// Exponential function of an expression
    Exp(Box<Expr>),
    /// Natural logarithm of an expression
    Ln(Box<Expr>),
    /// Square root of an expression
    Sqrt(Box<Expr>),
    /// Sine of an expression (argument in radians)
    Sin(Box<Expr>),
    /// Cosine of an expression (argument in radians)
    Cos(Box<Expr>),
    /// Arctangent of an expression
    Atan(Box<Expr>),
    /// Inverse hyperbolic sine of an expression
    Asinh(Box<Expr>),
    /// Negation of an expression
    Neg(Box<Expr>),
}

impl Expr {
    /// Creates a constant node.
    pub fn constant(value: f64) -> Expr {
        Expr::Const(value)
    }

    /// Creates a variable node with an explicit input index.
    pub fn var(name: impl Into<String>, index: u32) -> Expr {
        Expr::Var(VarRef {
            name: name.into(),
            index,
        })
    }

    /// Creates one variable node per name, indexed in declaration order.
    ///
    /// This is the entry point for building a functional directly in Rust:
    /// the array position of each name is its index in the evaluation point.
    pub fn vars<const N: usize>(names: [&str; N]) -> [Expr; N] {
        std::array::from_fn(|i| Expr::var(names[i], i as u32))
    }

    /// Raises the expression to an integer power.
    pub fn powi(self, exponent: i64) -> Expr {
        Expr::Pow(Box::new(self), exponent)
    }

    /// Raises the expression to a constant real power.
    pub fn powf(self, exponent: f64) -> Expr {
        Expr::PowFloat(Box::new(self), exponent)
    }

    /// Raises the expression to an expression power.
    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::PowExpr(Box::new(self), Box::new(exponent))
    }

    pub fn abs(self) -> Expr {
        Expr::Abs(Box::new(self))
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(Box::new(self))
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(Box::new(self))
    }

    pub fn sqrt(self) -> Expr {
        Expr::Sqrt(Box::new(self))
    }

    pub fn sin(self) -> Expr {
        Expr::Sin(Box::new(self))
    }

    pub fn cos(self) -> Expr {
        Expr::Cos(Box::new(self))
    }

    pub fn atan(self) -> Expr {
        Expr::Atan(Box::new(self))
    }

    pub fn asinh(self) -> Expr {
        Expr::Asinh(Box::new(self))
    }

    /// Computes the symbolic derivative of this expression with respect to a
    /// variable.
    ///
    /// Recursively applies the rules of differentiation to build a new
    /// expression tree representing the derivative:
    /// - d/dx(c) = 0 for constants
    /// - d/dx(x) = 1 for the variable we're differentiating with respect to
    /// - d/dx(y) = 0 for other variables
    /// - Sum rule: d/dx(f + g) = df/dx + dg/dx
    /// - Product rule: d/dx(f * g) = f * dg/dx + g * df/dx
    /// - Quotient rule: d/dx(f/g) = (g * df/dx - f * dg/dx) / g^2
    /// - Power rule: d/dx(f^c) = c * f^(c-1) * df/dx
    /// - General power rule: d/dx(f^g) = f^g * (g' * ln(f) + g * f'/f)
    /// - Chain rules for abs, exp, ln, sqrt, sin, cos, atan, asinh
    ///
    /// # Arguments
    /// * `with_respect_to` - The name of the variable to differentiate with
    ///   respect to
    ///
    /// # Returns
    /// A new expression tree representing the derivative
    pub fn derivative(&self, with_respect_to: &str) -> Box<Expr> {
        match self {
            Expr::Const(_) => Box::new(Expr::Const(0.0)),

            Expr::Var(var_ref) => {
                if var_ref.name == with_respect_to {
                    Box::new(Expr::Const(1.0))
                } else {
                    Box::new(Expr::Const(0.0))
                }
            }

            Expr::Add(left, right) => {
                // d/dx(f + g) = df/dx + dg/dx
                Box::new(Expr::Add(
                    left.derivative(with_respect_to),
                    right.derivative(with_respect_to),
                ))
            }

            Expr::Sub(left, right) => {
                // d/dx(f - g) = df/dx - dg/dx
                Box::new(Expr::Sub(
                    left.derivative(with_respect_to),
                    right.derivative(with_respect_to),
                ))
            }

            Expr::Mul(left, right) => {
                // d/dx(f * g) = f * dg/dx + g * df/dx
                Box::new(Expr::Add(
                    Box::new(Expr::Mul(left.clone(), right.derivative(with_respect_to))),
                    Box::new(Expr::Mul(right.clone(), left.derivative(with_respect_to))),
                ))
            }

            Expr::Div(left, right) => {
                // d/dx(f/g) = (g * df/dx - f * dg/dx) / g^2
                Box::new(Expr::Div(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Mul(right.clone(), left.derivative(with_respect_to))),
                        Box::new(Expr::Mul(left.clone(), right.derivative(with_respect_to))),
                    )),
                    Box::new(Expr::Pow(right.clone(), 2)),
                ))
            }

            Expr::Abs(expr) => {
                // d/dx|f| = f/|f| * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Div(expr.clone(), Box::new(Expr::Abs(expr.clone())))),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Pow(base, exp) => {
                // d/dx(f^n) = n * f^(n-1) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Mul(
                        Box::new(Expr::Const(*exp as f64)),
                        Box::new(Expr::Pow(base.clone(), exp - 1)),
                    )),
                    base.derivative(with_respect_to),
                ))
            }

            Expr::PowFloat(base, exp) => {
                // d/dx(f^c) = c * f^(c-1) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Mul(
                        Box::new(Expr::Const(*exp)),
                        Box::new(Expr::PowFloat(base.clone(), exp - 1.0)),
                    )),
                    base.derivative(with_respect_to),
                ))
            }

            Expr::PowExpr(base, exponent) => {
                // d/dx(f^g) = f^g * (g' * ln(f) + g * f'/f)
                Box::new(Expr::Mul(
                    Box::new(Expr::PowExpr(base.clone(), exponent.clone())),
                    Box::new(Expr::Add(
                        Box::new(Expr::Mul(
                            exponent.derivative(with_respect_to),
                            Box::new(Expr::Ln(base.clone())),
                        )),
                        Box::new(Expr::Mul(
                            exponent.clone(),
                            Box::new(Expr::Div(base.derivative(with_respect_to), base.clone())),
                        )),
                    )),
                ))
            }

            Expr::Exp(expr) => {
                // d/dx(e^f) = e^f * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Exp(expr.clone())),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Ln(expr) => {
                // d/dx(ln(f)) = 1/f * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Div(Box::new(Expr::Const(1.0)), expr.clone())),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Sqrt(expr) => {
                // d/dx(sqrt(f)) = 1/(2*sqrt(f)) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Div(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Mul(
                            Box::new(Expr::Const(2.0)),
                            Box::new(Expr::Sqrt(expr.clone())),
                        )),
                    )),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Sin(expr) => {
                // d/dx(sin(f)) = cos(f) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Cos(expr.clone())),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Cos(expr) => {
                // d/dx(cos(f)) = -sin(f) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Neg(Box::new(Expr::Sin(expr.clone())))),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Atan(expr) => {
                // d/dx(atan(f)) = 1/(1 + f^2) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Div(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Add(
                            Box::new(Expr::Const(1.0)),
                            Box::new(Expr::Pow(expr.clone(), 2)),
                        )),
                    )),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Asinh(expr) => {
                // d/dx(asinh(f)) = 1/sqrt(f^2 + 1) * df/dx
                Box::new(Expr::Mul(
                    Box::new(Expr::Div(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Sqrt(Box::new(Expr::Add(
                            Box::new(Expr::Pow(expr.clone(), 2)),
                            Box::new(Expr::Const(1.0)),
                        )))),
                    )),
                    expr.derivative(with_respect_to),
                ))
            }

            Expr::Neg(expr) => {
                // d/dx(-f) = -(df/dx)
                Box::new(Expr::Neg(expr.derivative(with_respect_to)))
            }
        }
    }

    /// Simplifies the expression by folding constants and applying basic
    /// algebraic rules.
    ///
    /// Differentiation produces many trivial factors (`* 1`, `+ 0`, `^0`),
    /// so every derivative is simplified before it is compiled. The rules:
    ///
    /// # Constant folding
    /// - Evaluates constant subtrees: 2 + 3 → 5 (division and power folds are
    ///   guarded so an out-of-domain constant is left for the interpreter to
    ///   report instead of being folded into a NaN)
    ///
    /// # Identity rules
    /// - x + 0 → x, x * 1 → x, x * 0 → 0, x / 1 → x, x / x → 1, x - x → 0
    ///
    /// # Exponent rules
    /// - x^0 → 1, x^1 → x, (x^a)^b → x^(a*b), x^a * x^b → x^(a+b)
    /// - real-constant exponents with integer value become integer powers
    ///
    /// # Special functions
    /// - |-x| → |x|, -(-x) → x, exp(ln(x)) → x, ln(exp(x)) → x,
    ///   sqrt(x^2) → |x|, plus constant folds for atan/asinh/sin/cos
    pub fn simplify(&self) -> Box<Expr> {
        match self {
            // Base cases - constants and variables remain unchanged
            Expr::Const(_) | Expr::Var(_) => Box::new(self.clone()),

            Expr::Add(left, right) => {
                let l = left.simplify();
                let r = right.simplify();
                match (&*l, &*r) {
                    // Fold constants: 1 + 2 -> 3
                    (Expr::Const(a), Expr::Const(b)) => Box::new(Expr::Const(a + b)),
                    // Identity: x + 0 -> x
                    (expr, Expr::Const(0.0)) | (Expr::Const(0.0), expr) => Box::new(expr.clone()),
                    // Combine like terms: c1*x + c2*x -> (c1+c2)*x
                    (Expr::Mul(a1, x1), Expr::Mul(a2, x2)) if x1 == x2 => {
                        let combined_coeff = Expr::Add(a1.clone(), a2.clone()).simplify();
                        Box::new(Expr::Mul(combined_coeff, x1.clone()))
                    }
                    // Associativity: (x + c1) + c2 -> x + (c1 + c2)
                    (Expr::Add(x, c1), c2)
                        if matches!(**c1, Expr::Const(_)) && matches!(*c2, Expr::Const(_)) =>
                    {
                        Box::new(Expr::Add(
                            x.clone(),
                            Expr::Add(c1.clone(), Box::new(c2.clone())).simplify(),
                        ))
                    }
                    _ => Box::new(Expr::Add(l, r)),
                }
            }

            Expr::Sub(left, right) => {
                let l = left.simplify();
                let r = right.simplify();
                match (&*l, &*r) {
                    // Fold constants: 3 - 2 -> 1
                    (Expr::Const(a), Expr::Const(b)) => Box::new(Expr::Const(a - b)),
                    // Identity: x - 0 -> x
                    (expr, Expr::Const(0.0)) => Box::new(expr.clone()),
                    // Zero: x - x -> 0
                    (a, b) if a == b => Box::new(Expr::Const(0.0)),
                    // Combine like terms: c1*x - c2*x -> (c1-c2)*x
                    (Expr::Mul(a1, x1), Expr::Mul(a2, x2)) if x1 == x2 => {
                        let combined_coeff = Expr::Sub(a1.clone(), a2.clone()).simplify();
                        Box::new(Expr::Mul(combined_coeff, x1.clone()))
                    }
                    // Convert subtraction to addition: x - c -> x + (-c)
                    (x, Expr::Const(c)) => {
                        Box::new(Expr::Add(Box::new(x.clone()), Box::new(Expr::Const(-c))))
                    }
                    _ => Box::new(Expr::Sub(l, r)),
                }
            }

            Expr::Mul(left, right) => {
                let l = left.simplify();
                let r = right.simplify();

                // x * x -> x^2
                if l == r {
                    return Box::new(Expr::Pow(l, 2));
                }

                match (&*l, &*r) {
                    // Fold constants: 2 * 3 -> 6
                    (Expr::Const(a), Expr::Const(b)) => Box::new(Expr::Const(a * b)),
                    // Zero property: x * 0 -> 0
                    (Expr::Const(0.0), _) | (_, Expr::Const(0.0)) => Box::new(Expr::Const(0.0)),
                    // Identity: x * 1 -> x
                    (expr, Expr::Const(1.0)) | (Expr::Const(1.0), expr) => Box::new(expr.clone()),
                    // Negative one: x * (-1) -> -x
                    (expr, Expr::Const(-1.0)) | (Expr::Const(-1.0), expr) => {
                        Box::new(Expr::Neg(Box::new(expr.clone())))
                    }
                    // Combine exponents: x^a * x^b -> x^(a+b)
                    (Expr::Pow(b1, e1), Expr::Pow(b2, e2)) if b1 == b2 => {
                        Box::new(Expr::Pow(b1.clone(), e1 + e2))
                    }
                    // Associativity: (c1 * x) * c2 -> (c1 * c2) * x
                    (Expr::Mul(c1, x), c2)
                        if matches!(**c1, Expr::Const(_)) && matches!(*c2, Expr::Const(_)) =>
                    {
                        Box::new(Expr::Mul(
                            Expr::Mul(c1.clone(), Box::new(c2.clone())).simplify(),
                            x.clone(),
                        ))
                    }
                    _ => Box::new(Expr::Mul(l, r)),
                }
            }

            Expr::Div(left, right) => {
                let l = left.simplify();
                let r = right.simplify();
                match (&*l, &*r) {
                    // Fold constants: 6 / 2 -> 3
                    (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Box::new(Expr::Const(a / b)),
                    // Zero numerator: 0 / x -> 0
                    (Expr::Const(0.0), _) => Box::new(Expr::Const(0.0)),
                    // Identity: x / 1 -> x
                    (expr, Expr::Const(1.0)) => Box::new(expr.clone()),
                    // Division by negative one: x / (-1) -> -x
                    (expr, Expr::Const(-1.0)) => Box::new(Expr::Neg(Box::new(expr.clone()))),
                    // Identity: x / x -> 1
                    (a, b) if a == b => Box::new(Expr::Const(1.0)),
                    // Simplify exponents: x^a / x^b -> x^(a-b)
                    (Expr::Pow(b1, e1), Expr::Pow(b2, e2)) if b1 == b2 => {
                        Box::new(Expr::Pow(b1.clone(), e1 - e2))
                    }
                    // Simplify nested divisions: (x/y)/z -> x/(y*z)
                    (Expr::Div(x, y), z) => Box::new(Expr::Div(
                        x.clone(),
                        Box::new(Expr::Mul(y.clone(), Box::new(z.clone()))),
                    )),
                    _ => Box::new(Expr::Div(l, r)),
                }
            }

            Expr::Abs(expr) => {
                let e = expr.simplify();
                match &*e {
                    // Fold constants: abs(-3) -> 3
                    Expr::Const(a) => Box::new(Expr::Const(a.abs())),
                    // Nested abs: abs(abs(x)) -> abs(x)
                    Expr::Abs(inner) => Box::new(Expr::Abs(inner.clone())),
                    // abs(-x) -> abs(x)
                    Expr::Neg(inner) => Box::new(Expr::Abs(inner.clone())),
                    // abs(x^2) -> x^2 (even powers are never negative)
                    Expr::Pow(_, exp) if exp % 2 == 0 => e,
                    _ => Box::new(Expr::Abs(e)),
                }
            }

            Expr::Pow(base, exp) => {
                let b = base.simplify();
                match (&*b, exp) {
                    // x^0 -> 1 (including 0^0 = 1 by convention)
                    (_, 0) => Box::new(Expr::Const(1.0)),
                    // Fold constants: 2^3 -> 8
                    (Expr::Const(a), exp) => Box::new(Expr::Const(a.powi(*exp as i32))),
                    // Identity: x^1 -> x
                    (expr, 1) => Box::new(expr.clone()),
                    // Nested exponents: (x^a)^b -> x^(a*b)
                    (Expr::Pow(inner_base, inner_exp), outer_exp) => {
                        Box::new(Expr::Pow(inner_base.clone(), inner_exp * outer_exp))
                    }
                    _ => Box::new(Expr::Pow(b, *exp)),
                }
            }

            Expr::PowFloat(base, exp) => {
                let b = base.simplify();
                match (&*b, exp) {
                    // x^0.0 -> 1
                    (_, exp) if exp.abs() < 1e-10 => Box::new(Expr::Const(1.0)),
                    // Fold constants with a non-negative base; a negative base
                    // with a fractional exponent is a domain error and stays
                    // for the interpreter to report
                    (Expr::Const(a), exp) if *a >= 0.0 || exp.fract() == 0.0 => {
                        Box::new(Expr::Const(a.powf(*exp)))
                    }
                    // Identity: x^1.0 -> x
                    (expr, exp) if (exp - 1.0).abs() < 1e-10 => Box::new(expr.clone()),
                    // Convert to integer power if possible
                    (expr, exp) if exp.fract().abs() < 1e-10 => {
                        Box::new(Expr::Pow(Box::new(expr.clone()), *exp as i64))
                    }
                    _ => Box::new(Expr::PowFloat(b, *exp)),
                }
            }

            Expr::PowExpr(base, exponent) => {
                let b = base.simplify();
                let e = exponent.simplify();
                match (&*b, &*e) {
                    (Expr::Const(a), Expr::Const(b)) if *a >= 0.0 || b.fract() == 0.0 => {
                        Box::new(Expr::Const(a.powf(*b)))
                    }
                    // x^0 -> 1
                    (_, Expr::Const(0.0)) => Box::new(Expr::Const(1.0)),
                    // x^1 -> x
                    (expr, Expr::Const(1.0)) => Box::new(expr.clone()),
                    // Demote constant exponents to the cheaper forms
                    (expr, Expr::Const(exp)) if exp.fract().abs() < 1e-10 => {
                        Box::new(Expr::Pow(Box::new(expr.clone()), *exp as i64))
                    }
                    (expr, Expr::Const(exp)) => {
                        Box::new(Expr::PowFloat(Box::new(expr.clone()), *exp))
                    }
                    _ => Box::new(Expr::PowExpr(b, e)),
                }
            }

            Expr::Exp(expr) => {
                let e = expr.simplify();
                match &*e {
                    // exp(0) -> 1
                    Expr::Const(0.0) => Box::new(Expr::Const(1.0)),
                    // Fold constants
                    Expr::Const(a) => Box::new(Expr::Const(a.exp())),
                    // exp(ln(x)) -> x
                    Expr::Ln(inner) => inner.clone(),
                    _ => Box::new(Expr::Exp(e)),
                }
            }

            Expr::Ln(expr) => {
                let e = expr.simplify();
                match &*e {
                    // ln(1) -> 0
                    Expr::Const(1.0) => Box::new(Expr::Const(0.0)),
                    // Fold positive constants only; ln of a non-positive
                    // constant is a domain error
                    Expr::Const(a) if *a > 0.0 => Box::new(Expr::Const(a.ln())),
                    // ln(exp(x)) -> x
                    Expr::Exp(inner) => inner.clone(),
                    _ => Box::new(Expr::Ln(e)),
                }
            }

            Expr::Sqrt(expr) => {
                let e = expr.simplify();
                match &*e {
                    // Fold non-negative constants only
                    Expr::Const(a) if *a >= 0.0 => Box::new(Expr::Const(a.sqrt())),
                    // sqrt(x^2) -> abs(x)
                    Expr::Pow(x, 2) => Box::new(Expr::Abs(x.clone())),
                    _ => Box::new(Expr::Sqrt(e)),
                }
            }

            Expr::Sin(expr) => {
                let e = expr.simplify();
                match &*e {
                    Expr::Const(0.0) => Box::new(Expr::Const(0.0)),
                    Expr::Const(a) => Box::new(Expr::Const(a.sin())),
                    _ => Box::new(Expr::Sin(e)),
                }
            }

            Expr::Cos(expr) => {
                let e = expr.simplify();
                match &*e {
                    Expr::Const(0.0) => Box::new(Expr::Const(1.0)),
                    Expr::Const(a) => Box::new(Expr::Const(a.cos())),
                    _ => Box::new(Expr::Cos(e)),
                }
            }

            Expr::Atan(expr) => {
                let e = expr.simplify();
                match &*e {
                    Expr::Const(0.0) => Box::new(Expr::Const(0.0)),
                    Expr::Const(a) => Box::new(Expr::Const(a.atan())),
                    _ => Box::new(Expr::Atan(e)),
                }
            }

            Expr::Asinh(expr) => {
                let e = expr.simplify();
                match &*e {
                    Expr::Const(0.0) => Box::new(Expr::Const(0.0)),
                    Expr::Const(a) => Box::new(Expr::Const(a.asinh())),
                    _ => Box::new(Expr::Asinh(e)),
                }
            }

            Expr::Neg(expr) => {
                let e = expr.simplify();
                match &*e {
                    // Fold constants: -(3) -> -3
                    Expr::Const(a) => Box::new(Expr::Const(-a)),
                    // Double negation: -(-x) -> x
                    Expr::Neg(inner) => inner.clone(),
                    // Distribute negation: -(x + y) -> -x - y
                    Expr::Add(x, y) => {
                        Expr::Sub(Box::new(Expr::Neg(x.clone())), y.clone()).simplify()
                    }
                    // Distribute negation: -(x - y) -> -x + y
                    Expr::Sub(x, y) => {
                        Expr::Add(Box::new(Expr::Neg(x.clone())), y.clone()).simplify()
                    }
                    // Factor out negation: -(c*x) -> (-c)*x
                    Expr::Mul(c, x) if matches!(**c, Expr::Const(_)) => {
                        Expr::Mul(Box::new(Expr::Neg(c.clone())), x.clone()).simplify()
                    }
                    _ => Box::new(Expr::Neg(e)),
                }
            }
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Add<f64> for Expr {
    type Output = Expr;
    fn add(self, rhs: f64) -> Expr {
        Expr::Add(Box::new(self), Box::new(Expr::Const(rhs)))
    }
}

impl ops::Add<Expr> for f64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(Expr::Const(self)), Box::new(rhs))
    }
}

impl ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub<f64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: f64) -> Expr {
        Expr::Sub(Box::new(self), Box::new(Expr::Const(rhs)))
    }
}

impl ops::Sub<Expr> for f64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(Expr::Const(self)), Box::new(rhs))
    }
}

impl ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul<f64> for Expr {
    type Output = Expr;
    fn mul(self, rhs: f64) -> Expr {
        Expr::Mul(Box::new(self), Box::new(Expr::Const(rhs)))
    }
}

impl ops::Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(Expr::Const(self)), Box::new(rhs))
    }
}

impl ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl ops::Div<f64> for Expr {
    type Output = Expr;
    fn div(self, rhs: f64) -> Expr {
        Expr::Div(Box::new(self), Box::new(Expr::Const(rhs)))
    }
}

impl ops::Div<Expr> for f64 {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(Expr::Const(self)), Box::new(rhs))
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

/// Standard mathematical notation: binary operations wrapped in parentheses,
/// functions in call notation, absolute value as |x|, exponents with ^.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Const(val) => write!(f, "{val}"),
            Expr::Var(var_ref) => write!(f, "{0}", var_ref.name),
            Expr::Add(left, right) => write!(f, "({left} + {right})"),
            Expr::Mul(left, right) => write!(f, "({left} * {right})"),
            Expr::Sub(left, right) => write!(f, "({left} - {right})"),
            Expr::Div(left, right) => write!(f, "({left} / {right})"),
            Expr::Abs(expr) => write!(f, "|{expr}|"),
            Expr::Pow(base, exp) => write!(f, "({base}^{exp})"),
            Expr::PowFloat(base, exp) => write!(f, "({base}^{exp})"),
            Expr::PowExpr(base, exponent) => write!(f, "({base}^{exponent})"),
            Expr::Exp(expr) => write!(f, "exp({expr})"),
            Expr::Ln(expr) => write!(f, "ln({expr})"),
            Expr::Sqrt(expr) => write!(f, "sqrt({expr})"),
            Expr::Sin(expr) => write!(f, "sin({expr})"),
            Expr::Cos(expr) => write!(f, "cos({expr})"),
            Expr::Atan(expr) => write!(f, "atan({expr})"),
            Expr::Asinh(expr) => write!(f, "asinh({expr})"),
            Expr::Neg(expr) => write!(f, "-({expr})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::var(name, 0))
    }

    #[test]
    fn test_simplify() {
        // Constant folding: 2 + 3 → 5
        assert_eq!(
            *Expr::Add(Box::new(Expr::Const(2.0)), Box::new(Expr::Const(3.0))).simplify(),
            Expr::Const(5.0)
        );

        // x + 0 → x
        assert_eq!(
            *Expr::Add(var("x"), Box::new(Expr::Const(0.0))).simplify(),
            *var("x")
        );

        // x * 1 → x
        assert_eq!(
            *Expr::Mul(var("x"), Box::new(Expr::Const(1.0))).simplify(),
            *var("x")
        );

        // x * 0 → 0
        assert_eq!(
            *Expr::Mul(var("x"), Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(0.0)
        );

        // x / 1 → x
        assert_eq!(
            *Expr::Div(var("x"), Box::new(Expr::Const(1.0))).simplify(),
            *var("x")
        );

        // x / x → 1
        assert_eq!(*Expr::Div(var("x"), var("x")).simplify(), Expr::Const(1.0));

        // x - x → 0
        assert_eq!(*Expr::Sub(var("x"), var("x")).simplify(), Expr::Const(0.0));

        // x^0 → 1, x^1 → x
        assert_eq!(*Expr::Pow(var("x"), 0).simplify(), Expr::Const(1.0));
        assert_eq!(*Expr::Pow(var("x"), 1).simplify(), *var("x"));

        // |-3| → 3
        assert_eq!(
            *Expr::Abs(Box::new(Expr::Const(-3.0))).simplify(),
            Expr::Const(3.0)
        );

        // ||x|| → |x|
        assert_eq!(
            *Expr::Abs(Box::new(Expr::Abs(var("x")))).simplify(),
            Expr::Abs(var("x"))
        );
    }

    #[test]
    fn test_simplify_real_exponents() {
        // x^0.0 → 1
        assert_eq!(*Expr::PowFloat(var("x"), 0.0).simplify(), Expr::Const(1.0));

        // x^1.0 → x
        assert_eq!(*Expr::PowFloat(var("x"), 1.0).simplify(), *var("x"));

        // Integer-valued real exponents demote to integer powers
        assert_eq!(
            *Expr::PowFloat(var("x"), 4.0).simplify(),
            Expr::Pow(var("x"), 4)
        );

        // Fractional exponents stay
        assert_eq!(
            *Expr::PowFloat(var("x"), 4.0 / 3.0).simplify(),
            Expr::PowFloat(var("x"), 4.0 / 3.0)
        );

        // ln of a non-positive constant is left for the interpreter
        let bad = Expr::Ln(Box::new(Expr::Const(-1.0)));
        assert_eq!(*bad.simplify(), bad);
    }

    #[test]
    fn test_derivative() {
        // Constants and variables
        assert_eq!(*Expr::Const(5.0).derivative("x"), Expr::Const(0.0));
        assert_eq!(*var("x").derivative("x"), Expr::Const(1.0));
        assert_eq!(*var("y").derivative("x"), Expr::Const(0.0));

        // Sum rule (u+v)' = u' + v'
        let sum = Box::new(Expr::Add(var("x"), var("y")));
        assert_eq!(
            *sum.derivative("x"),
            Expr::Add(Box::new(Expr::Const(1.0)), Box::new(Expr::Const(0.0)))
        );

        // Product rule (u*v)' = u*v' + v*u'
        let product = Box::new(Expr::Mul(var("x"), var("y")));
        assert_eq!(
            *product.derivative("x"),
            Expr::Add(
                Box::new(Expr::Mul(var("x"), Box::new(Expr::Const(0.0)))),
                Box::new(Expr::Mul(var("y"), Box::new(Expr::Const(1.0))))
            )
        );

        // Power rule (x^3)' = 3 * x^2 * 1
        let power = Box::new(Expr::Pow(var("x"), 3));
        assert_eq!(
            *power.derivative("x"),
            Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(3.0)),
                    Box::new(Expr::Pow(var("x"), 2))
                )),
                Box::new(Expr::Const(1.0))
            )
        );
    }

    #[test]
    fn test_derivative_inverse_functions() {
        // atan'(x) = 1/(1 + x^2), simplified
        let datan = Expr::Atan(var("x")).derivative("x").simplify();
        assert_eq!(
            *datan,
            Expr::Div(
                Box::new(Expr::Const(1.0)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(var("x"), 2))
                ))
            )
        );

        // asinh'(x) = 1/sqrt(x^2 + 1), simplified
        let dasinh = Expr::Asinh(var("x")).derivative("x").simplify();
        assert_eq!(
            *dasinh,
            Expr::Div(
                Box::new(Expr::Const(1.0)),
                Box::new(Expr::Sqrt(Box::new(Expr::Add(
                    Box::new(Expr::Pow(var("x"), 2)),
                    Box::new(Expr::Const(1.0))
                ))))
            )
        );
    }

    #[test]
    fn test_complex_simplifications() {
        // (x + 0) * (y + 0) → x * y
        let expr = Box::new(Expr::Mul(
            Box::new(Expr::Add(var("x"), Box::new(Expr::Const(0.0)))),
            Box::new(Expr::Add(var("y"), Box::new(Expr::Const(0.0)))),
        ));
        assert_eq!(*expr.simplify(), Expr::Mul(var("x"), var("y")));

        // -(-x) → x
        let expr = Box::new(Expr::Neg(Box::new(Expr::Neg(var("x")))));
        assert_eq!(*expr.simplify(), *var("x"));

        // (x/y)/(x/y) → 1
        let div = Box::new(Expr::Div(var("x"), var("y")));
        let expr = Box::new(Expr::Div(div.clone(), div));
        assert_eq!(*expr.simplify(), Expr::Const(1.0));

        // sqrt(x^2) → |x|
        let expr = Box::new(Expr::Sqrt(Box::new(Expr::Pow(var("x"), 2))));
        assert_eq!(*expr.simplify(), Expr::Abs(var("x")));

        // exp(0) = 1, ln(1) = 0, atan(0) = 0, asinh(0) = 0
        assert_eq!(
            *Expr::Exp(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(1.0)
        );
        assert_eq!(
            *Expr::Ln(Box::new(Expr::Const(1.0))).simplify(),
            Expr::Const(0.0)
        );
        assert_eq!(
            *Expr::Atan(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(0.0)
        );
        assert_eq!(
            *Expr::Asinh(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(0.0)
        );
    }

    #[test]
    fn test_builder_ops() {
        let [x, y] = Expr::vars(["x", "y"]);
        assert_eq!(x, Expr::var("x", 0));
        assert_eq!(y, Expr::var("y", 1));

        let f = 2.0 * x.clone() + y.clone().powi(2);
        assert_eq!(
            f,
            Expr::Add(
                Box::new(Expr::Mul(Box::new(Expr::Const(2.0)), Box::new(x.clone()))),
                Box::new(Expr::Pow(Box::new(y.clone()), 2)),
            )
        );

        let g = (1.0 - x.clone()).powf(4.0 / 3.0) / y;
        assert_eq!(
            g,
            Expr::Div(
                Box::new(Expr::PowFloat(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(x.clone())
                    )),
                    4.0 / 3.0
                )),
                Box::new(Expr::var("y", 1)),
            )
        );

        assert_eq!(-x.clone(), Expr::Neg(Box::new(x)));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Expr::Const(5.0)), "5");
        assert_eq!(format!("{}", *var("x")), "x");

        let sum = Expr::Add(var("x"), var("y"));
        assert_eq!(format!("{sum}"), "(x + y)");

        let exp = Expr::Exp(var("x"));
        assert_eq!(format!("{exp}"), "exp(x)");

        let asinh = Expr::Asinh(var("x"));
        assert_eq!(format!("{asinh}"), "asinh(x)");

        let complex = Expr::Div(
            Box::new(Expr::Add(Box::new(Expr::Pow(var("x"), 2)), var("y"))),
            var("z"),
        );
        assert_eq!(format!("{complex}"), "(((x^2) + y) / z)");
    }
}
