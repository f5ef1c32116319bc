//! Error types for the xcdiff crate.
//!
//! Three layers, matching where a failure can occur:
//!
//! - `ConvertError`: conversion of a parsed textual formula into the internal
//!   expression representation
//! - `EvalError`: domain failures raised lazily by the interpreter, at the
//!   arithmetic operation that is undefined for its operands
//! - `FunctionalError`: the caller-facing taxonomy, wrapping the two layers
//!   above and adding the eagerly-checked input-shape violations
//!
//! Domain failures are never converted into default values; they carry the
//! offending operand so the caller can see where the physical domain was left.

use evalexpr::{DefaultNumericTypes, EvalexprError};
use thiserror::Error;

/// Errors that can occur while converting an evalexpr parse tree into the
/// internal expression representation.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// An operator the expression language does not support
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// A function call the expression language does not support
    #[error("unsupported function: {0}")]
    UnsupportedFunction(String),
    /// A constant that is not a floating point or integer number
    #[error("expected numeric constant: {0}")]
    ConstOperator(String),
    /// The parse tree root does not have exactly one child
    #[error("expected single child for root node: {0}")]
    RootNode(String),
    /// A variable that is missing from the variable table
    #[error("variable not found: {0}")]
    VariableNotFound(String),
}

/// Domain failures raised during program evaluation.
///
/// Raised at the exact operation that is undefined for its operands and
/// propagated unmodified; the interpreter never substitutes a NaN or a
/// default value for an out-of-domain result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Logarithm of a non-positive value
    #[error("logarithm of non-positive value {0}")]
    LogNonPositive(f64),
    /// Square root of a negative value
    #[error("square root of negative value {0}")]
    SqrtNegative(f64),
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Negative base raised to a non-integer power
    #[error("negative base {base} raised to fractional power {exponent}")]
    FractionalPowOfNegative { base: f64, exponent: f64 },
    /// Zero raised to a negative power
    #[error("zero raised to negative power {0}")]
    ZeroToNegativePower(f64),
    /// The input slice does not cover a variable the program reads
    #[error("input has {got} values but the program reads variable index {index}")]
    MissingVariable { index: u32, got: usize },
}

/// High-level errors for building and evaluating functionals.
#[derive(Debug, Error)]
pub enum FunctionalError {
    /// The textual formula failed to parse
    #[error("failed to parse expression")]
    ParseError(#[from] EvalexprError<DefaultNumericTypes>),
    /// The parsed formula could not be converted into the internal AST
    #[error("failed to convert parsed expression")]
    ConvertError(#[from] ConvertError),
    /// Evaluation left the domain of the functional or one of its derivatives
    #[error("domain error during evaluation")]
    EvalError(#[from] EvalError),
    /// A variable name that is not part of the functional
    #[error("variable not found in functional: {0}")]
    VariableNotFound(String),
    /// A variable index outside the functional's arity
    #[error("variable index {index} out of range for arity {arity}")]
    VariableIndexOutOfRange { index: usize, arity: usize },
    /// The evaluation point length does not match the number of variables
    #[error("invalid input length: expected {expected}, got {got}")]
    InvalidInputLength { expected: usize, got: usize },
    /// The order vector length does not match the number of variables
    #[error("invalid order vector length: expected {expected}, got {got}")]
    InvalidOrderLength { expected: usize, got: usize },
}
