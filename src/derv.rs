//! Arbitrary-order mixed partial derivatives.
//!
//! The entry point is [`derv`]: given a differentiable function of N
//! variables, an evaluation point of length N and an order vector of length N
//! (entry *i* = how many times to differentiate with respect to variable
//! *i*), it returns the value of the requested mixed partial derivative at
//! the point.
//!
//! The computation happens in two steps:
//!
//! 1. [`derv_sequence`] compiles the order vector into a flat sequence of
//!    variable indices, grouped in ascending index order. `[1, 0, 2]` becomes
//!    `[0, 2, 2]`: differentiate once with respect to variable 0, then twice
//!    with respect to variable 2.
//! 2. [`derv`] folds the sequence into a pipeline of function objects, where
//!    each stage is the partial derivative of the previous stage with respect
//!    to one variable, and evaluates the final stage at the point.
//!
//! For smooth functions mixed partials commute, so the grouping order is a
//! convention, not a correctness requirement; it is fixed so that repeated
//! runs reproduce the same float rounding. The pipeline is rebuilt on every
//! call and dropped afterwards; batch evaluation over many points can share
//! one pipeline through
//! [`Functional::derv_batch`](crate::functional::Functional::derv_batch).
//!
//! ```
//! use xcdiff::{derv, Functional};
//!
//! let f = Functional::parse("x^2 * y^2").unwrap();
//! // ∂²f/∂x∂y at (2, 3) = 4xy = 24
//! assert_eq!(derv(&f, &[2.0, 3.0], &[1, 1]).unwrap(), 24.0);
//! ```

use tracing::debug;

use crate::errors::FunctionalError;

/// A scalar function of N real variables that can produce the partial
/// derivative of itself with respect to any one of them.
///
/// The derivative of a stage is a new stage of identical arity and
/// signature, which is what allows [`derv`] to chain differentiation to
/// arbitrary order. Implementations must compute derivatives exactly (up to
/// float rounding); a finite-difference approximation compounds its error
/// under repeated application and is not a valid implementation.
pub trait Differentiable: Sized {
    /// Number of input variables.
    fn arity(&self) -> usize;

    /// Evaluates the function at a point of length `arity()`.
    fn evaluate(&self, point: &[f64]) -> Result<f64, FunctionalError>;

    /// Returns the partial derivative with respect to the variable at
    /// `index`, as a new function of the same arity.
    fn partial(&self, index: usize) -> Result<Self, FunctionalError>;
}

/// Compiles an order vector into a flat sequence of variable indices.
///
/// Index *i* appears exactly `orders[i]` times, grouped in ascending index
/// order. An all-zero order vector yields an empty sequence.
pub fn derv_sequence(orders: &[usize]) -> Vec<usize> {
    orders
        .iter()
        .enumerate()
        .flat_map(|(variable, &order)| std::iter::repeat(variable).take(order))
        .collect()
}

/// Evaluates a mixed partial derivative of `fun` at `point`.
///
/// `orders[i]` is the number of times to differentiate with respect to
/// variable `i`. Both `point` and `orders` must have exactly `fun.arity()`
/// entries; a mismatch is reported before any differentiation is attempted.
/// With an all-zero order vector the function itself is evaluated.
///
/// Domain failures raised by the function or any of its derivative stages
/// (densities outside the physical domain, for instance) propagate to the
/// caller unmodified.
pub fn derv<F: Differentiable>(
    fun: &F,
    point: &[f64],
    orders: &[usize],
) -> Result<f64, FunctionalError> {
    if point.len() != fun.arity() {
        return Err(FunctionalError::InvalidInputLength {
            expected: fun.arity(),
            got: point.len(),
        });
    }
    if orders.len() != fun.arity() {
        return Err(FunctionalError::InvalidOrderLength {
            expected: fun.arity(),
            got: orders.len(),
        });
    }

    let sequence = derv_sequence(orders);
    debug!(
        total_order = sequence.len(),
        "building differentiation pipeline"
    );

    let mut pipeline: Vec<F> = Vec::with_capacity(sequence.len());
    for &variable in &sequence {
        let previous = pipeline.last().unwrap_or(fun);
        pipeline.push(previous.partial(variable)?);
    }

    match pipeline.last() {
        Some(stage) => stage.evaluate(point),
        None => fun.evaluate(point),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional::Functional;

    #[test]
    fn test_derv_sequence() {
        assert_eq!(derv_sequence(&[3, 2, 1, 0]), vec![0, 0, 0, 1, 1, 2]);
        assert_eq!(derv_sequence(&[0, 1, 2, 3]), vec![1, 2, 2, 3, 3, 3]);
        assert_eq!(derv_sequence(&[0, 1, 0, 1]), vec![1, 3]);
        assert_eq!(derv_sequence(&[0, 0]), Vec::<usize>::new());
    }

    #[test]
    fn test_zero_orders_evaluate_the_function() {
        let f = Functional::parse("2*x + y^2").unwrap();
        assert_eq!(derv(&f, &[1.0, 2.0], &[0, 0]).unwrap(), 6.0);
    }

    #[test]
    fn test_mixed_partial() {
        let f = Functional::parse("x^2 * y^2").unwrap();
        // ∂²/∂x∂y (x²y²) = 4xy
        assert_eq!(derv(&f, &[2.0, 3.0], &[1, 1]).unwrap(), 24.0);
        // ∂³/∂x²∂y (x²y²) = 4y
        assert_eq!(derv(&f, &[2.0, 3.0], &[2, 1]).unwrap(), 12.0);
        // differentiating past the polynomial degree gives zero
        assert_eq!(derv(&f, &[2.0, 3.0], &[3, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_shape_validation() {
        let f = Functional::parse("x + y").unwrap();
        assert!(matches!(
            derv(&f, &[1.0], &[0, 0]),
            Err(FunctionalError::InvalidInputLength {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            derv(&f, &[1.0, 2.0], &[0]),
            Err(FunctionalError::InvalidOrderLength {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_domain_failure_propagates() {
        let f = Functional::parse("ln(x)").unwrap();
        // ln is undefined at -1; the error surfaces instead of a NaN
        assert!(matches!(
            derv(&f, &[-1.0], &[0]),
            Err(FunctionalError::EvalError(_))
        ));
        // the derivative 1/x is undefined at 0
        assert!(matches!(
            derv(&f, &[0.0], &[1]),
            Err(FunctionalError::EvalError(_))
        ));
    }
}
