//! The built-in exchange-correlation functional library.
//!
//! Every functional is exposed as a nullary constructor returning a
//! [`Functional`], in both spin-resolved and closed-shell form. The
//! closed-shell variants are defined by substituting `a = b = n/2` (and
//! splitting the gradient invariant accordingly) into the spin-resolved
//! formula, so the two forms agree at equal spin densities at every
//! derivative order.
//!
//! Variable conventions:
//! - `n`, `gnn`: total density and its squared-gradient invariant
//! - `a`, `b`: spin-up and spin-down densities
//! - `gaa`, `gab`, `gbb`: spin-resolved squared-gradient invariants
//!
//! All formulas are defined for strictly positive densities; evaluation
//! outside that domain surfaces as a domain error.

pub mod becke;
pub mod lyp;
pub mod pbe;
pub mod slater;
pub mod vwn;

pub use becke::{b88_a_b_gaa_gbb, b88_n_gnn};
pub use lyp::{lyp_a_b_gaa_gab_gbb, lyp_n_gnn};
pub use pbe::{pbec_a_b_gaa_gab_gbb, pbec_n_gnn, pbex_a_b_gaa_gab_gbb, pbex_n_gnn};
pub use slater::{slaterx_a_b, slaterx_n};
pub use vwn::{vwn3_a_b, vwn3_n, vwn5_a_b, vwn5_n};

use crate::functional::Functional;

/// Names of all built-in functionals, in registry order.
pub fn names() -> &'static [&'static str] {
    &[
        "slaterx_n",
        "slaterx_a_b",
        "vwn3_n",
        "vwn3_a_b",
        "vwn5_n",
        "vwn5_a_b",
        "b88_n_gnn",
        "b88_a_b_gaa_gbb",
        "lyp_n_gnn",
        "lyp_a_b_gaa_gab_gbb",
        "pbex_n_gnn",
        "pbex_a_b_gaa_gab_gbb",
        "pbec_n_gnn",
        "pbec_a_b_gaa_gab_gbb",
    ]
}

/// Builds a built-in functional by name, or `None` for an unknown name.
pub fn by_name(name: &str) -> Option<Functional> {
    match name {
        "slaterx_n" => Some(slaterx_n()),
        "slaterx_a_b" => Some(slaterx_a_b()),
        "vwn3_n" => Some(vwn3_n()),
        "vwn3_a_b" => Some(vwn3_a_b()),
        "vwn5_n" => Some(vwn5_n()),
        "vwn5_a_b" => Some(vwn5_a_b()),
        "b88_n_gnn" => Some(b88_n_gnn()),
        "b88_a_b_gaa_gbb" => Some(b88_a_b_gaa_gbb()),
        "lyp_n_gnn" => Some(lyp_n_gnn()),
        "lyp_a_b_gaa_gab_gbb" => Some(lyp_a_b_gaa_gab_gbb()),
        "pbex_n_gnn" => Some(pbex_n_gnn()),
        "pbex_a_b_gaa_gab_gbb" => Some(pbex_a_b_gaa_gab_gbb()),
        "pbec_n_gnn" => Some(pbec_n_gnn()),
        "pbec_a_b_gaa_gab_gbb" => Some(pbec_a_b_gaa_gab_gbb()),
        _ => None,
    }
}

/// Relative-tolerance comparison for reference values.
#[cfg(test)]
pub(crate) fn assert_close(got: f64, want: f64) {
    let tolerance = 1e-9 * want.abs().max(1e-9);
    assert!(
        (got - want).abs() <= tolerance,
        "got {got}, want {want} (difference {})",
        got - want
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A physically valid point for each arity in the library.
    fn point_for(arity: usize) -> Vec<f64> {
        match arity {
            1 => vec![0.05],
            2 => vec![0.04, 0.03],
            4 => vec![0.02, 0.05, 0.02, 0.04],
            5 => vec![0.02, 0.05, 0.02, 0.03, 0.04],
            _ => unreachable!("no functional with arity {arity}"),
        }
    }

    #[test]
    fn registry_covers_every_functional() {
        for name in names() {
            let fun = by_name(name).unwrap();
            assert_eq!(fun.name(), *name);
        }
        assert!(by_name("xalpha").is_none());
    }

    #[test]
    fn zero_orders_equal_plain_evaluation() {
        for name in names() {
            let fun = by_name(name).unwrap();
            let point = point_for(fun.arity());
            let orders = vec![0; fun.arity()];
            assert_eq!(
                fun.derv(&point, &orders).unwrap(),
                fun.eval(&point).unwrap(),
                "functional {name}"
            );
        }
    }

    #[test]
    fn second_order_equals_repeated_first_order() {
        for name in names() {
            let fun = by_name(name).unwrap();
            let point = point_for(fun.arity());

            let mut orders = vec![0; fun.arity()];
            orders[0] = 2;
            let direct = fun.derv(&point, &orders).unwrap();

            let mut one = vec![0; fun.arity()];
            one[0] = 1;
            let chained = fun.partial_at(0).unwrap().derv(&point, &one).unwrap();

            assert_eq!(direct, chained, "functional {name}");
        }
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        let fun = slaterx_a_b();
        assert!(fun.derv(&[0.02], &[1, 0]).is_err());
        assert!(fun.derv(&[0.02, 0.05], &[1]).is_err());
    }

    #[test]
    fn zero_density_is_a_domain_error() {
        // r_s diverges as the density vanishes
        let fun = vwn5_n();
        assert!(fun.eval(&[0.0]).is_err());
    }
}
