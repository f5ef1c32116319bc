//! Dirac-Slater local exchange.

use std::f64::consts::PI;

use crate::expr::Expr;
use crate::functional::Functional;

/// Slater exchange energy density of one spin channel, cx * rho^(4/3).
pub(super) fn slater_term(density: Expr) -> Expr {
    let cx = -0.75 * (6.0 / PI).powf(1.0 / 3.0);
    cx * density.powf(4.0 / 3.0)
}

/// Slater exchange in the spin densities a and b.
pub fn slaterx_a_b() -> Functional {
    Functional::define("slaterx_a_b", ["a", "b"], |[a, b]| {
        slater_term(a) + slater_term(b)
    })
}

/// Closed-shell Slater exchange in the total density n.
pub fn slaterx_n() -> Functional {
    Functional::define("slaterx_n", ["n"], |[n]| {
        slater_term(0.5 * n.clone()) + slater_term(0.5 * n)
    })
}

#[cfg(test)]
mod tests {
    use super::super::assert_close;
    use super::*;

    #[test]
    fn unpolarized_reference_values() {
        let fun = slaterx_n();
        let n = 0.05;

        assert_close(fun.derv(&[n], &[0]).unwrap(), -0.01360436879474179);
        assert_close(fun.derv(&[n], &[1]).unwrap(), -0.362783167859781);
        assert_close(fun.derv(&[n], &[2]).unwrap(), -2.4185544523985397);
    }

    #[test]
    fn polarized_reference_values() {
        let fun = slaterx_a_b();
        let (a, b) = (0.02, 0.05);

        assert_close(fun.derv(&[a, b], &[0, 0]).unwrap(), -0.022192101517910012);
        assert_close(fun.derv(&[a, b], &[1, 0]).unwrap(), -0.33677806019212597);
        assert_close(fun.derv(&[a, b], &[0, 1]).unwrap(), -0.4570781497340833);
        assert_close(fun.derv(&[a, b], &[2, 0]).unwrap(), -5.6129676698687656);
    }

    #[test]
    fn closed_shell_matches_equal_spin_densities() {
        let unpolarized = slaterx_n();
        let polarized = slaterx_a_b();
        let n = 0.05;
        let half = [0.5 * n, 0.5 * n];

        assert_close(
            unpolarized.eval(&[n]).unwrap(),
            polarized.eval(&half).unwrap(),
        );

        // chain rule through a = b = n/2
        let dn = unpolarized.derv(&[n], &[1]).unwrap();
        let da = polarized.derv(&half, &[1, 0]).unwrap();
        let db = polarized.derv(&half, &[0, 1]).unwrap();
        assert_close(dn, 0.5 * (da + db));
    }

    #[test]
    fn repeated_first_order_equals_second_order() {
        let fun = slaterx_n();
        let direct = fun.derv(&[0.05], &[2]).unwrap();
        let chained = fun.partial("n").unwrap().derv(&[0.05], &[1]).unwrap();
        assert_eq!(direct, chained);
    }
}
