//! Lee-Yang-Parr gradient-corrected correlation.

use std::f64::consts::PI;

use crate::expr::Expr;
use crate::functional::Functional;

const LYP_A: f64 = 0.04918;
const LYP_B: f64 = 0.132;
const LYP_C: f64 = 0.2533;
const LYP_D: f64 = 0.349;

fn lyp_energy(a: Expr, b: Expr, gaa: Expr, gab: Expr, gbb: Expr) -> Expr {
    let n = a.clone() + b.clone();
    let gnn = gaa.clone() + 2.0 * gab + gbb.clone();

    let cf = 0.3 * (3.0 * PI * PI).powf(2.0 / 3.0);
    let icbrtn = n.clone().powf(-1.0 / 3.0);
    let p = 1.0 / (1.0 + LYP_D * icbrtn.clone());
    let omega = (-LYP_C * icbrtn.clone()).exp() * p.clone() * n.clone().powf(-11.0 / 3.0);
    let delta = icbrtn * (LYP_C + LYP_D * p.clone());
    let n2 = n.clone() * n.clone();

    -LYP_A
        * (4.0 * a.clone() * b.clone() * p / n.clone()
            + LYP_B
                * omega
                * (a.clone()
                    * b.clone()
                    * (2.0_f64.powf(11.0 / 3.0)
                        * cf
                        * (a.clone().powf(8.0 / 3.0) + b.clone().powf(8.0 / 3.0))
                        + (47.0 - 7.0 * delta.clone()) * gnn.clone() / 18.0
                        - (2.5 - delta.clone() / 18.0) * (gaa.clone() + gbb.clone())
                        - (delta - 11.0) / 9.0 * (a.clone() * gaa.clone() + b.clone() * gbb.clone())
                            / n)
                    - 2.0 / 3.0 * n2.clone() * gnn
                    + (2.0 / 3.0 * n2.clone() - a.clone() * a) * gbb
                    + (2.0 / 3.0 * n2 - b.clone() * b) * gaa))
}

/// LYP correlation in the spin densities and their gradient invariants.
pub fn lyp_a_b_gaa_gab_gbb() -> Functional {
    Functional::define(
        "lyp_a_b_gaa_gab_gbb",
        ["a", "b", "gaa", "gab", "gbb"],
        |[a, b, gaa, gab, gbb]| lyp_energy(a, b, gaa, gab, gbb),
    )
}

/// Closed-shell LYP correlation in the total density and gradient invariant.
pub fn lyp_n_gnn() -> Functional {
    Functional::define("lyp_n_gnn", ["n", "gnn"], |[n, gnn]| {
        lyp_energy(
            0.5 * n.clone(),
            0.5 * n,
            0.25 * gnn.clone(),
            0.25 * gnn.clone(),
            0.25 * gnn,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::super::assert_close;
    use super::*;

    #[test]
    fn unpolarized_reference_values() {
        let fun = lyp_n_gnn();
        let point = [0.05, 0.05];

        assert_close(fun.derv(&point, &[0, 0]).unwrap(), 0.0004208778098598789);
        assert_close(fun.derv(&point, &[1, 0]).unwrap(), -0.092631049037734509);
        assert_close(fun.derv(&point, &[0, 1]).unwrap(), 0.038485303497764791);
    }

    #[test]
    fn polarized_reference_values() {
        let fun = lyp_a_b_gaa_gab_gbb();
        let point = [0.02, 0.05, 0.02, 0.03, 0.04];

        assert_close(
            fun.derv(&point, &[0, 0, 0, 0, 0]).unwrap(),
            0.001542746435862991,
        );
        assert_close(
            fun.derv(&point, &[1, 0, 0, 0, 0]).unwrap(),
            -0.24548979946312076,
        );
        assert_close(
            fun.derv(&point, &[0, 1, 0, 0, 0]).unwrap(),
            -0.049365492793595968,
        );
        assert_close(
            fun.derv(&point, &[0, 0, 1, 0, 0]).unwrap(),
            0.079345481803419906,
        );
        assert_close(
            fun.derv(&point, &[0, 0, 0, 1, 0]).unwrap(),
            0.070022728604069755,
        );
        assert_close(
            fun.derv(&point, &[0, 0, 0, 0, 1]).unwrap(),
            -0.0046091286083357232,
        );
    }

    #[test]
    fn closed_shell_matches_equal_spin_densities() {
        let unpolarized = lyp_n_gnn();
        let polarized = lyp_a_b_gaa_gab_gbb();
        let (n, gnn) = (0.05, 0.05);
        let split = [0.5 * n, 0.5 * n, 0.25 * gnn, 0.25 * gnn, 0.25 * gnn];

        assert_close(
            unpolarized.eval(&[n, gnn]).unwrap(),
            polarized.eval(&split).unwrap(),
        );

        // chain rule through gaa = gab = gbb = gnn/4
        let dg = unpolarized.derv(&[n, gnn], &[0, 1]).unwrap();
        let dgaa = polarized.derv(&split, &[0, 0, 1, 0, 0]).unwrap();
        let dgab = polarized.derv(&split, &[0, 0, 0, 1, 0]).unwrap();
        let dgbb = polarized.derv(&split, &[0, 0, 0, 0, 1]).unwrap();
        assert_close(dg, 0.25 * (dgaa + dgab + dgbb));
    }
}
