//! Perdew-Burke-Ernzerhof exchange and correlation.

use std::f64::consts::{LN_2, PI};

use crate::expr::Expr;
use crate::functional::Functional;

use super::vwn::spin_interpolation;

const BETA: f64 = 0.06672455060314922;

fn gamma() -> f64 {
    (1.0 - LN_2) / (PI * PI)
}

fn beta_gamma() -> f64 {
    BETA / gamma()
}

/// LDA exchange energy density of one spin channel, the term the enhancement
/// factor multiplies.
fn pbex_prefactor(a: &Expr) -> Expr {
    let c = -0.75 * 2.0_f64.powf(1.0 / 3.0) * (3.0 * PI * PI).powf(1.0 / 3.0);
    c * a.clone().powf(4.0 / 3.0) / PI
}

/// PBE exchange enhancement factor F(s²) with kappa = r.
fn pbex_enhancement(r: f64, a: &Expr, gaa: &Expr) -> Expr {
    let mu = 0.066725 * PI * PI / 3.0;
    let st2 = gaa.clone() / a.clone().powf(8.0 / 3.0)
        * (6.0_f64.powf(2.0 / 3.0) / (12.0 * PI.powf(2.0 / 3.0))).powi(2);
    let t1 = 1.0 + mu * st2 / r;
    1.0 + r - r / t1
}

fn pbex_term(a: &Expr, gaa: &Expr) -> Expr {
    let kappa = 0.804;
    pbex_prefactor(a) * pbex_enhancement(kappa, a, gaa)
}

// PW92 fit parameters [A, alpha1, beta1, beta2, beta3, beta4] for the
// unpolarized and polarized correlation energy and the spin stiffness.
const PW92_UNPOLARIZED: [f64; 6] = [0.03109070, 0.21370, 7.59570, 3.5876, 1.63820, 0.49294];
const PW92_POLARIZED: [f64; 6] = [0.01554535, 0.20548, 14.1189, 6.1977, 3.36620, 0.62517];
const PW92_ALPHA: [f64; 6] = [0.01688690, 0.11125, 10.3570, 3.6231, 0.88026, 0.49671];

fn pw92_eopt(sqrtr: &Expr, t: &[f64; 6]) -> Expr {
    -2.0 * t[0]
        * (1.0 + t[1] * sqrtr.clone() * sqrtr.clone())
        * (1.0
            + 0.5
                / (t[0]
                    * (sqrtr.clone()
                        * (t[2]
                            + sqrtr.clone()
                                * (t[3] + sqrtr.clone() * (t[4] + t[5] * sqrtr.clone()))))))
            .ln()
}

fn pw92_omega(zeta: &Expr) -> Expr {
    (spin_interpolation(zeta, 4.0 / 3.0) - 2.0) / (2.0 * 2.0_f64.powf(1.0 / 3.0) - 2.0)
}

/// PW92 correlation energy per particle, the gradient-free part of PBE
/// correlation.
fn pw92_eps(zeta: &Expr, r_s: &Expr) -> Expr {
    let c = 8.0 / (9.0 * (2.0 * 2.0_f64.powf(1.0 / 3.0) - 2.0));
    let zeta4 = zeta.clone().powi(4);
    let omega = pw92_omega(zeta);
    let sqrtr = r_s.clone().powf(0.5);
    let e0 = pw92_eopt(&sqrtr, &PW92_UNPOLARIZED);

    e0.clone() - pw92_eopt(&sqrtr, &PW92_ALPHA) * omega.clone() * (1.0 - zeta4.clone()) / c
        + (pw92_eopt(&sqrtr, &PW92_POLARIZED) - e0) * omega * zeta4
}

fn pbec_a_factor(eps: &Expr, u3: &Expr) -> Expr {
    beta_gamma() / ((-eps.clone() / (gamma() * u3.clone())).exp() - 1.0)
}

/// The spin-scaling factor [(1+zeta)^(2/3) + (1-zeta)^(2/3)] / 2, expressed
/// in the spin densities directly.
fn pbec_phi(a: &Expr, b: &Expr) -> Expr {
    let n = a.clone() + b.clone();
    let c = 2.0_f64.powf(-1.0 / 3.0);
    let n_m13 = n.powf(-1.0 / 3.0);
    c * n_m13.clone() * n_m13 * (a.clone().powf(2.0 / 3.0) + b.clone().powf(2.0 / 3.0))
}

fn pbec_h(d2: &Expr, eps: &Expr, u3: &Expr) -> Expr {
    let d2a = d2.clone() * pbec_a_factor(eps, u3);
    gamma()
        * u3.clone()
        * (1.0
            + beta_gamma() * d2.clone() * (1.0 + d2a.clone())
                / (1.0 + d2a.clone() * (1.0 + d2a)))
            .ln()
}

fn pbec_energy(a: Expr, b: Expr, gnn: Expr) -> Expr {
    let n = a.clone() + b.clone();
    let zeta = (a.clone() - b.clone()) / n.clone();
    let r_s = (3.0 / (4.0 * PI * n.clone())).powf(1.0 / 3.0);
    let eps = pw92_eps(&zeta, &r_s);
    let u = pbec_phi(&a, &b);
    let d2 = (1.0 / 12.0 * 3.0_f64.powf(5.0 / 6.0) / PI.powf(-1.0 / 6.0)).powi(2) * gnn
        / (u.clone() * u.clone() * n.clone().powf(7.0 / 3.0));
    let u3 = u.clone() * u.clone() * u;
    n * (eps.clone() + pbec_h(&d2, &eps, &u3))
}

/// PBE exchange in the spin densities and their gradient invariants. The
/// cross invariant gab is accepted for signature compatibility and never
/// enters the formula.
pub fn pbex_a_b_gaa_gab_gbb() -> Functional {
    Functional::define(
        "pbex_a_b_gaa_gab_gbb",
        ["a", "b", "gaa", "gab", "gbb"],
        |[a, b, gaa, _gab, gbb]| pbex_term(&a, &gaa) + pbex_term(&b, &gbb),
    )
}

/// Closed-shell PBE exchange in the total density and gradient invariant.
pub fn pbex_n_gnn() -> Functional {
    Functional::define("pbex_n_gnn", ["n", "gnn"], |[n, gnn]| {
        let a = 0.5 * n;
        let gaa = 0.25 * gnn;
        pbex_term(&a, &gaa) + pbex_term(&a, &gaa)
    })
}

/// PBE correlation in the spin densities and their gradient invariants.
pub fn pbec_a_b_gaa_gab_gbb() -> Functional {
    Functional::define(
        "pbec_a_b_gaa_gab_gbb",
        ["a", "b", "gaa", "gab", "gbb"],
        |[a, b, gaa, gab, gbb]| {
            let gnn = gaa + 2.0 * gab + gbb;
            pbec_energy(a, b, gnn)
        },
    )
}

/// Closed-shell PBE correlation in the total density and gradient invariant.
pub fn pbec_n_gnn() -> Functional {
    Functional::define("pbec_n_gnn", ["n", "gnn"], |[n, gnn]| {
        pbec_energy(0.5 * n.clone(), 0.5 * n, gnn)
    })
}
