//! Vosko-Wilk-Nusair local correlation, parameterizations III and V.

use std::f64::consts::PI;

use crate::expr::Expr;
use crate::functional::Functional;

// Parameter sets [x0, A, b, c] of the RPA fit for the paramagnetic and
// ferromagnetic states and the spin stiffness.
const VWN5_PARA: [f64; 4] = [
    -0.10498,
    0.0621813817393097900698817274255,
    3.72744,
    12.9352,
];
const VWN5_FERRO: [f64; 4] = [
    -0.325,
    0.0310906908696548950349408637127,
    7.06042,
    18.0578,
];
const VWN5_INTER: [f64; 4] = [-0.0047584, -1.0 / (3.0 * PI * PI), 1.13107, 13.0045];

const VWN3_PARA: [f64; 4] = [-0.4092860, 0.0621814, 13.0720, 42.7198];
const VWN3_FERRO: [f64; 4] = [-0.7432940, 0.0310907, 20.1231, 101.578];
const VWN3_INTER: [f64; 4] = [-0.0047584, -0.0337737, 1.13107, 13.0045];

// 1 / (2 * (2^(1/3) - 1))
const SPIN_SCALE: f64 = 1.92366105093154;

fn vwn_a(p: &[f64; 4]) -> f64 {
    p[0] * p[2] / (p[0] * p[0] + p[0] * p[2] + p[3]) - 1.0
}

fn vwn_b(p: &[f64; 4]) -> f64 {
    2.0 * (p[0] * p[2] / (p[0] * p[0] + p[0] * p[2] + p[3]) - 1.0) + 2.0
}

fn vwn_c(p: &[f64; 4]) -> f64 {
    let q = (4.0 * p[3] - p[2] * p[2]).sqrt();
    2.0 * p[2]
        * (1.0 / q - p[0] / ((p[0] * p[0] + p[0] * p[2] + p[3]) * q / (p[2] + 2.0 * p[0])))
}

/// Correlation energy per particle of one parameter set, in s = sqrt(r_s).
fn vwn_eps(s: &Expr, p: &[f64; 4]) -> Expr {
    let x = s.clone() * s.clone() + p[2] * s.clone() + p[3];
    let y = s.clone() - p[0];
    let z = (4.0 * p[3] - p[2] * p[2]).sqrt() / (2.0 * s.clone() + p[2]);
    0.5 * p[1]
        * (2.0 * s.clone().ln() + vwn_a(p) * x.ln() - vwn_b(p) * y.ln() + vwn_c(p) * z.atan())
}

/// (1 + zeta)^e + (1 - zeta)^e, the spin-interpolation building block.
pub(super) fn spin_interpolation(zeta: &Expr, exponent: f64) -> Expr {
    (1.0 + zeta.clone()).powf(exponent) + (1.0 - zeta.clone()).powf(exponent)
}

fn vwn5_energy(a: Expr, b: Expr) -> Expr {
    let n = a.clone() + b.clone();
    let r_s = (3.0 / (4.0 * PI * n.clone())).powf(1.0 / 3.0);
    let s = r_s.powf(0.5);

    let zeta = (a - b) / n.clone();
    let g = SPIN_SCALE * (spin_interpolation(&zeta, 4.0 / 3.0) - 2.0);
    let zeta4 = zeta.powi(4);
    let dd = g * ((vwn_eps(&s, &VWN5_FERRO) - vwn_eps(&s, &VWN5_PARA)) * zeta4.clone()
        + vwn_eps(&s, &VWN5_INTER)
            * (1.0 - zeta4)
            * (9.0 / 4.0 * (2.0_f64.powf(1.0 / 3.0) - 1.0)));

    n * (vwn_eps(&s, &VWN5_PARA) + dd)
}

fn vwn3_energy(a: Expr, b: Expr) -> Expr {
    let n = a.clone() + b.clone();
    let r_s = (3.0 / (4.0 * PI * n.clone())).powf(1.0 / 3.0);
    let s = r_s.powf(0.5);

    let zeta = (a - b) / n.clone();
    let g = SPIN_SCALE * (spin_interpolation(&zeta, 4.0 / 3.0) - 2.0);
    let dd = g * (vwn_eps(&s, &VWN3_FERRO) - vwn_eps(&s, &VWN3_PARA));

    n * (vwn_eps(&s, &VWN3_PARA) + dd)
}

/// VWN V correlation in the spin densities a and b.
pub fn vwn5_a_b() -> Functional {
    Functional::define("vwn5_a_b", ["a", "b"], |[a, b]| vwn5_energy(a, b))
}

/// Closed-shell VWN V correlation in the total density n.
pub fn vwn5_n() -> Functional {
    Functional::define("vwn5_n", ["n"], |[n]| {
        vwn5_energy(0.5 * n.clone(), 0.5 * n)
    })
}

/// VWN III correlation in the spin densities a and b.
pub fn vwn3_a_b() -> Functional {
    Functional::define("vwn3_a_b", ["a", "b"], |[a, b]| vwn3_energy(a, b))
}

/// Closed-shell VWN III correlation in the total density n.
pub fn vwn3_n() -> Functional {
    Functional::define("vwn3_n", ["n"], |[n]| {
        vwn3_energy(0.5 * n.clone(), 0.5 * n)
    })
}
