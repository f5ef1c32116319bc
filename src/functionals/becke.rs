//! Becke 88 gradient-corrected exchange.

use crate::expr::Expr;
use crate::functional::Functional;

use super::slater::slater_term;

const BECKE_D: f64 = 0.0042;

/// B88 exchange energy density of one spin channel: the Slater term plus the
/// gradient correction in chi = sqrt(g) / rho^(4/3).
fn b88_term(density: Expr, grad: Expr) -> Expr {
    let na43 = density.clone().powf(4.0 / 3.0);
    let chi2 = grad * density.clone().powf(-8.0 / 3.0);
    let chi = chi2.clone().sqrt();
    let correction =
        -(BECKE_D * na43 * chi2) / (1.0 + 6.0 * BECKE_D * chi.clone() * chi.asinh());
    slater_term(density) + correction
}

/// B88 exchange in the spin densities and their gradient invariants.
pub fn b88_a_b_gaa_gbb() -> Functional {
    Functional::define("b88_a_b_gaa_gbb", ["a", "b", "gaa", "gbb"], |[a, b, gaa, gbb]| {
        b88_term(a, gaa) + b88_term(b, gbb)
    })
}

/// Closed-shell B88 exchange in the total density and gradient invariant.
pub fn b88_n_gnn() -> Functional {
    Functional::define("b88_n_gnn", ["n", "gnn"], |[n, gnn]| {
        b88_term(0.5 * n.clone(), 0.25 * gnn.clone()) + b88_term(0.5 * n, 0.25 * gnn)
    })
}
