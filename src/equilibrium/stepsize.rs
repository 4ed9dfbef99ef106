//! Line search for the 1-D Beckmann sub-objective along the chosen descent direction.

use crate::vdf::ResolvedVdf;

const MAX_BISECTION_ITERS: usize = 50;
const BISECTION_TOLERANCE: f64 = 1e-9;

/// Outcome of one line search: the step size plus whether the bracketed solve
/// actually found a sign change (`false` means the heuristic fallback fired and the
/// caller must set `do_fw_step` for the next iteration).
pub struct StepSize {
    pub lambda: f64,
    pub bracketed: bool,
}

/// Evaluates `phi'(lambda) = dot(t(x + lambda * delta), delta)` for the aggregate flow
/// `x`, aggregate direction delta `delta = d - x`, using `vdf` and per-link
/// `capacity`/`fftime`. `scratch_flow` and `scratch_cost` are reused across calls to
/// avoid allocating inside the search loop.
fn phi_prime(
    vdf: &ResolvedVdf,
    x: &[f64],
    delta: &[f64],
    capacity: &[f64],
    fftime: &[f64],
    lambda: f64,
    scratch_flow: &mut [f64],
    scratch_cost: &mut [f64],
) -> f64 {
    for l in 0..x.len() {
        scratch_flow[l] = x[l] + lambda * delta[l];
    }
    vdf.apply(scratch_cost, scratch_flow, capacity, fftime);
    scratch_cost
        .iter()
        .zip(delta.iter())
        .map(|(c, d)| c * d)
        .sum()
}

/// Finds `lambda` in `[0, 1]` with `phi'(lambda) = 0` by bisection when `phi'(0)` and
/// `phi'(1)` bracket a root, falling back to the heuristic in §4.4 otherwise:
/// `phi'(0) < phi'(1)` picks `lambda = 1/iter` and asks for a forced FW restart, else
/// `lambda = 1`.
#[allow(clippy::too_many_arguments)]
pub fn line_search(
    vdf: &ResolvedVdf,
    x: &[f64],
    delta: &[f64],
    capacity: &[f64],
    fftime: &[f64],
    iter: usize,
    scratch_flow: &mut [f64],
    scratch_cost: &mut [f64],
) -> StepSize {
    let at = |lambda: f64, flow: &mut [f64], cost: &mut [f64]| {
        phi_prime(vdf, x, delta, capacity, fftime, lambda, flow, cost)
    };

    let phi_at_0 = at(0.0, scratch_flow, scratch_cost);
    let phi_at_1 = at(1.0, scratch_flow, scratch_cost);

    if phi_at_0 == 0.0 {
        return StepSize {
            lambda: 0.0,
            bracketed: true,
        };
    }
    if phi_at_1 == 0.0 {
        return StepSize {
            lambda: 1.0,
            bracketed: true,
        };
    }

    if phi_at_0.signum() != phi_at_1.signum() {
        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        let mut phi_lo = phi_at_0;

        for _ in 0..MAX_BISECTION_ITERS {
            let mid = 0.5 * (lo + hi);
            let phi_mid = at(mid, scratch_flow, scratch_cost);
            if phi_mid.abs() < BISECTION_TOLERANCE || (hi - lo) < BISECTION_TOLERANCE {
                return StepSize {
                    lambda: mid.clamp(0.0, 1.0),
                    bracketed: true,
                };
            }
            if phi_mid.signum() == phi_lo.signum() {
                lo = mid;
                phi_lo = phi_mid;
            } else {
                hi = mid;
            }
        }

        return StepSize {
            lambda: (0.5 * (lo + hi)).clamp(0.0, 1.0),
            bracketed: true,
        };
    }

    // no sign change on the bracket: fall back to the designed-in heuristic
    if phi_at_0 < phi_at_1 {
        StepSize {
            lambda: (1.0 / iter as f64).clamp(0.0, 1.0),
            bracketed: false,
        }
    } else {
        StepSize {
            lambda: 1.0,
            bracketed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdf::{ParamBinding, Vdf};
    use crate::graph::{GraphBuilder, LinkRecord};

    #[test]
    fn finds_the_equalising_split_on_two_parallel_links() {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(
                LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0).with_attr("alpha", 0.15).with_attr("beta", 4.0),
            )
            .unwrap()
            .push_link(
                LinkRecord::new(2, 1, 2, 1, 200.0, 12.0, 1.0).with_attr("alpha", 0.15).with_attr("beta", 4.0),
            )
            .unwrap();
        let graph = builder.finalize(&[1, 2]).unwrap();

        let vdf = Vdf::bpr(
            ParamBinding::LinkAttribute("alpha".into()),
            ParamBinding::LinkAttribute("beta".into()),
        )
        .resolve(&graph)
        .unwrap();

        let capacity: Vec<f64> = graph.links().iter().map(|l| l.capacity).collect();
        let fftime: Vec<f64> = graph.links().iter().map(|l| l.free_flow_time).collect();

        // x_0 = 0, direction d = all-or-nothing onto link 1 (cheapest at zero flow)
        let x = vec![0.0, 0.0];
        let delta = vec![200.0, 0.0];

        let mut flow = vec![0.0; 2];
        let mut cost = vec![0.0; 2];
        let step = line_search(&vdf, &x, &delta, &capacity, &fftime, 2, &mut flow, &mut cost);
        assert!(step.bracketed);
        assert!(step.lambda > 0.0 && step.lambda < 1.0);
    }
}
