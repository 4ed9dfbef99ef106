//! The iterative equilibration driver: direction choice, line search, convergence.

pub mod direction;
pub mod stepsize;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::error::{AssignmentError, NumericError};
use crate::graph::Graph;
use crate::routing::all_or_nothing;
use crate::traffic_class::TrafficClass;
use crate::vdf::ResolvedVdf;

use direction::{
    biconjugate_betas, conjugate_alpha, direction_kind, Algorithm, ClassVectors, DirectionKind,
    RestartFlags,
};
use stepsize::line_search;

/// One row of the per-iteration diagnostic trail exposed by the façade.
#[derive(Debug, Clone)]
pub struct IterationLog {
    pub iter: usize,
    pub rgap: f64,
    pub stepsize: f64,
    pub betas: [f64; 3],
}

/// Result of a completed `execute()` call. Non-convergence is not an error — it is a
/// reported outcome, carrying the best solution obtained within `max_iter`.
#[derive(Debug, Clone)]
pub enum Outcome {
    Converged { iterations: usize, rgap: f64 },
    MaxIterationsReached { iterations: usize, rgap: f64 },
    Cancelled { last_completed_iter: usize },
}

/// Per-class scratch that lives for the whole run and is mutated in place every
/// iteration: the all-or-nothing target and the three direction buffers, rotated by
/// swapping (never edited in place) to implement the double buffering §9 calls for.
struct ClassState {
    class: TrafficClass,
    direction: Vec<f64>,
    prev_direction: Vec<f64>,
    prev_prev_direction: Vec<f64>,
}

/// Owns the graph and all per-class state for one assignment run.
pub struct Equilibrator {
    graph: Graph,
    classes: Vec<ClassState>,
    vdf: ResolvedVdf,
    capacity: Vec<f64>,
    fftime: Vec<f64>,
    algorithm: Algorithm,
    rgap_target: f64,
    max_iter: usize,
    steps_below_needed_to_terminate: usize,
    record_skims: bool,
    log: Vec<IterationLog>,
    last_unreachable: Vec<(u64, u64)>,
}

impl Equilibrator {
    /// `capacity`/`fftime` are resolved by the caller from the façade's configured
    /// capacity/time fields (see `Assignment::execute`), not read from the graph's
    /// intrinsic `Link::capacity`/`Link::free_flow_time` here — a custom field name
    /// must actually change what the VDF evaluates against.
    pub fn new(
        graph: Graph,
        classes: Vec<TrafficClass>,
        vdf: ResolvedVdf,
        capacity: Vec<f64>,
        fftime: Vec<f64>,
        algorithm: Algorithm,
        rgap_target: f64,
        max_iter: usize,
        steps_below_needed_to_terminate: usize,
        record_skims: bool,
    ) -> Self {
        let link_count = graph.link_count();

        let classes = classes
            .into_iter()
            .map(|class| ClassState {
                class,
                direction: vec![0.0; link_count],
                prev_direction: vec![0.0; link_count],
                prev_prev_direction: vec![0.0; link_count],
            })
            .collect();

        Equilibrator {
            graph,
            classes,
            vdf,
            capacity,
            fftime,
            algorithm,
            rgap_target,
            max_iter,
            steps_below_needed_to_terminate,
            record_skims,
            log: Vec::new(),
            last_unreachable: Vec::new(),
        }
    }

    pub fn diagnostic_log(&self) -> &[IterationLog] {
        &self.log
    }

    /// Origin-destination pairs with demand but no path, from the most recently
    /// completed iteration's all-or-nothing pass.
    pub fn last_unreachable(&self) -> &[(u64, u64)] {
        &self.last_unreachable
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn class_link_loads(&self, class_index: usize) -> &[f64] {
        &self.classes[class_index].class.link_loads
    }

    /// Consumes the equilibrator, returning the (possibly cost-mutated) graph and the
    /// per-class results accumulated over the run.
    pub fn into_parts(self) -> (Graph, Vec<TrafficClass>) {
        let classes = self.classes.into_iter().map(|state| state.class).collect();
        (self.graph, classes)
    }

    fn aggregate_flow(&self, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        for state in &self.classes {
            state.class.pce_weighted_loads(out);
        }
    }

    fn link_count(&self) -> usize {
        self.graph.link_count()
    }

    /// Runs up to `max_iter` iterations, polling `cancel` (if given) between them.
    pub fn execute(&mut self, cancel: Option<&Arc<AtomicBool>>) -> Result<Outcome, AssignmentError> {
        let link_count = self.link_count();
        let mut flags = RestartFlags::default();
        let mut lambda_prev = 0.0_f64;

        let mut aggregate_x = vec![0.0; link_count];
        let mut aggregate_y = vec![0.0; link_count];
        let mut aggregate_d = vec![0.0; link_count];
        let mut aggregate_delta = vec![0.0; link_count];
        let mut hessian = vec![0.0; link_count];
        let mut scratch_flow = vec![0.0; link_count];
        let mut scratch_cost = vec![0.0; link_count];
        let mut new_cost = vec![0.0; link_count];

        let mut consecutive_below_target = 0usize;
        let mut last_rgap = 0.0;

        for iter in 1..=self.max_iter {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Ok(Outcome::Cancelled {
                        last_completed_iter: iter - 1,
                    });
                }
            }

            // 1. all-or-nothing loading for every class under the current cost vector
            let mut unreachable_total = Vec::new();
            for state in &mut self.classes {
                let result = all_or_nothing::load(&self.graph, &state.class.matrix, self.record_skims);
                unreachable_total.extend(result.unreachable.iter().copied());
                state.class.apply_aon_result(&result);
            }
            if !unreachable_total.is_empty() {
                log::warn!(
                    "{} origin-destination pair(s) had demand but no path on iteration {}",
                    unreachable_total.len(),
                    iter
                );
            }
            self.last_unreachable = unreachable_total;

            // 2. relative gap, measured against the cost vector used for this AoN pass
            self.aggregate_flow(&mut aggregate_x);
            aggregate_y.iter_mut().for_each(|v| *v = 0.0);
            for state in &self.classes {
                for (o, &f) in aggregate_y.iter_mut().zip(state.class.aon_loads.iter()) {
                    *o += f * state.class.pce;
                }
            }
            let cost = self.graph.cost();
            let cx: f64 = cost.iter().zip(aggregate_x.iter()).map(|(c, x)| c * x).sum();
            let cy: f64 = cost.iter().zip(aggregate_y.iter()).map(|(c, y)| c * y).sum();
            let rgap = if cx == 0.0 { 0.0 } else { (cx - cy).abs() / cx };
            last_rgap = rgap;

            // 3. direction choice
            let kind = direction_kind(self.algorithm, iter, flags);
            let mut betas = [1.0, 0.0, 0.0];
            let mut alpha = 0.0;

            match kind {
                DirectionKind::Seed | DirectionKind::Fw => {
                    for state in &mut self.classes {
                        state.direction.copy_from_slice(&state.class.aon_loads);
                    }
                    if kind == DirectionKind::Fw {
                        flags.do_fw_step = false;
                        flags.do_conjugate_step = true;
                    }
                }
                DirectionKind::Cfw => {
                    self.vdf
                        .apply_derivative(&mut hessian, &aggregate_x, &self.capacity, &self.fftime);
                    let vectors: Vec<ClassVectors> = self
                        .classes
                        .iter()
                        .map(|state| ClassVectors {
                            pce: state.class.pce,
                            x: &state.class.link_loads,
                            y: &state.class.aon_loads,
                            prev_direction: &state.prev_direction,
                            prev_prev_direction: &state.prev_prev_direction,
                        })
                        .collect();
                    alpha = conjugate_alpha(&vectors, &hessian);
                    for state in &mut self.classes {
                        for l in 0..link_count {
                            state.direction[l] = alpha * state.prev_direction[l]
                                + (1.0 - alpha) * state.class.aon_loads[l];
                        }
                    }
                    flags.do_conjugate_step = false;
                }
                DirectionKind::Bfw => {
                    self.vdf
                        .apply_derivative(&mut hessian, &aggregate_x, &self.capacity, &self.fftime);
                    let vectors: Vec<ClassVectors> = self
                        .classes
                        .iter()
                        .map(|state| ClassVectors {
                            pce: state.class.pce,
                            x: &state.class.link_loads,
                            y: &state.class.aon_loads,
                            prev_direction: &state.prev_direction,
                            prev_prev_direction: &state.prev_prev_direction,
                        })
                        .collect();
                    betas = biconjugate_betas(&vectors, &hessian, lambda_prev);
                    for state in &mut self.classes {
                        for l in 0..link_count {
                            state.direction[l] = betas[0] * state.class.aon_loads[l]
                                + betas[1] * state.prev_direction[l]
                                + betas[2] * state.prev_prev_direction[l];
                        }
                    }
                }
            }

            // 4. step size
            self.aggregate_flow(&mut aggregate_x);
            aggregate_d.iter_mut().for_each(|v| *v = 0.0);
            for state in &self.classes {
                for (o, &d) in aggregate_d.iter_mut().zip(state.direction.iter()) {
                    *o += d * state.class.pce;
                }
            }
            for l in 0..link_count {
                aggregate_delta[l] = aggregate_d[l] - aggregate_x[l];
            }

            // iteration 1 has no incumbent to blend with: `results := y_1` outright,
            // never a line-searched blend (there is nothing at x_0 to search against).
            let lambda = if kind == DirectionKind::Seed {
                1.0
            } else if self.algorithm == Algorithm::Msa {
                1.0 / iter as f64
            } else {
                let step = line_search(
                    &self.vdf,
                    &aggregate_x,
                    &aggregate_delta,
                    &self.capacity,
                    &self.fftime,
                    iter,
                    &mut scratch_flow,
                    &mut scratch_cost,
                );
                if !step.bracketed {
                    flags.do_fw_step = true;
                }
                step.lambda
            };

            if !(0.0..=1.0).contains(&lambda) || !lambda.is_finite() {
                return Err(NumericError::LineSearchDivergence.into());
            }

            // 5. update each class's own flow, then rotate the direction buffers
            for state in &mut self.classes {
                for l in 0..link_count {
                    state.class.link_loads[l] =
                        (1.0 - lambda) * state.class.link_loads[l] + lambda * state.direction[l];
                }
                if let Some((link, &value)) = state
                    .class
                    .link_loads
                    .iter()
                    .enumerate()
                    .find(|(_, f)| !f.is_finite())
                {
                    return Err(NumericError::NonFiniteFlow { link, value }.into());
                }
                std::mem::swap(&mut state.prev_prev_direction, &mut state.prev_direction);
                std::mem::swap(&mut state.prev_direction, &mut state.direction);
            }

            // 6. recompute congested cost and publish it for the next iteration's AoN
            self.aggregate_flow(&mut aggregate_x);
            self.vdf
                .apply(&mut new_cost, &aggregate_x, &self.capacity, &self.fftime);
            if let Some((link, &value)) = new_cost.iter().enumerate().find(|(_, c)| !c.is_finite()) {
                return Err(NumericError::NonFiniteCost { link, value }.into());
            }
            self.graph.set_cost(&new_cost);

            self.log.push(IterationLog {
                iter,
                rgap,
                stepsize: lambda,
                betas,
            });
            debug!(
                "iteration {}: rgap={:.6e} lambda={:.6} alpha={:.6} betas={:?}",
                iter, rgap, lambda, alpha, betas
            );

            lambda_prev = lambda;

            // iteration 1 only seeds `x` from zero, so its rgap is a zero-flow artifact,
            // not a real equilibrium measurement; the convergence check starts at iter 2.
            if iter > 1 && rgap < self.rgap_target {
                consecutive_below_target += 1;
            } else if iter > 1 {
                consecutive_below_target = 0;
            }
            if iter > 1 && consecutive_below_target >= self.steps_below_needed_to_terminate {
                info!("converged after {} iterations, rgap={:.6e}", iter, rgap);
                return Ok(Outcome::Converged {
                    iterations: iter,
                    rgap,
                });
            }
        }

        info!(
            "reached maximum_iterations={} without converging, rgap={:.6e}",
            self.max_iter, last_rgap
        );
        Ok(Outcome::MaxIterationsReached {
            iterations: self.max_iter,
            rgap: last_rgap,
        })
    }
}

