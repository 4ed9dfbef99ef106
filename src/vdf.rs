//! Volume-delay functions: pure, vectorised, allocation-free link cost kernels.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::graph::Graph;

/// A per-link VDF parameter, resolved once before the solver loop starts: either a
/// constant shared by every link, or a reference to a named numeric link attribute.
#[derive(Debug, Clone)]
pub enum ParamBinding {
    Constant(f64),
    LinkAttribute(String),
}

/// Resolved, per-link parameter values — one `f64` per link, in link-index order.
#[derive(Debug, Clone)]
pub struct ResolvedParam(Vec<f64>);

impl ResolvedParam {
    fn resolve(binding: &ParamBinding, graph: &Graph) -> Result<ResolvedParam, ConfigError> {
        match binding {
            ParamBinding::Constant(v) => Ok(ResolvedParam(vec![*v; graph.link_count()])),
            ParamBinding::LinkAttribute(name) => {
                let mut values = Vec::with_capacity(graph.link_count());
                for link in graph.links() {
                    match link.attr(name) {
                        Some(v) => values.push(v),
                        None => return Err(ConfigError::UnresolvedVdfParameter(name.clone())),
                    }
                }
                Ok(ResolvedParam(values))
            }
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Volume-delay function family. The set is small and closed at compile time, so it is
/// modeled as a tagged enum rather than a trait object.
#[derive(Debug, Clone)]
pub enum Vdf {
    /// Bureau of Public Roads function: `t = fftime * (1 + alpha * (f/capacity)^beta)`.
    Bpr {
        alpha: ParamBinding,
        beta: ParamBinding,
    },
}

impl Vdf {
    pub fn bpr(alpha: ParamBinding, beta: ParamBinding) -> Vdf {
        Vdf::Bpr { alpha, beta }
    }

    /// Binds named/constant parameters against `graph`'s link attributes, producing a
    /// [`ResolvedVdf`] that can be evaluated without further lookups.
    pub fn resolve(&self, graph: &Graph) -> Result<ResolvedVdf, ConfigError> {
        match self {
            Vdf::Bpr { alpha, beta } => Ok(ResolvedVdf::Bpr {
                alpha: ResolvedParam::resolve(alpha, graph)?,
                beta: ResolvedParam::resolve(beta, graph)?,
            }),
        }
    }
}

/// A [`Vdf`] with its parameters already bound to per-link values.
#[derive(Debug, Clone)]
pub enum ResolvedVdf {
    Bpr {
        alpha: ResolvedParam,
        beta: ResolvedParam,
    },
}

impl ResolvedVdf {
    /// Writes `out[l] = t(flow[l]; capacity[l], fftime[l], params[l])` for every link.
    pub fn apply(&self, out: &mut [f64], flow: &[f64], capacity: &[f64], fftime: &[f64]) {
        match self {
            ResolvedVdf::Bpr { alpha, beta } => {
                let alpha = alpha.as_slice();
                let beta = beta.as_slice();
                for l in 0..out.len() {
                    let ratio = if capacity[l] > 0.0 {
                        flow[l] / capacity[l]
                    } else {
                        0.0
                    };
                    out[l] = fftime[l] * (1.0 + alpha[l] * ratio.powf(beta[l]));
                }
            }
        }
    }

    /// Writes `out[l] = dt/df |_{flow[l]}` for every link.
    pub fn apply_derivative(&self, out: &mut [f64], flow: &[f64], capacity: &[f64], fftime: &[f64]) {
        match self {
            ResolvedVdf::Bpr { alpha, beta } => {
                let alpha = alpha.as_slice();
                let beta = beta.as_slice();
                for l in 0..out.len() {
                    if capacity[l] <= 0.0 || beta[l] == 0.0 {
                        out[l] = 0.0;
                        continue;
                    }
                    let ratio = flow[l] / capacity[l];
                    out[l] = fftime[l] * alpha[l] * beta[l] * ratio.powf(beta[l] - 1.0)
                        / capacity[l];
                }
            }
        }
    }
}

/// Known VDF family names, for the `set_vdf(name)` façade entry point.
pub fn by_name(name: &str, parameters: &HashMap<String, ParamBinding>) -> Result<Vdf, ConfigError> {
    match name {
        "bpr" => {
            let alpha = parameters
                .get("alpha")
                .cloned()
                .unwrap_or(ParamBinding::Constant(0.15));
            let beta = parameters
                .get("beta")
                .cloned()
                .unwrap_or(ParamBinding::Constant(4.0));
            Ok(Vdf::bpr(alpha, beta))
        }
        other => Err(ConfigError::UnresolvedVdfParameter(format!(
            "unknown vdf '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpr_returns_free_flow_time_at_zero_flow() {
        let resolved = ResolvedVdf::Bpr {
            alpha: ResolvedParam(vec![0.15]),
            beta: ResolvedParam(vec![4.0]),
        };
        let mut out = vec![0.0];
        resolved.apply(&mut out, &[0.0], &[100.0], &[10.0]);
        assert_eq!(out[0], 10.0);
    }

    #[test]
    fn bpr_is_monotone_in_flow() {
        let resolved = ResolvedVdf::Bpr {
            alpha: ResolvedParam(vec![0.15]),
            beta: ResolvedParam(vec![4.0]),
        };
        let mut low = vec![0.0];
        let mut high = vec![0.0];
        resolved.apply(&mut low, &[50.0], &[100.0], &[10.0]);
        resolved.apply(&mut high, &[90.0], &[100.0], &[10.0]);
        assert!(high[0] > low[0]);
    }

    #[test]
    fn derivative_is_zero_at_zero_capacity() {
        let resolved = ResolvedVdf::Bpr {
            alpha: ResolvedParam(vec![0.15]),
            beta: ResolvedParam(vec![4.0]),
        };
        let mut out = vec![1.0];
        resolved.apply_derivative(&mut out, &[0.0], &[0.0], &[10.0]);
        assert_eq!(out[0], 0.0);
    }
}
