//! The public façade: validates configuration, drives the [`Equilibrator`], exposes
//! results. Mirrors the teacher's builder-style `Config` structs, but since validation
//! can only happen once the whole problem is assembled, setters mutate `&mut self`
//! and `execute()` is where everything is checked.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::info;

use crate::equilibrium::direction::Algorithm;
use crate::equilibrium::{Equilibrator, IterationLog, Outcome};
use crate::error::{ConfigError, Result};
use crate::graph::Graph;
use crate::traffic_class::TrafficClass;
use crate::vdf::{self, ParamBinding};

/// Builder + driver for one assignment run. Configuration methods return `&mut Self`
/// for chaining; nothing is validated until [`Assignment::execute`].
pub struct Assignment {
    graph: Option<Graph>,
    classes: Vec<TrafficClass>,
    vdf_name: String,
    vdf_parameters: HashMap<String, ParamBinding>,
    capacity_field: Option<String>,
    time_field: Option<String>,
    algorithm: Algorithm,
    rgap_target: f64,
    max_iter: usize,
    steps_below_needed_to_terminate: usize,
    record_skims: bool,
    blocked_centroid_flows: bool,
}

/// The solved state returned by [`Assignment::execute`] on success (including
/// non-convergence, which is reported rather than treated as an error).
pub struct AssignmentResult {
    pub outcome: Outcome,
    pub graph: Graph,
    pub classes: Vec<TrafficClass>,
    pub diagnostic_log: Vec<IterationLog>,
}

impl Assignment {
    pub fn new(graph: Graph) -> Self {
        Assignment {
            graph: Some(graph),
            classes: Vec::new(),
            vdf_name: "bpr".to_owned(),
            vdf_parameters: HashMap::new(),
            capacity_field: None,
            time_field: None,
            algorithm: Algorithm::default(),
            rgap_target: 1e-4,
            max_iter: 500,
            steps_below_needed_to_terminate: 1,
            record_skims: false,
            blocked_centroid_flows: false,
        }
    }

    pub fn set_classes(&mut self, classes: Vec<TrafficClass>) -> &mut Self {
        self.classes = classes;
        self
    }

    pub fn set_vdf(&mut self, name: impl Into<String>) -> &mut Self {
        self.vdf_name = name.into();
        self
    }

    pub fn set_vdf_parameters(&mut self, parameters: HashMap<String, ParamBinding>) -> &mut Self {
        self.vdf_parameters = parameters;
        self
    }

    pub fn set_capacity_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.capacity_field = Some(field.into());
        self
    }

    pub fn set_time_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.time_field = Some(field.into());
        self
    }

    pub fn set_algorithm(&mut self, name: &str) -> Result<&mut Self> {
        self.algorithm = Algorithm::by_name(name)?;
        Ok(self)
    }

    pub fn set_rgap_target(&mut self, target: f64) -> &mut Self {
        self.rgap_target = target;
        self
    }

    pub fn set_max_iter(&mut self, max_iter: usize) -> &mut Self {
        self.max_iter = max_iter;
        self
    }

    pub fn set_steps_below_needed_to_terminate(&mut self, steps: usize) -> &mut Self {
        self.steps_below_needed_to_terminate = steps;
        self
    }

    pub fn set_record_skims(&mut self, record: bool) -> &mut Self {
        self.record_skims = record;
        self
    }

    pub fn set_blocked_centroid_flows(&mut self, blocked: bool) -> &mut Self {
        self.blocked_centroid_flows = blocked;
        self
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.classes.is_empty() {
            return Err(ConfigError::NoClasses);
        }
        if self.capacity_field.is_none() {
            return Err(ConfigError::MissingCapacityField);
        }
        if self.time_field.is_none() {
            return Err(ConfigError::MissingTimeField);
        }
        if self.rgap_target <= 0.0 {
            return Err(ConfigError::InvalidRgapTarget(self.rgap_target));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::InvalidMaxIter(self.max_iter));
        }
        Ok(())
    }

    /// Validates configuration, resolves the VDF against the graph, and runs the
    /// equilibrator to completion (convergence, max-iterations, or cancellation).
    pub fn execute(mut self, cancel: Option<&Arc<AtomicBool>>) -> Result<AssignmentResult> {
        self.validate()?;

        let mut graph = self.graph.take().expect("graph is set at construction and only taken here");
        graph.set_blocked_centroid_flows(self.blocked_centroid_flows);
        let time_field = self.time_field.as_deref().unwrap();
        let capacity_field = self.capacity_field.as_deref().unwrap();
        graph.set_cost_field(time_field)?;
        let capacity = graph.resolve_numeric_field(capacity_field)?;
        let fftime = graph.resolve_numeric_field(time_field)?;

        let vdf = vdf::by_name(&self.vdf_name, &self.vdf_parameters)?;
        let resolved_vdf = vdf.resolve(&graph)?;

        info!(
            "starting assignment: {} classes, algorithm={:?}, rgap_target={}, max_iter={}",
            self.classes.len(),
            self.algorithm,
            self.rgap_target,
            self.max_iter
        );

        let mut equilibrator = Equilibrator::new(
            graph,
            self.classes,
            resolved_vdf,
            capacity,
            fftime,
            self.algorithm,
            self.rgap_target,
            self.max_iter,
            self.steps_below_needed_to_terminate,
            self.record_skims,
        );

        let outcome = equilibrator.execute(cancel)?;
        let diagnostic_log = equilibrator.diagnostic_log().to_vec();
        let (graph, classes) = equilibrator.into_parts();

        Ok(AssignmentResult {
            outcome,
            graph,
            classes,
            diagnostic_log,
        })
    }
}
