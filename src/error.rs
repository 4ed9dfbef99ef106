use thiserror::Error;

/// Errors raised while building or validating a [`crate::graph::Graph`].
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("duplicate link id {0}")]
    DuplicateLinkId(u64),

    #[error("link {link_id} references a-node {node} which is not in the node set")]
    DanglingANode { link_id: u64, node: u64 },

    #[error("link {link_id} references b-node {node} which is not in the node set")]
    DanglingBNode { link_id: u64, node: u64 },

    #[error("centroid {0} is not a node of the graph")]
    UnknownCentroid(u64),

    #[error("cost attribute '{0}' is not a numeric column on this graph")]
    NonNumericCostAttribute(String),

    #[error("link {0} has a negative cost")]
    NegativeCost(u64),
}

/// Errors raised while validating assignment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no traffic classes were configured; call set_classes() with at least one class")]
    NoClasses,

    #[error("no capacity field was configured; call set_capacity_field()")]
    MissingCapacityField,

    #[error("no free-flow-time field was configured; call set_time_field()")]
    MissingTimeField,

    #[error("unknown algorithm '{0}'; expected one of msa, fw, cfw, bfw")]
    UnknownAlgorithm(String),

    #[error("VDF parameter '{0}' is not bound to a constant or a known link attribute")]
    UnresolvedVdfParameter(String),

    #[error("rgap_target must be positive, got {0}")]
    InvalidRgapTarget(f64),

    #[error("maximum_iterations must be at least 1, got {0}")]
    InvalidMaxIter(usize),
}

/// Errors raised by the numerical core during an iteration.
#[derive(Debug, Error)]
pub enum NumericError {
    #[error("non-finite cost encountered on link {link} (value {value})")]
    NonFiniteCost { link: usize, value: f64 },

    #[error("non-finite flow encountered on link {link} (value {value})")]
    NonFiniteFlow { link: usize, value: f64 },

    #[error("line search failed to bracket a root and the heuristic fallback also failed")]
    LineSearchDivergence,
}

/// Top-level error type returned by the public API.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("{unreachable_count} origin-destination pair(s) had demand but no path; first offender: {0:?}", .first)]
    UnreachableDemand {
        unreachable_count: usize,
        first: Option<(u64, u64)>,
    },

    #[error("assignment was cancelled after iteration {last_completed_iter}")]
    Cancelled { last_completed_iter: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AssignmentError>;
