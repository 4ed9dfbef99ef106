//! Static user-equilibrium traffic assignment: builds a routable graph from a link
//! table, loads origin-destination demand all-or-nothing under a volume-delay
//! function, and drives it to equilibrium with MSA/FW/CFW/BFW.

pub mod assignment;
pub mod demand;
pub mod equilibrium;
pub mod error;
pub mod graph;
pub mod io;
pub mod logging;
pub mod routing;
pub mod traffic_class;
pub mod vdf;

pub use assignment::{Assignment, AssignmentResult};
pub use demand::DemandMatrix;
pub use equilibrium::direction::Algorithm;
pub use equilibrium::Outcome;
pub use error::{AssignmentError, ConfigError, NumericError, Result, TopologyError};
pub use graph::{Graph, GraphBuilder, LinkRecord};
pub use traffic_class::TrafficClass;
