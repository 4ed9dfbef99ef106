//! CSV import/export for the tabular inputs and outputs described in the external
//! interfaces: link tables, centroid lists, demand tables, and per-class results.

pub mod demand;
pub mod links;
pub mod results;

pub use demand::read_demand;
pub use links::{read_centroids, read_links};
pub use results::write_class_results;
