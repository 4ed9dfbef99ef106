//! Shortest-path computation and all-or-nothing demand loading.

pub mod all_or_nothing;
pub mod shortest_path;

pub use all_or_nothing::{load, AonResult};
pub use shortest_path::{Dijkstra, PathLinks, ShortestPathTree};
