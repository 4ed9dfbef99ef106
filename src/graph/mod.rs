//! Immutable, indexed representation of the routable network.
//!
//! A [`Graph`] is built once per assignment run via [`GraphBuilder`] and never
//! mutated afterwards, except for the per-iteration `cost` vector, which the
//! equilibrium driver overwrites in place between iterations.

pub mod builder;

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Deref};

pub use builder::{GraphBuilder, LinkRecord};

//------------------------------------------------------------------------------------------------//
// index newtypes

/// Index into the dense node array of a [`Graph`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIdx(usize);

impl NodeIdx {
    pub fn new(idx: usize) -> Self {
        NodeIdx(idx)
    }

    pub fn zero() -> Self {
        NodeIdx(0)
    }
}

impl Deref for NodeIdx {
    type Target = usize;

    fn deref(&self) -> &usize {
        &self.0
    }
}

impl From<usize> for NodeIdx {
    fn from(idx: usize) -> Self {
        NodeIdx(idx)
    }
}

impl Add<usize> for NodeIdx {
    type Output = NodeIdx;

    fn add(self, rhs: usize) -> NodeIdx {
        NodeIdx(self.0 + rhs)
    }
}

impl AddAssign<usize> for NodeIdx {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the dense (directed) link array of a [`Graph`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeIdx(usize);

impl EdgeIdx {
    pub fn new(idx: usize) -> Self {
        EdgeIdx(idx)
    }
}

impl Deref for EdgeIdx {
    type Target = usize;

    fn deref(&self) -> &usize {
        &self.0
    }
}

impl From<usize> for EdgeIdx {
    fn from(idx: usize) -> Self {
        EdgeIdx(idx)
    }
}

impl fmt::Display for EdgeIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//------------------------------------------------------------------------------------------------//
// link

/// A single directed link. Bidirectional input rows are expanded into two of these.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: u64,
    pub a_node: NodeIdx,
    pub b_node: NodeIdx,
    pub free_flow_time: f64,
    pub capacity: f64,
    pub length: f64,
    pub modes: String,
    attrs: HashMap<String, f64>,
}

impl Link {
    pub fn attr(&self, name: &str) -> Option<f64> {
        match name {
            "free_flow_time" => Some(self.free_flow_time),
            "capacity" => Some(self.capacity),
            "length" => Some(self.length),
            _ => self.attrs.get(name).copied(),
        }
    }

    pub fn allows_mode(&self, mode: char) -> bool {
        self.modes.contains(mode)
    }
}

//------------------------------------------------------------------------------------------------//
// graph

/// Forward-star range of link indices leaving a node: `fwd_offsets[n]..fwd_offsets[n+1]`.
#[derive(Debug, Clone)]
pub struct Graph {
    node_ids: Vec<u64>,
    node_id_to_idx: HashMap<u64, NodeIdx>,
    centroids: Vec<NodeIdx>,
    is_centroid: Vec<bool>,
    links: Vec<Link>,
    /// Forward-star offsets, sorted by `a_node`. Length is `node_count() + 1`.
    fwd_offsets: Vec<usize>,
    /// `fwd_links[fwd_offsets[n]..fwd_offsets[n+1]]` are the link indices leaving node `n`.
    fwd_links: Vec<EdgeIdx>,
    cost: Vec<f64>,
    blocked_centroid_flows: bool,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node_id(&self, idx: NodeIdx) -> u64 {
        self.node_ids[*idx]
    }

    pub fn node_idx(&self, id: u64) -> Option<NodeIdx> {
        self.node_id_to_idx.get(&id).copied()
    }

    pub fn centroids(&self) -> &[NodeIdx] {
        &self.centroids
    }

    pub fn is_centroid(&self, idx: NodeIdx) -> bool {
        self.is_centroid[*idx]
    }

    pub fn link(&self, idx: EdgeIdx) -> &Link {
        &self.links[*idx]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Link indices leaving `node`, i.e. the forward star of `node`.
    pub fn leaving_links(&self, node: NodeIdx) -> &[EdgeIdx] {
        let start = self.fwd_offsets[*node];
        let end = self.fwd_offsets[*node + 1];
        &self.fwd_links[start..end]
    }

    pub fn blocked_centroid_flows(&self) -> bool {
        self.blocked_centroid_flows
    }

    pub fn set_blocked_centroid_flows(&mut self, blocked: bool) {
        self.blocked_centroid_flows = blocked;
    }

    /// Current per-link cost vector, in link-index order. Mutated in place by the driver.
    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    pub fn set_cost(&mut self, cost: &[f64]) {
        debug_assert_eq!(cost.len(), self.cost.len());
        self.cost.copy_from_slice(cost);
    }

    /// Points `cost` at a named numeric link attribute (e.g. `"free_flow_time"`),
    /// rejecting negative values per the `cost[l] >= 0` invariant.
    pub fn set_cost_field(&mut self, field: &str) -> Result<(), crate::error::TopologyError> {
        let resolved = self.resolve_numeric_field(field)?;
        for (link, &value) in self.links.iter().zip(resolved.iter()) {
            if value < 0.0 {
                return Err(crate::error::TopologyError::NegativeCost(link.id));
            }
        }
        self.cost = resolved;
        Ok(())
    }

    /// Reads a named numeric link attribute into a fresh per-link vector, in link-index
    /// order, without touching `cost`. Used for any field a caller needs resolved once
    /// up front — e.g. the capacity column a VDF evaluates against.
    pub fn resolve_numeric_field(&self, field: &str) -> Result<Vec<f64>, crate::error::TopologyError> {
        let mut resolved = Vec::with_capacity(self.links.len());
        for link in &self.links {
            match link.attr(field) {
                Some(v) => resolved.push(v),
                None => {
                    return Err(crate::error::TopologyError::NonNumericCostAttribute(
                        field.to_owned(),
                    ))
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_idx_increments_like_a_counter() {
        let mut idx = NodeIdx::zero();
        idx += 1;
        idx += 1;
        assert_eq!(idx, NodeIdx::new(2));
    }
}
