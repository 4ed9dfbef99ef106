use std::collections::{BTreeMap, HashMap};

use log::info;

use super::{EdgeIdx, Graph, Link, NodeIdx};
use crate::error::TopologyError;

//------------------------------------------------------------------------------------------------//

/// One input row describing a (possibly bidirectional) physical link.
///
/// `direction = 0` means bidirectional and expands into two directed [`Link`]s;
/// `+1`/`-1` means a single directed link, with the sign selecting which of
/// `a_node -> b_node` / `b_node -> a_node` is kept.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub link_id: u64,
    pub a_node: u64,
    pub b_node: u64,
    pub direction: i8,
    pub capacity: f64,
    pub free_flow_time: f64,
    pub length: f64,
    pub modes: String,
    pub attrs: HashMap<String, f64>,
}

impl LinkRecord {
    pub fn new(
        link_id: u64,
        a_node: u64,
        b_node: u64,
        direction: i8,
        capacity: f64,
        free_flow_time: f64,
        length: f64,
    ) -> Self {
        LinkRecord {
            link_id,
            a_node,
            b_node,
            direction,
            capacity,
            free_flow_time,
            length,
            modes: String::new(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_modes(mut self, modes: impl Into<String>) -> Self {
        self.modes = modes.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }
}

/// handy for remembering the directed-link's originating row while sorting by a_node
struct ProtoLink {
    directed_id: u64,
    a_node: u64,
    b_node: u64,
    free_flow_time: f64,
    capacity: f64,
    length: f64,
    modes: String,
    attrs: HashMap<String, f64>,
}

//------------------------------------------------------------------------------------------------//
// graph building

/// Accumulates [`LinkRecord`]s and centroid ids, then finalizes them into an
/// immutable, forward-star-indexed [`Graph`].
pub struct GraphBuilder {
    seen_link_ids: std::collections::HashSet<u64>,
    proto_links: Vec<ProtoLink>,
    proto_node_ids: std::collections::BTreeSet<u64>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            seen_link_ids: std::collections::HashSet::new(),
            proto_links: Vec::new(),
            proto_node_ids: std::collections::BTreeSet::new(),
        }
    }

    /// Pushes one input row, expanding `direction == 0` into two directed links.
    pub fn push_link(&mut self, record: LinkRecord) -> Result<&mut Self, TopologyError> {
        if !self.seen_link_ids.insert(record.link_id) {
            return Err(TopologyError::DuplicateLinkId(record.link_id));
        }

        self.proto_node_ids.insert(record.a_node);
        self.proto_node_ids.insert(record.b_node);

        match record.direction {
            0 => {
                self.proto_links.push(ProtoLink {
                    directed_id: record.link_id,
                    a_node: record.a_node,
                    b_node: record.b_node,
                    free_flow_time: record.free_flow_time,
                    capacity: record.capacity,
                    length: record.length,
                    modes: record.modes.clone(),
                    attrs: record.attrs.clone(),
                });
                self.proto_links.push(ProtoLink {
                    directed_id: record.link_id,
                    a_node: record.b_node,
                    b_node: record.a_node,
                    free_flow_time: record.free_flow_time,
                    capacity: record.capacity,
                    length: record.length,
                    modes: record.modes,
                    attrs: record.attrs,
                });
            }
            d if d > 0 => self.proto_links.push(ProtoLink {
                directed_id: record.link_id,
                a_node: record.a_node,
                b_node: record.b_node,
                free_flow_time: record.free_flow_time,
                capacity: record.capacity,
                length: record.length,
                modes: record.modes,
                attrs: record.attrs,
            }),
            _ => self.proto_links.push(ProtoLink {
                directed_id: record.link_id,
                a_node: record.b_node,
                b_node: record.a_node,
                free_flow_time: record.free_flow_time,
                capacity: record.capacity,
                length: record.length,
                modes: record.modes,
                attrs: record.attrs,
            }),
        }

        Ok(self)
    }

    /// Builds the immutable [`Graph`], validating centroid membership and
    /// constructing the forward-star index sorted by `a_node`.
    pub fn finalize(mut self, centroids: &[u64]) -> Result<Graph, TopologyError> {
        info!(
            "Finalizing graph with {} nodes and {} directed links.",
            self.proto_node_ids.len(),
            self.proto_links.len()
        );

        // dense node ids, sorted ascending (BTreeSet is already sorted)
        let node_ids: Vec<u64> = self.proto_node_ids.into_iter().collect();
        let mut node_id_to_idx: BTreeMap<u64, NodeIdx> = BTreeMap::new();
        for (idx, &id) in node_ids.iter().enumerate() {
            node_id_to_idx.insert(id, NodeIdx::new(idx));
        }

        let mut centroid_idxs = Vec::with_capacity(centroids.len());
        let mut is_centroid = vec![false; node_ids.len()];
        for &id in centroids {
            let idx = *node_id_to_idx
                .get(&id)
                .ok_or(TopologyError::UnknownCentroid(id))?;
            centroid_idxs.push(idx);
            is_centroid[*idx] = true;
        }

        // sort directed links by ascending a_node, stable (so link-id order is the tie-break,
        // matching the spec's "stable loading" requirement)
        self.proto_links.sort_by(|a, b| a.a_node.cmp(&b.a_node));

        let mut links = Vec::with_capacity(self.proto_links.len());
        for proto in &self.proto_links {
            let a_idx = *node_id_to_idx
                .get(&proto.a_node)
                .ok_or(TopologyError::DanglingANode {
                    link_id: proto.directed_id,
                    node: proto.a_node,
                })?;
            let b_idx = *node_id_to_idx
                .get(&proto.b_node)
                .ok_or(TopologyError::DanglingBNode {
                    link_id: proto.directed_id,
                    node: proto.b_node,
                })?;
            links.push(Link {
                id: proto.directed_id,
                a_node: a_idx,
                b_node: b_idx,
                free_flow_time: proto.free_flow_time,
                capacity: proto.capacity,
                length: proto.length,
                modes: proto.modes.clone(),
                attrs: proto.attrs.clone(),
            });
        }

        // forward-star offsets: fwd_offsets[n]..fwd_offsets[n+1] are the link indices leaving n
        let mut fwd_offsets = Vec::with_capacity(node_ids.len() + 1);
        let mut fwd_links = Vec::with_capacity(links.len());
        let mut node_cursor = NodeIdx::zero();
        let mut offset = 0usize;
        fwd_offsets.push(offset);
        for (link_idx, link) in links.iter().enumerate() {
            while node_cursor != link.a_node {
                node_cursor += 1;
                fwd_offsets.push(offset);
            }
            fwd_links.push(EdgeIdx::new(link_idx));
            offset += 1;
        }
        // trailing nodes with no leaving links (including the final upper bound) still need
        // an offset entry each, so `leaving_links(n)` stays well-defined for every node.
        while fwd_offsets.len() < node_ids.len() + 1 {
            fwd_offsets.push(offset);
        }
        debug_assert_eq!(fwd_offsets.len(), node_ids.len() + 1);

        let cost = links.iter().map(|l| l.free_flow_time).collect();

        info!("Finished finalizing graph.");

        Ok(Graph {
            node_ids,
            node_id_to_idx: node_id_to_idx.into_iter().collect(),
            centroids: centroid_idxs,
            is_centroid,
            links,
            fwd_offsets,
            fwd_links,
            cost,
            blocked_centroid_flows: false,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
