//! Origin-destination demand matrices, indexed by position in a [`Graph`]'s centroid list.

use std::collections::HashMap;

use crate::error::TopologyError;
use crate::graph::Graph;

/// A dense origin-destination trip table. Rows and columns are positions into
/// `graph.centroids()`, not raw node ids — [`DemandMatrix::from_long_format`] does the
/// id-to-position lookup once at construction time so the hot loop never has to.
#[derive(Debug, Clone)]
pub struct DemandMatrix {
    n: usize,
    trips: Vec<f64>,
}

impl DemandMatrix {
    /// Builds an all-zero matrix sized to `graph`'s centroid count.
    pub fn zeros(graph: &Graph) -> Self {
        let n = graph.centroids().len();
        DemandMatrix {
            n,
            trips: vec![0.0; n * n],
        }
    }

    /// Builds a matrix from a dense `n x n` row-major table already in centroid-position
    /// order (`rows[i][j]` is trips from `graph.centroids()[i]` to `graph.centroids()[j]`).
    pub fn from_dense(graph: &Graph, rows: Vec<Vec<f64>>) -> Result<Self, TopologyError> {
        let n = graph.centroids().len();
        let mut trips = vec![0.0; n * n];
        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                if i < n && j < n {
                    trips[i * n + j] = value;
                }
            }
        }
        Ok(DemandMatrix { n, trips })
    }

    /// Builds a matrix from `(origin_node_id, destination_node_id, trips)` rows, resolving
    /// node ids to centroid positions against `graph`.
    pub fn from_long_format(
        graph: &Graph,
        rows: &[(u64, u64, f64)],
    ) -> Result<Self, TopologyError> {
        let n = graph.centroids().len();
        let position: HashMap<u64, usize> = graph
            .centroids()
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (graph.node_id(idx), pos))
            .collect();

        let mut trips = vec![0.0; n * n];
        for &(origin, dest, value) in rows {
            let oi = *position
                .get(&origin)
                .ok_or(TopologyError::UnknownCentroid(origin))?;
            let di = *position
                .get(&dest)
                .ok_or(TopologyError::UnknownCentroid(dest))?;
            trips[oi * n + di] += value;
        }
        Ok(DemandMatrix { n, trips })
    }

    pub fn centroid_count(&self) -> usize {
        self.n
    }

    /// Trips from centroid position `origin` to centroid position `dest`.
    pub fn get(&self, origin: usize, dest: usize) -> f64 {
        self.trips[origin * self.n + dest]
    }

    /// All destinations (as centroid positions) with nonzero demand from `origin`.
    pub fn destinations_from(&self, origin: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = origin * self.n;
        self.trips[start..start + self.n]
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(j, &v)| (j, v))
    }

    /// Total trips across all origin-destination pairs.
    pub fn total(&self) -> f64 {
        self.trips.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, LinkRecord};

    fn two_centroid_graph() -> Graph {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap();
        builder.finalize(&[1, 2]).unwrap()
    }

    #[test]
    fn long_format_resolves_node_ids_to_centroid_positions() {
        let graph = two_centroid_graph();
        let matrix =
            DemandMatrix::from_long_format(&graph, &[(1, 2, 500.0)]).unwrap();
        assert_eq!(matrix.get(0, 1), 500.0);
        assert_eq!(matrix.total(), 500.0);
    }

    #[test]
    fn unknown_origin_id_is_rejected() {
        let graph = two_centroid_graph();
        let err = DemandMatrix::from_long_format(&graph, &[(99, 2, 1.0)]);
        assert!(matches!(err, Err(TopologyError::UnknownCentroid(99))));
    }
}
