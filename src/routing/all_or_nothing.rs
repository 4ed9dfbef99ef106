//! All-or-nothing loading: assigns every origin's demand onto its current shortest path.

use rayon::prelude::*;

use crate::demand::DemandMatrix;
use crate::graph::Graph;
use crate::routing::shortest_path::Dijkstra;

/// Output of one all-or-nothing pass: per-link loads plus any demand that could not
/// be routed under the current cost vector.
#[derive(Debug, Clone)]
pub struct AonResult {
    /// Trips loaded onto each link, in link-index order.
    pub link_loads: Vec<f64>,
    /// Shortest travel time for every reached (origin, destination) pair with demand,
    /// indexed the same way as `DemandMatrix` (centroid positions), present only when
    /// `record_skims` was requested.
    pub skims: Option<Vec<f64>>,
    /// `(origin_node_id, destination_node_id)` pairs that had demand but no path.
    pub unreachable: Vec<(u64, u64)>,
}

/// Per-origin scratch produced in parallel, merged on the driver thread afterwards.
struct OriginLoad {
    origin_position: usize,
    link_loads: Vec<f64>,
    skim_row: Option<Vec<f64>>,
    unreachable: Vec<(u64, u64)>,
}

/// Loads `matrix` onto `graph`'s current cost vector via per-origin shortest paths.
///
/// Origins are processed in parallel (one [`Dijkstra`] instance per rayon task), and
/// their per-link contributions are merged back in ascending origin-position order on
/// the calling thread. Floating point addition is not associative, so this ordering is
/// required for the loading to be deterministic across runs and thread-pool sizes.
pub fn load(graph: &Graph, matrix: &DemandMatrix, record_skims: bool) -> AonResult {
    let centroids = graph.centroids();
    let n = centroids.len();

    let per_origin: Vec<OriginLoad> = (0..n)
        .into_par_iter()
        .map(|origin_position| {
            let mut dijkstra = Dijkstra::new(graph.node_count());
            let origin_idx = centroids[origin_position];
            let mut link_loads = vec![0.0; graph.link_count()];
            let mut skim_row = record_skims.then(|| vec![f64::INFINITY; n]);
            let mut unreachable = Vec::new();

            let destinations: Vec<(usize, f64)> = matrix.destinations_from(origin_position).collect();
            if destinations.is_empty() {
                return OriginLoad {
                    origin_position,
                    link_loads,
                    skim_row,
                    unreachable,
                };
            }

            let tree = dijkstra.compute(graph, origin_idx);

            for (dest_position, trips) in destinations {
                let dest_idx = centroids[dest_position];
                let dist = tree.dist[*dest_idx];

                if let Some(row) = skim_row.as_mut() {
                    row[dest_position] = dist;
                }

                if dist.is_infinite() {
                    unreachable.push((graph.node_id(origin_idx), graph.node_id(dest_idx)));
                    continue;
                }

                for edge_idx in tree.path_to(graph, dest_idx) {
                    link_loads[*edge_idx] += trips;
                }
            }

            OriginLoad {
                origin_position,
                link_loads,
                skim_row,
                unreachable,
            }
        })
        .collect();

    let mut ordered = per_origin;
    ordered.sort_by_key(|o| o.origin_position);

    let mut link_loads = vec![0.0; graph.link_count()];
    let mut skims = record_skims.then(|| vec![f64::INFINITY; n * n]);
    let mut unreachable = Vec::new();

    for origin in ordered {
        for (l, v) in origin.link_loads.into_iter().enumerate() {
            link_loads[l] += v;
        }
        if let (Some(skims), Some(row)) = (skims.as_mut(), origin.skim_row) {
            let start = origin.origin_position * n;
            skims[start..start + n].copy_from_slice(&row);
        }
        unreachable.extend(origin.unreachable);
    }

    AonResult {
        link_loads,
        skims,
        unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, LinkRecord};

    fn parallel_links_graph() -> Graph {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap()
            .push_link(LinkRecord::new(2, 1, 2, 1, 100.0, 20.0, 1.0))
            .unwrap();
        builder.finalize(&[1, 2]).unwrap()
    }

    #[test]
    fn all_demand_loads_onto_the_cheaper_link() {
        let graph = parallel_links_graph();
        let matrix = DemandMatrix::from_long_format(&graph, &[(1, 2, 1000.0)]).unwrap();
        let result = load(&graph, &matrix, false);
        assert_eq!(result.link_loads[0], 1000.0);
        assert_eq!(result.link_loads[1], 0.0);
        assert!(result.unreachable.is_empty());
    }

    #[test]
    fn unreachable_demand_is_reported() {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap()
            .push_link(LinkRecord::new(2, 10, 20, 1, 100.0, 1.0, 1.0))
            .unwrap();
        let graph = builder.finalize(&[1, 20]).unwrap();
        let matrix = DemandMatrix::from_long_format(&graph, &[(1, 20, 50.0)]).unwrap();
        let result = load(&graph, &matrix, false);
        assert_eq!(result.unreachable, vec![(1, 20)]);
    }
}
