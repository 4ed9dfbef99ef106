//! A single user class contributing demand to a shared assignment.
//!
//! A [`TrafficClass`] owns its own demand matrix and flow vectors but never the
//! [`crate::graph::Graph`] itself — the graph (and its shared, iteration-mutated cost
//! vector) is owned by the driver and passed in by reference wherever a class needs it,
//! so there is no cyclic ownership between classes and the network they route over.

use crate::demand::DemandMatrix;
use crate::routing::AonResult;

/// One user class: its own demand, its own link flows, its own PCE weight.
#[derive(Debug, Clone)]
pub struct TrafficClass {
    pub name: String,
    pub matrix: DemandMatrix,
    /// Passenger-car-equivalent weight applied when this class's flow contributes to
    /// the congestion-producing, shared link volume.
    pub pce: f64,
    /// Current raw-trip flow on every link, in link-index order. This is the class's
    /// own flow, never multiplied by `pce` — aggregation happens at the driver level.
    pub link_loads: Vec<f64>,
    /// The all-or-nothing target loaded under the latest cost vector; the descent
    /// direction is built from the gap between this and `link_loads`.
    pub aon_loads: Vec<f64>,
}

impl TrafficClass {
    pub fn new(name: impl Into<String>, matrix: DemandMatrix, pce: f64, link_count: usize) -> Self {
        TrafficClass {
            name: name.into(),
            matrix,
            pce,
            link_loads: vec![0.0; link_count],
            aon_loads: vec![0.0; link_count],
        }
    }

    /// Replaces `aon_loads` with a freshly computed all-or-nothing result and clears
    /// any stale unreachable-demand bookkeeping the caller wants to inspect.
    pub fn apply_aon_result(&mut self, result: &AonResult) {
        self.aon_loads.copy_from_slice(&result.link_loads);
    }

    /// This class's contribution to the shared, congestion-producing volume.
    pub fn pce_weighted_loads(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.link_loads.len());
        for (o, &f) in out.iter_mut().zip(self.link_loads.iter()) {
            *o += f * self.pce;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, LinkRecord};

    #[test]
    fn pce_weighted_loads_accumulate_into_existing_buffer() {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap();
        let graph = builder.finalize(&[1, 2]).unwrap();
        let matrix = DemandMatrix::zeros(&graph);

        let mut class = TrafficClass::new("car", matrix, 1.0, graph.link_count());
        class.link_loads[0] = 40.0;

        let mut truck_matrix = DemandMatrix::zeros(&graph);
        let _ = &mut truck_matrix;
        let mut truck = TrafficClass::new("truck", DemandMatrix::zeros(&graph), 2.0, graph.link_count());
        truck.link_loads[0] = 10.0;

        let mut aggregate = vec![0.0; graph.link_count()];
        class.pce_weighted_loads(&mut aggregate);
        truck.pce_weighted_loads(&mut aggregate);

        assert_eq!(aggregate[0], 40.0 + 20.0);
    }
}
