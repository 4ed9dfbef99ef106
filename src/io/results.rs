//! CSV export of per-class assignment results.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::graph::Graph;
use crate::traffic_class::TrafficClass;

#[derive(Debug, Serialize)]
struct ResultRow {
    link_id: u64,
    a_node: u64,
    b_node: u64,
    flow: f64,
}

/// Writes one row per link for `class`, with `flow` as the PCE-weighted contribution
/// this class makes to the shared link volume.
pub fn write_class_results<W: Write>(writer: W, graph: &Graph, class: &TrafficClass) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (idx, link) in graph.links().iter().enumerate() {
        wtr.serialize(ResultRow {
            link_id: link.id,
            a_node: graph.node_id(link.a_node),
            b_node: graph.node_id(link.b_node),
            flow: class.link_loads[idx] * class.pce,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandMatrix;
    use crate::graph::{GraphBuilder, LinkRecord};

    #[test]
    fn writes_one_row_per_link() {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap();
        let graph = builder.finalize(&[1, 2]).unwrap();
        let mut class = TrafficClass::new("car", DemandMatrix::zeros(&graph), 1.0, graph.link_count());
        class.link_loads[0] = 42.0;

        let mut buf = Vec::new();
        write_class_results(&mut buf, &graph, &class).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("1,1,2,42"));
    }
}
