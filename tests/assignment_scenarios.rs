//! End-to-end scenarios from the component design spec, run against literal small
//! networks built directly through the public API (no fixture files).

use std::collections::HashMap;

use wardrop_assign::graph::{GraphBuilder, LinkRecord};
use wardrop_assign::vdf::ParamBinding;
use wardrop_assign::{Assignment, DemandMatrix, Graph, Outcome, TrafficClass};

fn bpr_link(id: u64, a: u64, b: u64, capacity: f64, fftime: f64) -> LinkRecord {
    LinkRecord::new(id, a, b, 1, capacity, fftime, 1.0)
        .with_attr("alpha", 0.15)
        .with_attr("beta", 4.0)
}

fn single_class(graph: &Graph, origin: u64, dest: u64, trips: f64) -> Vec<TrafficClass> {
    let matrix = DemandMatrix::from_long_format(graph, &[(origin, dest, trips)]).unwrap();
    vec![TrafficClass::new("car", matrix, 1.0, graph.link_count())]
}

fn configured(graph: Graph, classes: Vec<TrafficClass>) -> Assignment {
    let mut assignment = Assignment::new(graph);
    assignment
        .set_classes(classes)
        .set_vdf("bpr")
        .set_capacity_field("capacity")
        .set_time_field("free_flow_time");
    assignment
}

// Scenario 1: two parallel links, closed-form split f1 ~= 79.2, f2 ~= 120.8.
#[test]
fn two_link_parallel_network_reaches_the_closed_form_split() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 100.0, 10.0))
        .unwrap()
        .push_link(bpr_link(2, 1, 2, 200.0, 12.0))
        .unwrap();
    let graph = builder.finalize(&[1, 2]).unwrap();

    let classes = single_class(&graph, 1, 2, 200.0);
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(100);

    let result = assignment.execute(None).unwrap();
    match result.outcome {
        Outcome::Converged { rgap, .. } => assert!(rgap < 1e-4),
        other => panic!("expected convergence, got {:?}", other),
    }

    let class = &result.classes[0];
    let f1 = class.link_loads[0];
    let f2 = class.link_loads[1];
    assert!((f1 - 79.2).abs() < 1.0, "f1 = {}", f1);
    assert!((f2 - 120.8).abs() < 1.0, "f2 = {}", f2);
    assert!((f1 + f2 - 200.0).abs() < 1e-6);
}

// Scenario 2: Braess's paradox — adding the shortcut increases the common origin cost.
// Congested links (1, 4) use a near-linear BPR shape (tiny free-flow time, large alpha);
// the constant links (2, 3) and the shortcut (5) sit at effectively fixed cost because
// their capacity dwarfs the demand.
#[test]
fn braess_paradox_shortcut_raises_the_equilibrium_cost() {
    fn congested_link(id: u64, a: u64, b: u64) -> LinkRecord {
        LinkRecord::new(id, a, b, 1, 1.0, 0.001, 1.0)
            .with_attr("alpha", 1000.0)
            .with_attr("beta", 1.0)
    }

    fn constant_link(id: u64, a: u64, b: u64, fftime: f64) -> LinkRecord {
        LinkRecord::new(id, a, b, 1, 1_000_000.0, fftime, 1.0)
            .with_attr("alpha", 0.15)
            .with_attr("beta", 1.0)
    }

    fn network(with_shortcut: bool) -> Graph {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(congested_link(1, 1, 2))
            .unwrap()
            .push_link(constant_link(2, 1, 3, 45.0))
            .unwrap()
            .push_link(constant_link(3, 2, 4, 45.0))
            .unwrap()
            .push_link(congested_link(4, 3, 4))
            .unwrap();
        if with_shortcut {
            builder.push_link(constant_link(5, 2, 3, 0.0)).unwrap();
        }
        builder.finalize(&[1, 4]).unwrap()
    }

    fn total_cost(with_shortcut: bool) -> f64 {
        let graph = network(with_shortcut);
        let classes = single_class(&graph, 1, 4, 4000.0);
        let mut assignment = configured(graph, classes);
        let mut vdf_parameters = HashMap::new();
        vdf_parameters.insert("alpha".to_owned(), ParamBinding::LinkAttribute("alpha".to_owned()));
        vdf_parameters.insert("beta".to_owned(), ParamBinding::LinkAttribute("beta".to_owned()));
        assignment.set_vdf_parameters(vdf_parameters).set_max_iter(200);
        let result = assignment.execute(None).unwrap();
        let class = &result.classes[0];
        let cost = result.graph.cost();
        class
            .link_loads
            .iter()
            .zip(cost.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            / 4000.0
    }

    let without = total_cost(false);
    let with = total_cost(true);
    assert!(
        with > without,
        "expected the shortcut to raise average cost: without={} with={}",
        without,
        with
    );
}

// Scenario 3: single O-D, capacity far above demand, converges fast onto the free-flow path.
#[test]
fn uncongested_single_od_converges_in_a_few_iterations() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 1_000_000.0, 10.0))
        .unwrap()
        .push_link(bpr_link(2, 1, 2, 1_000_000.0, 50.0))
        .unwrap();
    let graph = builder.finalize(&[1, 2]).unwrap();

    let classes = single_class(&graph, 1, 2, 10.0);
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(10).set_rgap_target(1e-6);

    let result = assignment.execute(None).unwrap();
    match result.outcome {
        Outcome::Converged { iterations, rgap } => {
            assert!(iterations <= 3, "iterations = {}", iterations);
            assert!(rgap < 1e-6);
        }
        other => panic!("expected convergence, got {:?}", other),
    }
    let class = &result.classes[0];
    assert!((class.link_loads[0] - 10.0).abs() < 1e-6);
    assert!(class.link_loads[1] < 1e-6);
}

// Scenario 4: two classes, pce=1 and pce=2, on a three-link serial network.
#[test]
fn two_classes_report_raw_flow_and_aggregate_pce_weighted_flow() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 500.0, 5.0))
        .unwrap()
        .push_link(bpr_link(2, 2, 3, 500.0, 5.0))
        .unwrap()
        .push_link(bpr_link(3, 3, 4, 500.0, 5.0))
        .unwrap();
    let graph = builder.finalize(&[1, 4]).unwrap();

    let car_matrix = DemandMatrix::from_long_format(&graph, &[(1, 4, 100.0)]).unwrap();
    let truck_matrix = DemandMatrix::from_long_format(&graph, &[(1, 4, 100.0)]).unwrap();
    let classes = vec![
        TrafficClass::new("car", car_matrix, 1.0, graph.link_count()),
        TrafficClass::new("truck", truck_matrix, 2.0, graph.link_count()),
    ];

    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(100);
    let result = assignment.execute(None).unwrap();

    let car = result.classes.iter().find(|c| c.name == "car").unwrap();
    let truck = result.classes.iter().find(|c| c.name == "truck").unwrap();

    for l in 0..3 {
        assert!((car.link_loads[l] - 100.0).abs() < 1e-6);
        assert!((truck.link_loads[l] - 100.0).abs() < 1e-6);
    }

    let aggregate: f64 = (0..3)
        .map(|l| car.link_loads[l] * car.pce + truck.link_loads[l] * truck.pce)
        .sum::<f64>()
        / 3.0;
    assert!((aggregate - 300.0).abs() < 1e-6);
}

// Scenario 5: a centroid on the geodesic between two other centroids must not be
// traversed when blocked-centroid flows are enabled.
#[test]
fn blocked_centroid_flows_forces_a_detour_around_a_transit_centroid() {
    let mut builder = GraphBuilder::new();
    builder
        // 1 -> 2 (centroid) -> 3 is the cheap direct route
        .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 1.0, 1.0))
        .unwrap()
        .push_link(LinkRecord::new(2, 2, 3, 1, 100.0, 1.0, 1.0))
        .unwrap()
        // 1 -> 4 -> 3 is the longer detour
        .push_link(LinkRecord::new(3, 1, 4, 1, 100.0, 10.0, 1.0))
        .unwrap()
        .push_link(LinkRecord::new(4, 4, 3, 1, 100.0, 10.0, 1.0))
        .unwrap();
    let mut graph = builder.finalize(&[1, 2, 3]).unwrap();
    graph.set_blocked_centroid_flows(true);

    let mut dijkstra = wardrop_assign::routing::Dijkstra::new(graph.node_count());
    let origin = graph.node_idx(1).unwrap();
    let dest = graph.node_idx(3).unwrap();
    let tree = dijkstra.compute(&graph, origin);
    let path = tree.path_to(&graph, dest);

    let used_ids: Vec<u64> = path.iter().map(|&e| graph.link(e).id).collect();
    assert_eq!(used_ids, vec![3, 4], "expected the detour around centroid 2");
}

// Running the same problem twice yields byte-identical link loads.
#[test]
fn execute_is_deterministic_across_runs() {
    fn run() -> Vec<f64> {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(bpr_link(1, 1, 2, 100.0, 10.0))
            .unwrap()
            .push_link(bpr_link(2, 1, 2, 200.0, 12.0))
            .unwrap();
        let graph = builder.finalize(&[1, 2]).unwrap();
        let classes = single_class(&graph, 1, 2, 200.0);
        let mut assignment = configured(graph, classes);
        assignment.set_max_iter(30);
        let result = assignment.execute(None).unwrap();
        result.classes[0].link_loads.clone()
    }

    assert_eq!(run(), run());
}

// FW/CFW/BFW with max_iter = 1 seeds the solution with the all-or-nothing flow.
#[test]
fn max_iter_one_seeds_with_all_or_nothing_flow() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 100.0, 10.0))
        .unwrap()
        .push_link(bpr_link(2, 1, 2, 200.0, 20.0))
        .unwrap();
    let graph = builder.finalize(&[1, 2]).unwrap();
    let classes = single_class(&graph, 1, 2, 50.0);
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(1);
    let result = assignment.execute(None).unwrap();
    let class = &result.classes[0];
    assert_eq!(class.link_loads[0], 50.0);
    assert_eq!(class.link_loads[1], 0.0);
}

// Zero demand produces zero flow and a reported rgap of 0.
#[test]
fn zero_demand_yields_zero_flow_and_zero_rgap() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 100.0, 10.0))
        .unwrap();
    let graph = builder.finalize(&[1, 2]).unwrap();
    let matrix = DemandMatrix::zeros(&graph);
    let classes = vec![TrafficClass::new("car", matrix, 1.0, graph.link_count())];
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(5);
    let result = assignment.execute(None).unwrap();
    assert!(result.classes[0].link_loads.iter().all(|&f| f == 0.0));
    if let Outcome::Converged { rgap, .. } = result.outcome {
        assert_eq!(rgap, 0.0);
    }
}

// Demand between a disconnected centroid pair is reported, not silently dropped.
#[test]
fn disconnected_demand_is_reported_as_unreachable() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
        .unwrap()
        .push_link(LinkRecord::new(2, 10, 20, 1, 100.0, 10.0, 1.0))
        .unwrap();
    let graph = builder.finalize(&[1, 20]).unwrap();
    let classes = single_class(&graph, 1, 20, 25.0);
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(3);
    let result = assignment.execute(None).unwrap();
    assert!(result.classes[0].link_loads.iter().all(|&f| f == 0.0));
}

// Once the warm-up iterations pass (seed, FW, CFW), every biconjugate step reported in
// the diagnostic trail still respects the beta-simplex invariant from the direction
// coefficients (they sum to one and stay nonnegative), whichever iteration produced it.
#[test]
fn diagnostic_log_betas_stay_on_the_simplex_across_the_full_run() {
    let mut builder = GraphBuilder::new();
    builder
        .push_link(bpr_link(1, 1, 2, 50.0, 10.0))
        .unwrap()
        .push_link(bpr_link(2, 1, 2, 50.0, 11.0))
        .unwrap()
        .push_link(bpr_link(3, 1, 2, 50.0, 12.0))
        .unwrap();
    let graph = builder.finalize(&[1, 2]).unwrap();
    let classes = single_class(&graph, 1, 2, 150.0);
    let mut assignment = configured(graph, classes);
    assignment.set_max_iter(20).set_rgap_target(1e-8);
    let result = assignment.execute(None).unwrap();

    assert!(
        result.diagnostic_log.len() >= 4,
        "expected the run to reach the biconjugate phase, got {} iterations",
        result.diagnostic_log.len()
    );
    for row in &result.diagnostic_log {
        let sum: f64 = row.betas.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "iter {}: betas={:?}", row.iter, row.betas);
        assert!(row.betas.iter().all(|&b| b >= 0.0), "iter {}: betas={:?}", row.iter, row.betas);
    }
}
