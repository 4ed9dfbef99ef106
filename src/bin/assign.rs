use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser as ClapParser;
use log::{error, info};

use wardrop_assign::graph::GraphBuilder;
use wardrop_assign::io::{read_centroids, read_demand, read_links, write_class_results};
use wardrop_assign::{Assignment, DemandMatrix, TrafficClass};

/// Runs a static user-equilibrium assignment from a link table, centroid list, and
/// origin-destination demand table.
#[derive(Debug, ClapParser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about)]
struct Args {
    /// CSV file with link_id, a_node, b_node, direction, capacity, free_flow_time, length, ...
    #[arg(long)]
    links: PathBuf,

    /// CSV file with one `node_id` column, in centroid order.
    #[arg(long)]
    centroids: PathBuf,

    /// CSV file with origin, destination, and one trips column per class.
    #[arg(long)]
    demand: PathBuf,

    /// Comma-separated class names; each must be a column in the demand table. PCE
    /// weights, also comma-separated, default to 1.0 for every class.
    #[arg(long, value_delimiter = ',')]
    classes: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pce: Vec<f64>,

    #[arg(long, default_value = "bfw")]
    algorithm: String,

    #[arg(long, default_value_t = 1e-4)]
    rgap_target: f64,

    #[arg(long, default_value_t = 500)]
    max_iter: usize,

    /// Directory to write one `<class>.csv` results file per class into.
    #[arg(long)]
    out_dir: PathBuf,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    if let Err(msg) = wardrop_assign::logging::init_logging(&args.log_level, vec![]) {
        eprintln!("{}", msg);
        std::process::exit(1);
    }

    if let Err(err) = run(args) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("EXECUTE {}", env!("CARGO_PKG_NAME"));

    let now = Instant::now();
    let link_records = read_links(File::open(&args.links)?)?;
    let centroids = read_centroids(File::open(&args.centroids)?)?;

    let mut builder = GraphBuilder::new();
    for record in link_records {
        builder.push_link(record)?;
    }
    let graph = builder.finalize(&centroids)?;
    info!(
        "parsed graph with {} nodes and {} links in {} ms",
        graph.node_count(),
        graph.link_count(),
        now.elapsed().as_millis()
    );

    let demand_by_class = read_demand(File::open(&args.demand)?, &args.classes)?;

    let mut classes = Vec::new();
    for (i, name) in args.classes.iter().enumerate() {
        let pce = args.pce.get(i).copied().unwrap_or(1.0);
        let rows = demand_by_class.get(name).cloned().unwrap_or_default();
        let matrix = DemandMatrix::from_long_format(&graph, &rows)?;
        classes.push(TrafficClass::new(name.clone(), matrix, pce, graph.link_count()));
    }

    let mut assignment = Assignment::new(graph);
    assignment
        .set_classes(classes)
        .set_vdf("bpr")
        .set_capacity_field("capacity")
        .set_time_field("free_flow_time")
        .set_rgap_target(args.rgap_target)
        .set_max_iter(args.max_iter)
        .set_algorithm(&args.algorithm)?;

    let now = Instant::now();
    let result = assignment.execute(None)?;
    info!("assignment finished in {} ms: {:?}", now.elapsed().as_millis(), result.outcome);

    std::fs::create_dir_all(&args.out_dir)?;
    for class in &result.classes {
        let path = args.out_dir.join(format!("{}.csv", class.name));
        let file = File::create(&path)?;
        write_class_results(file, &result.graph, class)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
