use chrono::Utc;
use hn_components::PumpCurve;
use hn_core::units::{m, mm};
use hn_network::NetworkBuilder;
use hn_results::{GraphProjection, LinkSnapshot, NodeSnapshot, Snapshot};
use hn_solver::LinkStatus;

fn network() -> hn_network::NetworkModel {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", 10.0);
    let j = b.add_junction("J", 2.0, 25.0);
    b.set_coordinates(j, 100.0, 50.0);
    b.add_pump("PU", "R", "J", PumpCurve::single_point(25.0, 30.0));
    b.add_junction("K", 1.0, 5.0);
    b.add_pipe("P1", "J", "K", m(250.0), mm(150.0), 130.0, 0.0);
    b.build().expect("valid network")
}

#[test]
fn projection_mirrors_nodes_and_links() {
    let net = network();
    let graph = GraphProjection::from_network(&net);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(graph.topology_version, net.topology_version());

    let j = graph.nodes.iter().find(|n| n.id == "J").unwrap();
    assert_eq!(j.kind, "junction");
    assert_eq!((j.x, j.y), (Some(100.0), Some(50.0)));
    assert_eq!(j.base_demand_m3h, 25.0);

    let p1 = graph.edges.iter().find(|e| e.id == "P1").unwrap();
    assert_eq!((p1.from.as_str(), p1.to.as_str()), ("J", "K"));
    assert_eq!(p1.length_m, 250.0);
    let pump = graph.edges.iter().find(|e| e.id == "PU").unwrap();
    assert_eq!(pump.diameter_m, None);
}

#[test]
fn snapshot_values_land_on_the_projection() {
    let snapshot = Snapshot {
        period: 0,
        timestamp: Utc::now(),
        converged: true,
        iterations: 3,
        max_residual_m3h: 0.0,
        nodes: vec![NodeSnapshot {
            node: "K".to_string(),
            head_m: 30.0,
            pressure_m: 29.0,
            demand_m3h: 5.0,
        }],
        links: vec![LinkSnapshot {
            link: "P1".to_string(),
            flow_m3h: 5.0,
            headloss_m: 0.1,
            status: LinkStatus::Open,
        }],
    };
    let graph = GraphProjection::from_network(&network()).with_snapshot(&snapshot);
    let k = graph.nodes.iter().find(|n| n.id == "K").unwrap();
    assert_eq!(k.pressure_m, Some(29.0));
    let p1 = graph.edges.iter().find(|e| e.id == "P1").unwrap();
    assert_eq!(p1.flow_m3h, Some(5.0));

    let cypher = graph.to_cypher();
    assert_eq!(cypher.lines().count(), 5);
    assert!(cypher.contains("MERGE (n:Node {id: 'K'})"));
    assert!(cypher.contains("r.flow_m3h = 5"));
    let json = serde_json::to_string(&graph).unwrap();
    let back: GraphProjection = serde_json::from_str(&json).unwrap();
    assert_eq!(back, graph);
}
