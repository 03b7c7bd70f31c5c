use std::path::PathBuf;

use hn_project::{NodeKind, compile_topology, load_project, resolve_controls};
use hn_solver::{NewtonConfig, solve};

fn demo(name: &str) -> PathBuf {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("demos/projects")
        .join(name)
}

#[test]
fn demo_projects_load_and_compile() {
    for name in ["two_pump_station.yaml", "lift_station.inp"] {
        let path = demo(name);
        let project = load_project(&path).unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()));
        let net = compile_topology(&project.network).unwrap_or_else(|e| panic!("failed to compile {name}: {e}"));
        assert!(net.pumps().count() >= 1, "{name} has no pumps");
        for scenario in &project.scenarios {
            resolve_controls(&net, &scenario.controls).unwrap();
        }
    }
}

#[test]
fn imported_lift_station_solves() {
    let project = load_project(&demo("lift_station.inp")).unwrap();
    assert_eq!(project.scenarios.len(), 1);
    let net = compile_topology(&project.network).unwrap();
    let controls = resolve_controls(&net, &project.scenarios[0].controls).unwrap();
    let res = solve(&net, &net.base_demands(), &controls, &NewtonConfig::default()).unwrap();
    assert!(res.converged);

    let demand_total: f64 = project
        .network
        .nodes
        .iter()
        .map(|n| match n.kind {
            NodeKind::Junction { demand_m3h, .. } => demand_m3h,
            _ => 0.0,
        })
        .sum();
    assert!((demand_total - 18.0 * 3.6).abs() < 1e-9);
}

#[test]
fn unknown_extension_is_rejected() {
    assert!(load_project(&demo("missing.txt")).is_err());
}
