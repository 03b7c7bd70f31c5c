use hn_project::schema::*;
use hn_project::{compile_topology, load_json, load_yaml, save_json, save_yaml, validate_project};

fn small_project() -> Project {
    Project {
        version: hn_project::LATEST_VERSION,
        name: "Small".to_string(),
        network: TopologyDef {
            title: Some("small".to_string()),
            nodes: vec![
                NodeDef {
                    id: "R".to_string(),
                    elevation_m: 60.0,
                    kind: NodeKind::Reservoir { head_pattern: None },
                    coordinates: None,
                },
                NodeDef {
                    id: "J".to_string(),
                    elevation_m: 20.0,
                    kind: NodeKind::Junction {
                        demand_m3h: 25.0,
                        pattern: Some("p".to_string()),
                    },
                    coordinates: Some([1.0, 2.0]),
                },
            ],
            links: vec![LinkDef {
                id: "L".to_string(),
                from: "R".to_string(),
                to: "J".to_string(),
                kind: LinkKind::Pipe {
                    length_m: 250.0,
                    diameter_mm: 150.0,
                    roughness: 120.0,
                    minor_loss: 0.5,
                },
            }],
            patterns: vec![PatternDef {
                id: "p".to_string(),
                multipliers: vec![0.5, 1.5],
            }],
        },
        scenarios: vec![ScenarioDef::new("base")],
    }
}

#[test]
fn roundtrip_yaml() {
    let project = small_project();
    validate_project(&project).unwrap();

    let path = std::env::temp_dir().join("hn_project_roundtrip.yaml");
    save_yaml(&path, &project).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(project, loaded);
}

#[test]
fn roundtrip_json() {
    let project = small_project();
    let path = std::env::temp_dir().join("hn_project_roundtrip.json");
    save_json(&path, &project).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(project, loaded);
}

#[test]
fn unversioned_files_migrate() {
    let yaml = r#"
name: Old
network:
  nodes:
    - { id: R, elevation_m: 10.0, kind: { type: Reservoir } }
scenarios:
  - id: only
"#;
    let path = std::env::temp_dir().join("hn_project_unversioned.yaml");
    std::fs::write(&path, yaml).unwrap();
    let project = load_yaml(&path).unwrap();
    assert_eq!(project.version, hn_project::LATEST_VERSION);
    assert_eq!(project.scenarios[0].name, "only");
}

#[test]
fn future_version_is_rejected() {
    let mut project = small_project();
    project.version = 99;
    assert!(validate_project(&project).is_err());
}

#[test]
fn compiled_network_carries_patterns() {
    let net = compile_topology(&small_project().network).unwrap();
    let demands = net.demands_at(1);
    let j = net.node_id("J").unwrap();
    assert!((demands[j.idx()] - 37.5).abs() < 1e-12);
}
