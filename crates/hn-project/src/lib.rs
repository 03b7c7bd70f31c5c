//! hn-project: project file format, `.inp` import and validation.
//!
//! Provides:
//! - Serde schema for networks and scenarios (YAML or JSON)
//! - EPANET `.inp` subset reader with line/field errors
//! - Cross-reference validation and compilation into `NetworkModel`

pub mod compile;
pub mod inp;
pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use compile::{compile_topology, resolve_controls};
pub use inp::{FlowUnits, InpError, InpNetwork, parse_inp};
pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_project, validate_topology};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("INP error: {0}")]
    Inp(#[from] InpError),

    #[error("Network error: {0}")]
    Network(#[from] hn_network::NetworkError),

    #[error("Unsupported project file: {path}")]
    UnsupportedFile { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let mut project: Project = serde_yaml::from_str(&content)?;
    project = migrate_to_latest(project)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let mut project: Project = serde_json::from_str(&content)?;
    project = migrate_to_latest(project)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_inp(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "network".to_string());
    let project = project_from_inp(name, parse_inp(&content)?);
    validate_project(&project)?;
    Ok(project)
}

/// Load a project by extension: `.yaml`/`.yml`, `.json` or `.inp`.
pub fn load_project(path: &Path) -> ProjectResult<Project> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "yaml" | "yml" => load_yaml(path),
        "json" => load_json(path),
        "inp" => load_inp(path),
        _ => Err(ProjectError::UnsupportedFile {
            path: path.display().to_string(),
        }),
    }
}

/// Wrap an imported network in a project with one `base` scenario carrying
/// the file's pump states.
pub fn project_from_inp(name: impl Into<String>, inp: InpNetwork) -> Project {
    let mut base = ScenarioDef::new("base");
    base.controls = inp.controls;
    Project {
        version: LATEST_VERSION,
        name: name.into(),
        network: inp.topology,
        scenarios: vec![base],
    }
}
