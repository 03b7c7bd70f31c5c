//! Project loading, saving and introspection.

use std::path::Path;
use std::sync::Arc;

use hn_network::NetworkModel;
use hn_project::{Project, ProjectError, ScenarioDef};

use crate::error::{AppError, AppResult};

/// Summary of a scenario for listing.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub id: String,
    pub name: String,
    pub periods: usize,
    pub has_schedule: bool,
    pub controlled_links: usize,
}

/// Load a project from YAML, JSON or `.inp`, chosen by extension.
pub fn load_project(path: &Path) -> AppResult<Project> {
    Ok(hn_project::load_project(path)?)
}

/// Save a project as YAML or JSON, chosen by extension.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let saved = match ext.as_str() {
        "json" => hn_project::save_json(path, project),
        "yaml" | "yml" => hn_project::save_yaml(path, project),
        _ => {
            return Err(AppError::InvalidInput(format!(
                "cannot save a project as '{}'",
                path.display()
            )));
        }
    };
    saved.map_err(|err| match err {
        ProjectError::Io(source) => AppError::ProjectFileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

/// List all scenarios in the project with summaries.
pub fn list_scenarios(project: &Project) -> Vec<ScenarioSummary> {
    project
        .scenarios
        .iter()
        .map(|scenario| ScenarioSummary {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            periods: scenario.simulation.as_ref().map_or(1, |s| s.periods),
            has_schedule: scenario.schedule.is_some(),
            controlled_links: scenario.controls.pumps.len() + scenario.controls.valves.len(),
        })
        .collect()
}

/// Get a specific scenario by id.
pub fn get_scenario<'a>(project: &'a Project, scenario_id: &str) -> AppResult<&'a ScenarioDef> {
    project
        .scenario(scenario_id)
        .ok_or_else(|| AppError::ScenarioNotFound(scenario_id.to_string()))
}

/// Build the project's network once; scenarios share it read-only.
pub fn compile_network(project: &Project) -> AppResult<Arc<NetworkModel>> {
    let network = hn_project::compile_topology(&project.network)?;
    tracing::info!(
        nodes = network.nodes().len(),
        links = network.links().len(),
        topology = %network.topology_version(),
        "network compiled"
    );
    Ok(Arc::new(network))
}
