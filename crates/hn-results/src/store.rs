//! Run storage API.
//!
//! Layout: `<root>/<run_id>/manifest.json` plus `snapshots.jsonl`, one
//! snapshot per line. Runs are append-only; saving an id twice is an error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::{RunManifest, SCHEMA_VERSION, SimulationRun, Snapshot};
use crate::{ResultsError, ResultsResult};

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a project file, under `.hydronet/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(project_dir.join(".hydronet").join("runs"))
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, run: &SimulationRun) -> ResultsResult<()> {
        if self.has_run(&run.run_id) {
            return Err(ResultsError::RunExists {
                run_id: run.run_id.clone(),
            });
        }
        let run_dir = self.run_dir(&run.run_id);
        fs::create_dir_all(&run_dir)?;

        // Snapshots first: a manifest only ever points at complete data.
        let mut snapshots = fs::File::create(run_dir.join("snapshots.jsonl"))?;
        for snapshot in &run.snapshots {
            serde_json::to_writer(&mut snapshots, snapshot)?;
            snapshots.write_all(b"\n")?;
        }
        snapshots.flush()?;

        let manifest_json = serde_json::to_string_pretty(&run.manifest())?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");
        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(manifest_path)?;
        let manifest: RunManifest = serde_json::from_str(&content)?;
        if manifest.schema_version > SCHEMA_VERSION {
            return Err(ResultsError::SchemaVersion {
                run_id: run_id.to_string(),
                found: manifest.schema_version,
            });
        }
        Ok(manifest)
    }

    pub fn load_snapshots(&self, run_id: &str) -> ResultsResult<Vec<Snapshot>> {
        let path = self.run_dir(run_id).join("snapshots.jsonl");
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let mut snapshots = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                snapshots.push(serde_json::from_str(line)?);
            }
        }
        Ok(snapshots)
    }

    pub fn load_run(&self, run_id: &str) -> ResultsResult<SimulationRun> {
        let manifest = self.load_manifest(run_id)?;
        let snapshots = self.load_snapshots(run_id)?;
        Ok(SimulationRun::from_parts(manifest, snapshots))
    }

    /// All stored runs, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        if !self.root_dir.exists() {
            return Ok(runs);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if self.has_run(&run_id) {
                runs.push(self.load_manifest(&run_id)?);
            }
        }
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    pub fn list_for_scenario(&self, scenario_id: &str) -> ResultsResult<Vec<RunManifest>> {
        Ok(self
            .list_runs()?
            .into_iter()
            .filter(|m| m.scenario_id == scenario_id)
            .collect())
    }
}
