use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use hn_anomaly::{AnomalyDetector, DetectorConfig, PressureSample, Severity, alerts_from};
use hn_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, TracingSink,
    alerts_for_run, dispatch_alerts, project_service, query, run_service,
};
use hn_results::{GraphProjection, RunStore};
use hn_schedule::{ScheduleOptimizer, ScheduleRequest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydronet")]
#[command(about = "hydronet - water distribution network analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project (YAML, JSON or .inp) and build its network
    Validate {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Run one scenario (solve, detect, optimize) and store the result
    Solve {
        /// Path to the project file
        project_path: PathBuf,
        /// Scenario ID to run
        #[arg(default_value = "base")]
        scenario_id: String,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// Run several scenarios in parallel and store the results
    Simulate {
        /// Path to the project file
        project_path: PathBuf,
        /// Scenario IDs (all scenarios when omitted)
        scenario_ids: Vec<String>,
    },
    /// Score a pressure history (JSON array of samples)
    Detect {
        /// Path to the samples file
        samples_path: PathBuf,
        /// Detector configuration (YAML); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Log alerts at or above warning severity
        #[arg(long)]
        alerts: bool,
    },
    /// Optimize the pump schedule of a scenario
    Schedule {
        /// Path to the project file
        project_path: PathBuf,
        /// Scenario ID carrying the schedule inputs
        scenario_id: String,
    },
    /// List stored runs for a project
    Runs {
        /// Path to the project file
        project_path: PathBuf,
        /// Only runs of this scenario
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Show details of a stored run
    ShowRun {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Print the pressure series of this node
        #[arg(long)]
        node: Option<String>,
    },
    /// Export the network as a property graph
    ExportGraph {
        /// Path to the project file
        project_path: PathBuf,
        /// Attach pressures and flows from this stored run
        #[arg(long)]
        run: Option<String>,
        /// Period of the run to attach
        #[arg(long, default_value_t = 0)]
        period: usize,
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphFormat {
    Json,
    Cypher,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Solve {
            project_path,
            scenario_id,
            no_cache,
        } => cmd_solve(&project_path, &scenario_id, !no_cache),
        Commands::Simulate {
            project_path,
            scenario_ids,
        } => cmd_simulate(&project_path, &scenario_ids),
        Commands::Detect {
            samples_path,
            config,
            alerts,
        } => cmd_detect(&samples_path, config.as_deref(), alerts),
        Commands::Schedule {
            project_path,
            scenario_id,
        } => cmd_schedule(&project_path, &scenario_id),
        Commands::Runs {
            project_path,
            scenario,
        } => cmd_runs(&project_path, scenario.as_deref()),
        Commands::ShowRun {
            project_path,
            run_id,
            node,
        } => cmd_show_run(&project_path, &run_id, node.as_deref()),
        Commands::ExportGraph {
            project_path,
            run,
            period,
            format,
            output,
        } => cmd_export_graph(&project_path, run.as_deref(), period, format, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    let network = project_service::compile_network(&project)?;
    println!(
        "✓ Project is valid ({} nodes, {} links, {} pumps)",
        network.nodes().len(),
        network.links().len(),
        network.pumps().count()
    );
    println!("  Topology version: {}", network.topology_version());
    for scenario in project_service::list_scenarios(&project) {
        println!(
            "  {} - {} ({} period(s){})",
            scenario.id,
            scenario.name,
            scenario.periods,
            if scenario.has_schedule { ", schedule" } else { "" }
        );
    }
    Ok(())
}

fn cmd_solve(project_path: &Path, scenario_id: &str, use_cache: bool) -> AppResult<()> {
    println!("Running scenario: {}", scenario_id);

    let request = RunRequest {
        project_path,
        scenario_id,
        options: RunOptions {
            use_cache,
            cancel: None,
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage: Option<RunStage> = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run completed: {}", response.run_id);
    }
    println!("  Status: {:?}", response.run.status);
    println!("  Total: {:.3}s", response.total_time_s);
    print_summary(&response.run)?;

    let alerts = alerts_for_run(&response.run, Severity::Critical);
    dispatch_alerts(&alerts, &[&TracingSink])?;
    Ok(())
}

fn cmd_simulate(project_path: &Path, scenario_ids: &[String]) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let store = RunStore::for_project(project_path)?;
    let outcomes = hn_app::run_batch(&project, scenario_ids, None)?;

    let mut failures = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(run) => {
                let saved = if run.status == hn_results::RunStatus::Cancelled || store.has_run(&run.run_id) {
                    "kept"
                } else {
                    store.save_run(&run)?;
                    "saved"
                };
                println!(
                    "✓ {}: {:?} ({} periods, {} anomalies) {} {}",
                    outcome.scenario_id,
                    run.status,
                    run.snapshots.len(),
                    run.anomalies.len(),
                    saved,
                    run.run_id
                );
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(scenario = %outcome.scenario_id, error = %err, "scenario failed");
                println!("✗ {}: {}", outcome.scenario_id, err);
            }
        }
    }
    if failures > 0 {
        return Err(AppError::InvalidInput(format!("{failures} scenario(s) failed")));
    }
    Ok(())
}

fn cmd_detect(samples_path: &Path, config_path: Option<&Path>, alerts: bool) -> AppResult<()> {
    let content = std::fs::read_to_string(samples_path)?;
    let samples: Vec<PressureSample> = serde_json::from_str(&content)
        .map_err(|e| AppError::InvalidInput(format!("failed to parse samples: {e}")))?;

    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<DetectorConfig>(&text)
                .map_err(|e| AppError::InvalidInput(format!("failed to parse detector config: {e}")))?
        }
        None => DetectorConfig::default(),
    };

    let detector = AnomalyDetector::new(&config)?;
    let report = detector.score(&samples)?;

    println!(
        "Scored {} samples with {}",
        samples.len(),
        detector.scorer_names().join(", ")
    );
    for (node, flag) in &report.flags {
        println!("  {node}: {flag:?}");
    }
    println!("\nEvents:");
    for event in &report.events {
        println!(
            "  {} {}  {:.2} m  {:?} {:?} score={:.2}",
            event.timestamp, event.node, event.observed_m, event.flag, event.severity, event.score
        );
    }

    if alerts {
        let delivered = dispatch_alerts(&alerts_from(&report, Severity::Warning), &[&TracingSink])?;
        println!("\n{} alert(s) delivered", delivered);
    }
    Ok(())
}

fn cmd_schedule(project_path: &Path, scenario_id: &str) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let scenario = project_service::get_scenario(&project, scenario_id)?;
    let def = scenario.schedule.as_ref().ok_or_else(|| {
        AppError::InvalidInput(format!("scenario '{scenario_id}' has no schedule inputs"))
    })?;
    let network = project_service::compile_network(&project)?;

    let request = ScheduleRequest::new(def.forecast_m3h.clone(), def.pumps.clone()).with_bounds(def.bounds.clone());
    let mut optimizer = ScheduleOptimizer::new(scenario.optimizer.clone());
    let schedule = optimizer.optimize_network(&network, &request, None)?;

    println!("Schedule for '{}' ({} periods, backend {}):", scenario_id, schedule.horizon, optimizer.backend_name());
    for period in 0..schedule.horizon {
        let entries: Vec<String> = schedule
            .period(period)
            .map(|e| format!("{}={:.1} m3/h", e.pump, e.flow_m3h))
            .collect();
        println!(
            "  t={:<3} forecast={:>8.1}  {}  cost={:.3}",
            period,
            def.forecast_m3h[period],
            entries.join("  "),
            schedule.period_costs[period]
        );
    }
    println!("  Total cost: {:.3}", schedule.total_cost);
    Ok(())
}

fn cmd_runs(project_path: &Path, scenario_id: Option<&str>) -> AppResult<()> {
    let runs = run_service::list_runs(project_path, scenario_id)?;

    if runs.is_empty() {
        println!("No stored runs found");
    } else {
        println!("Stored runs:");
        for manifest in runs {
            println!(
                "  {} {} ({}, {} periods, {:?})",
                manifest.run_id, manifest.scenario_id, manifest.created_at, manifest.snapshot_count, manifest.status
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str, node: Option<&str>) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let run = run_service::load_run(project_path, run_id)?;
    println!("  Scenario: {}", run.scenario_id);
    println!("  Created: {}", run.created_at);
    println!("  Status: {:?}", run.status);
    print_summary(&run)?;

    if let Some(node) = node {
        println!("\nPressure at {}:", node);
        for (timestamp, pressure) in query::node_series(&run, node) {
            println!("  {}  {:.3} m", timestamp, pressure);
        }
    }
    Ok(())
}

fn cmd_export_graph(
    project_path: &Path,
    run_id: Option<&str>,
    period: usize,
    format: GraphFormat,
    output: Option<&Path>,
) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let network = project_service::compile_network(&project)?;
    let mut graph = GraphProjection::from_network(&network);

    if let Some(run_id) = run_id {
        let run = run_service::load_run(project_path, run_id)?;
        let snapshot = run
            .snapshots
            .iter()
            .find(|s| s.period == period)
            .ok_or_else(|| AppError::InvalidInput(format!("run {run_id} has no period {period}")))?;
        graph = graph.with_snapshot(snapshot);
    }

    let text = match format {
        GraphFormat::Json => serde_json::to_string_pretty(&graph)
            .map_err(|e| AppError::Results(e.to_string()))?,
        GraphFormat::Cypher => graph.to_cypher(),
    };

    if let Some(path) = output {
        std::fs::write(path, text)?;
        println!(
            "✓ Exported {} nodes and {} edges to {}",
            graph.nodes.len(),
            graph.edges.len(),
            path.display()
        );
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn print_summary(run: &hn_results::SimulationRun) -> AppResult<()> {
    let summary = query::get_run_summary(run)?;
    println!("  Periods: {} ({} unconverged)", summary.periods, summary.unconverged_periods);
    println!("  Nodes: {}", summary.node_count);
    println!("  Links: {}", summary.link_count);
    println!(
        "  Pressure range: {:.2} m at {} (t={}) .. {:.2} m at {} (t={})",
        summary.min_pressure.2,
        summary.min_pressure.0,
        summary.min_pressure.1,
        summary.max_pressure.2,
        summary.max_pressure.0,
        summary.max_pressure.1
    );
    println!("  Anomalies: {}", summary.anomaly_count);
    if let Some(cost) = summary.schedule_cost {
        println!("  Schedule cost: {:.3}", cost);
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.period) {
        (RunStage::Solving, Some(p)) => {
            let width = 28usize;
            let filled = ((p.fraction_complete() * width as f64).round() as usize).min(width);
            let bar = format!("{}{}", "#".repeat(filled), "-".repeat(width.saturating_sub(filled)));
            print!(
                "\r[{}] {:>6.2}%  period={}/{}  iter={}  residual={:.3e}  elapsed={:.1}s",
                bar,
                p.fraction_complete() * 100.0,
                p.period + 1,
                p.periods,
                p.iterations,
                p.max_residual_m3h,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}
