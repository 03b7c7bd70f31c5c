//! Progress events streamed to front ends while a run executes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProject,
    CompilingNetwork,
    CheckingCache,
    LoadingCachedResult,
    Solving,
    Detecting,
    Optimizing,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingProject => "load",
            RunStage::CompilingNetwork => "compile",
            RunStage::CheckingCache => "cache",
            RunStage::LoadingCachedResult => "cache-load",
            RunStage::Solving => "solve",
            RunStage::Detecting => "detect",
            RunStage::Optimizing => "optimize",
            RunStage::SavingResults => "save",
            RunStage::Completed => "done",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodProgress {
    pub period: usize,
    pub periods: usize,
    pub iterations: usize,
    pub max_residual_m3h: f64,
    pub converged: bool,
}

impl PeriodProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.periods == 0 {
            1.0
        } else {
            (self.period + 1) as f64 / self.periods as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub scenario_id: String,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub period: Option<PeriodProgress>,
}

impl RunProgressEvent {
    pub fn stage(
        scenario_id: impl Into<String>,
        stage: RunStage,
        elapsed_wall_s: f64,
        message: Option<String>,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            stage,
            elapsed_wall_s,
            message,
            period: None,
        }
    }
}
