use serde::{Deserialize, Serialize};

// =============================================================================
// Step Ledger Types
// =============================================================================

/// One persisted unit of orchestration work: a single model decision plus its
/// consequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step identity.
    pub id: String,
    /// Owning task.
    pub task_id: String,
    /// Strictly increasing within a task, assigned at write time as
    /// `count(existing steps) + 1`. Never reused, never skipped.
    pub step_index: u32,
    /// Optional rationale text.
    #[serde(default)]
    pub thought: String,
    /// Tool name or phase label.
    pub action: String,
    /// Structured arguments, serialized as JSON.
    pub action_input: String,
    /// Tool output, empty if no tool ran.
    #[serde(default)]
    pub observation: String,
    /// Lifecycle status.
    pub status: StepStatus,
    /// Human-facing markdown produced in this step.
    #[serde(default)]
    pub result: String,
}

/// Two-write step lifecycle: created `Running` before the model call, then
/// updated in place to `Completed`. A crash mid-call leaves a durable
/// in-progress marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Completed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Audit fields written when a plan/explore step completes.
#[derive(Debug, Clone, Default)]
pub struct StepCompletion {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
    pub result: String,
}
