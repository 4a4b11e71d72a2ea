//! Mutable per-task state threaded through a mode's execution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use taskforge_core::{
    config::EngineConfig,
    traits::{KnowledgeRetriever, ModelGateway, TaskStore},
    types::{Elaboration, SectionContent, TaskMode, TaskPlan, TaskStatus},
    Error, Result,
};
use taskforge_store::TaskFileSink;

/// One explore-mode action outcome, kept in memory to detect
/// repeated-failure loops. Not persisted beyond the run.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub name: String,
    pub success: bool,
}

/// The state a task carries through its lifetime.
///
/// Each task run owns exactly one instance, passed `&mut` to every phase
/// function; all persistence and model calls act through the handles it
/// holds. No state is shared across concurrently running tasks.
pub struct TaskContext {
    pub task_id: String,
    pub goal: String,
    pub mode: TaskMode,
    /// Knowledge source selector; `None` or `"none"` means retrieval is
    /// unavailable and `retrieve_knowledge` degrades to its sentinel.
    pub knowledge_selector: Option<String>,
    pub config: EngineConfig,
    /// Primary model for orchestration decisions.
    pub gateway: Arc<dyn ModelGateway>,
    /// Cheaper model for research-mode bulk generation.
    pub bulk_gateway: Arc<dyn ModelGateway>,
    pub retriever: Option<Arc<dyn KnowledgeRetriever>>,
    pub store: Arc<dyn TaskStore>,
    pub files: TaskFileSink,
    /// Mode-dependent plan value.
    pub plan: TaskPlan,
    /// Tool observation per step index.
    pub step_outputs: HashMap<u32, String>,
    /// Ordered markdown fragments, one per completed step.
    pub step_results: Vec<String>,
    /// Set by the critique loop (explore) or the last phase (write/debate).
    pub is_finished: bool,
    /// Background text available to the planner.
    pub initial_context: String,
    /// Generated content per leaf node id.
    pub research_content: BTreeMap<String, SectionContent>,
    /// Explore-mode action outcomes.
    pub action_history: Vec<ActionRecord>,
    /// Write-mode elaboration, set in phase 1 or supplied on resume.
    pub elaboration: Option<Elaboration>,
}

impl TaskContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: impl Into<String>,
        goal: impl Into<String>,
        mode: TaskMode,
        knowledge_selector: Option<String>,
        config: EngineConfig,
        gateway: Arc<dyn ModelGateway>,
        bulk_gateway: Arc<dyn ModelGateway>,
        retriever: Option<Arc<dyn KnowledgeRetriever>>,
        store: Arc<dyn TaskStore>,
        files: TaskFileSink,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            goal: goal.into(),
            mode,
            knowledge_selector,
            config,
            gateway,
            bulk_gateway,
            retriever,
            store,
            files,
            plan: TaskPlan::default(),
            step_outputs: HashMap::new(),
            step_results: Vec::new(),
            is_finished: false,
            initial_context: String::new(),
            research_content: BTreeMap::new(),
            action_history: Vec::new(),
            elaboration: None,
        }
    }

    /// Whether a retrieval source is configured for this task.
    pub fn has_retrieval_source(&self) -> bool {
        matches!(&self.knowledge_selector, Some(s) if !s.is_empty() && s != "none")
    }

    /// Cooperative stop checkpoint: fails with [`Error::Stopped`] when the
    /// persisted status shows the task is no longer supposed to run.
    pub async fn check_stopped(&self) -> Result<()> {
        let status = self.store.task_status(&self.task_id).await?;
        match status {
            Some(TaskStatus::Running) | Some(TaskStatus::Planning) => Ok(()),
            other => {
                tracing::info!(
                    task_id = %self.task_id,
                    status = ?other,
                    "Task stopped externally, terminating execution"
                );
                Err(Error::Stopped)
            }
        }
    }

    /// Append to the task log. The log is a side artifact; write failures
    /// are logged and ignored.
    pub fn append_log(&self, entry: &str) {
        if let Err(e) = self.files.append_log(&self.task_id, entry) {
            tracing::warn!(task_id = %self.task_id, error = %e, "Failed to append task log");
        }
    }
}
