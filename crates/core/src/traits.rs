//! Collaborator contracts for Taskforge.
//!
//! These traits are the narrow seams between the orchestration engine and
//! its external collaborators: the model gateway, knowledge retrieval, and
//! persistent storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{SectionContent, Step, StepCompletion, StepStatus, Task, TaskPlan, TaskStatus};

// =============================================================================
// Model Gateway
// =============================================================================

/// One role/content message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generation options for a single completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Max output tokens; None lets the provider decide.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn with_max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }
}

/// A model response.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text content.
    pub content: String,
}

/// Accepts a list of role/content messages plus generation options and
/// returns one response message, or fails.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

// =============================================================================
// Knowledge Retrieval
// =============================================================================

/// One retrieved snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHit {
    /// Name or path of the source document.
    pub source_name: String,
    /// Matching content excerpt.
    pub content_snippet: String,
    /// Relevance score.
    pub score: f32,
}

/// Routes a query to internet search, an online knowledge base, or a local
/// vector index depending on the selector string.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, selector: &str) -> Result<Vec<SourceHit>>;
}

// =============================================================================
// Task Store
// =============================================================================

/// Persistent task and step storage.
///
/// Step indices are assigned by counting existing rows at write time, so
/// ordering is only correct while a single flow writes steps for a given
/// task. Running the same task id from two processes is unsafe and must be
/// prevented by the caller.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> Result<()>;

    async fn load_task(&self, task_id: &str) -> Result<Option<Task>>;

    async fn task_status(&self, task_id: &str) -> Result<Option<TaskStatus>>;

    async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<()>;

    async fn set_plan(&self, task_id: &str, plan: &TaskPlan) -> Result<()>;

    async fn set_plan_and_status(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        status: TaskStatus,
    ) -> Result<()>;

    /// Progressive final-report snapshot.
    async fn set_final_report(&self, task_id: &str, report: &str) -> Result<()>;

    /// Persist plan, per-section content, and the reassembled report in one
    /// commit (write/research progressive state).
    async fn set_research_artifacts(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        research_content: &BTreeMap<String, SectionContent>,
        report: &str,
    ) -> Result<()>;

    /// Write terminal status and report body.
    async fn finalize_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        report: &str,
        updated_at: i64,
    ) -> Result<()>;

    /// Append a ledger step with a caller-chosen identity. The step index is
    /// assigned as `count(existing steps for the task) + 1`.
    async fn save_step_with_id(
        &self,
        task_id: &str,
        step_id: &str,
        action: &str,
        action_input: &str,
        status: StepStatus,
        result: &str,
    ) -> Result<Step>;

    /// Complete an in-flight step in place with full audit fields.
    async fn update_step(&self, step_id: &str, completion: &StepCompletion) -> Result<()>;

    /// Overwrite the result of the step whose identity is derived from the
    /// task id and the sanitized action name.
    async fn update_step_result(&self, task_id: &str, action: &str, result: &str) -> Result<()>;

    async fn list_steps(&self, task_id: &str) -> Result<Vec<Step>>;

    async fn count_steps(&self, task_id: &str) -> Result<u32>;
}

/// Deterministic step identity used by [`TaskStore::update_step_result`]:
/// the task id joined to the action name with spaces dashed and all other
/// non `[A-Za-z0-9_-]` characters removed.
pub fn derived_step_id(task_id: &str, action: &str) -> String {
    let sanitized: String = action
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{}-{}", task_id, sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_step_id_sanitizes() {
        assert_eq!(
            derived_step_id("t1", "Phase 1: Generate Elaboration"),
            "t1-Phase-1-Generate-Elaboration"
        );
        assert_eq!(derived_step_id("t1", "finish_task"), "t1-finish_task");
    }
}
