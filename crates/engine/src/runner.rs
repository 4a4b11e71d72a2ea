//! Task runner: the top-level dispatcher.
//!
//! Selects a mode state machine, runs it, performs final synthesis, and
//! always finalizes the task row — a run never ends with the task silently
//! left `running`. Partial progress (persisted steps, progressive reports)
//! is never rolled back.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use taskforge_core::{
    config::EngineConfig,
    now_millis,
    traits::{ChatMessage, KnowledgeRetriever, ModelGateway, TaskStore},
    types::{Elaboration, SectionContent, Step, Task, TaskMode, TaskPlan, TaskStatus},
    Error, Result,
};
use taskforge_store::TaskFileSink;

use crate::context::TaskContext;
use crate::invoker::call_model;
use crate::modes;
use crate::prompts;
use crate::report::assemble_report;

/// Fixed report body for user-stopped tasks.
const STOPPED_REPORT: &str = "Task stopped by user.";

/// User-supplied state applied when resuming a paused task.
#[derive(Debug, Clone, Default)]
pub struct ResumeOverrides {
    /// A (possibly user-edited) plan replacing the persisted one.
    pub plan: Option<TaskPlan>,
    /// A (possibly user-edited) elaboration.
    pub elaboration: Option<Elaboration>,
}

/// Read-only projection of a task's persisted state.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub plan: TaskPlan,
    pub steps: Vec<Step>,
    pub research_content: BTreeMap<String, SectionContent>,
    pub final_report: String,
}

enum Outcome {
    /// The mode suspended the task (awaiting user input, or research-mode
    /// sections pending); the caller resumes it later.
    Paused,
    /// The mode ran to completion and produced the final report body.
    Finished(String),
}

/// Runs tasks as independent fire-and-forget jobs, one flow per task.
#[derive(Clone)]
pub struct TaskRunner {
    config: EngineConfig,
    store: Arc<dyn TaskStore>,
    gateway: Arc<dyn ModelGateway>,
    bulk_gateway: Arc<dyn ModelGateway>,
    retriever: Option<Arc<dyn KnowledgeRetriever>>,
    files: TaskFileSink,
}

impl TaskRunner {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn TaskStore>,
        gateway: Arc<dyn ModelGateway>,
        bulk_gateway: Arc<dyn ModelGateway>,
        files: TaskFileSink,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            bulk_gateway,
            retriever: None,
            files,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    // =========================================================================
    // Produced contract
    // =========================================================================

    /// Create a task and run it as a detached background job.
    pub async fn start(
        &self,
        goal: &str,
        mode: TaskMode,
        knowledge_selector: Option<String>,
    ) -> Result<String> {
        let task_id = self.create_task(goal, mode).await?;
        let runner = self.clone();
        let goal = goal.to_string();
        let spawned_id = task_id.clone();
        tokio::spawn(async move {
            runner
                .drive(&spawned_id, &goal, mode, knowledge_selector, false, ResumeOverrides::default())
                .await;
        });
        Ok(task_id)
    }

    /// Create a task and drive it to completion, pause, or failure inline.
    pub async fn run(
        &self,
        goal: &str,
        mode: TaskMode,
        knowledge_selector: Option<String>,
    ) -> Result<String> {
        let task_id = self.create_task(goal, mode).await?;
        self.drive(&task_id, goal, mode, knowledge_selector, false, ResumeOverrides::default())
            .await;
        Ok(task_id)
    }

    /// Resume a paused or failed task from persisted state as a detached
    /// job.
    pub async fn resume(&self, task_id: &str, overrides: ResumeOverrides) -> Result<()> {
        let task = self.prepare_resume(task_id, &overrides).await?;
        let runner = self.clone();
        let task_id = task_id.to_string();
        tokio::spawn(async move {
            runner
                .drive(&task_id, &task.goal, task.mode, None, true, overrides)
                .await;
        });
        Ok(())
    }

    /// Resume inline, returning once the task reaches a terminal or paused
    /// state again.
    pub async fn resume_and_wait(&self, task_id: &str, overrides: ResumeOverrides) -> Result<()> {
        let task = self.prepare_resume(task_id, &overrides).await?;
        self.drive(task_id, &task.goal, task.mode, None, true, overrides)
            .await;
        Ok(())
    }

    /// Cooperative stop: finalizes the task as failed with the fixed
    /// stopped-by-user report. A running mode observes the status change at
    /// its next checkpoint; an in-flight model call is not interrupted.
    pub async fn stop(&self, task_id: &str) -> Result<()> {
        match self.store.task_status(task_id).await? {
            None => Err(Error::TaskNotFound(task_id.to_string())),
            Some(TaskStatus::Completed) | Some(TaskStatus::Failed) => {
                tracing::info!(task_id = %task_id, "Stop requested for a task already terminal");
                Ok(())
            }
            Some(_) => {
                tracing::info!(task_id = %task_id, "Stopping task");
                self.store
                    .finalize_task(task_id, TaskStatus::Failed, STOPPED_REPORT, now_millis())
                    .await
            }
        }
    }

    /// Project the task's persisted state.
    pub async fn status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let task = self
            .store
            .load_task(task_id)
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let steps = self.store.list_steps(task_id).await?;
        Ok(TaskSnapshot {
            status: task.status,
            plan: task.plan,
            steps,
            research_content: task.research_content,
            final_report: task.final_report,
        })
    }

    /// Research mode: generate content for one outline leaf on the bulk
    /// model assignment.
    pub async fn generate_section(&self, task_id: &str, node_id: &str) -> Result<()> {
        let mut ctx = self.context_from_task(task_id).await?;
        ctx.gateway = ctx.bulk_gateway.clone();
        modes::generate_node_content(&mut ctx, node_id).await
    }

    /// Rewrite one section's content per a user instruction (or replace it
    /// verbatim when `is_manual`).
    pub async fn refine_section(
        &self,
        task_id: &str,
        node_id: &str,
        user_prompt: &str,
        is_manual: bool,
    ) -> Result<()> {
        let mut ctx = self.context_from_task(task_id).await?;
        modes::refine_section(&mut ctx, node_id, user_prompt, is_manual).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn create_task(&self, goal: &str, mode: TaskMode) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();
        let now = now_millis();
        self.store
            .insert_task(&Task {
                id: task_id.clone(),
                goal: goal.to_string(),
                mode,
                status: TaskStatus::Planning,
                plan: TaskPlan::default(),
                research_content: BTreeMap::new(),
                final_report: String::new(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(task_id = %task_id, mode = %mode, "Task created");
        Ok(task_id)
    }

    async fn prepare_resume(&self, task_id: &str, overrides: &ResumeOverrides) -> Result<Task> {
        let task = self
            .store
            .load_task(task_id)
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        tracing::info!(task_id = %task_id, status = %task.status, "Resuming task");
        self.store.set_status(task_id, TaskStatus::Running).await?;
        if let Some(plan) = &overrides.plan {
            self.store.set_plan(task_id, plan).await?;
        }
        Ok(task)
    }

    fn build_context(
        &self,
        task_id: &str,
        goal: &str,
        mode: TaskMode,
        knowledge_selector: Option<String>,
    ) -> TaskContext {
        TaskContext::new(
            task_id,
            goal,
            mode,
            knowledge_selector,
            self.config.clone(),
            self.gateway.clone(),
            self.bulk_gateway.clone(),
            self.retriever.clone(),
            self.store.clone(),
            self.files.clone(),
        )
    }

    /// Reconstruct a context for a detached per-section operation.
    async fn context_from_task(&self, task_id: &str) -> Result<TaskContext> {
        let task = self
            .store
            .load_task(task_id)
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let mut ctx = self.build_context(&task.id, &task.goal, task.mode, None);
        ctx.plan = task.plan;
        ctx.research_content = task.research_content;
        Ok(ctx)
    }

    /// Run the task to a terminal or paused state and persist the outcome.
    async fn drive(
        &self,
        task_id: &str,
        goal: &str,
        mode: TaskMode,
        knowledge_selector: Option<String>,
        is_resume: bool,
        overrides: ResumeOverrides,
    ) {
        let mut ctx = self.build_context(task_id, goal, mode, knowledge_selector);

        if is_resume {
            match self.store.load_task(task_id).await {
                Ok(Some(task)) => {
                    ctx.plan = task.plan;
                    ctx.research_content = task.research_content;
                }
                Ok(None) => {
                    tracing::error!(task_id = %task_id, "Task disappeared before resume");
                    return;
                }
                Err(e) => {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to reload task for resume");
                    return;
                }
            }
            if let Some(plan) = overrides.plan {
                ctx.plan = plan;
            }
            if let Some(elaboration) = overrides.elaboration {
                ctx.elaboration = Some(elaboration);
            }
            if ctx.elaboration.is_none() && mode == TaskMode::Research {
                ctx.elaboration = Some(Elaboration {
                    summary: format!("In-depth research report on: {goal}"),
                    style: "In-depth research report".into(),
                    word_count: 3000,
                    strategy: "Comprehensive and structured.".into(),
                });
            }
        }

        let outcome = self.execute(&mut ctx, is_resume).await;

        let (status, report) = match outcome {
            Ok(Outcome::Paused) => return,
            Ok(Outcome::Finished(report)) => (TaskStatus::Completed, report),
            Err(Error::Stopped) => {
                tracing::info!(task_id = %task_id, "Task stopped by user");
                (TaskStatus::Failed, STOPPED_REPORT.to_string())
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Task execution failed");
                (TaskStatus::Failed, format!("Task failed during execution: {e}"))
            }
        };

        if let Err(e) = self
            .files
            .write_report(task_id, goal, status.as_str(), &report)
        {
            tracing::warn!(task_id = %task_id, error = %e, "Failed to write report artifact");
        }
        if let Err(e) = self
            .store
            .finalize_task(task_id, status, &report, now_millis())
            .await
        {
            tracing::error!(task_id = %task_id, error = %e, "Failed to finalize task");
        }
        tracing::info!(task_id = %task_id, status = %status, "Task finalized");
    }

    async fn execute(&self, ctx: &mut TaskContext, is_resume: bool) -> Result<Outcome> {
        if !is_resume {
            if let Err(e) = self
                .files
                .init_log(&ctx.task_id, &ctx.goal, ctx.mode.as_str())
            {
                tracing::warn!(task_id = %ctx.task_id, error = %e, "Failed to initialize task log");
            }
        }

        match (ctx.mode, is_resume) {
            (TaskMode::Plan, _) => modes::run_plan_mode(ctx).await?,
            (TaskMode::Explore, _) => modes::run_explore_mode(ctx).await?,
            (TaskMode::Write, false) => modes::run_write_mode(ctx).await?,
            (TaskMode::Write, true) | (TaskMode::Research, true) => {
                modes::resume_write_mode(ctx).await?
            }
            (TaskMode::Research, false) => modes::run_research_mode(ctx).await?,
            (TaskMode::Debate, _) => modes::run_debate_mode(ctx).await?,
        }

        // Write mode parks here until the user confirms the outline.
        if self.store.task_status(&ctx.task_id).await? == Some(TaskStatus::AwaitingUserInput) {
            return Ok(Outcome::Paused);
        }
        // Research sections are generated on demand; the task stays running.
        if ctx.mode == TaskMode::Research && !ctx.is_finished {
            return Ok(Outcome::Paused);
        }

        if !ctx.is_finished {
            tracing::warn!(
                task_id = %ctx.task_id,
                "Task completed all steps without being marked finished; expected for some modes"
            );
        }

        let report = self.synthesize_final_report(ctx).await?;
        Ok(Outcome::Finished(report))
    }

    /// Produce the final artifact: write/research assemble the structured
    /// content directly, other modes synthesize a report from step results
    /// with one model call.
    async fn synthesize_final_report(&self, ctx: &TaskContext) -> Result<String> {
        tracing::info!(task_id = %ctx.task_id, "Starting final synthesis step");

        if matches!(ctx.mode, TaskMode::Write | TaskMode::Research) {
            tracing::info!(task_id = %ctx.task_id, "Final report assembled from structured content");
            return Ok(assemble_report(&ctx.goal, &ctx.plan, &ctx.research_content));
        }

        let parsed: Vec<String> = ctx.step_results.iter().map(|r| parse_step_result(r)).collect();
        let history = parsed.join("\n\n---\n\n");
        if history.trim().is_empty() {
            tracing::warn!(task_id = %ctx.task_id, "No content available for final synthesis");
            return Ok(
                "The agent task is complete, but no content was generated to synthesize."
                    .to_string(),
            );
        }

        let prompt = prompts::final_synthesis_prompt(ctx, &history);
        let data = call_model(ctx, &[ChatMessage::user(prompt)], Some(4096)).await?;
        let report = data
            .get("report")
            .and_then(Value::as_str)
            .unwrap_or("Failed to synthesize the final report.")
            .to_string();
        tracing::info!(task_id = %ctx.task_id, "Final synthesis complete");
        Ok(report)
    }
}

/// Extract clean content from a step result that may itself be serialized
/// JSON: an object with a `content` field contributes that field, other
/// JSON contributes its compact form, and plain text passes through.
fn parse_step_result(result: &str) -> String {
    match serde_json::from_str::<Value>(result) {
        Ok(Value::Object(map)) => match map.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => Value::Object(map).to_string(),
        },
        Ok(other) => other.to_string(),
        Err(_) => result.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_result_unwraps_content() {
        assert_eq!(parse_step_result(r#"{"content": "clean text"}"#), "clean text");
    }

    #[test]
    fn test_parse_step_result_stringifies_other_json() {
        assert_eq!(parse_step_result(r#"{"other": 1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn test_parse_step_result_passes_plain_text() {
        assert_eq!(parse_step_result("## Markdown result"), "## Markdown result");
    }
}
