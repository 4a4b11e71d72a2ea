//! In-memory task store.
//!
//! Backs tests and ephemeral runs; semantics match the SQLite store,
//! including count-based step index assignment.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use taskforge_core::{
    derived_step_id,
    error::{Error, Result},
    traits::TaskStore,
    types::{SectionContent, Step, StepCompletion, StepStatus, Task, TaskPlan, TaskStatus},
};

/// DashMap-backed task store.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Task>,
    steps: DashMap<String, Vec<Step>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_task<F>(&self, task_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Task),
    {
        let mut task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        f(&mut task);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_task(&self, task: &Task) -> Result<()> {
        self.tasks.insert(task.id.clone(), task.clone());
        tracing::debug!(task_id = %task.id, "Task inserted");
        Ok(())
    }

    async fn load_task(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.get(task_id).map(|t| t.clone()))
    }

    async fn task_status(&self, task_id: &str) -> Result<Option<TaskStatus>> {
        Ok(self.tasks.get(task_id).map(|t| t.status))
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.with_task(task_id, |t| t.status = status)
    }

    async fn set_plan(&self, task_id: &str, plan: &TaskPlan) -> Result<()> {
        self.with_task(task_id, |t| t.plan = plan.clone())
    }

    async fn set_plan_and_status(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        status: TaskStatus,
    ) -> Result<()> {
        self.with_task(task_id, |t| {
            t.plan = plan.clone();
            t.status = status;
        })
    }

    async fn set_final_report(&self, task_id: &str, report: &str) -> Result<()> {
        self.with_task(task_id, |t| t.final_report = report.to_string())
    }

    async fn set_research_artifacts(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        research_content: &BTreeMap<String, SectionContent>,
        report: &str,
    ) -> Result<()> {
        self.with_task(task_id, |t| {
            t.plan = plan.clone();
            t.research_content = research_content.clone();
            t.final_report = report.to_string();
        })
    }

    async fn finalize_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        report: &str,
        updated_at: i64,
    ) -> Result<()> {
        self.with_task(task_id, |t| {
            t.status = status;
            t.final_report = report.to_string();
            t.updated_at = updated_at;
        })
    }

    async fn save_step_with_id(
        &self,
        task_id: &str,
        step_id: &str,
        action: &str,
        action_input: &str,
        status: StepStatus,
        result: &str,
    ) -> Result<Step> {
        let mut steps = self.steps.entry(task_id.to_string()).or_default();
        let step = Step {
            id: step_id.to_string(),
            task_id: task_id.to_string(),
            step_index: steps.len() as u32 + 1,
            thought: String::new(),
            action: action.to_string(),
            action_input: action_input.to_string(),
            observation: String::new(),
            status,
            result: result.to_string(),
        };
        steps.push(step.clone());
        Ok(step)
    }

    async fn update_step(&self, step_id: &str, completion: &StepCompletion) -> Result<()> {
        for mut steps in self.steps.iter_mut() {
            if let Some(step) = steps.iter_mut().find(|s| s.id == step_id) {
                step.thought = completion.thought.clone();
                step.action = completion.action.clone();
                step.action_input = completion.action_input.clone();
                step.observation = completion.observation.clone();
                step.status = StepStatus::Completed;
                step.result = completion.result.clone();
                return Ok(());
            }
        }
        Err(Error::storage(format!("step not found: {step_id}")))
    }

    async fn update_step_result(&self, task_id: &str, action: &str, result: &str) -> Result<()> {
        let id = derived_step_id(task_id, action);
        if let Some(mut steps) = self.steps.get_mut(task_id) {
            if let Some(step) = steps.iter_mut().find(|s| s.id == id) {
                step.result = result.to_string();
            }
        }
        Ok(())
    }

    async fn list_steps(&self, task_id: &str) -> Result<Vec<Step>> {
        Ok(self
            .steps
            .get(task_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn count_steps(&self, task_id: &str) -> Result<u32> {
        Ok(self.steps.get(task_id).map(|s| s.len() as u32).unwrap_or(0))
    }
}
