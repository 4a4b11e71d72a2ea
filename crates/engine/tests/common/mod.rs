#![allow(dead_code)]
//! Shared test harness: scripted gateways over an in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use taskforge_core::config::EngineConfig;
use taskforge_core::mocks::MockGateway;
use taskforge_core::traits::TaskStore;
use taskforge_core::types::{Task, TaskMode, TaskPlan, TaskStatus};
use taskforge_engine::{TaskContext, TaskRunner};
use taskforge_store::{InMemoryTaskStore, TaskFileSink};

pub struct TestHarness {
    pub store: Arc<InMemoryTaskStore>,
    pub gateway: Arc<MockGateway>,
    pub bulk_gateway: Arc<MockGateway>,
    pub files: TaskFileSink,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness whose chat gateway plays the given script; the bulk gateway
    /// has an empty script and fails loudly if touched.
    pub fn new(script: &[&str]) -> Self {
        Self::with_bulk(script, &[])
    }

    pub fn with_bulk(script: &[&str], bulk_script: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self {
            store: Arc::new(InMemoryTaskStore::new()),
            gateway: Arc::new(MockGateway::scripted(script)),
            bulk_gateway: Arc::new(MockGateway::scripted(bulk_script)),
            files: TaskFileSink::new(dir.path()).expect("file sink"),
            _dir: dir,
        }
    }

    pub async fn insert_task(&self, task_id: &str, goal: &str, mode: TaskMode, status: TaskStatus) {
        self.store
            .insert_task(&Task {
                id: task_id.to_string(),
                goal: goal.to_string(),
                mode,
                status,
                plan: TaskPlan::default(),
                research_content: BTreeMap::new(),
                final_report: String::new(),
                created_at: 0,
                updated_at: 0,
            })
            .await
            .expect("insert task");
    }

    pub fn context(
        &self,
        task_id: &str,
        goal: &str,
        mode: TaskMode,
        knowledge_selector: Option<&str>,
    ) -> TaskContext {
        TaskContext::new(
            task_id,
            goal,
            mode,
            knowledge_selector.map(str::to_string),
            EngineConfig::default(),
            self.gateway.clone(),
            self.bulk_gateway.clone(),
            None,
            self.store.clone(),
            self.files.clone(),
        )
    }

    pub fn runner(&self) -> TaskRunner {
        TaskRunner::new(
            EngineConfig::default(),
            self.store.clone(),
            self.gateway.clone(),
            self.bulk_gateway.clone(),
            self.files.clone(),
        )
    }
}
