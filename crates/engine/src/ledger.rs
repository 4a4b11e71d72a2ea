//! Step ledger glue.
//!
//! Every mode phase boundary funnels through [`call_and_save`]: a durable
//! `running` placeholder goes in before the model call and a `completed` row
//! after, so a crash mid-phase leaves an inspectable in-flight marker
//! instead of silent loss.

use serde_json::Value;
use uuid::Uuid;

use taskforge_core::{
    traits::ChatMessage,
    types::{Step, StepStatus},
    Result,
};

use crate::context::TaskContext;
use crate::invoker::call_model;

/// Append a new ledger step with a fresh identity; the store assigns the
/// next step index.
pub async fn save_step(
    ctx: &TaskContext,
    action: &str,
    result: &Value,
    status: StepStatus,
) -> Result<Step> {
    let step_id = Uuid::new_v4().to_string();
    ctx.store
        .save_step_with_id(
            &ctx.task_id,
            &step_id,
            action,
            "{}",
            status,
            &result.to_string(),
        )
        .await
}

/// Write a `running` placeholder, perform a robust model call, then write a
/// `completed` step carrying the parsed result.
pub async fn call_and_save(
    ctx: &TaskContext,
    action: &str,
    messages: &[ChatMessage],
    max_tokens: Option<u32>,
) -> Result<Value> {
    save_step(ctx, action, &Value::Object(Default::default()), StepStatus::Running).await?;
    let data = call_model(ctx, messages, max_tokens).await?;
    save_step(ctx, action, &data, StepStatus::Completed).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use taskforge_core::config::EngineConfig;
    use taskforge_core::mocks::MockGateway;
    use taskforge_core::traits::TaskStore;
    use taskforge_core::types::TaskMode;
    use taskforge_store::{InMemoryTaskStore, TaskFileSink};

    fn make_ctx(gateway: Arc<MockGateway>) -> (TaskContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = TaskContext::new(
            "t1",
            "goal",
            TaskMode::Write,
            None,
            EngineConfig::default(),
            gateway.clone(),
            gateway,
            None,
            Arc::new(InMemoryTaskStore::new()),
            TaskFileSink::new(dir.path()).unwrap(),
        );
        (ctx, dir)
    }

    #[tokio::test]
    async fn test_call_and_save_writes_running_then_completed() {
        let gateway = Arc::new(MockGateway::scripted(&[r#"{"answer": 42}"#]));
        let (ctx, _dir) = make_ctx(gateway);

        let data = call_and_save(&ctx, "Phase 1: Think", &[ChatMessage::user("q")], None)
            .await
            .unwrap();
        assert_eq!(data, json!({"answer": 42}));

        let steps = ctx.store.list_steps("t1").await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].status, StepStatus::Running);
        assert_eq!(steps[1].status, StepStatus::Completed);
        assert!(steps[1].result.contains("42"));
        assert_eq!((steps[0].step_index, steps[1].step_index), (1, 2));
    }

    #[tokio::test]
    async fn test_indices_unaffected_by_invoker_retries() {
        let gateway = Arc::new(MockGateway::scripted(&[
            "garbage response",
            r#"{"fine": true}"#,
        ]));
        let (ctx, _dir) = make_ctx(gateway.clone());

        call_and_save(&ctx, "Phase", &[ChatMessage::user("q")], None)
            .await
            .unwrap();

        // Two model attempts, still exactly two ledger rows with gapless
        // indices.
        assert_eq!(gateway.call_count(), 2);
        let steps = ctx.store.list_steps("t1").await.unwrap();
        let indices: Vec<u32> = steps.iter().map(|s| s.step_index).collect();
        assert_eq!(indices, vec![1, 2]);
    }
}
