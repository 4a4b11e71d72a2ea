mod common;

use common::TestHarness;
use taskforge_core::types::{StepStatus, TaskMode, TaskStatus};
use taskforge_core::Error;
use taskforge_engine::ResumeOverrides;

const PLAN: &str = r#"{
  "plan": [
    {"sub_goal": "Research the key aspects."},
    {"sub_goal": "finish_task"}
  ]
}"#;

const EXECUTOR_DECISION: &str = r###"{
  "thought": "No external information is needed here.",
  "action": "reasoning_step",
  "action_input": {"thought": "Reasoning through the aspects."},
  "result": "## Key Aspects\n\nThe aspects are A and B."
}"###;

const SYNTHESIS: &str = r###"{"report": "# The Goal\n\nA polished final report."}"###;

/// A full plan-execute run: plan, one executor step, the finish-task
/// sentinel, then final synthesis.
#[tokio::test]
async fn test_plan_mode_runs_to_completion() {
    let harness = TestHarness::new(&[PLAN, EXECUTOR_DECISION, SYNTHESIS]);
    let runner = harness.runner();

    let task_id = runner.run("the goal", TaskMode::Plan, None).await.unwrap();

    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.final_report, "# The Goal\n\nA polished final report.");

    // One step row per plan step, indices gapless, all completed.
    assert_eq!(snapshot.steps.len(), 2);
    let indices: Vec<u32> = snapshot.steps.iter().map(|s| s.step_index).collect();
    assert_eq!(indices, vec![1, 2]);
    assert!(snapshot.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert_eq!(snapshot.steps[1].action, "finish_task");

    // The finish step compiled the prior results into its observation.
    assert!(snapshot.steps[1].observation.contains("The aspects are A and B."));

    // Log and report artifacts were written.
    let log = std::fs::read_to_string(harness.files.log_path(&task_id)).unwrap();
    assert!(log.contains("## Step 1: Research the key aspects."));
    let report = std::fs::read_to_string(harness.files.report_path(&task_id)).unwrap();
    assert!(report.contains("**Status:** Completed"));
    assert!(report.contains("A polished final report."));
}

/// A planner response without the required structure fails the task, and
/// the failure is recorded rather than left running.
#[tokio::test]
async fn test_invalid_plan_fails_task() {
    let harness = TestHarness::new(&[r#"{"plan": "not a list"}"#]);
    let runner = harness.runner();

    let task_id = runner.run("the goal", TaskMode::Plan, None).await.unwrap();

    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert!(snapshot.final_report.contains("Task failed during execution"));
}

/// Stopping a running task writes the fixed stopped-by-user report under
/// the conflated `failed` status.
#[tokio::test]
async fn test_stop_marks_task_failed_with_fixed_message() {
    let harness = TestHarness::new(&[]);
    harness
        .insert_task("t1", "goal", TaskMode::Explore, TaskStatus::Running)
        .await;
    let runner = harness.runner();

    runner.stop("t1").await.unwrap();

    let snapshot = runner.status("t1").await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert_eq!(snapshot.final_report, "Task stopped by user.");

    // Stopping an already-terminal task is a no-op.
    runner.stop("t1").await.unwrap();
    assert!(matches!(
        runner.stop("missing").await.unwrap_err(),
        Error::TaskNotFound(_)
    ));
}

/// The write-mode pause/resume round trip through the runner's produced
/// contract.
#[tokio::test]
async fn test_write_mode_pause_and_resume_via_runner() {
    let harness = TestHarness::new(&[
        r#"{"elaboration": {"summary": "s", "style": "plain", "word_count": 100, "strategy": "short"}}"#,
        r#"{"plan": [{"sub_goal": "Everything", "word_count": 100}]}"#,
        // Resume: single leaf, passing critique.
        r#"{"content": "All of it."}"#,
        r#"{"scores": {"relevance": 9, "depth": 9, "clarity": 9, "style": 9, "word_count": 9}, "feedback": "ok"}"#,
    ]);
    let runner = harness.runner();

    let task_id = runner.run("tiny article", TaskMode::Write, None).await.unwrap();
    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::AwaitingUserInput);

    // Resume with the persisted plan and a user-confirmed elaboration.
    let overrides = ResumeOverrides {
        plan: None,
        elaboration: Some(taskforge_core::types::Elaboration {
            summary: "s".into(),
            style: "plain".into(),
            word_count: 100,
            strategy: "short".into(),
        }),
    };
    runner.resume_and_wait(&task_id, overrides).await.unwrap();

    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(snapshot.final_report.contains("## 1 Everything"));
    assert!(snapshot.final_report.contains("All of it."));
}

/// Write-mode resume without an elaboration cannot proceed and fails the
/// task.
#[tokio::test]
async fn test_write_resume_without_elaboration_fails() {
    let harness = TestHarness::new(&[
        r#"{"elaboration": {"summary": "s", "style": "plain", "word_count": 100, "strategy": "short"}}"#,
        r#"{"plan": [{"sub_goal": "Everything", "word_count": 100}]}"#,
    ]);
    let runner = harness.runner();
    let task_id = runner.run("tiny article", TaskMode::Write, None).await.unwrap();

    runner
        .resume_and_wait(&task_id, ResumeOverrides::default())
        .await
        .unwrap();

    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert!(snapshot.final_report.contains("elaboration"));
}

/// Step results that are themselves JSON objects contribute their
/// `content` field to the synthesis corpus.
#[tokio::test]
async fn test_synthesis_unwraps_json_step_results() {
    let harness = TestHarness::new(&[
        r#"{"plan": [{"sub_goal": "Only step"}]}"#,
        r#"{
          "thought": "t",
          "action": "none",
          "action_input": {},
          "result": "{\"content\": \"Unwrapped step text.\"}"
        }"#,
        SYNTHESIS,
    ]);
    let runner = harness.runner();

    let task_id = runner.run("the goal", TaskMode::Plan, None).await.unwrap();

    let snapshot = runner.status(&task_id).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Completed);
    // The synthesis prompt received the unwrapped text, not the JSON
    // wrapper.
    let requests = harness.gateway.requests();
    let synthesis_prompt = requests.last().unwrap();
    assert!(synthesis_prompt.contains("Unwrapped step text."));
    assert!(!synthesis_prompt.contains(r#"{"content""#));
}
