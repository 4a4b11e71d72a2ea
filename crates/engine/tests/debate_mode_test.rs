mod common;

use common::TestHarness;
use taskforge_core::traits::TaskStore;
use taskforge_core::types::{
    Complexity, DebateRound, DebateState, Evaluation, Personas, Score, TaskMode, TaskPlan,
    TaskStatus,
};
use taskforge_engine::modes::run_debate_mode;

const SETUP: &str = r#"{
  "personas": {
    "pro": {"style": "optimistic", "framework": "consequentialism"},
    "con": {"style": "skeptical", "framework": "precautionary principle"},
    "judge": {"style": "methodical", "framework": "formal logic"}
  },
  "complexity": {"max_rounds": 8, "score_diff_threshold": 8}
}"#;

fn round_script(n: u32) -> [String; 4] {
    [
        format!(r#"{{"rules": "Round {n} focus"}}"#),
        format!(r#"{{"argument": "Pro point {n}"}}"#),
        format!(r#"{{"argument": "Con point {n}"}}"#),
        r#"{"winner": "pro", "score": {"pro": 5, "con": 0}, "justification": "Pro was sharper."}"#
            .to_string(),
    ]
}

/// Per-round scores pro=5/con=0 against a threshold of 8: the cumulative
/// difference reaches 10 after round 2, so the debate ends early despite
/// max_rounds = 8.
#[tokio::test]
async fn test_early_termination_on_score_threshold() {
    let mut script: Vec<String> = vec![SETUP.to_string()];
    script.extend(round_script(1));
    script.extend(round_script(2));
    script.push(
        r#"{"winner": "pro", "score": {"pro": 9, "con": 3}, "justification": "Pro carried the debate."}"#
            .to_string(),
    );
    let script_refs: Vec<&str> = script.iter().map(String::as_str).collect();

    let harness = TestHarness::new(&script_refs);
    harness
        .insert_task("t1", "AI will benefit society", TaskMode::Debate, TaskStatus::Planning)
        .await;
    let mut ctx = harness.context("t1", "AI will benefit society", TaskMode::Debate, None);

    run_debate_mode(&mut ctx).await.unwrap();

    // 1 setup + 2 rounds x 4 sub-steps + 1 verdict; round 3 never starts.
    assert_eq!(harness.gateway.call_count(), 10);

    let state = ctx.plan.as_debate().unwrap();
    assert_eq!(state.rounds.len(), 2);
    assert_eq!(state.total_scores(), (10, 0));
    assert_eq!(state.rounds[1].pro_argument, "Pro point 2");
    assert!(state.verdict.is_some());

    assert!(ctx.is_finished);
    assert_eq!(ctx.step_results.len(), 1);
    assert!(ctx.step_results[0].contains("**Winner:** PRO"));
    assert!(ctx.step_results[0].contains("Pro carried the debate."));

    // Personas and complexity persisted with the rounds.
    let stored = harness.store.load_task("t1").await.unwrap().unwrap();
    let stored_state = stored.plan.as_debate().unwrap();
    assert_eq!(stored_state.personas.pro.style, "optimistic");
    assert_eq!(stored_state.complexity.score_diff_threshold, 8);
}

/// A persisted verdict short-circuits both the round loop (rounds already
/// at max) and the verdict call: no model calls at all.
#[tokio::test]
async fn test_verdict_is_idempotent() {
    let harness = TestHarness::new(&[]);
    harness
        .insert_task("t1", "topic", TaskMode::Debate, TaskStatus::Running)
        .await;

    let state = DebateState {
        personas: Personas::default(),
        complexity: Complexity {
            max_rounds: 1,
            score_diff_threshold: 8,
        },
        rounds: vec![DebateRound {
            round: 1,
            rules: "r1".into(),
            pro_argument: "p1".into(),
            con_argument: "c1".into(),
            evaluation: Some(Evaluation {
                winner: "con".into(),
                score: Score { pro: 3, con: 6 },
                justification: "Con held the line.".into(),
            }),
        }],
        verdict: Some(Evaluation {
            winner: "con".into(),
            score: Score { pro: 4, con: 8 },
            justification: "Con wins overall.".into(),
        }),
    };

    let mut ctx = harness.context("t1", "topic", TaskMode::Debate, None);
    ctx.plan = TaskPlan::Debate(state);

    run_debate_mode(&mut ctx).await.unwrap();

    assert_eq!(harness.gateway.call_count(), 0);
    assert!(ctx.step_results[0].contains("**Winner:** CON"));
    assert!(ctx.step_results[0].contains("Con wins overall."));
}

/// Each sub-step is persisted as a running/completed ledger pair, and the
/// stop signal is honored between sub-steps.
#[tokio::test]
async fn test_round_substeps_are_ledgered() {
    let mut script: Vec<String> = vec![SETUP.to_string()];
    script.extend(round_script(1));
    script.extend(round_script(2));
    script.push(r#"{"winner": "pro", "score": {"pro": 9, "con": 2}, "justification": "j"}"#.to_string());
    let script_refs: Vec<&str> = script.iter().map(String::as_str).collect();

    let harness = TestHarness::new(&script_refs);
    harness
        .insert_task("t1", "topic", TaskMode::Debate, TaskStatus::Planning)
        .await;
    let mut ctx = harness.context("t1", "topic", TaskMode::Debate, None);
    run_debate_mode(&mut ctx).await.unwrap();

    let steps = harness.store.list_steps("t1").await.unwrap();
    // Every model call produced a running and a completed row.
    assert_eq!(steps.len(), 20);
    let indices: Vec<u32> = steps.iter().map(|s| s.step_index).collect();
    let expected: Vec<u32> = (1..=20).collect();
    assert_eq!(indices, expected);
    assert!(steps.iter().any(|s| s.action == "Phase 2.1.2: Pro Argues"));
    assert!(steps.iter().any(|s| s.action == "Phase 3: Final Verdict"));
}
