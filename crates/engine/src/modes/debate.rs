//! Debate mode: setup, judged rounds, verdict.
//!
//! A judge sets per-round rules, pro and con argue under their personas,
//! and the judge scores each round. The debate ends early once the
//! cumulative score difference reaches the configured threshold.

use serde_json::Value;

use taskforge_core::{
    traits::ChatMessage,
    types::{DebateRound, DebateState, Evaluation, TaskPlan, TaskStatus},
    Result,
};

use crate::context::TaskContext;
use crate::ledger::call_and_save;
use crate::prompts;

pub async fn run_debate_mode(ctx: &mut TaskContext) -> Result<()> {
    tracing::info!(task_id = %ctx.task_id, "Starting debate mode");

    let (mut state, needs_setup) = match ctx.plan.as_debate() {
        Some(existing) => (existing.clone(), false),
        None => (DebateState::default(), true),
    };

    // Phase 1: personas and complexity, set once and never mutated after.
    if needs_setup {
        let prompt = prompts::persona_prompt(ctx);
        let data = call_and_save(
            ctx,
            "Phase 1: Generate Personas & Complexity",
            &[ChatMessage::user(prompt)],
            None,
        )
        .await?;

        state.personas =
            serde_json::from_value(data.get("personas").cloned().unwrap_or(Value::Null))
                .unwrap_or_default();
        state.complexity =
            serde_json::from_value(data.get("complexity").cloned().unwrap_or(Value::Null))
                .unwrap_or_default();
        state.rounds = Vec::new();

        ctx.plan = TaskPlan::Debate(state.clone());
        ctx.store
            .set_plan_and_status(&ctx.task_id, &ctx.plan, TaskStatus::Running)
            .await?;
    }

    let max_rounds = state.complexity.max_rounds;
    let score_diff_threshold = state.complexity.score_diff_threshold;

    // Rebuild the running transcript from any persisted rounds so a resumed
    // debate argues against its full history.
    let mut history = String::new();
    for round in &state.rounds {
        append_round_to_history(&mut history, round);
    }

    // Phase 2: round loop.
    while (state.rounds.len() as u32) < max_rounds {
        let round_num = state.rounds.len() as u32 + 1;

        // Judge sets the round's focus.
        ctx.check_stopped().await?;
        let prompt = prompts::judge_rules_prompt(ctx, &history, round_num);
        let rules_data = call_and_save(
            ctx,
            &format!("Phase 2.{round_num}.1: Judge Sets Rules"),
            &[ChatMessage::user(prompt)],
            None,
        )
        .await?;
        let round_rules = rules_data
            .get("rules")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Round {round_num} begins."));

        state.rounds.push(DebateRound {
            round: round_num,
            rules: round_rules.clone(),
            ..Default::default()
        });
        self::persist(ctx, &state).await?;
        history.push_str(&format!("### Round {round_num}: {round_rules}\n\n"));

        // Pro argues.
        ctx.check_stopped().await?;
        let prompt = prompts::argument_prompt(
            ctx,
            &state.personas,
            &history,
            round_num,
            &round_rules,
            "pro",
        );
        let pro_data = call_and_save(
            ctx,
            &format!("Phase 2.{round_num}.2: Pro Argues"),
            &[ChatMessage::user(prompt)],
            Some(1024),
        )
        .await?;
        let pro_argument = pro_data
            .get("argument")
            .and_then(Value::as_str)
            .unwrap_or("The Pro side has no argument for this round.")
            .to_string();
        if let Some(round) = state.rounds.last_mut() {
            round.pro_argument = pro_argument.clone();
        }
        self::persist(ctx, &state).await?;
        history.push_str(&format!("**Pro's Argument:**\n{pro_argument}\n\n"));

        // Con argues.
        ctx.check_stopped().await?;
        let prompt = prompts::argument_prompt(
            ctx,
            &state.personas,
            &history,
            round_num,
            &round_rules,
            "con",
        );
        let con_data = call_and_save(
            ctx,
            &format!("Phase 2.{round_num}.3: Con Argues"),
            &[ChatMessage::user(prompt)],
            Some(1024),
        )
        .await?;
        let con_argument = con_data
            .get("argument")
            .and_then(Value::as_str)
            .unwrap_or("The Con side has no argument for this round.")
            .to_string();
        if let Some(round) = state.rounds.last_mut() {
            round.con_argument = con_argument.clone();
        }
        self::persist(ctx, &state).await?;
        history.push_str(&format!("**Con's Argument:**\n{con_argument}\n\n"));

        // Judge evaluates the round.
        ctx.check_stopped().await?;
        let prompt = prompts::judge_verdict_prompt(ctx, &history, false);
        let evaluation_data = call_and_save(
            ctx,
            &format!("Phase 2.{round_num}.4: Judge Evaluates"),
            &[ChatMessage::user(prompt)],
            Some(1024),
        )
        .await?;
        let evaluation: Evaluation =
            serde_json::from_value(evaluation_data).unwrap_or_default();
        let justification = evaluation.justification.clone();
        if let Some(round) = state.rounds.last_mut() {
            round.evaluation = Some(evaluation);
        }
        self::persist(ctx, &state).await?;
        history.push_str(&format!("**Judge's Evaluation:**\n{justification}\n\n"));

        // Early termination on cumulative score difference.
        let (pro_total, con_total) = state.total_scores();
        if (pro_total - con_total).abs() >= score_diff_threshold {
            tracing::info!(
                task_id = %ctx.task_id,
                pro_total,
                con_total,
                score_diff_threshold,
                "Score difference threshold reached, ending debate early"
            );
            break;
        }
    }

    // Phase 3: final verdict, idempotent.
    if state.verdict.is_none() {
        ctx.check_stopped().await?;
        let prompt = prompts::judge_verdict_prompt(ctx, &history, true);
        let verdict_data = call_and_save(
            ctx,
            "Phase 3: Final Verdict",
            &[ChatMessage::user(prompt)],
            Some(2048),
        )
        .await?;
        state.verdict = Some(serde_json::from_value(verdict_data).unwrap_or_default());
        self::persist(ctx, &state).await?;
    }

    let verdict = state.verdict.clone().unwrap_or_default();
    let winner = if verdict.winner.is_empty() {
        "N/A".to_string()
    } else {
        verdict.winner.to_uppercase()
    };
    let justification = if verdict.justification.is_empty() {
        "No justification provided.".to_string()
    } else {
        verdict.justification
    };
    let final_report = format!(
        "## Final Verdict on '{}'\n\n**Winner:** {}\n\n{}",
        ctx.goal, winner, justification
    );
    ctx.step_results.push(final_report);
    ctx.is_finished = true;
    Ok(())
}

async fn persist(ctx: &mut TaskContext, state: &DebateState) -> Result<()> {
    ctx.plan = TaskPlan::Debate(state.clone());
    ctx.store.set_plan(&ctx.task_id, &ctx.plan).await
}

fn append_round_to_history(history: &mut String, round: &DebateRound) {
    history.push_str(&format!("### Round {}: {}\n\n", round.round, round.rules));
    if !round.pro_argument.is_empty() {
        history.push_str(&format!("**Pro's Argument:**\n{}\n\n", round.pro_argument));
    }
    if !round.con_argument.is_empty() {
        history.push_str(&format!("**Con's Argument:**\n{}\n\n", round.con_argument));
    }
    if let Some(evaluation) = &round.evaluation {
        history.push_str(&format!(
            "**Judge's Evaluation:**\n{}\n\n",
            evaluation.justification
        ));
    }
}
