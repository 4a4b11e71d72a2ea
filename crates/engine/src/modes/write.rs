//! Write mode: a five-phase pipeline over a hierarchical outline, with a
//! hard pause for user confirmation between structure and content.
//!
//! Phases 1-2 (elaborate, outline) run on start and suspend the task as
//! `awaiting_user_input`; phases 3-5 (chapter strategies, leaf content,
//! quality gate) run on resume with the user-confirmed plan.

use std::collections::HashMap;

use serde_json::{json, Value};

use taskforge_core::{
    now_millis,
    traits::ChatMessage,
    types::{
        Elaboration, NodeStatus, PlanNode, SectionContent, SectionRevision, StepStatus, TaskPlan,
        TaskStatus,
    },
    Error, Result,
};

use crate::context::TaskContext;
use crate::invoker::call_model;
use crate::ledger::{call_and_save, save_step};
use crate::modes::{assign_outline_ids, collect_internal_nodes, collect_leaves, set_node_status};
use crate::prompts;
use crate::report::assemble_report;

const ELABORATION_ACTION: &str = "Phase 1: Generate Elaboration";
const OUTLINE_ACTION: &str = "Phase 2: Generate Outline";

/// The five critique criteria, each of which must clear the configured bar
/// for a draft to pass the quality gate.
const CRITIQUE_CRITERIA: [&str; 5] = ["relevance", "depth", "clarity", "style", "word_count"];

/// Phases 1-2 with stateful recovery: completed ledger rows are reused, so
/// re-running after a crash never repeats a finished phase.
pub async fn run_write_mode(ctx: &mut TaskContext) -> Result<()> {
    let completed: HashMap<String, Value> = ctx
        .store
        .list_steps(&ctx.task_id)
        .await?
        .into_iter()
        .filter(|s| s.status == StepStatus::Completed)
        .filter_map(|s| serde_json::from_str(&s.result).ok().map(|v| (s.action, v)))
        .collect();

    // Phase 1: Elaboration
    let elaboration_data = match completed.get(ELABORATION_ACTION) {
        Some(data) => data.clone(),
        None => {
            let prompt = prompts::elaboration_prompt(ctx);
            call_and_save(ctx, ELABORATION_ACTION, &[ChatMessage::user(prompt)], None).await?
        }
    };
    let elaboration: Elaboration = serde_json::from_value(
        elaboration_data.get("elaboration").cloned().unwrap_or(Value::Null),
    )
    .map_err(|_| Error::invalid_response("elaboration response is missing the 'elaboration' object"))?;
    let elaboration_str = elaboration.render();
    ctx.elaboration = Some(elaboration);

    // Phase 2: Outline
    let outline_data = match completed.get(OUTLINE_ACTION) {
        Some(data) => data.clone(),
        None => {
            let prompt = prompts::outline_prompt(ctx, &elaboration_str, 3);
            call_and_save(ctx, OUTLINE_ACTION, &[ChatMessage::user(prompt)], Some(4096)).await?
        }
    };
    let mut nodes: Vec<PlanNode> =
        serde_json::from_value(outline_data.get("plan").cloned().unwrap_or(Value::Null))
            .map_err(|_| Error::invalid_response("outline response did not contain a valid plan tree"))?;

    assign_outline_ids(&mut nodes, "");
    ctx.plan = TaskPlan::Outline(nodes);

    // Save the plan and pause for user confirmation.
    ctx.store
        .set_plan_and_status(&ctx.task_id, &ctx.plan, TaskStatus::AwaitingUserInput)
        .await?;
    tracing::info!(task_id = %ctx.task_id, "Outline generated. Awaiting user confirmation");
    Ok(())
}

/// Phases 3-5, after the user confirmed (and possibly edited) the plan and
/// elaboration.
pub async fn resume_write_mode(ctx: &mut TaskContext) -> Result<()> {
    tracing::info!(task_id = %ctx.task_id, "Resuming write mode with confirmed plan");

    let elaboration = ctx
        .elaboration
        .clone()
        .ok_or_else(|| Error::orchestration("write mode resume requires an elaboration"))?;

    // Re-record the (possibly user-edited) elaboration for consistency.
    save_step(
        ctx,
        ELABORATION_ACTION,
        &json!({ "elaboration": elaboration }),
        StepStatus::Completed,
    )
    .await?;
    let elaboration_str = elaboration.render();

    let outline_nodes = ctx
        .plan
        .as_outline()
        .ok_or_else(|| Error::orchestration("write mode requires an outline plan"))?
        .to_vec();
    let outline_json = serde_json::to_string(&ctx.plan)?;

    // Phase 3: a strategy per internal node, depth-first.
    let mut chapter_strategies: HashMap<String, String> = HashMap::new();
    for (node_id, node_title) in collect_internal_nodes(&outline_nodes) {
        ctx.check_stopped().await?;

        let action = format!("Phase 3: Strategy for '{node_title}'");
        let prompt =
            prompts::chapter_strategy_prompt(ctx, &elaboration_str, &outline_json, &node_title);
        let data = call_and_save(ctx, &action, &[ChatMessage::user(prompt)], None).await?;
        let strategy = data
            .get("strategy")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        chapter_strategies.insert(node_id, strategy);
    }

    // Phases 4-5: leaf content in document order, each gated by critique.
    let mut history = String::new();
    for leaf in collect_leaves(&outline_nodes) {
        ctx.check_stopped().await?;

        let section_id = leaf.id.clone();
        let section_title = leaf.title();
        tracing::info!(
            task_id = %ctx.task_id,
            section = %section_title,
            "Starting content generation for section"
        );

        let parent_id = section_id
            .rsplit_once('.')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default();
        let chapter_strategy = chapter_strategies
            .get(&parent_id)
            .cloned()
            .unwrap_or_else(|| elaboration_str.clone());
        let planned_word_count = leaf.word_count.unwrap_or(0);

        let write_action = format!("Phase 4: Write content for '{section_title}'");
        let prompt = prompts::section_content_prompt(
            ctx,
            &elaboration_str,
            &outline_json,
            &chapter_strategy,
            &section_title,
            &history,
            planned_word_count,
        );
        let data =
            call_and_save(ctx, &write_action, &[ChatMessage::user(prompt)], Some(4096)).await?;
        let draft = data
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let content = refine_until_passing(
            ctx,
            &section_title,
            &elaboration_str,
            planned_word_count,
            draft.clone(),
        )
        .await?;

        let refine_action = format!("Phase 5: Refine content for '{section_title}'");
        save_step(ctx, &refine_action, &json!({ "content": content }), StepStatus::Completed)
            .await?;

        ctx.research_content.insert(
            section_id.clone(),
            SectionContent {
                current: content.clone(),
                history: vec![SectionRevision {
                    prompt: "Initial generation".into(),
                    content: draft,
                    timestamp: now_millis(),
                }],
            },
        );
        history.push_str(&format!("## {section_title}\n\n{content}\n\n"));

        if let Some(nodes) = ctx.plan.as_outline_mut() {
            set_node_status(nodes, &section_id, NodeStatus::Completed);
        }

        // Reassemble and persist after every leaf so a partial run still
        // reads as a document.
        let progressive_report = assemble_report(&ctx.goal, &ctx.plan, &ctx.research_content);
        ctx.store
            .set_research_artifacts(&ctx.task_id, &ctx.plan, &ctx.research_content, &progressive_report)
            .await?;
    }

    let final_report = assemble_report(&ctx.goal, &ctx.plan, &ctx.research_content);
    ctx.step_results.push(final_report);
    ctx.is_finished = true;
    Ok(())
}

/// Bounded critique/refine quality gate. A draft passes only when every
/// criterion clears the configured bar; exhausting the rounds returns the
/// last draft rather than failing.
async fn refine_until_passing(
    ctx: &TaskContext,
    section_title: &str,
    elaboration: &str,
    planned_word_count: u32,
    mut draft: String,
) -> Result<String> {
    let bar = ctx.config.writer.pass_bar as i64;

    for round in 1..=ctx.config.writer.max_refine_rounds {
        let prompt = prompts::section_critique_prompt(
            ctx,
            section_title,
            elaboration,
            planned_word_count,
            &draft,
        );
        let critique = call_model(ctx, &[ChatMessage::user(prompt)], Some(1024)).await?;

        let Some(scores) = critique.get("scores").and_then(Value::as_object) else {
            tracing::warn!(
                task_id = %ctx.task_id,
                section = %section_title,
                "Critique returned no scores, accepting draft"
            );
            return Ok(draft);
        };

        let passed = CRITIQUE_CRITERIA
            .iter()
            .all(|criterion| scores.get(*criterion).and_then(Value::as_i64).unwrap_or(0) >= bar);
        if passed {
            tracing::info!(
                task_id = %ctx.task_id,
                section = %section_title,
                round,
                "Draft passed the quality gate"
            );
            return Ok(draft);
        }

        let feedback = critique
            .get("feedback")
            .and_then(Value::as_str)
            .unwrap_or_default();
        tracing::info!(
            task_id = %ctx.task_id,
            section = %section_title,
            round,
            "Draft failed critique, rewriting"
        );

        let prompt = prompts::section_rewrite_prompt(
            ctx,
            section_title,
            elaboration,
            planned_word_count,
            &draft,
            feedback,
        );
        let rewrite = call_model(ctx, &[ChatMessage::user(prompt)], Some(4096)).await?;
        if let Some(content) = rewrite.get("content").and_then(Value::as_str) {
            draft = content.to_string();
        }
    }

    tracing::warn!(
        task_id = %ctx.task_id,
        section = %section_title,
        "Quality gate exhausted, keeping last draft"
    );
    Ok(draft)
}
