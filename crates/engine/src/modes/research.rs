//! Research mode: detached outline and per-section generation.
//!
//! Unlike write mode, the engine does not drive the whole tree: outline
//! generation and each leaf's content generation are independently
//! triggered operations, and bulk generation runs on the cheaper model
//! assignment.

use serde_json::Value;

use taskforge_core::{
    traits::ChatMessage,
    types::{NodeStatus, PlanNode, SectionContent, TaskPlan, TaskStatus},
    Error, Result,
};

use crate::context::TaskContext;
use crate::ledger::call_and_save;
use crate::modes::{assign_outline_ids, collect_leaves, find_node, set_node_status};
use crate::prompts;
use crate::report::assemble_report;

const RESEARCH_ELABORATION: &str =
    "Style: In-depth research report. Strategy: Comprehensive and structured.";

/// Generate and persist the research outline; the task then stays running
/// while sections are generated on demand.
pub async fn run_research_mode(ctx: &mut TaskContext) -> Result<()> {
    tracing::info!(task_id = %ctx.task_id, "Starting research mode");

    let prompt = prompts::outline_prompt(ctx, RESEARCH_ELABORATION, 4);
    let data = call_and_save(
        ctx,
        "Phase 1: Generate Outline",
        &[ChatMessage::user(prompt)],
        Some(4096),
    )
    .await?;

    let mut nodes: Vec<PlanNode> =
        serde_json::from_value(data.get("plan").cloned().unwrap_or(Value::Null))
            .map_err(|_| Error::invalid_response("outline response did not contain a valid plan tree"))?;
    assign_outline_ids(&mut nodes, "");
    ctx.plan = TaskPlan::Outline(nodes);

    ctx.store
        .set_plan_and_status(&ctx.task_id, &ctx.plan, TaskStatus::Running)
        .await?;
    tracing::info!(task_id = %ctx.task_id, "Research outline generated and saved");

    ctx.is_finished = false;
    Ok(())
}

/// Generate content for one leaf node, with all previously completed
/// sections (in document order) as history. The caller reconstructs the
/// context from storage and wires the bulk model assignment into
/// `ctx.gateway`.
pub async fn generate_node_content(ctx: &mut TaskContext, node_id: &str) -> Result<()> {
    let nodes = ctx
        .plan
        .as_outline()
        .ok_or_else(|| Error::orchestration("research task has no outline plan"))?
        .to_vec();

    let target = find_node(&nodes, node_id)
        .cloned()
        .ok_or_else(|| Error::orchestration(format!("node {node_id} not found in the plan")))?;
    let target_title = target.title();

    let mut history = String::new();
    for leaf in collect_leaves(&nodes) {
        if leaf.id == node_id {
            break;
        }
        if let Some(section) = ctx.research_content.get(&leaf.id) {
            history.push_str(&format!("## {}\n\n{}\n\n", leaf.title(), section.current));
        }
    }

    if let Some(nodes) = ctx.plan.as_outline_mut() {
        set_node_status(nodes, node_id, NodeStatus::Writing);
    }
    ctx.store.set_plan(&ctx.task_id, &ctx.plan).await?;

    let outline_json = serde_json::to_string(&ctx.plan)?;
    let elaboration = format!("Style: In-depth research report for goal: {}", ctx.goal);
    let prompt = prompts::section_content_prompt(
        ctx,
        &elaboration,
        &outline_json,
        "Write a detailed and well-researched section for a comprehensive report.",
        &target_title,
        &history,
        target.word_count.unwrap_or(0),
    );

    let action = format!("Generate content for '{target_title}'");
    let data = call_and_save(ctx, &action, &[ChatMessage::user(prompt)], Some(4096)).await?;
    let content = data
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Content generation failed for section {node_id}."));

    ctx.research_content.insert(
        node_id.to_string(),
        SectionContent {
            current: content,
            history: vec![],
        },
    );
    if let Some(nodes) = ctx.plan.as_outline_mut() {
        set_node_status(nodes, node_id, NodeStatus::Completed);
    }

    let progressive_report = assemble_report(&ctx.goal, &ctx.plan, &ctx.research_content);
    ctx.store
        .set_research_artifacts(&ctx.task_id, &ctx.plan, &ctx.research_content, &progressive_report)
        .await?;

    tracing::info!(
        task_id = %ctx.task_id,
        node_id = %node_id,
        "Section content generated and report updated"
    );
    Ok(())
}
