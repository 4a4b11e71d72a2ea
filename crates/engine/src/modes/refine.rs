//! Section refinement: an independently triggered rewrite of one leaf's
//! content, either a manual replacement or a model-backed revision guided
//! by the user's instruction and the word-count ratio.

use serde_json::{json, Value};

use taskforge_core::{
    now_millis,
    traits::{ChatMessage, CompletionOptions},
    types::{SectionRevision, StepStatus},
    Error, Result,
};

use crate::context::TaskContext;
use crate::invoker::extract_json;
use crate::ledger::save_step;
use crate::modes::find_node;
use crate::prompts;
use crate::report::assemble_report;

pub async fn refine_section(
    ctx: &mut TaskContext,
    node_id: &str,
    user_prompt: &str,
    is_manual: bool,
) -> Result<()> {
    let mut section = ctx
        .research_content
        .get(node_id)
        .cloned()
        .ok_or_else(|| Error::orchestration(format!("node {node_id} has no content to refine")))?;
    let current_content = section.current.clone();

    let nodes = ctx.plan.as_outline().unwrap_or(&[]).to_vec();
    let (section_title, planned_word_count) = find_node(&nodes, node_id)
        .map(|node| (node.title(), node.word_count.unwrap_or(0)))
        .unwrap_or_else(|| ("Unknown Section".to_string(), 0));

    let (refined_content, history_prompt) = if is_manual {
        tracing::info!(
            task_id = %ctx.task_id,
            node_id = %node_id,
            "Performing manual content replacement"
        );
        (user_prompt.to_string(), "Manual Replacement".to_string())
    } else {
        let outline_json = serde_json::to_string(&ctx.plan)?;
        let current_word_count = current_content.chars().count() as u32;
        let prompt = prompts::refine_section_prompt(
            ctx,
            &outline_json,
            &section_title,
            &current_content,
            user_prompt,
            planned_word_count,
            current_word_count,
        );

        let completion = ctx
            .gateway
            .complete(
                &[ChatMessage::user(prompt)],
                &CompletionOptions::with_max_tokens(4096),
            )
            .await?;
        // Tolerate a model that skipped the JSON wrapper: the raw text is
        // then taken as the refined content.
        let refined = match extract_json(&completion.content) {
            Ok(value) => value
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| completion.content.trim().to_string()),
            Err(_) => completion.content.trim().to_string(),
        };
        (refined, user_prompt.to_string())
    };

    let refine_action = format!("Phase 5: Refine content for '{section_title}'");
    save_step(
        ctx,
        &refine_action,
        &json!({ "content": refined_content }),
        StepStatus::Completed,
    )
    .await?;

    section.history.push(SectionRevision {
        prompt: history_prompt,
        content: current_content,
        timestamp: now_millis(),
    });
    section.current = refined_content;
    ctx.research_content.insert(node_id.to_string(), section);

    let progressive_report = assemble_report(&ctx.goal, &ctx.plan, &ctx.research_content);
    ctx.store
        .set_research_artifacts(&ctx.task_id, &ctx.plan, &ctx.research_content, &progressive_report)
        .await?;

    tracing::info!(
        task_id = %ctx.task_id,
        node_id = %node_id,
        "Section content refined and report updated"
    );
    Ok(())
}
