//! Explore mode: a bounded Act-Reflect-Critique loop.
//!
//! Each iteration decides one action, reflects the observation into a
//! narrative summary, and critiques the accumulated progress to decide
//! whether the goal is met. Two consecutive failed actions of the same
//! outcome class abort the loop as stuck.

use serde_json::{json, Value};
use uuid::Uuid;

use taskforge_core::{
    traits::{ChatMessage, CompletionOptions},
    types::{StepCompletion, StepStatus},
    Error, Result,
};

use crate::context::{ActionRecord, TaskContext};
use crate::invoker::call_model;
use crate::modes::format_step_entry;
use crate::modes::plan::str_field;
use crate::prompts;
use crate::tools::{ToolCall, NO_SOURCE_SELECTED};

pub async fn run_explore_mode(ctx: &mut TaskContext) -> Result<()> {
    let mut consecutive_failures = 0u32;

    for i in 1..=ctx.config.explore.max_steps {
        ctx.check_stopped().await?;

        execute_explore_step(ctx, i).await?;

        match ctx.action_history.last() {
            Some(last) if !last.success => consecutive_failures += 1,
            _ => consecutive_failures = 0,
        }
        if consecutive_failures >= 2 {
            tracing::error!(
                task_id = %ctx.task_id,
                "Agent is stuck in a failure loop, terminating task"
            );
            return Err(Error::StuckLoop);
        }

        if ctx.is_finished {
            break;
        }
    }
    Ok(())
}

async fn execute_explore_step(ctx: &mut TaskContext, step_index: u32) -> Result<()> {
    let step_id = Uuid::new_v4().to_string();
    tracing::info!(
        task_id = %ctx.task_id,
        step_index,
        step_id = %step_id,
        "Exploring: deciding next action"
    );

    ctx.store
        .save_step_with_id(&ctx.task_id, &step_id, "Thinking...", "{}", StepStatus::Running, "")
        .await?;

    let has_retrieval_tool = ctx.has_retrieval_source();

    // --- ACT ---
    let act_prompt = prompts::explorer_act_prompt(ctx, has_retrieval_tool);
    let act_messages = [ChatMessage::user(act_prompt)];

    let decision = if has_retrieval_tool {
        call_model(ctx, &act_messages, None).await?
    } else {
        // Tool-free fallback: a plain-text reasoning completion, wrapped
        // into a structural reasoning_step decision.
        let completion = ctx
            .gateway
            .complete(&act_messages, &CompletionOptions::default())
            .await?;
        let reasoning_text = if completion.content.trim().is_empty() {
            "Could not generate a reasoning step.".to_string()
        } else {
            completion.content
        };
        json!({
            "thought": "No knowledge source is available, so I must rely on internal knowledge. The next step is to reason about the problem directly.",
            "action": "reasoning_step",
            "action_input": {"thought": reasoning_text}
        })
    };

    let thought = str_field(&decision, "thought");
    let action = str_field(&decision, "action");
    let action_input = decision.get("action_input").cloned().unwrap_or_else(|| json!({}));

    let mut action_succeeded = true;
    let observation = if !action.is_empty() && action != "none" {
        let obs = ToolCall::parse(&action, &action_input)?.dispatch(ctx).await?;
        if obs.contains(NO_SOURCE_SELECTED) {
            action_succeeded = false;
        }
        obs
    } else {
        "No tool executed.".to_string()
    };

    ctx.action_history.push(ActionRecord {
        name: action.clone(),
        success: action_succeeded,
    });
    ctx.step_outputs.insert(step_index, observation.clone());

    // --- REFLECT ---
    tracing::info!(task_id = %ctx.task_id, step_index, "Reflecting on observation");
    let action_input_json = serde_json::to_string(&action_input)?;
    let reflect_prompt =
        prompts::explorer_reflect_prompt(ctx, &action, &action_input_json, &observation);
    let reflection = call_model(ctx, &[ChatMessage::user(reflect_prompt)], None).await?;
    let result_md = reflection
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("Action '{action}' was performed, but no summary was generated.")
        });

    ctx.step_results.push(result_md.clone());

    // --- CRITIQUE ---
    tracing::info!(task_id = %ctx.task_id, step_index, "Critiquing progress");
    let full_history = ctx.step_results.join("\n\n");
    let critique_prompt = prompts::explorer_critique_prompt(ctx, &full_history);
    let critique_decision = call_model(ctx, &[ChatMessage::user(critique_prompt)], None).await?;

    let critique_text = critique_decision
        .get("critique")
        .and_then(Value::as_str)
        .unwrap_or("Critique failed.")
        .to_string();
    let is_finished = critique_decision
        .get("is_finished")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_finished {
        ctx.is_finished = true;
        tracing::info!(task_id = %ctx.task_id, "Critique determined the task is finished");
    } else {
        // Feed the critique into the next act step's history.
        ctx.step_results.push(format!("**Critique:** {critique_text}"));
    }

    // --- SAVE STEP ---
    let progressive_report = ctx.step_results.join("\n\n");
    ctx.store
        .set_final_report(&ctx.task_id, &progressive_report)
        .await?;

    ctx.store
        .update_step(
            &step_id,
            &StepCompletion {
                thought: thought.clone(),
                action: action.clone(),
                action_input: action_input_json.clone(),
                observation: observation.clone(),
                result: result_md.clone(),
            },
        )
        .await?;

    let pretty_input =
        serde_json::to_string_pretty(&action_input).unwrap_or(action_input_json);
    ctx.append_log(&format_step_entry(
        step_index,
        None,
        &thought,
        &action,
        &pretty_input,
        &observation,
        &result_md,
        Some(&critique_text),
    ));

    Ok(())
}
