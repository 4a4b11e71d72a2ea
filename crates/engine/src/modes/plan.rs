//! Plan-execute mode: generate an ordered plan, then execute each sub-goal
//! as one persisted step.

use serde_json::{json, Value};
use uuid::Uuid;

use taskforge_core::{
    traits::ChatMessage,
    types::{PlanNode, StepCompletion, StepStatus, TaskPlan},
    Error, Result,
};

use crate::context::TaskContext;
use crate::invoker::call_model;
use crate::modes::format_step_entry;
use crate::prompts;
use crate::tools::ToolCall;

/// A plan step whose sub-goal equals this sentinel compiles the final
/// report instead of consulting the executor.
pub const FINISH_SENTINEL: &str = "finish_task";

pub async fn run_plan_mode(ctx: &mut TaskContext) -> Result<()> {
    let sub_goals = generate_and_save_plan(ctx).await?;
    for (i, sub_goal) in sub_goals.iter().enumerate() {
        ctx.check_stopped().await?;
        execute_plan_step(ctx, sub_goal, i as u32 + 1).await?;
    }
    Ok(())
}

/// One model call produces the ordered sub-goal list; anything that is not
/// a list of `sub_goal` entries is rejected.
async fn generate_and_save_plan(ctx: &mut TaskContext) -> Result<Vec<String>> {
    tracing::info!(task_id = %ctx.task_id, goal = %ctx.goal, "Generating initial plan");

    let prompt = prompts::planner_prompt(ctx);
    let data = call_model(ctx, &[ChatMessage::user(prompt)], None).await?;

    let nodes: Vec<PlanNode> =
        serde_json::from_value(data.get("plan").cloned().unwrap_or(Value::Null)).map_err(
            |_| Error::invalid_response("planner did not return a valid plan structure"),
        )?;

    ctx.plan = TaskPlan::Outline(nodes.clone());
    ctx.store.set_plan(&ctx.task_id, &ctx.plan).await?;

    tracing::info!(task_id = %ctx.task_id, steps = nodes.len(), "Generated and saved plan");
    Ok(nodes.into_iter().map(|n| n.sub_goal).collect())
}

/// Execute a single plan step: decide, act, record, and refresh the
/// progressive report.
async fn execute_plan_step(ctx: &mut TaskContext, sub_goal: &str, step_index: u32) -> Result<()> {
    let step_id = Uuid::new_v4().to_string();
    tracing::info!(
        task_id = %ctx.task_id,
        step_index,
        step_id = %step_id,
        sub_goal = %sub_goal,
        "Executing plan step"
    );

    ctx.store
        .save_step_with_id(&ctx.task_id, &step_id, "Planning...", "{}", StepStatus::Running, "")
        .await?;

    if sub_goal == FINISH_SENTINEL {
        let conclusion = ctx.step_results.join("\n\n");
        let observation = ToolCall::FinishTask {
            conclusion: Some(conclusion),
        }
        .dispatch(ctx)
        .await?;
        ctx.step_outputs.insert(step_index, observation.clone());

        ctx.store
            .update_step(
                &step_id,
                &StepCompletion {
                    thought: "Compiling final report from all previous steps.".into(),
                    action: FINISH_SENTINEL.into(),
                    action_input: "{}".into(),
                    observation,
                    result: "Final report compiled.".into(),
                },
            )
            .await?;
        return Ok(());
    }

    let prompt = prompts::executor_prompt(ctx, sub_goal);
    let decision = call_model(ctx, &[ChatMessage::user(prompt)], None).await?;

    let thought = str_field(&decision, "thought");
    let action = str_field(&decision, "action");
    let action_input = decision.get("action_input").cloned().unwrap_or_else(|| json!({}));
    let result_md = decision
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("## Step {step_index} Result\n\nNo result was generated for this step.")
        });

    ctx.step_results.push(result_md.clone());

    let observation = if !action.is_empty() && action != "none" {
        ToolCall::parse(&action, &action_input)?.dispatch(ctx).await?
    } else {
        "No tool executed.".to_string()
    };
    ctx.step_outputs.insert(step_index, observation.clone());

    // Progressive report after every step, so a crash still leaves a
    // readable document.
    let progressive_report = ctx.step_results.join("\n\n");
    ctx.store
        .set_final_report(&ctx.task_id, &progressive_report)
        .await?;

    let action_input_json = serde_json::to_string(&action_input)?;
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
        Some(sub_goal),
        &thought,
        &action,
        &pretty_input,
        &observation,
        &result_md,
        None,
    ));

    Ok(())
}

pub(crate) fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
