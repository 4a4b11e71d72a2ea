use crate::context::TaskContext;
use crate::tools::ToolCall;

/// Planner: produce the ordered sub-goal list. The final step must be the
/// `finish_task` sentinel the executor short-circuits on.
pub fn planner_prompt(ctx: &TaskContext) -> String {
    let context_section = if ctx.initial_context.is_empty() {
        String::new()
    } else {
        format!(
            "\n**Background Information:**\nUse this information to inform your plan.\n---\n{}\n---\n",
            ctx.initial_context
        )
    };

    format!(
        r#"You are a master planner AI. Break the user's goal into a logical sequence of sub-goals covering research, analysis, and composition. Do not name specific tools; the executor chooses those. The final step must always be "finish_task", which compiles all previous results into the final answer.
{language}

**User's Goal:** {goal}
{context_section}
**Output Format:**
A single JSON object with a "plan" key: a list of steps, each an object with a "sub_goal" key.

**Example:**
```json
{{
    "plan": [
        {{"sub_goal": "Identify the key aspects of the topic."}},
        {{"sub_goal": "Research and summarize each aspect."}},
        {{"sub_goal": "Compile the findings into a comprehensive report."}},
        {{"sub_goal": "finish_task"}}
    ]
}}
```
Now create the plan. Your output must be ONLY the JSON object, with no other text before or after it.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        context_section = context_section,
    )
}

/// Executor: choose a tool (or none) for the current sub-goal and produce
/// that step's markdown result.
pub fn executor_prompt(ctx: &TaskContext, sub_goal: &str) -> String {
    let previous_results = if ctx.step_results.is_empty() {
        "No results from previous steps yet.".to_string()
    } else {
        ctx.step_results.join("\n")
    };
    let plan_json =
        serde_json::to_string_pretty(&ctx.plan).unwrap_or_else(|_| "[]".to_string());

    format!(
        r###"You are an expert executor AI. Accomplish the current sub-goal using the available tools, then summarize your findings for this step.

**Overall Goal:** {goal}
**Initial Plan:**
---
{plan}
---
**Previous Steps' Results:**
---
{previous_results}
---

**Current Sub-Goal to Accomplish:**
"{sub_goal}"

**Available Tools:**
{tools}

**Your Task:**
1. Think: analyze the sub-goal and previous results, and decide whether a tool is needed.
2. Act: if so, pick the single best tool; the "action_input" keys MUST match the tool's documented parameter names. If no tool is needed, set "action" to "none".
3. Result: produce a Markdown result for the current sub-goal, starting with a level 2 heading (##). {language}

**Output Format:**
A single JSON object with exactly four keys: "thought", "action", "action_input", and "result".

**Example Response:**
```json
{{
  "thought": "I need background on this sub-goal, so I will query the knowledge source.",
  "action": "retrieve_knowledge",
  "action_input": {{"query": "the current sub-goal topic"}},
  "result": "## Findings\n\nBased on the retrieved information..."
}}
```

Now, what is your action for the current sub-goal? Your output must be ONLY the JSON object.
"###,
        goal = ctx.goal,
        plan = plan_json,
        previous_results = previous_results,
        sub_goal = sub_goal,
        tools = ToolCall::catalogue(),
        language = ctx.config.language.instruction(),
    )
}

fn explore_history(ctx: &TaskContext) -> String {
    if ctx.step_results.is_empty() {
        return "This is the first step. No history yet.".to_string();
    }
    ctx.step_results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("### Step {} Result:\n{}", i + 1, result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Standing warning injected once retrieval has failed for lack of a
/// configured source, so the explorer never retries a known-dead action.
fn retrieval_failure_warning(ctx: &TaskContext) -> &'static str {
    let failed = ctx
        .action_history
        .iter()
        .any(|a| a.name == "retrieve_knowledge" && !a.success);
    if failed {
        "**CRITICAL CONTEXT:** A previous `retrieve_knowledge` attempt failed because no knowledge source is selected. You MUST NOT use `retrieve_knowledge` again. Rely on your internal knowledge to break down the problem and answer the goal step by step."
    } else {
        ""
    }
}

/// Explorer act phase. With a retrieval source configured this requests a
/// structured tool decision; without one it requests a plain-text reasoning
/// continuation the caller wraps into a `reasoning_step` record.
pub fn explorer_act_prompt(ctx: &TaskContext, has_retrieval_tool: bool) -> String {
    let history = explore_history(ctx);
    let failure_context = retrieval_failure_warning(ctx);

    if has_retrieval_tool {
        format!(
            r#"You are an autonomous AI explorer working toward the user's goal through iterative steps. Decide the single best next action.

**Overall Goal:** {goal}
**History of Previous Steps:**
---
{history}
---
{failure_context}

**Available Tools:**
{tools}
**CRITICAL INSTRUCTION:** You MUST choose an action from the tools above. Do not invent tools.

**Your Task:**
1. Think: what is the most critical missing piece or next logical action? If a previous action failed, change strategy.
2. Act: choose one tool; the "action_input" keys MUST match the tool's documented parameter names.

**Output Format:**
A single JSON object with three keys: "thought", "action", and "action_input".

**Example Response:**
```json
{{
  "thought": "I have the background covered; now I need specifics on the remaining open question.",
  "action": "retrieve_knowledge",
  "action_input": {{"query": "specific follow-up question"}}
}}
```
Now, what is your next step? Your output must be ONLY the JSON object.
"#,
            goal = ctx.goal,
            history = history,
            failure_context = failure_context,
            tools = ToolCall::catalogue(),
        )
    } else {
        format!(
            r#"You are an autonomous AI analyst. You have no external tools; rely solely on your internal knowledge to reason toward the user's goal step by step.

**Overall Goal:** {goal}
**History of Your Reasoning So Far:**
---
{history}
---
{failure_context}

**Your Task:**
Provide the very next step of your thought process as a concise paragraph of pure reasoning that moves you closer to a complete answer.

Your output should be ONLY the text of your thought process.
"#,
            goal = ctx.goal,
            history = history,
            failure_context = failure_context,
        )
    }
}

/// Reflect: turn the raw observation into a plain-text summary (no heading
/// markup) that becomes the step's result.
pub fn explorer_reflect_prompt(
    ctx: &TaskContext,
    action: &str,
    action_input: &str,
    observation: &str,
) -> String {
    format!(
        r#"You are an AI assistant summarizing the result of an action. {language}

**Overall Goal:** {goal}
**Action Taken:**
`{action}` with input `{action_input}`
**Observation from Action:**
---
{observation}
---
**Your Task:**
Write a concise natural-language summary of the observation that contributes to the overall goal. It becomes this step's result and feeds the history of future steps.
**CRITICAL INSTRUCTION:** Do NOT use any Markdown headings (like ##). Provide plain text only.

**Output Format:**
A single JSON object with one key: "result".

Now generate the result. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        action = action,
        action_input = action_input,
        observation = observation,
    )
}

/// Critique: judge the accumulated progress and decide whether the task is
/// finished.
pub fn explorer_critique_prompt(ctx: &TaskContext, history: &str) -> String {
    format!(
        r#"You are a meticulous, critical AI reviewer evaluating an explorer's progress. {language}

**Original User Goal:** "{goal}"

**Explorer's Progress So Far (History of all steps):**
---
{history}
---

**Your Task:**
1. Critique: is the goal fully and comprehensively answered? What is still missing?
2. Decide: whether the task is finished.

**Output Format:**
A single JSON object with two keys:
- "critique": a short critical analysis; if unfinished, state exactly what is missing.
- "is_finished": a boolean.

Now provide your critique and decision. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        history = history,
    )
}

/// Final synthesis over all intermediate results (plan/explore/debate).
pub fn final_synthesis_prompt(ctx: &TaskContext, history: &str) -> String {
    format!(
        r#"You are an expert report writer AI. Synthesize the collected research notes and intermediate results into one final, comprehensive, well-structured report that directly answers the user's original goal.

**User's Original Goal:**
"{goal}"

**Collected Information and Reasoning Steps:**
---
{history}
---

**Requirements:**
1. The report MUST be in Markdown format and start with a level 1 heading (`#`) that is the user's original goal.
2. Structure it logically with subheadings, lists, and formatting.
3. Do not include meta-commentary such as "Based on the information provided". Write the report itself.
4. {language}

**Output Format:**
A single JSON object with one key: "report".

Now synthesize the final report. Your output must be ONLY the JSON object.
"#,
        goal = ctx.goal,
        history = history,
        language = ctx.config.language.instruction(),
    )
}
