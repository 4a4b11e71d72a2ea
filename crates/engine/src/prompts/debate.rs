use taskforge_core::types::{Persona, Personas};

use crate::context::TaskContext;

/// Setup: create the three personas and judge the debate's structure
/// parameters from the topic's complexity.
pub fn persona_prompt(ctx: &TaskContext) -> String {
    format!(
        r#"You are a debate setup AI. Create distinct personas and set the debate parameters for the topic: "{goal}". {language}

**Instructions:**
1. For the roles Pro, Con, and Judge, define:
   - "style": a short description of their debating style.
   - "framework": the core intellectual framework they argue from.
2. From the topic's complexity, set the structure:
   - "max_rounds": between 4 and 12 (simple topics 4-5, complex ones 10-12, 8 for average).
   - "score_diff_threshold": the cumulative score difference that ends the debate early, between 5 and 15 (default 8).

**Output Format:**
A single JSON object with two keys: "personas" (with "pro", "con", "judge") and "complexity" (with "max_rounds" and "score_diff_threshold").

Now generate the personas and complexity for "{goal}". Your output must be ONLY the JSON object.
"#,
        goal = ctx.goal,
        language = ctx.config.language.instruction(),
    )
}

/// Judge sets the focus for the upcoming round from the transcript so far.
pub fn judge_rules_prompt(ctx: &TaskContext, history: &str, round_num: u32) -> String {
    let history = if history.is_empty() {
        "This is the first round. No history yet."
    } else {
        history
    };
    format!(
        r#"You are the Judge in a formal debate; you set the rules and focus for each round. {language}

**Debate Topic:** "{goal}"
**Debate History (Previous Rounds):**
---
{history}
---

**Your Task:**
Round {round_num} is beginning. Based on the debate so far, define a clear, concise, neutral focus for this round.

**Output Format:**
A single JSON object with one key: "rules".

**Example:** {{"rules": "Direct Rebuttal: each side must address and refute the opponent's key points from the previous round."}}

Now set the rules for Round {round_num}. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        history = history,
        round_num = round_num,
    )
}

/// One side's argument for the round, bounded to roughly 100 words.
pub fn argument_prompt(
    ctx: &TaskContext,
    personas: &Personas,
    history: &str,
    round_num: u32,
    round_rules: &str,
    role: &str,
) -> String {
    let persona: &Persona = if role == "pro" { &personas.pro } else { &personas.con };

    format!(
        r#"You are an expert debater. Argue your position convincingly, strictly within your assigned persona and the rules of the current round. {language}

**Debate Topic:** "{goal}"
**Your Assigned Role:** {role_upper}
**Your Persona:**
- Style: {style}
- Framework: {framework}

**Debate History & Current Round ({round_num}) Rules:**
---
{history}
**Current Round Rules:** "{round_rules}"
---

**Your Task:**
Construct a persuasive argument that:
1. follows the rules and focus of Round {round_num};
2. stays consistent with your persona;
3. is concise, approximately 100 words, in Markdown.

**Output Format:**
A single JSON object with one key: "argument".

Now generate your argument for Round {round_num}. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        role_upper = role.to_uppercase(),
        style = persona.style,
        framework = persona.framework,
        round_num = round_num,
        history = history,
        round_rules = round_rules,
    )
}

/// Judge evaluation, for one round or for the final verdict over the whole
/// transcript.
pub fn judge_verdict_prompt(ctx: &TaskContext, history: &str, is_final: bool) -> String {
    let task_description = if is_final {
        "deliver a final verdict for the entire debate"
    } else {
        "evaluate the latest round of arguments"
    };
    let scope = if is_final { "the debate" } else { "this specific round" };

    format!(
        r#"You are the Judge of a formal debate. It is now your duty to {task_description}. {language}

**Debate Topic:** "{goal}"
**Full Debate Transcript So Far:**
---
{history}
---

**Your Task:**
1. Evaluate the arguments on logical consistency, evidence, and adherence to the rules.
2. Declare whether "pro" or "con" won {scope}.
3. Score both sides out of 10.
4. Justify your decision in Markdown, explaining the scoring.

**Output Format:**
A single JSON object with three keys: "winner", "score" (an object with "pro" and "con"), and "justification".

Now {task_description}. Your output must be ONLY the JSON object.
"#,
        task_description = task_description,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        history = history,
        scope = scope,
    )
}
