use crate::context::TaskContext;

/// Phase 1: elaborate the goal into summary, style, word count, and
/// strategy.
pub fn elaboration_prompt(ctx: &TaskContext) -> String {
    format!(
        r#"You are a master strategist and writer. Elaborate on the user's goal for an article, respecting any constraints it contains. {language}

**User's Goal:** Write an article about "{goal}"

**Instructions:**
Cover four areas:
1. Summary: a one-sentence summary of the article's core thesis.
2. Style: the writing style and tone (e.g. academic, journalistic, technical).
3. Word Count: the target total word count. Use the user's number if specified, otherwise estimate a reasonable one (1500 for a standard post, 3000+ for a detailed report).
4. Strategy: a high-level approach for structuring the article.

**Output Format:**
A single JSON object with one key "elaboration", whose value is an object containing "summary", "style", "word_count", and "strategy".

Now generate the elaboration for the goal: "{goal}". Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
    )
}

/// Phase 2: produce the outline tree with per-node word budgets.
pub fn outline_prompt(ctx: &TaskContext, elaboration: &str, levels: u32) -> String {
    format!(
        r#"You are a professional writer and editor AI. Create a detailed multi-level outline for an article and allocate the target total word count across its sections. {language}

**User's Goal:** Write an article about "{goal}"

**Core Strategy, Style, and Word Count:**
---
{elaboration}
---

**Instructions:**
1. The structure must follow the core strategy, with a depth of approximately {levels} levels.
2. Every node in the tree MUST include a "word_count" key.
3. The word counts of the terminal sections (those without "steps") must sum to approximately the total target.
4. Output a single JSON object with one key "plan": a list of chapter objects. Every object has "sub_goal" (the title) and "word_count"; objects with children also have a "steps" list of child objects.

**Example for a 1000-word article:**
```json
{{
  "plan": [
    {{"sub_goal": "Chapter 1: Introduction", "word_count": 150, "steps": [
      {{"sub_goal": "1.1: Hook and Thesis", "word_count": 150}}
    ]}},
    {{"sub_goal": "Chapter 2: Main Body", "word_count": 700, "steps": [
      {{"sub_goal": "2.1: Key Point A", "word_count": 350}},
      {{"sub_goal": "2.2: Key Point B", "word_count": 350}}
    ]}},
    {{"sub_goal": "Chapter 3: Conclusion", "word_count": 150}}
  ]
}}
```

Now generate the JSON outline for the goal: "{goal}". Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        elaboration = elaboration,
        levels = levels,
    )
}

/// Phase 3: a 2-3 sentence writing strategy for one internal (chapter)
/// node.
pub fn chapter_strategy_prompt(
    ctx: &TaskContext,
    elaboration: &str,
    outline: &str,
    node_title: &str,
) -> String {
    format!(
        r#"You are the lead editor of an article. Define how one chapter should be written so that its sections stay coherent with the whole. {language}

**Overall Article Goal:** {goal}

**Core Strategy & Style:**
---
{elaboration}
---

**Full Article Outline (JSON):**
---
{outline}
---

**Chapter:** "{node_title}"

**Your Task:**
Write a 2-3 sentence strategy for this chapter: its narrative role in the article, the angle its sections should take, and what it must not repeat from elsewhere.

**Output Format:**
A single JSON object with one key: "strategy".

Now write the strategy for "{node_title}". Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        elaboration = elaboration,
        outline = outline,
        node_title = node_title,
    )
}

/// Phase 4: write one leaf section, given the accumulated history of prior
/// sections.
#[allow(clippy::too_many_arguments)]
pub fn section_content_prompt(
    ctx: &TaskContext,
    elaboration: &str,
    outline: &str,
    chapter_strategy: &str,
    section_title: &str,
    history: &str,
    planned_word_count: u32,
) -> String {
    format!(
        r#"You are an expert writer AI. Write the content for one specific section of an article, adhering to the strategic context and constraints below. {language}

**Overall Article Goal:** {goal}

**Core Strategy & Style:**
---
{elaboration}
---

**Full Article Outline:**
---
{outline}
---

**Chapter Strategy:**
---
{chapter_strategy}
---

**Previously Written Content (History):**
---
{history}
---

**Current Section to Write:** "{section_title}"

**Constraint:**
You MUST write approximately **{planned_word_count} words** for this section; adhering to this budget is a primary requirement.

**Instructions:**
1. Write comprehensive, well-structured Markdown content for the section.
2. Do NOT repeat material already covered in the history.
3. Do NOT include the section title in your output, only the body content.

**Output Format:**
A single JSON object with one key: "content".

Now write the content for "{section_title}". Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        elaboration = elaboration,
        outline = outline,
        chapter_strategy = chapter_strategy,
        history = history,
        section_title = section_title,
        planned_word_count = planned_word_count,
    )
}

/// Quality gate: score a draft against the acceptance criteria.
pub fn section_critique_prompt(
    ctx: &TaskContext,
    section_title: &str,
    elaboration: &str,
    planned_word_count: u32,
    draft: &str,
) -> String {
    format!(
        r#"You are a meticulous, demanding editor AI scoring one section of an article. {language}

**Overall Article Goal:** {goal}
**Section:** "{section_title}"
**Core Strategy & Style:**
---
{elaboration}
---
**Planned Word Count:** {planned_word_count}

**Draft to Score:**
---
{draft}
---

**Your Task:**
Score the draft from 0 to 10 on each criterion:
- "relevance": does it cover exactly this section's topic?
- "depth": is the treatment substantive rather than superficial?
- "clarity": is it well-structured and readable?
- "style": does it match the article's declared style?
- "word_count": does the length respect the planned budget?
Then give specific, actionable feedback on what must change.

**Output Format:**
A single JSON object with two keys: "scores" (an object with the five criteria) and "feedback" (a string).

Now score the draft. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        section_title = section_title,
        elaboration = elaboration,
        planned_word_count = planned_word_count,
        draft = draft,
    )
}

/// Quality gate: rewrite a failing draft against the critique feedback.
pub fn section_rewrite_prompt(
    ctx: &TaskContext,
    section_title: &str,
    elaboration: &str,
    planned_word_count: u32,
    draft: &str,
    feedback: &str,
) -> String {
    format!(
        r#"You are an expert revision writer AI. Rewrite a section draft so it fully addresses the editor's feedback. {language}

**Overall Article Goal:** {goal}
**Section:** "{section_title}"
**Core Strategy & Style:**
---
{elaboration}
---
**Planned Word Count:** {planned_word_count}

**Original Draft (failed review):**
---
{draft}
---

**Editorial Feedback to Address:**
---
{feedback}
---

**Instructions:**
Rewrite the draft to resolve every point of feedback while keeping what already works. Markdown body only; do NOT include the section title.

**Output Format:**
A single JSON object with one key: "content".

Now rewrite the section. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        section_title = section_title,
        elaboration = elaboration,
        planned_word_count = planned_word_count,
        draft = draft,
        feedback = feedback,
    )
}

/// User-directed refinement of one existing section, with word-count-ratio
/// guidance.
#[allow(clippy::too_many_arguments)]
pub fn refine_section_prompt(
    ctx: &TaskContext,
    outline: &str,
    section_title: &str,
    current_content: &str,
    user_prompt: &str,
    planned_word_count: u32,
    current_word_count: u32,
) -> String {
    let word_count_instruction = if planned_word_count == 0 {
        String::new()
    } else {
        let ratio = current_word_count as f64 / planned_word_count as f64;
        if ratio < 0.75 {
            format!("Note: the section is about {current_word_count} words, significantly shorter than the planned {planned_word_count}. While addressing the user's request, also expand the content with more detail or examples.")
        } else if ratio > 1.25 {
            format!("Note: the section is about {current_word_count} words, significantly longer than the planned {planned_word_count}. While addressing the user's request, also make the content more concise.")
        } else {
            format!("Note: the current length of {current_word_count} words fits the planned {planned_word_count}. Focus on the user's request for quality improvement.")
        }
    };

    format!(
        r#"You are an expert editor and writer AI. Refine one section of an article per the user's instructions while staying consistent with the overall structure and goal. {language}

**Overall Article Goal:**
{goal}

**Full Article Outline (JSON):**
---
{outline}
---

**Section to Refine:**
"{section_title}"

**Current Content of the Section:**
---
{current_content}
---

**User's Refinement Instructions:**
"{user_prompt}"

**Editing Context:**
{word_count_instruction}

**Your Task:**
Rewrite the section content to incorporate the user's instructions and the editing context. Markdown body only; do NOT include the section title.

**Output Format:**
A single JSON object with one key: "content".

Now generate the refined content. Your output must be ONLY the JSON object.
"#,
        language = ctx.config.language.instruction(),
        goal = ctx.goal,
        outline = outline,
        section_title = section_title,
        current_content = current_content,
        user_prompt = user_prompt,
        word_count_instruction = word_count_instruction,
    )
}
