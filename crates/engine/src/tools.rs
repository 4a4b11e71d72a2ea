//! Tool dispatch.
//!
//! A typed action set replaces runtime signature introspection: each tool
//! kind carries its own parsed arguments, and one dispatch function executes
//! it against the task context. Extra model-provided argument keys are
//! ignored; a missing required parameter fails before any side effect.

use serde_json::Value;

use taskforge_core::{Error, Result};

use crate::context::TaskContext;

/// Sentinel observation returned by `retrieve_knowledge` when no knowledge
/// source is configured; the explore loop keys repeated-failure detection on
/// this exact text.
pub const NO_SOURCE_SELECTED: &str =
    "No knowledge source selected. Cannot retrieve information.";

/// Observation when retrieval succeeds but matches nothing.
pub const NO_RESULTS_FOUND: &str = "No relevant information found in the knowledge base.";

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Query the selected knowledge source.
    RetrieveKnowledge { query: String },
    /// Pure model-internal reasoning; passes the thought through unchanged.
    ReasoningStep { thought: String },
    /// Produce a conclusion. Does not itself terminate the task; termination
    /// is decided by a separate critique or control step.
    FinishTask { conclusion: Option<String> },
}

impl ToolCall {
    /// The registry of dispatchable action names.
    pub const NAMES: [&'static str; 3] = ["retrieve_knowledge", "reasoning_step", "finish_task"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RetrieveKnowledge { .. } => "retrieve_knowledge",
            Self::ReasoningStep { .. } => "reasoning_step",
            Self::FinishTask { .. } => "finish_task",
        }
    }

    /// Tool catalogue for executor prompts.
    pub fn catalogue() -> String {
        [
            "- \"retrieve_knowledge\": Retrieves information from the selected knowledge source based on a query. Parameters: {\"query\": string}. Use this to gather information needed to accomplish a sub-goal.",
            "- \"reasoning_step\": Use this when no external information is needed. Parameters: {\"thought\": string}. The thought is added to the history to guide the next action.",
            "- \"finish_task\": Provides the final answer or an intermediate conclusion. Parameters: {\"conclusion\": string (optional)}. If omitted, all accumulated step results are compiled.",
        ]
        .join("\n")
    }

    /// Validate a model-chosen action against the registry.
    ///
    /// Rejects unknown names and non-object payloads. Supplied keys the tool
    /// does not declare are dropped silently; a declared parameter without a
    /// usable value fails with the tool name, the parameter, and the raw
    /// arguments for debuggability.
    pub fn parse(action: &str, action_input: &Value) -> Result<Self> {
        if !Self::NAMES.contains(&action) {
            return Err(Error::UnknownTool(action.to_string()));
        }
        let Some(args) = action_input.as_object() else {
            return Err(Error::MalformedArguments(action_input.to_string()));
        };

        let require_str = |param: &str| -> Result<String> {
            args.get(param)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::MissingParameter {
                    tool: action.to_string(),
                    param: param.to_string(),
                    provided: action_input.to_string(),
                })
        };

        match action {
            "retrieve_knowledge" => Ok(Self::RetrieveKnowledge {
                query: require_str("query")?,
            }),
            "reasoning_step" => Ok(Self::ReasoningStep {
                thought: require_str("thought")?,
            }),
            "finish_task" => Ok(Self::FinishTask {
                conclusion: args
                    .get("conclusion")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            _ => unreachable!("name checked against registry"),
        }
    }

    /// Execute the tool against the task context, returning its observation.
    pub async fn dispatch(&self, ctx: &TaskContext) -> Result<String> {
        match self {
            Self::RetrieveKnowledge { query } => retrieve_knowledge(ctx, query).await,
            Self::ReasoningStep { thought } => Ok(thought.clone()),
            Self::FinishTask { conclusion } => Ok(finish_task(ctx, conclusion.as_deref())),
        }
    }
}

async fn retrieve_knowledge(ctx: &TaskContext, query: &str) -> Result<String> {
    tracing::info!(
        task_id = %ctx.task_id,
        query = %query,
        selection = ?ctx.knowledge_selector,
        "Executing retrieve_knowledge"
    );

    if query.is_empty() {
        return Err(Error::tool_execution(
            "Tool 'retrieve_knowledge' requires a non-empty 'query' parameter.",
        ));
    }

    if !ctx.has_retrieval_source() {
        return Ok(NO_SOURCE_SELECTED.to_string());
    }
    let Some(retriever) = &ctx.retriever else {
        return Ok(NO_SOURCE_SELECTED.to_string());
    };
    let selector = ctx.knowledge_selector.as_deref().unwrap_or_default();

    let hits = retriever
        .retrieve(query, selector)
        .await
        .map_err(|e| Error::tool_execution(e.to_string()))?;

    if hits.is_empty() {
        return Ok(NO_RESULTS_FOUND.to_string());
    }

    Ok(hits
        .iter()
        .map(|hit| format!("Source: {}\nContent: {}", hit.source_name, hit.content_snippet))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn finish_task(ctx: &TaskContext, conclusion: Option<&str>) -> String {
    tracing::info!(task_id = %ctx.task_id, "Executing finish_task");
    match conclusion {
        Some(text) if !text.is_empty() => text.to_string(),
        _ if ctx.step_results.is_empty() => {
            "The task is complete, but no conclusion was provided and no results were generated."
                .to_string()
        }
        _ => ctx.step_results.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use taskforge_core::config::EngineConfig;
    use taskforge_core::mocks::{MockGateway, MockRetriever};
    use taskforge_core::types::TaskMode;
    use taskforge_store::{InMemoryTaskStore, TaskFileSink};

    fn make_ctx(selector: Option<&str>, retriever: Option<MockRetriever>) -> (TaskContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::scripted(&[]));
        let ctx = TaskContext::new(
            "t1",
            "goal",
            TaskMode::Explore,
            selector.map(str::to_string),
            EngineConfig::default(),
            gateway.clone(),
            gateway,
            retriever.map(|r| Arc::new(r) as Arc<dyn taskforge_core::traits::KnowledgeRetriever>),
            Arc::new(InMemoryTaskStore::new()),
            TaskFileSink::new(dir.path()).unwrap(),
        );
        (ctx, dir)
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let err = ToolCall::parse("write_file", &json!({})).unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "write_file"));
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let err = ToolCall::parse("reasoning_step", &json!("just a string")).unwrap_err();
        assert!(matches!(err, Error::MalformedArguments(_)));
    }

    #[test]
    fn test_missing_parameter_names_tool_and_raw_args() {
        let err = ToolCall::parse("retrieve_knowledge", &json!({"q": "typo"})).unwrap_err();
        match err {
            Error::MissingParameter { tool, param, provided } => {
                assert_eq!(tool, "retrieve_knowledge");
                assert_eq!(param, "query");
                assert!(provided.contains("typo"));
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_arguments_ignored() {
        let call = ToolCall::parse(
            "reasoning_step",
            &json!({"thought": "t", "confidence": 0.9, "mood": "great"}),
        )
        .unwrap();
        assert_eq!(call, ToolCall::ReasoningStep { thought: "t".into() });
    }

    #[test]
    fn test_finish_task_conclusion_optional() {
        let call = ToolCall::parse("finish_task", &json!({})).unwrap();
        assert_eq!(call, ToolCall::FinishTask { conclusion: None });
    }

    #[tokio::test]
    async fn test_retrieve_without_source_returns_sentinel() {
        let (ctx, _dir) = make_ctx(None, None);
        let obs = ToolCall::RetrieveKnowledge { query: "q".into() }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert_eq!(obs, NO_SOURCE_SELECTED);

        let (ctx, _dir) = make_ctx(Some("none"), None);
        let obs = ToolCall::RetrieveKnowledge { query: "q".into() }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert_eq!(obs, NO_SOURCE_SELECTED);
    }

    #[tokio::test]
    async fn test_retrieve_formats_hits() {
        let (ctx, _dir) = make_ctx(
            Some("local::docs"),
            Some(MockRetriever::single("notes.md", "Mars has two moons.")),
        );
        let obs = ToolCall::RetrieveKnowledge { query: "moons of mars".into() }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert!(obs.contains("Source: notes.md"));
        assert!(obs.contains("Content: Mars has two moons."));
    }

    #[tokio::test]
    async fn test_retrieve_empty_hits() {
        let (ctx, _dir) = make_ctx(Some("local::docs"), Some(MockRetriever::empty()));
        let obs = ToolCall::RetrieveKnowledge { query: "anything".into() }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert_eq!(obs, NO_RESULTS_FOUND);
    }

    #[tokio::test]
    async fn test_retrieve_empty_query_fails() {
        let (ctx, _dir) = make_ctx(Some("local::docs"), Some(MockRetriever::empty()));
        let err = ToolCall::RetrieveKnowledge { query: String::new() }
            .dispatch(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolExecution(_)));
    }

    #[tokio::test]
    async fn test_finish_task_joins_results() {
        let (mut ctx, _dir) = make_ctx(None, None);
        ctx.step_results.push("first".into());
        ctx.step_results.push("second".into());
        let obs = ToolCall::FinishTask { conclusion: None }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert_eq!(obs, "first\n\nsecond");

        let obs = ToolCall::FinishTask { conclusion: Some("done".into()) }
            .dispatch(&ctx)
            .await
            .unwrap();
        assert_eq!(obs, "done");
    }
}
