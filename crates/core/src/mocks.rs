//! Mock implementations of collaborator traits for testing.
//!
//! Used across the workspace for unit and integration tests that script the
//! model's behavior without a live provider.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::traits::{
    ChatMessage, Completion, CompletionOptions, KnowledgeRetriever, ModelGateway, SourceHit,
};

// =============================================================================
// Mock Model Gateway
// =============================================================================

/// Scripted mock gateway that returns predefined responses in order.
///
/// The queue is consumed FIFO; a call past the end of the script fails with
/// a gateway error, so loops that over-call fail tests loudly instead of
/// silently replaying responses.
pub struct MockGateway {
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<String>>,
}

impl MockGateway {
    /// Create a mock with a queue of responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock from string literals.
    pub fn scripted(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|s| s.to_string()).collect())
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The final user message of every request received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<Completion> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.requests.lock().unwrap().push(last);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::gateway("mock response queue exhausted"));
        }
        Ok(Completion {
            content: responses.remove(0),
        })
    }
}

// =============================================================================
// Mock Knowledge Retriever
// =============================================================================

/// Mock retriever returning a fixed hit list for every query.
pub struct MockRetriever {
    hits: Vec<SourceHit>,
    queries: Mutex<Vec<String>>,
}

impl MockRetriever {
    pub fn new(hits: Vec<SourceHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A retriever that finds nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A retriever with one canned hit.
    pub fn single(source_name: &str, snippet: &str) -> Self {
        Self::new(vec![SourceHit {
            source_name: source_name.to_string(),
            content_snippet: snippet.to_string(),
            score: 0.9,
        }])
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeRetriever for MockRetriever {
    async fn retrieve(&self, query: &str, _selector: &str) -> Result<Vec<SourceHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hits.clone())
    }
}
