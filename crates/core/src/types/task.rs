use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::debate::DebateState;

// =============================================================================
// Task & Plan Types
// =============================================================================

/// Orchestration strategy selected at task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Plan-execute: generate an ordered plan, then execute each step.
    Plan,
    /// Explore: iterative Act-Reflect-Critique loop.
    Explore,
    /// Write: elaborate, outline, pause for confirmation, then write.
    Write,
    /// Research: detached outline + per-section generation.
    Research,
    /// Debate: pro/con rounds judged until a verdict.
    Debate,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Explore => "explore",
            Self::Write => "write",
            Self::Research => "research",
            Self::Debate => "debate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plan" => Some(Self::Plan),
            "explore" => Some(Self::Explore),
            "write" => Some(Self::Write),
            "research" => Some(Self::Research),
            "debate" => Some(Self::Debate),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, plan not yet generated.
    Planning,
    /// Actively executing.
    Running,
    /// Paused for user confirmation (write mode after outline).
    AwaitingUserInput,
    /// Finished successfully.
    Completed,
    /// Failed or stopped by the user.
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Running => "running",
            Self::AwaitingUserInput => "awaiting_user_input",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "running" => Some(Self::Running),
            "awaiting_user_input" => Some(Self::AwaitingUserInput),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID.
    pub id: String,
    /// The user's goal, free text.
    pub goal: String,
    /// Orchestration mode.
    pub mode: TaskMode,
    /// Current status.
    pub status: TaskStatus,
    /// Mode-dependent plan value.
    #[serde(default)]
    pub plan: TaskPlan,
    /// Generated content per leaf node, keyed by node id.
    #[serde(default)]
    pub research_content: BTreeMap<String, SectionContent>,
    /// Final (or progressive) report text.
    #[serde(default)]
    pub final_report: String,
    /// Creation timestamp (unix ms).
    pub created_at: i64,
    /// Last-updated timestamp (unix ms).
    pub updated_at: i64,
}

/// Mode-dependent plan shape: an ordered node list for plan/explore and an
/// outline tree for write/research, or an accumulating debate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskPlan {
    Outline(Vec<PlanNode>),
    Debate(DebateState),
}

impl Default for TaskPlan {
    fn default() -> Self {
        Self::Outline(Vec::new())
    }
}

impl TaskPlan {
    pub fn as_outline(&self) -> Option<&[PlanNode]> {
        match self {
            Self::Outline(nodes) => Some(nodes),
            Self::Debate(_) => None,
        }
    }

    pub fn as_outline_mut(&mut self) -> Option<&mut Vec<PlanNode>> {
        match self {
            Self::Outline(nodes) => Some(nodes),
            Self::Debate(_) => None,
        }
    }

    pub fn as_debate(&self) -> Option<&DebateState> {
        match self {
            Self::Debate(state) => Some(state),
            Self::Outline(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Outline(nodes) => nodes.is_empty(),
            Self::Debate(_) => false,
        }
    }
}

/// One node of a plan. Nodes with children never receive content themselves;
/// only leaves are content targets, keyed by `id` into `research_content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    /// Dotted path reflecting tree position, e.g. "2.1". Assigned after
    /// outline generation, unique within a task.
    #[serde(default)]
    pub id: String,
    /// Title or sub-goal description.
    pub sub_goal: String,
    /// Word budget for this node (write/research only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    /// Generation status (research mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    /// Child nodes; empty for leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<PlanNode>,
}

impl PlanNode {
    pub fn is_leaf(&self) -> bool {
        self.steps.is_empty()
    }

    /// Heading title combining the dotted id and the sub-goal.
    pub fn title(&self) -> String {
        format!("{} {}", self.id, self.sub_goal).trim().to_string()
    }
}

/// Per-node content generation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Writing,
    Completed,
}

/// Content of one leaf section, with its revision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionContent {
    /// Current text of the section.
    pub current: String,
    /// Prior revisions, oldest first.
    #[serde(default)]
    pub history: Vec<SectionRevision>,
}

/// One superseded revision of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRevision {
    /// The instruction that produced the replacement.
    pub prompt: String,
    /// The text as it was before the replacement.
    pub content: String,
    /// Unix ms timestamp.
    pub timestamp: i64,
}

/// Write-mode elaboration: the article's thesis, style, target length, and
/// structural strategy, produced once before outlining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elaboration {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_word_count")]
    pub word_count: u32,
    #[serde(default)]
    pub strategy: String,
}

fn default_word_count() -> u32 {
    1500
}

impl Elaboration {
    /// Render the elaboration the way content prompts expect it.
    pub fn render(&self) -> String {
        format!(
            "Summary: {}\nStyle: {}\nStrategy: {}\nWord Count: {}",
            self.summary, self.style, self.strategy, self.word_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_roundtrip_outline() {
        let json = r#"[{"sub_goal": "Intro", "word_count": 150, "steps": [{"sub_goal": "Hook"}]}]"#;
        let plan: TaskPlan = serde_json::from_str(json).unwrap();
        let nodes = plan.as_outline().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(!nodes[0].is_leaf());
        assert!(nodes[0].steps[0].is_leaf());
    }

    #[test]
    fn test_plan_roundtrip_debate() {
        let json = r#"{"personas": {}, "complexity": {"max_rounds": 4, "score_diff_threshold": 5}, "rounds": []}"#;
        let plan: TaskPlan = serde_json::from_str(json).unwrap();
        let state = plan.as_debate().unwrap();
        assert_eq!(state.complexity.max_rounds, 4);
    }

    #[test]
    fn test_elaboration_defaults() {
        let e: Elaboration = serde_json::from_str(r#"{"summary": "s", "style": "t", "strategy": "u"}"#).unwrap();
        assert_eq!(e.word_count, 1500);
    }
}
