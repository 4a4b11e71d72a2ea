use serde::{Deserialize, Serialize};

// =============================================================================
// Debate Types
// =============================================================================

/// Accumulating debate record stored in the task's `plan` column.
///
/// `personas` and `complexity` are set once during setup and never mutated
/// afterward; `rounds` grows as the debate progresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateState {
    #[serde(default)]
    pub personas: Personas,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub rounds: Vec<DebateRound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Evaluation>,
}

impl DebateState {
    /// Cumulative (pro, con) scores over all evaluated rounds.
    pub fn total_scores(&self) -> (i64, i64) {
        self.rounds.iter().fold((0, 0), |(pro, con), r| {
            match &r.evaluation {
                Some(eval) => (pro + eval.score.pro, con + eval.score.con),
                None => (pro, con),
            }
        })
    }
}

/// The three debate roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personas {
    #[serde(default)]
    pub pro: Persona,
    #[serde(default)]
    pub con: Persona,
    #[serde(default)]
    pub judge: Persona,
}

/// Debating style and intellectual framework for one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub framework: String,
}

/// Debate structure parameters, judged from the topic's complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_score_diff_threshold")]
    pub score_diff_threshold: i64,
}

fn default_max_rounds() -> u32 {
    8
}

fn default_score_diff_threshold() -> i64 {
    8
}

impl Default for Complexity {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            score_diff_threshold: default_score_diff_threshold(),
        }
    }
}

/// One completed (or in-flight) debate round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// 1-based round number.
    pub round: u32,
    /// Judge-set focus for this round.
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub pro_argument: String,
    #[serde(default)]
    pub con_argument: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// Judge output, used both per round and for the final verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub winner: String,
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub justification: String,
}

/// Pro/con score pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub pro: i64,
    #[serde(default)]
    pub con: i64,
}
