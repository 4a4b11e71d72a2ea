//! Mode state machines.
//!
//! One module per orchestration strategy, plus the shared plan-tree and
//! log-formatting helpers they have in common.

pub mod debate;
pub mod explore;
pub mod plan;
pub mod refine;
pub mod research;
pub mod write;

pub use debate::run_debate_mode;
pub use explore::run_explore_mode;
pub use plan::run_plan_mode;
pub use refine::refine_section;
pub use research::{generate_node_content, run_research_mode};
pub use write::{resume_write_mode, run_write_mode};

use taskforge_core::types::{NodeStatus, PlanNode};

/// Assign dotted hierarchical ids depth-first and mark every node pending.
/// Runs once after outline generation.
pub(crate) fn assign_outline_ids(nodes: &mut [PlanNode], prefix: &str) {
    for (i, node) in nodes.iter_mut().enumerate() {
        let id = if prefix.is_empty() {
            (i + 1).to_string()
        } else {
            format!("{prefix}{}", i + 1)
        };
        node.id = id.clone();
        node.status = Some(NodeStatus::Pending);
        if !node.steps.is_empty() {
            assign_outline_ids(&mut node.steps, &format!("{id}."));
        }
    }
}

/// Internal nodes (those with children) in depth-first document order, as
/// `(id, title)` pairs.
pub(crate) fn collect_internal_nodes(nodes: &[PlanNode]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for node in nodes {
        if !node.is_leaf() {
            out.push((node.id.clone(), node.title()));
            out.extend(collect_internal_nodes(&node.steps));
        }
    }
    out
}

/// Leaf nodes in depth-first document order.
pub(crate) fn collect_leaves(nodes: &[PlanNode]) -> Vec<PlanNode> {
    let mut out = Vec::new();
    for node in nodes {
        if node.is_leaf() {
            out.push(node.clone());
        } else {
            out.extend(collect_leaves(&node.steps));
        }
    }
    out
}

/// Find a node anywhere in the tree by its dotted id.
pub(crate) fn find_node<'a>(nodes: &'a [PlanNode], id: &str) -> Option<&'a PlanNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.steps, id) {
            return Some(found);
        }
    }
    None
}

/// Set one node's status in place. Returns whether the node was found.
pub(crate) fn set_node_status(nodes: &mut [PlanNode], id: &str, status: NodeStatus) -> bool {
    for node in nodes {
        if node.id == id {
            node.status = Some(status);
            return true;
        }
        if set_node_status(&mut node.steps, id, status) {
            return true;
        }
    }
    false
}

/// One human-readable log entry per executed step, appended to the task's
/// markdown log file.
#[allow(clippy::too_many_arguments)]
pub(crate) fn format_step_entry(
    step_index: u32,
    sub_goal: Option<&str>,
    thought: &str,
    action: &str,
    action_input: &str,
    observation: &str,
    result: &str,
    critique: Option<&str>,
) -> String {
    let mut entry = match sub_goal {
        Some(sub_goal) => format!("## Step {step_index}: {sub_goal}\n\n"),
        None => format!("## Step {step_index}\n\n"),
    };
    entry.push_str(&format!("### Thought\n\n> {thought}\n\n"));
    entry.push_str(&format!("### Action: `{action}`\n\n"));
    entry.push_str(&format!("#### Input\n\n```json\n{action_input}\n```\n\n"));
    entry.push_str(&format!("#### Observation\n\n```\n{observation}\n```\n\n"));
    entry.push_str(&format!("### Result\n\n{result}\n\n"));
    if let Some(critique) = critique {
        entry.push_str(&format!("### Critique\n\n> {critique}\n\n"));
    }
    entry.push_str("---\n\n");
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(sub_goal: &str, steps: Vec<PlanNode>) -> PlanNode {
        PlanNode {
            id: String::new(),
            sub_goal: sub_goal.into(),
            word_count: None,
            status: None,
            steps,
        }
    }

    #[test]
    fn test_assign_outline_ids_depth_first() {
        let mut nodes = vec![
            node("Intro", vec![node("Hook", vec![])]),
            node("Body", vec![node("A", vec![]), node("B", vec![node("B1", vec![])])]),
        ];
        assign_outline_ids(&mut nodes, "");

        assert_eq!(nodes[0].id, "1");
        assert_eq!(nodes[0].steps[0].id, "1.1");
        assert_eq!(nodes[1].id, "2");
        assert_eq!(nodes[1].steps[0].id, "2.1");
        assert_eq!(nodes[1].steps[1].id, "2.2");
        assert_eq!(nodes[1].steps[1].steps[0].id, "2.2.1");
        assert_eq!(nodes[0].status, Some(NodeStatus::Pending));
    }

    #[test]
    fn test_collect_leaves_document_order() {
        let mut nodes = vec![
            node("Intro", vec![node("Hook", vec![])]),
            node("Body", vec![node("A", vec![]), node("B", vec![node("B1", vec![])])]),
        ];
        assign_outline_ids(&mut nodes, "");

        let leaves: Vec<String> = collect_leaves(&nodes).iter().map(|n| n.id.clone()).collect();
        assert_eq!(leaves, vec!["1.1", "2.1", "2.2.1"]);

        let internal: Vec<String> = collect_internal_nodes(&nodes)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(internal, vec!["1", "2", "2.2"]);
    }

    #[test]
    fn test_find_and_update_node() {
        let mut nodes = vec![node("Body", vec![node("A", vec![])])];
        assign_outline_ids(&mut nodes, "");

        assert!(find_node(&nodes, "1.1").is_some());
        assert!(find_node(&nodes, "3").is_none());
        assert!(set_node_status(&mut nodes, "1.1", NodeStatus::Completed));
        assert_eq!(nodes[0].steps[0].status, Some(NodeStatus::Completed));
    }
}
