//! Hierarchical report assembly.
//!
//! The single source of truth for what the final document looks like across
//! write, research, and partial in-progress states.

use std::collections::BTreeMap;

use taskforge_core::types::{PlanNode, SectionContent, TaskPlan};

/// Placeholder emitted for a leaf with no generated content yet.
pub const MISSING_SECTION: &str = "*Content for this section is missing.*\n\n";

/// Render the plan tree and per-leaf content map into one ordered markdown
/// document. Heading level equals node depth; leaves emit their content
/// verbatim, or the missing-section placeholder.
pub fn assemble_report(
    goal: &str,
    plan: &TaskPlan,
    research_content: &BTreeMap<String, SectionContent>,
) -> String {
    let mut report = format!("# {goal}\n\n");
    if let Some(nodes) = plan.as_outline() {
        report.push_str(&assemble_level(nodes, research_content, 2));
    }
    report
}

fn assemble_level(
    nodes: &[PlanNode],
    research_content: &BTreeMap<String, SectionContent>,
    level: usize,
) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&format!(
            "\n{} {} {}\n\n",
            "#".repeat(level),
            node.id,
            node.sub_goal
        ));
        if node.is_leaf() {
            match research_content.get(&node.id) {
                Some(section) => out.push_str(&section.current),
                None => out.push_str(MISSING_SECTION),
            }
        } else {
            out.push_str(&assemble_level(&node.steps, research_content, level + 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> TaskPlan {
        TaskPlan::Outline(vec![
            PlanNode {
                id: "1".into(),
                sub_goal: "Introduction".into(),
                word_count: None,
                status: None,
                steps: vec![PlanNode {
                    id: "1.1".into(),
                    sub_goal: "Hook".into(),
                    word_count: None,
                    status: None,
                    steps: vec![],
                }],
            },
            PlanNode {
                id: "2".into(),
                sub_goal: "Conclusion".into(),
                word_count: None,
                status: None,
                steps: vec![],
            },
        ])
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let plan = sample_plan();
        let mut content = BTreeMap::new();
        content.insert(
            "1.1".to_string(),
            SectionContent {
                current: "Opening line.".into(),
                history: vec![],
            },
        );

        let first = assemble_report("My Goal", &plan, &content);
        let second = assemble_report("My Goal", &plan, &content);
        assert_eq!(first, second);
    }

    #[test]
    fn test_headings_follow_depth() {
        let plan = sample_plan();
        let content = BTreeMap::new();
        let report = assemble_report("My Goal", &plan, &content);

        assert!(report.starts_with("# My Goal\n"));
        assert!(report.contains("\n## 1 Introduction\n"));
        assert!(report.contains("\n### 1.1 Hook\n"));
        assert!(report.contains("\n## 2 Conclusion\n"));
    }

    #[test]
    fn test_missing_leaf_yields_placeholder() {
        let plan = sample_plan();
        let mut content = BTreeMap::new();
        content.insert(
            "1.1".to_string(),
            SectionContent {
                current: "Opening line.".into(),
                history: vec![],
            },
        );

        let report = assemble_report("My Goal", &plan, &content);
        assert!(report.contains("Opening line."));
        // Leaf "2" has no content entry.
        assert!(report.contains(MISSING_SECTION));
    }

    #[test]
    fn test_internal_nodes_never_emit_content() {
        let plan = sample_plan();
        let mut content = BTreeMap::new();
        // Content keyed by an internal node id must be ignored.
        content.insert(
            "1".to_string(),
            SectionContent {
                current: "Should not appear.".into(),
                history: vec![],
            },
        );

        let report = assemble_report("My Goal", &plan, &content);
        assert!(!report.contains("Should not appear."));
    }

    #[test]
    fn test_debate_plan_renders_header_only() {
        let plan = TaskPlan::Debate(Default::default());
        let report = assemble_report("Topic", &plan, &BTreeMap::new());
        assert_eq!(report, "# Topic\n\n");
    }
}
