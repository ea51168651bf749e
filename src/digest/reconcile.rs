use crate::digest::thread::{
    ApiCommentNode, EnrichedComment, EnrichedThread, NodeType, RenderedComment,
};
use serde_json::Value;
use std::collections::HashMap;

const DELETED_AUTHOR: &str = "[deleted]";

pub fn parse_api_tree(raw: &str) -> Option<ApiCommentNode> {
    let json: Value = serde_json::from_str(raw).ok()?;
    api_node_from_value(&json)
}

pub fn api_node_from_value(value: &Value) -> Option<ApiCommentNode> {
    let external_id = value.get("id").and_then(Value::as_u64)?;
    let node_type = match value.get("type").and_then(Value::as_str) {
        Some("comment") => NodeType::Comment,
        _ => NodeType::Story,
    };
    let author = value
        .get("author")
        .and_then(Value::as_str)
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(DELETED_AUTHOR)
        .to_string();
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string);
    let children = value
        .get("children")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(api_node_from_value).collect())
        .unwrap_or_default();

    Some(ApiCommentNode {
        external_id,
        author,
        node_type,
        title,
        children,
    })
}

fn collect_records(
    node: &ApiCommentNode,
    parent: Option<u64>,
    rendered: &HashMap<u64, RenderedComment>,
    out: &mut Vec<EnrichedComment>,
) {
    if node.node_type == NodeType::Story {
        for child in &node.children {
            collect_records(child, None, rendered, out);
        }
        return;
    }

    // Hidden comments pass their own parent through, so their replies attach
    // to the nearest surviving ancestor.
    let Some(view) = rendered.get(&node.external_id) else {
        for child in &node.children {
            collect_records(child, parent, rendered, out);
        }
        return;
    };

    out.push(EnrichedComment {
        external_id: node.external_id,
        author: node.author.clone(),
        reply_count: node.children.len(),
        render_position: view.render_position,
        raw_text: view.raw_text.clone(),
        downvote_level: view.downvote_level,
        parent_external_id: parent,
        path: String::new(),
        score: 0,
    });

    for child in &node.children {
        collect_records(child, Some(node.external_id), rendered, out);
    }
}

fn assign_paths(records: &mut [EnrichedComment]) {
    let mut top_level = 0usize;
    let mut sibling_counts: HashMap<u64, usize> = HashMap::new();
    let mut assigned: HashMap<u64, String> = HashMap::new();

    for record in records.iter_mut() {
        let parent_path = record.parent_external_id.and_then(|parent| {
            let count = sibling_counts.entry(parent).or_insert(0);
            *count += 1;
            assigned.get(&parent).map(|path| format!("{path}.{count}"))
        });

        record.path = match parent_path {
            Some(path) => path,
            None => {
                top_level += 1;
                top_level.to_string()
            }
        };
        assigned.insert(record.external_id, record.path.clone());
    }
}

/// Popularity score decaying with render position and penalised per downvote
/// step relative to the comment's own base score.
pub fn score_for(render_position: usize, downvote_level: u8, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let base = (1000.0 - (render_position as f64) * 1000.0 / (total as f64)).floor();
    let penalty_per_downvote = base / 10.0;
    let score = (base - penalty_per_downvote * f64::from(downvote_level)).max(0.0);
    score.floor() as u32
}

/// Merge the API tree with the rendered view. Comments missing from the
/// rendered view are dropped; the result is ordered by render position.
pub fn reconcile(
    root: &ApiCommentNode,
    rendered: &HashMap<u64, RenderedComment>,
) -> EnrichedThread {
    if rendered.is_empty() {
        return EnrichedThread::default();
    }

    let mut records = Vec::with_capacity(rendered.len());
    collect_records(root, None, rendered, &mut records);
    records.sort_by_key(|record| record.render_position);

    assign_paths(&mut records);

    let total = records.len();
    for record in &mut records {
        record.score = score_for(record.render_position, record.downvote_level, total);
    }

    EnrichedThread::from_sorted(records)
}

#[cfg(test)]
mod tests {
    use super::{parse_api_tree, reconcile, score_for};
    use crate::digest::thread::{ApiCommentNode, NodeType, RenderedComment};
    use std::collections::{HashMap, HashSet};

    fn rendered(entries: &[(u64, usize, u8)]) -> HashMap<u64, RenderedComment> {
        entries
            .iter()
            .map(|(id, pos, level)| {
                (
                    *id,
                    RenderedComment {
                        external_id: *id,
                        render_position: *pos,
                        raw_text: format!("text {id}"),
                        downvote_level: *level,
                    },
                )
            })
            .collect()
    }

    fn paths_by_id(
        root: &ApiCommentNode,
        view: &HashMap<u64, RenderedComment>,
    ) -> HashMap<u64, String> {
        reconcile(root, view)
            .iter()
            .map(|r| (r.external_id, r.path.clone()))
            .collect()
    }

    fn c(id: u64, children: Vec<ApiCommentNode>) -> ApiCommentNode {
        ApiCommentNode::comment(id, "user", children)
    }

    #[test]
    fn nested_reply_gets_dotted_path() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![c(2, vec![])])]);
        let paths = paths_by_id(&root, &rendered(&[(1, 0, 0), (2, 1, 0)]));
        assert_eq!(paths.get(&1).map(String::as_str), Some("1"));
        assert_eq!(paths.get(&2).map(String::as_str), Some("1.1"));
    }

    #[test]
    fn hidden_parent_promotes_reply_to_top_level() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![c(2, vec![])])]);
        let thread = reconcile(&root, &rendered(&[(2, 1, 0)]));
        assert_eq!(thread.len(), 1);
        let only = thread.get(2).expect("reply kept");
        assert_eq!(only.path, "1");
        assert_eq!(only.parent_external_id, None);
    }

    #[test]
    fn hidden_middle_comment_reparents_to_grandparent() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![c(2, vec![c(3, vec![])])])]);
        let thread = reconcile(&root, &rendered(&[(1, 0, 0), (3, 1, 0)]));
        let grandchild = thread.get(3).expect("grandchild kept");
        assert_eq!(grandchild.parent_external_id, Some(1));
        assert_eq!(grandchild.path, "1.1");
    }

    #[test]
    fn siblings_are_numbered_in_render_order_not_tree_order() {
        let root = ApiCommentNode::story(
            100,
            vec![
                c(1, vec![c(10, vec![]), c(11, vec![])]),
                c(2, vec![]),
            ],
        );
        // The second API child of comment 1 is rendered first.
        let view = rendered(&[(2, 0, 0), (1, 1, 0), (11, 2, 0), (10, 3, 0)]);
        let paths = paths_by_id(&root, &view);
        assert_eq!(paths[&2], "1");
        assert_eq!(paths[&1], "2");
        assert_eq!(paths[&11], "2.1");
        assert_eq!(paths[&10], "2.2");
    }

    #[test]
    fn output_is_sorted_by_render_position_and_paths_are_unique() {
        let root = ApiCommentNode::story(
            100,
            vec![
                c(1, vec![c(3, vec![c(5, vec![])]), c(4, vec![])]),
                c(2, vec![c(6, vec![])]),
            ],
        );
        let view = rendered(&[(1, 0, 0), (3, 1, 0), (5, 2, 0), (4, 3, 0), (2, 4, 0), (6, 5, 0)]);
        let thread = reconcile(&root, &view);
        let positions: Vec<usize> = thread.iter().map(|r| r.render_position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);

        let unique: HashSet<&str> = thread.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(unique.len(), thread.len());
        assert_eq!(thread.get(5).map(|r| r.path.as_str()), Some("1.1.1"));
        assert_eq!(thread.get(4).map(|r| r.path.as_str()), Some("1.2"));
        assert_eq!(thread.get(6).map(|r| r.path.as_str()), Some("2.1"));
    }

    #[test]
    fn reply_count_comes_from_api_children() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![c(2, vec![]), c(3, vec![])])]);
        let thread = reconcile(&root, &rendered(&[(1, 0, 0)]));
        assert_eq!(thread.get(1).map(|r| r.reply_count), Some(2));
    }

    #[test]
    fn empty_rendered_view_yields_empty_thread() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![])]);
        assert!(reconcile(&root, &HashMap::new()).is_empty());
    }

    #[test]
    fn unparseable_payload_has_no_tree() {
        assert!(parse_api_tree("not json").is_none());
        assert!(parse_api_tree("{\"children\": []}").is_none());
    }

    #[test]
    fn parse_api_tree_reads_items_payload() {
        let raw = r#"{
            "id": 100, "type": "story", "title": "Show: a thing", "author": "op",
            "children": [
                {"id": 1, "type": "comment", "author": "alice", "children": [
                    {"id": 2, "type": "comment", "author": null, "children": []}
                ]}
            ]
        }"#;
        let root = parse_api_tree(raw).expect("tree");
        assert_eq!(root.node_type, NodeType::Story);
        assert_eq!(root.title.as_deref(), Some("Show: a thing"));
        assert_eq!(root.children[0].author, "alice");
        assert_eq!(root.children[0].children[0].author, "[deleted]");
    }

    #[test]
    fn score_decays_with_position_and_downvotes() {
        assert_eq!(score_for(0, 0, 4), 1000);
        assert_eq!(score_for(1, 0, 4), 750);
        assert_eq!(score_for(1, 2, 4), 600);
        assert_eq!(score_for(3, 9, 4), 25);
        assert_eq!(score_for(10, 0, 4), 0);
    }

    #[test]
    fn score_is_monotonic_in_position_and_downvotes() {
        let total = 37;
        for level in 0..=9u8 {
            let mut previous = u32::MAX;
            for pos in 0..total {
                let score = score_for(pos, level, total);
                assert!(score <= previous);
                assert!(score <= 1000);
                previous = score;
            }
        }
        for pos in 0..total {
            let mut previous = u32::MAX;
            for level in 0..=9u8 {
                let score = score_for(pos, level, total);
                assert!(score <= previous);
                previous = score;
            }
        }
        assert!(score_for(0, 1, total) < score_for(0, 0, total));
    }

    #[test]
    fn scores_are_assigned_on_reconcile() {
        let root = ApiCommentNode::story(100, vec![c(1, vec![]), c(2, vec![])]);
        let thread = reconcile(&root, &rendered(&[(1, 0, 0), (2, 1, 3)]));
        assert_eq!(thread.get(1).map(|r| r.score), Some(1000));
        // base 500, penalty 50 per level
        assert_eq!(thread.get(2).map(|r| r.score), Some(350));
    }
}
