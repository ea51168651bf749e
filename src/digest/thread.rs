use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One comment as the display surface shows it, in vote order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedComment {
    pub external_id: u64,
    pub render_position: usize,
    pub raw_text: String,
    #[serde(default)]
    pub downvote_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Story,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCommentNode {
    pub external_id: u64,
    pub author: String,
    pub node_type: NodeType,
    pub title: Option<String>,
    pub children: Vec<ApiCommentNode>,
}

impl ApiCommentNode {
    pub fn story(external_id: u64, children: Vec<ApiCommentNode>) -> Self {
        Self {
            external_id,
            author: String::new(),
            node_type: NodeType::Story,
            title: None,
            children,
        }
    }

    pub fn comment(external_id: u64, author: &str, children: Vec<ApiCommentNode>) -> Self {
        Self {
            external_id,
            author: author.to_string(),
            node_type: NodeType::Comment,
            title: None,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedComment {
    pub external_id: u64,
    pub author: String,
    pub reply_count: usize,
    pub render_position: usize,
    pub raw_text: String,
    pub downvote_level: u8,
    pub parent_external_id: Option<u64>,
    pub path: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichedThread {
    records: Vec<EnrichedComment>,
    by_id: HashMap<u64, usize>,
}

impl EnrichedThread {
    pub fn from_sorted(records: Vec<EnrichedComment>) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.external_id, idx))
            .collect();
        Self { records, by_id }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnrichedComment> {
        self.records.iter()
    }

    pub fn get(&self, external_id: u64) -> Option<&EnrichedComment> {
        self.by_id.get(&external_id).map(|idx| &self.records[*idx])
    }
}

/// Mapping from a path label to the comment it addresses, valid for a single
/// enrichment run only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    by_path: BTreeMap<String, u64>,
    by_id: HashMap<u64, String>,
}

impl PathIndex {
    pub fn insert(&mut self, path: &str, external_id: u64) {
        self.by_path.insert(path.to_string(), external_id);
        self.by_id.insert(external_id, path.to_string());
    }

    pub fn external_id(&self, path: &str) -> Option<u64> {
        self.by_path.get(path).copied()
    }

    pub fn path_of(&self, external_id: u64) -> Option<&str> {
        self.by_id.get(&external_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.by_path.iter().map(|(path, id)| (path.as_str(), *id))
    }
}
