use crate::digest::thread::{EnrichedComment, EnrichedThread, PathIndex};

#[derive(Debug, Clone, Default)]
pub struct FormattedThread {
    pub text: String,
    pub path_index: PathIndex,
    pub comment_count: usize,
}

/// The line layout is part of the prompt contract: the model is told to cite
/// comments by the leading `[path]`.
pub fn format_line(record: &EnrichedComment) -> String {
    format!(
        "[{}] (score: {}) <replies: {}> {{downvotes: {}}} {}: {}\n",
        record.path,
        record.score,
        record.reply_count,
        record.downvote_level,
        record.author,
        record.raw_text
    )
}

pub fn format_thread(thread: &EnrichedThread) -> FormattedThread {
    let mut text = String::new();
    let mut path_index = PathIndex::default();
    for record in thread.iter() {
        text.push_str(&format_line(record));
        path_index.insert(&record.path, record.external_id);
    }
    FormattedThread {
        text,
        path_index,
        comment_count: thread.len(),
    }
}
