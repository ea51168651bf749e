use crate::digest::reconcile::parse_api_tree;
use crate::digest::thread::{ApiCommentNode, RenderedComment};
use crate::digest::transport::{Fetched, HttpRequest, Transport};
use anyhow::{Context, Result, anyhow, bail};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Colour classes the upstream page uses to fade downvoted comments, from
/// untouched to nearly invisible.
const DOWNVOTE_CLASSES: [(&str, u8); 10] = [
    ("c00", 0),
    ("c5a", 1),
    ("c73", 2),
    ("c82", 3),
    ("c88", 4),
    ("c9c", 5),
    ("cae", 6),
    ("cbe", 7),
    ("cce", 8),
    ("cdd", 9),
];

pub fn downvote_level(class_name: &str) -> Option<u8> {
    DOWNVOTE_CLASSES
        .iter()
        .find(|(class, _)| *class == class_name)
        .map(|(_, level)| *level)
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|err| anyhow!("invalid selector `{raw}`: {err:?}"))
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn comment_text(commtext: ElementRef<'_>, reply_link: &Selector) -> String {
    let mut text = String::new();
    for node in commtext.text() {
        text.push_str(node);
        text.push(' ');
    }
    // Older page layouts nest the reply link inside the comment body.
    for reply in commtext.select(reply_link) {
        let noise: String = reply.text().collect();
        if let Some(idx) = text.rfind(noise.trim()) {
            text.replace_range(idx..idx + noise.trim().len(), "");
        }
    }
    collapse_whitespace(&text)
}

/// Build the rendered view from the item page markup, in document order.
/// Rows without comment text (deleted, flagged) are skipped.
pub fn parse_rendered_page(html: &str) -> Result<HashMap<u64, RenderedComment>> {
    let document = Html::parse_document(html);
    let rows = selector("tr.athing.comtr")?;
    let commtext = selector(".commtext")?;
    let reply_link = selector(".reply")?;

    let mut out = HashMap::new();
    for row in document.select(&rows) {
        let Some(external_id) = row.value().id().and_then(|id| id.parse::<u64>().ok()) else {
            continue;
        };
        let Some(body) = row.select(&commtext).next() else {
            continue;
        };
        let level = body
            .value()
            .classes()
            .find_map(downvote_level)
            .unwrap_or(0);
        let position = out.len();
        out.insert(
            external_id,
            RenderedComment {
                external_id,
                render_position: position,
                raw_text: comment_text(body, &reply_link),
                downvote_level: level,
            },
        );
    }
    Ok(out)
}

pub fn load_rendered_file(path: &Path) -> Result<HashMap<u64, RenderedComment>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<RenderedComment> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse rendered comments {}", path.display()))?;
    Ok(records
        .into_iter()
        .map(|mut record| {
            record.downvote_level = record.downvote_level.min(9);
            record.raw_text = collapse_whitespace(&record.raw_text);
            (record.external_id, record)
        })
        .collect())
}

pub struct ThreadSource<'a> {
    transport: &'a dyn Transport,
    api_base: String,
    site_base: String,
}

pub struct ThreadTree {
    /// `None` when the payload could not be parsed; callers treat it as empty.
    pub root: Option<ApiCommentNode>,
    pub title: Option<String>,
}

impl<'a> ThreadSource<'a> {
    pub fn new(transport: &'a dyn Transport, api_base: &str, site_base: &str) -> Self {
        Self {
            transport,
            api_base: api_base.trim_end_matches('/').to_string(),
            site_base: site_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn fetch_tree(&self, thread_id: u64) -> Result<ThreadTree> {
        let url = format!("{}/items/{thread_id}", self.api_base);
        let body = match self.transport.send(&HttpRequest::get(&url)) {
            Ok(Fetched::Body(body)) => body,
            Ok(Fetched::NotFound) => String::new(),
            Err(err) if err.is_not_found() => bail!("thread {thread_id} does not exist"),
            Err(err) => return Err(err.into()),
        };
        let root = parse_api_tree(&body);
        if root.is_none() {
            log::warn!("items API returned an unreadable tree for thread {thread_id}");
        }
        let title = root.as_ref().and_then(|node| node.title.clone());
        Ok(ThreadTree { root, title })
    }

    pub fn fetch_rendered(&self, thread_id: u64) -> Result<HashMap<u64, RenderedComment>> {
        let url = format!("{}/item?id={thread_id}", self.site_base);
        let body = match self.transport.send(&HttpRequest::get(&url))? {
            Fetched::Body(body) => body,
            Fetched::NotFound => String::new(),
        };
        parse_rendered_page(&body)
    }
}
