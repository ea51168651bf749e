use crate::digest::thread::PathIndex;
use regex::{Captures, Regex};

#[derive(Debug, Clone)]
pub struct ItemUrls {
    site_base: String,
}

impl ItemUrls {
    pub fn new(site_base: &str) -> Self {
        Self {
            site_base: site_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn thread_url(&self, thread_id: u64) -> String {
        format!("{}/item?id={thread_id}", self.site_base)
    }

    pub fn comment_url(&self, thread_id: u64, comment_id: u64) -> String {
        format!("{}/item?id={thread_id}#{comment_id}", self.site_base)
    }

    /// Regex fragment matching `<site>/item?id=N#M` with either scheme and the
    /// comment id captured under `name`.
    fn comment_url_pattern(&self, name: &str) -> String {
        let host = self
            .site_base
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        format!(
            r"https?://{}/item\?id=\d+#(?P<{name}>\d+)",
            regex::escape(host)
        )
    }
}

pub struct ReferenceResolver {
    urls: ItemUrls,
    cached_link: Regex,
    forward: Regex,
    inverse: Regex,
}

fn marker(comment_id: u64, label: &str) -> String {
    format!(
        "<a href=\"#{comment_id}\" class=\"comment-ref\" data-comment-id=\"{comment_id}\" title=\"Go to comment #{comment_id}\">{label}</a>"
    )
}

/// Single left-to-right pass; `replace` returns `None` to keep the match as is.
fn rewrite<F>(re: &Regex, input: &str, mut replace: F) -> String
where
    F: FnMut(&Captures<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut consumed = 0usize;
    for caps in re.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&input[consumed..whole.start()]);
        match replace(&caps) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(whole.as_str()),
        }
        consumed = whole.end();
    }
    out.push_str(&input[consumed..]);
    out
}

fn capture_id(caps: &Captures<'_>, name: &str) -> Option<u64> {
    caps.name(name)?.as_str().parse().ok()
}

impl ReferenceResolver {
    pub fn new(urls: ItemUrls) -> Self {
        let cached_link = Regex::new(concat!(
            r#"<a\b[^>]*\bhref="https?://[^"]*"[^>]*>\[?(?P<path>\d+(?:\.\d+)*)\]?</a>"#,
            r#"(?P<gap>\s*)\((?P<author>[^()<>\n]+)\)"#,
        ))
        .expect("cached link pattern is valid");
        let forward = Regex::new(&format!(
            concat!(
                r#"(?P<marker><a\b[^>]*\bdata-comment-id="\d+"[^>]*>.*?</a>)"#,
                r#"|<a\b[^>]*\bhref="{}"[^>]*>(?P<label>.*?)</a>"#,
                r#"|(?P<other_anchor><a\b[^>]*>.*?</a>)"#,
                r#"|{}"#,
                r#"|\[(?P<path>\d+(?:\.\d+)*)\]"#,
            ),
            urls.comment_url_pattern("anchor_id"),
            urls.comment_url_pattern("url_id"),
        ))
        .expect("forward reference pattern is valid");
        let inverse =
            Regex::new(r"(?P<linked>\[\d+(?:\.\d+)*\]\([^)]*\))|\[(?P<path>\d+(?:\.\d+)*)\]")
                .expect("inverse reference pattern is valid");
        Self {
            urls,
            cached_link,
            forward,
            inverse,
        }
    }

    /// Collapse `<a href="...">[path]</a> (author)` into plain `[path] (author)`
    /// when the path belongs to this run; other links stay for URL resolution.
    fn normalize_cached_links(&self, html: &str, index: &PathIndex) -> String {
        rewrite(&self.cached_link, html, |caps| {
            let path = caps.name("path")?.as_str();
            index.external_id(path)?;
            let gap = caps.name("gap").map_or(" ", |m| m.as_str());
            let author = caps.name("author")?.as_str();
            Some(format!("[{path}]{gap}({author})"))
        })
    }

    pub fn resolve_html(&self, html: &str, index: &PathIndex) -> String {
        let normalized = self.normalize_cached_links(html, index);
        rewrite(&self.forward, &normalized, |caps| {
            if caps.name("marker").is_some() || caps.name("other_anchor").is_some() {
                return None;
            }
            if let Some(id) = capture_id(caps, "anchor_id") {
                let label = caps.name("label").map_or("", |m| m.as_str());
                return Some(marker(id, label));
            }
            if let Some(id) = capture_id(caps, "url_id") {
                let label = match index.path_of(id) {
                    Some(path) => format!("[{path}]"),
                    None => format!("#{id}"),
                };
                return Some(marker(id, &label));
            }
            let path = caps.name("path")?.as_str();
            let id = index.external_id(path)?;
            Some(marker(id, &format!("[{path}]")))
        })
    }

    pub fn qualify_markdown(&self, text: &str, index: &PathIndex, thread_id: u64) -> String {
        rewrite(&self.inverse, text, |caps| {
            if caps.name("linked").is_some() {
                return None;
            }
            let path = caps.name("path")?.as_str();
            let id = index.external_id(path)?;
            Some(format!("[{path}]({})", self.urls.comment_url(thread_id, id)))
        })
    }
}
