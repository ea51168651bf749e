use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

const SAFE_SCHEMES: [&str; 3] = ["http:", "https:", "mailto:"];

fn is_safe_destination(dest: &str) -> bool {
    let trimmed = dest.trim();
    if trimmed.starts_with('#') {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    SAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

fn neutralize_link(dest: CowStr<'_>) -> CowStr<'_> {
    if is_safe_destination(&dest) {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

/// Render model markdown into HTML restricted to markdown-generated elements:
/// raw HTML is dropped and link/image targets outside http(s), mailto and
/// in-page fragments are replaced with `#`.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let events = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) => None,
        Event::Start(Tag::Link(kind, dest, title)) => {
            Some(Event::Start(Tag::Link(kind, neutralize_link(dest), title)))
        }
        Event::End(Tag::Link(kind, dest, title)) => {
            Some(Event::End(Tag::Link(kind, neutralize_link(dest), title)))
        }
        Event::Start(Tag::Image(kind, dest, title)) => {
            Some(Event::Start(Tag::Image(kind, neutralize_link(dest), title)))
        }
        Event::End(Tag::Image(kind, dest, title)) => {
            Some(Event::End(Tag::Image(kind, neutralize_link(dest), title)))
        }
        other => Some(other),
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, events);
    out
}
