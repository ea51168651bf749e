use crate::digest::providers::ProviderClass;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

const MIN_SENTENCES_EXCLUSIVE: usize = 8;
const MIN_COMMENTS_EXCLUSIVE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Eligibility {
    Ok,
    TooShort,
    TooShallow,
    TooDeep,
}

impl Eligibility {
    pub fn is_ok(self) -> bool {
        self == Eligibility::Ok
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Eligibility::Ok => "thread is eligible for summarization",
            Eligibility::TooShort => {
                "thread is too short to be worth a cloud summary; read it directly or use a local model"
            }
            Eligibility::TooShallow => {
                "thread has too few comments to be worth a cloud summary; read it directly or use a local model"
            }
            Eligibility::TooDeep => "thread is larger than the selected model can handle",
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Eligibility::Ok => "ok",
            Eligibility::TooShort => "too_short",
            Eligibility::TooShallow => "too_shallow",
            Eligibility::TooDeep => "too_deep",
        };
        f.write_str(label)
    }
}

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence boundary pattern is valid"))
}

pub fn sentence_count(text: &str) -> usize {
    sentence_boundary()
        .split(text)
        .filter(|fragment| !fragment.trim().is_empty())
        .count()
}

/// Decide whether a formatted thread is worth sending to a provider of the
/// given class. Local providers are never gated.
pub fn check(formatted_text: &str, comment_count: usize, class: ProviderClass) -> Eligibility {
    if class == ProviderClass::Local {
        return Eligibility::Ok;
    }
    if sentence_count(formatted_text) <= MIN_SENTENCES_EXCLUSIVE {
        return Eligibility::TooShort;
    }
    if comment_count <= MIN_COMMENTS_EXCLUSIVE {
        return Eligibility::TooShallow;
    }
    Eligibility::Ok
}

/// Structural ceiling for providers that cannot take large threads at all.
pub fn check_ceiling(comment_count: usize, max_comments: Option<usize>) -> Eligibility {
    match max_comments {
        Some(max) if comment_count > max => Eligibility::TooDeep,
        _ => Eligibility::Ok,
    }
}
