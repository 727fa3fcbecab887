use crate::mention::vocabulary::{contains_term, contains_word_prefix};
use serde::{Deserialize, Serialize};

/// Byte range `[lo, hi)` covering `radius` characters either side of `start..end`.
///
/// Offsets always land on char boundaries, so slicing with the result never panics.
pub fn window_bounds(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let hi = end
        + text[end..]
            .chars()
            .take(radius)
            .map(char::len_utf8)
            .sum::<usize>();
    (lo, hi)
}

pub fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let (lo, hi) = window_bounds(text, start, end, radius);
    &text[lo..hi]
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Sentence-level excerpting for mention evidence
pub struct TextProcessor {
    fallback_radius: usize,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new(150)
    }
}

impl TextProcessor {
    pub fn new(fallback_radius: usize) -> Self {
        Self { fallback_radius }
    }

    /// Excerpt the sentence containing `start..end`.
    ///
    /// A boundary is a newline, or `.`/`!`/`?` followed by whitespace (or end of text).
    /// Falls back to a fixed character window when neither side has a boundary, or when the
    /// sentence is longer than twice the fallback radius.
    pub fn excerpt(&self, text: &str, start: usize, end: usize) -> String {
        let left = sentence_start(text, start);
        let right = sentence_end(text, end);

        let sentence = match (left, right) {
            (None, None) => None,
            (l, r) => {
                let lo = l.unwrap_or(0);
                let hi = r.unwrap_or(text.len());
                let slice = &text[lo..hi];
                let limit = self.fallback_radius * 2 + text[start..end].chars().count();
                (slice.chars().count() <= limit).then_some(slice)
            }
        };

        sentence
            .unwrap_or_else(|| window(text, start, end, self.fallback_radius))
            .trim()
            .to_string()
    }
}

fn sentence_start(text: &str, start: usize) -> Option<usize> {
    let head = &text[..start];
    for (i, c) in head.char_indices().rev() {
        let next = i + c.len_utf8();
        if c == '\n' {
            return Some(next);
        }
        if is_terminator(c) && head[next..].starts_with(char::is_whitespace) {
            return Some(next);
        }
    }
    None
}

fn sentence_end(text: &str, end: usize) -> Option<usize> {
    let tail = &text[end..];
    for (i, c) in tail.char_indices() {
        if c == '\n' {
            return Some(end + i);
        }
        if is_terminator(c) {
            let after = i + c.len_utf8();
            let rest = &tail[after..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Some(end + after);
            }
        }
    }
    None
}

/// Topic of the sentence a mention was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCategory {
    Connectivity,
    Activity,
    Neuroplasticity,
    Structure,
    Function,
    General,
}

/// Keywords match whole words; a trailing `*` marks a stem matched at a word start.
const CATEGORY_KEYWORDS: &[(ContextCategory, &[&str])] = &[
    (
        ContextCategory::Connectivity,
        &["connectivity", "connection*", "pathway*", "projection*", "circuit*", "coupling", "network*"],
    ),
    (
        ContextCategory::Neuroplasticity,
        &["plasticity", "potentiation", "synaptic", "neurogenesis", "remodel*", "rewir*", "dendritic"],
    ),
    (
        ContextCategory::Activity,
        &["activity", "activation", "activated", "firing", "bold", "response*", "oscillat*"],
    ),
    (
        ContextCategory::Structure,
        &["volume*", "thickness", "gray matter", "grey matter", "white matter", "morpholog*", "density"],
    ),
    (
        ContextCategory::Function,
        &["memory", "emotion*", "attention", "decision*", "cognitive", "learning", "regulation", "function*"],
    ),
];

fn keyword_hit(lower: &str, keyword: &str) -> bool {
    match keyword.strip_suffix('*') {
        Some(stem) => contains_word_prefix(lower, stem),
        None => contains_term(lower, keyword),
    }
}

impl ContextCategory {
    /// First keyword group with a hit wins
    pub fn classify(excerpt: &str) -> Self {
        let lower = excerpt.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| keyword_hit(&lower, w)))
            .map(|(category, _)| *category)
            .unwrap_or(ContextCategory::General)
    }
}
