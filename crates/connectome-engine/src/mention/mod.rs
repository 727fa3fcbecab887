//! Region mention extraction from research text.
//!
//! Aliases are matched case-insensitively on whole-word boundaries; every candidate is
//! passed to the [`ContextValidator`] before it counts as evidence.

use crate::catalog::RegionCatalog;
use crate::config::ExtractionConfig;
use crate::processor::TextProcessor;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn};

pub mod validator;
pub mod vocabulary;

pub use crate::processor::ContextCategory;
use validator::{ContextValidator, Verdict};
use vocabulary::is_word_char;

/// A research excerpt to scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl Document {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            id: String::new(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Title and body joined by a newline, so the title reads as its own sentence.
    pub fn combined_text(&self) -> String {
        match (self.title.trim().is_empty(), self.body.trim().is_empty()) {
            (_, true) => self.title.clone(),
            (true, false) => self.body.clone(),
            (false, false) => format!("{}\n{}", self.title, self.body),
        }
    }

    fn identifier(&self, position: usize) -> String {
        if self.id.trim().is_empty() {
            format!("doc-{}", position)
        } else {
            self.id.clone()
        }
    }
}

/// A validated alias occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionEvidence {
    pub region_code: String,
    pub source_document_id: String,
    pub matched_alias: String,
    pub excerpt: String,
    pub context_category: ContextCategory,
}

struct AliasPattern {
    alias: String,
    regex: Regex,
}

/// Region code → compiled alias patterns, iterated in code then alias order.
pub struct AliasIndex {
    entries: Vec<(String, Vec<AliasPattern>)>,
}

impl AliasIndex {
    pub fn from_catalog(catalog: &RegionCatalog) -> Self {
        Self::new(
            catalog
                .iter()
                .map(|r| (r.code.clone(), r.aliases.iter().cloned().collect())),
        )
    }

    /// Build from arbitrary `(code, aliases)` pairs. Order of the input does not matter.
    pub fn new<I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut sorted: std::collections::BTreeMap<String, BTreeSet<String>> = Default::default();
        for (code, list) in aliases {
            let set = sorted.entry(code).or_default();
            set.extend(
                list.into_iter()
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty()),
            );
        }

        let entries = sorted
            .into_iter()
            .map(|(code, set)| {
                let patterns = set
                    .into_iter()
                    .filter_map(|alias| {
                        match RegexBuilder::new(&regex::escape(&alias))
                            .case_insensitive(true)
                            .build()
                        {
                            Ok(regex) => Some(AliasPattern { alias, regex }),
                            Err(e) => {
                                warn!(code = %code, alias = %alias, "Skipping alias: {}", e);
                                None
                            }
                        }
                    })
                    .collect();
                (code, patterns)
            })
            .collect();

        Self { entries }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn aliases(&self, code: &str) -> Vec<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, patterns)| patterns.iter().map(|p| p.alias.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub codes: BTreeSet<String>,
    pub evidence: Vec<MentionEvidence>,
    pub documents_scanned: usize,
    /// The deadline expired before every document was scanned
    pub truncated: bool,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

pub struct MentionExtractor {
    validator: ContextValidator,
    processor: TextProcessor,
}

impl Default for MentionExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl MentionExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            validator: ContextValidator::new(config.context_window),
            processor: TextProcessor::new(config.excerpt_window),
        }
    }

    pub fn with_validator(validator: ContextValidator, config: &ExtractionConfig) -> Self {
        Self {
            validator,
            processor: TextProcessor::new(config.excerpt_window),
        }
    }

    pub fn extract(&self, documents: &[Document], index: &AliasIndex) -> ExtractionResult {
        self.extract_with_deadline(documents, index, None)
    }

    /// Like [`extract`](Self::extract), but stops between documents once `deadline` passes.
    pub fn extract_with_deadline(
        &self,
        documents: &[Document],
        index: &AliasIndex,
        deadline: Option<Instant>,
    ) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        for (position, document) in documents.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    scanned = position,
                    total = documents.len(),
                    "Extraction deadline reached"
                );
                result.truncated = true;
                break;
            }
            result.documents_scanned += 1;

            let text = document.combined_text();
            if text.trim().is_empty() {
                continue;
            }
            let doc_id = document.identifier(position);

            'region: for (code, patterns) in &index.entries {
                for pattern in patterns {
                    for m in pattern.regex.find_iter(&text) {
                        if !on_word_boundary(&text, m.start(), m.end()) {
                            continue;
                        }

                        let (verdict, rule) = self.validator.evaluate(&text, m.start(), m.as_str());
                        if verdict != Verdict::Accept {
                            debug!(code = %code, alias = %pattern.alias, doc = %doc_id, rule = ?rule, "Mention rejected");
                            continue;
                        }

                        let excerpt = self.processor.excerpt(&text, m.start(), m.end());
                        debug!(code = %code, alias = %pattern.alias, doc = %doc_id, "Mention accepted");
                        result.evidence.push(MentionEvidence {
                            region_code: code.clone(),
                            source_document_id: doc_id.clone(),
                            matched_alias: pattern.alias.clone(),
                            context_category: ContextCategory::classify(&excerpt),
                            excerpt,
                        });
                        result.codes.insert(code.clone());
                        continue 'region;
                    }
                }
            }
        }

        info!(
            documents = result.documents_scanned,
            regions = result.codes.len(),
            evidence = result.evidence.len(),
            "Mention extraction finished"
        );
        result
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}
