use super::vocabulary::{contains_gene_shape, molecular_score, neuro_score};
use crate::config::GENE_WINDOW;
use crate::processor::window;

/// Outcome of a single validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
    /// Not decisive; defer to the next rule
    Continue,
}

/// A located alias match and the text around it.
#[derive(Debug, Clone)]
pub struct MatchContext<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// The matched text as it appears in the document
    pub alias: &'a str,
    /// Context window handed to the vocabulary rules
    pub window: &'a str,
}

impl MatchContext<'_> {
    /// Alias length in characters
    pub fn alias_len(&self) -> usize {
        self.alias.chars().count()
    }

    fn char_before(&self) -> Option<char> {
        self.text[..self.start].chars().next_back()
    }

    fn char_after(&self) -> Option<char> {
        self.text[self.end..].chars().next()
    }
}

/// One layer of the context check.
pub trait ValidationRule: Send + Sync {
    fn check(&self, ctx: &MatchContext<'_>) -> Verdict;

    fn name(&self) -> &str;
}

/// Rejects matches sitting next to a gene or protein symbol.
pub struct GenePatternRule {
    pub radius: usize,
}

impl ValidationRule for GenePatternRule {
    fn check(&self, ctx: &MatchContext<'_>) -> Verdict {
        let near = window(ctx.text, ctx.start, ctx.end, self.radius);
        if contains_gene_shape(near) {
            Verdict::Reject
        } else {
            Verdict::Continue
        }
    }

    fn name(&self) -> &str {
        "gene_pattern"
    }
}

/// Rejects one- and two-character aliases glued to a longer identifier.
pub struct EmbeddedTokenRule;

impl ValidationRule for EmbeddedTokenRule {
    fn check(&self, ctx: &MatchContext<'_>) -> Verdict {
        if ctx.alias_len() > 2 {
            return Verdict::Continue;
        }
        let glued = ctx.char_before().is_some_and(char::is_alphanumeric)
            || ctx.char_after().is_some_and(char::is_alphanumeric);
        if glued {
            Verdict::Reject
        } else {
            Verdict::Continue
        }
    }

    fn name(&self) -> &str {
        "embedded_token"
    }
}

/// One- and two-character aliases need neuroanatomical vocabulary nearby.
pub struct ShortAliasContextRule;

impl ValidationRule for ShortAliasContextRule {
    fn check(&self, ctx: &MatchContext<'_>) -> Verdict {
        if ctx.alias_len() <= 2 && neuro_score(ctx.window) == 0 {
            Verdict::Reject
        } else {
            Verdict::Continue
        }
    }

    fn name(&self) -> &str {
        "short_alias_context"
    }
}

/// Final vote: neuroanatomical versus molecular vocabulary.
///
/// Molecular dominance rejects, any neuro hit accepts, and long aliases are accepted
/// without support. All comparisons are strict.
pub struct ScoringRule;

impl ValidationRule for ScoringRule {
    fn check(&self, ctx: &MatchContext<'_>) -> Verdict {
        let neuro = neuro_score(ctx.window);
        let molecular = molecular_score(ctx.window);

        if molecular > neuro {
            Verdict::Reject
        } else if neuro > 0 {
            Verdict::Accept
        } else if ctx.alias_len() > 5 {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }

    fn name(&self) -> &str {
        "scoring"
    }
}

/// Selectable validation rules for fine-grained control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub gene_pattern: bool,
    pub embedded_token: bool,
    pub short_alias_context: bool,
    pub scoring: bool,
}

impl RuleSet {
    /// All rules enabled
    pub fn full() -> Self {
        Self {
            gene_pattern: true,
            embedded_token: true,
            short_alias_context: true,
            scoring: true,
        }
    }

    /// Parse from comma-separated rule names; `all` enables every rule.
    pub fn parse(rules: &str) -> Self {
        let mut ruleset = Self::default();
        for rule in rules.split(',').map(|s| s.trim().to_lowercase()) {
            match rule.as_str() {
                "gene" | "gene_pattern" => ruleset.gene_pattern = true,
                "embedded" | "embedded_token" => ruleset.embedded_token = true,
                "short" | "short_context" | "short_alias_context" => {
                    ruleset.short_alias_context = true
                }
                "scoring" | "score" => ruleset.scoring = true,
                "all" => ruleset = Self::full(),
                _ => {}
            }
        }
        ruleset
    }
}

/// Decides whether an alias match is a genuine neuroanatomical reference.
///
/// Rules run in a fixed order and the first decisive verdict wins. A match that no rule
/// accepts is rejected.
pub struct ContextValidator {
    rules: Vec<Box<dyn ValidationRule>>,
    context_window: usize,
}

impl ContextValidator {
    pub fn new(context_window: usize) -> Self {
        Self::with_rules(context_window, &RuleSet::full())
    }

    pub fn with_rules(context_window: usize, set: &RuleSet) -> Self {
        let mut rules: Vec<Box<dyn ValidationRule>> = Vec::new();
        if set.gene_pattern {
            rules.push(Box::new(GenePatternRule { radius: GENE_WINDOW }));
        }
        if set.embedded_token {
            rules.push(Box::new(EmbeddedTokenRule));
        }
        if set.short_alias_context {
            rules.push(Box::new(ShortAliasContextRule));
        }
        if set.scoring {
            rules.push(Box::new(ScoringRule));
        }
        Self {
            rules,
            context_window,
        }
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// `matched` is the alias text exactly as it occurs at byte offset `position`.
    pub fn is_valid(&self, text: &str, position: usize, matched: &str) -> bool {
        self.evaluate(text, position, matched).0 == Verdict::Accept
    }

    /// Returns the verdict and the name of the rule that decided it.
    pub fn evaluate(&self, text: &str, position: usize, matched: &str) -> (Verdict, Option<&str>) {
        let Some(end) = position.checked_add(matched.len()) else {
            return (Verdict::Reject, None);
        };
        if end > text.len() || !text.is_char_boundary(position) || !text.is_char_boundary(end) {
            return (Verdict::Reject, None);
        }

        let ctx = MatchContext {
            text,
            start: position,
            end,
            alias: &text[position..end],
            window: window(text, position, end, self.context_window),
        };

        for rule in &self.rules {
            match rule.check(&ctx) {
                Verdict::Continue => continue,
                decided => return (decided, Some(rule.name())),
            }
        }
        (Verdict::Reject, None)
    }
}
