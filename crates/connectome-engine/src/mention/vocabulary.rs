//! Term lists and token shapes used to judge the context around an alias match.

use regex::Regex;
use std::sync::OnceLock;

/// Neuroanatomical, functional, synaptic, imaging and cognitive-neuroscience terms.
pub const NEURO_TERMS: &[&str] = &[
    // anatomy
    "brain", "cortex", "cortical", "subcortical", "gyrus", "sulcus", "lobe", "nucleus", "nuclei",
    "thalamus", "thalamic", "hippocampus", "hippocampal", "amygdala", "prefrontal", "striatum",
    "striatal", "cerebellum", "brainstem", "hemisphere", "region", "regions", "area", "areas",
    "gray matter", "white matter",
    // function
    "activity", "activation", "connectivity", "network", "circuit", "pathway", "projection",
    "functional",
    // synaptic / plasticity
    "neuron", "neurons", "neuronal", "neural", "synapse", "synaptic", "plasticity",
    "neuroplasticity", "potentiation", "dendritic", "axonal",
    // imaging
    "fmri", "mri", "bold", "pet", "eeg", "neuroimaging", "voxel", "resting-state",
    // cognitive neuroscience
    "memory", "emotion", "emotional", "attention", "fear", "reward", "executive", "cognitive",
    "decision", "learning", "regulation",
];

/// Gene, protein and assay jargon. Disjoint from [`NEURO_TERMS`].
pub const MOLECULAR_TERMS: &[&str] = &[
    "gene", "genes", "protein", "proteins", "mrna", "transcript", "transcription", "expression",
    "upregulated", "downregulated", "knockout", "mutant", "allele", "promoter", "assay",
    "western blot", "pcr", "qpcr", "rna-seq", "antibody", "phosphorylation", "kinase",
];

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word occurrence of an already lower-cased `term` in lower-cased `haystack`.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(i, m)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + m.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Occurrence of `stem` at the start of a word; the word may continue after it.
pub fn contains_word_prefix(haystack: &str, stem: &str) -> bool {
    haystack
        .match_indices(stem)
        .any(|(i, _)| !haystack[..i].chars().next_back().is_some_and(is_word_char))
}

fn score(window: &str, terms: &[&str]) -> usize {
    let lower = window.to_lowercase();
    terms.iter().filter(|t| contains_term(&lower, t)).count()
}

/// Number of distinct neuroanatomical terms present in the window.
pub fn neuro_score(window: &str) -> usize {
    score(window, NEURO_TERMS)
}

/// Number of distinct molecular-biology terms present in the window.
pub fn molecular_score(window: &str) -> usize {
    score(window, MOLECULAR_TERMS)
}

const GENE_PATTERNS: &[&str] = &[
    // Mixed case with digits: Nr4a1, Gad67
    r"\b[A-Z][a-z]+\d[A-Za-z0-9]*\b",
    // Capitalised symbol with digits: MAP2K1, GRIN2B
    r"\b[A-Z]{3,}\d+[A-Z0-9]*\b",
    // Either shape in parentheses
    r"\(\s*(?:[A-Z][a-z]+\d[A-Za-z0-9]*|[A-Z]{3,}\d+[A-Z0-9]*)\s*\)",
];

fn gene_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| GENE_PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect())
}

/// True when the window contains a token shaped like a gene or protein symbol.
pub fn contains_gene_shape(window: &str) -> bool {
    gene_patterns().iter().any(|re| re.is_match(window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabularies_are_disjoint() {
        for term in MOLECULAR_TERMS {
            assert!(!NEURO_TERMS.contains(term), "{} appears in both lists", term);
        }
        assert!(NEURO_TERMS.len() >= 55);
        assert!(MOLECULAR_TERMS.len() >= 20);
    }

    #[test]
    fn test_all_gene_patterns_compile() {
        assert_eq!(gene_patterns().len(), GENE_PATTERNS.len());
    }

    #[test]
    fn test_gene_shapes() {
        assert!(contains_gene_shape("the Nr4a1 gene"));
        assert!(contains_gene_shape("via MAP2K1 signalling"));
        assert!(contains_gene_shape("kinase (GRIN2B) levels"));
        assert!(!contains_gene_shape("the amygdala (AMY) increased"));
        assert!(!contains_gene_shape("hippocampal CA1 neurons"));
        assert!(!contains_gene_shape("the mPFC and V1"));
        // labels such as Study2 or Fig3 share the mixed-case shape
        assert!(contains_gene_shape("In Study2 the amygdala"));
        assert!(contains_gene_shape("see Fig3"));
    }

    #[test]
    fn test_terms_match_whole_words_only() {
        assert!(contains_term("increased bold signal", "bold"));
        assert!(!contains_term("a bolder claim", "bold"));
        assert!(!contains_term("repetition", "pet"));
        assert!(contains_term("gray matter loss", "gray matter"));
    }

    #[test]
    fn test_scores_count_distinct_terms() {
        assert_eq!(neuro_score("Cortex and cortex and CORTEX"), 1);
        assert_eq!(neuro_score("fMRI activity in the amygdala"), 3);
        assert_eq!(molecular_score("the gene was upregulated in a qPCR assay"), 4);
        assert_eq!(molecular_score("hippocampal activity"), 0);
    }
}
