//! Reference orchestration of one request: extract mentions, build the filtered graph,
//! then perturb it.

use crate::catalog::ReferenceCatalog;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::graph::{BuildReport, FilteredGraph, GraphBuilder};
use crate::mention::{AliasIndex, Document, MentionEvidence, MentionExtractor};
use crate::modulation::{
    ChangeType, ConnectivityModulator, Jitter, PerturbationProfile, SeededJitter, WeightDelta,
};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

const STRONGEST_CHANGES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub increased: usize,
    pub decreased: usize,
    /// Edges whose change stayed within the noise floor
    pub unchanged: usize,
    /// Largest changes first
    pub strongest: Vec<WeightDelta>,
}

impl ChangeSummary {
    pub fn from_deltas(deltas: &[WeightDelta], total_edges: usize) -> Self {
        let increased = deltas
            .iter()
            .filter(|d| d.change_type == ChangeType::Increased)
            .count();
        let decreased = deltas
            .iter()
            .filter(|d| d.change_type == ChangeType::Decreased)
            .count();

        let mut strongest = deltas.to_vec();
        strongest.sort_by_key(|d| std::cmp::Reverse(OrderedFloat(d.magnitude())));
        strongest.truncate(STRONGEST_CHANGES);

        Self {
            increased,
            decreased,
            unchanged: total_edges.saturating_sub(deltas.len()),
            strongest,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub confirmed_regions: BTreeSet<String>,
    pub evidence: Vec<MentionEvidence>,
    pub graph: FilteredGraph,
    pub build: BuildReport,
    pub deltas: Vec<WeightDelta>,
    pub summary: ChangeSummary,
    /// Extraction stopped at the deadline before every document was read
    pub truncated: bool,
}

/// Result of a run. "No evidence" is distinct from a completed run with no weight changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimulationOutcome {
    NoEvidence {
        documents_scanned: usize,
        truncated: bool,
    },
    Completed(Box<SimulationReport>),
}

impl SimulationOutcome {
    pub fn report(&self) -> Option<&SimulationReport> {
        match self {
            SimulationOutcome::Completed(report) => Some(&**report),
            SimulationOutcome::NoEvidence { .. } => None,
        }
    }
}

/// Sequences extraction, graph construction and modulation over a shared catalog.
pub struct Simulation {
    catalog: Arc<ReferenceCatalog>,
    alias_index: AliasIndex,
    extractor: MentionExtractor,
    config: EngineConfig,
}

impl Simulation {
    pub fn new(catalog: Arc<ReferenceCatalog>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.modulation.validate()?;
        let alias_index = AliasIndex::from_catalog(&catalog.regions);
        let extractor = MentionExtractor::new(&config.extraction);
        Ok(Self {
            catalog,
            alias_index,
            extractor,
            config,
        })
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// Run with jitter from the configured seed, or OS entropy when unset.
    pub fn run(
        &self,
        documents: &[Document],
        profile: &PerturbationProfile,
    ) -> Result<SimulationOutcome, ConfigError> {
        let jitter = match self.config.seed {
            Some(seed) => SeededJitter::new(seed),
            None => SeededJitter::from_entropy(),
        };
        self.run_with_jitter(documents, profile, jitter)
    }

    pub fn run_with_jitter<J: Jitter>(
        &self,
        documents: &[Document],
        profile: &PerturbationProfile,
        jitter: J,
    ) -> Result<SimulationOutcome, ConfigError> {
        let mut modulator = ConnectivityModulator::new(self.config.modulation.clone(), jitter)?;

        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let extraction = self
            .extractor
            .extract_with_deadline(documents, &self.alias_index, deadline);

        if extraction.is_empty() {
            info!(
                documents = extraction.documents_scanned,
                "No region evidence found"
            );
            return Ok(SimulationOutcome::NoEvidence {
                documents_scanned: extraction.documents_scanned,
                truncated: extraction.truncated,
            });
        }

        let (mut graph, build) = GraphBuilder::build(
            &extraction.codes,
            &self.catalog.regions,
            &self.catalog.connections,
        );
        let deltas = modulator.modulate(&mut graph, profile);
        let summary = ChangeSummary::from_deltas(&deltas, graph.edges().len());

        let report = SimulationReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            confirmed_regions: extraction.codes,
            evidence: extraction.evidence,
            graph,
            build,
            deltas,
            summary,
            truncated: extraction.truncated,
        };
        info!(
            run_id = %report.run_id,
            regions = report.confirmed_regions.len(),
            changes = report.deltas.len(),
            "Simulation completed"
        );
        Ok(SimulationOutcome::Completed(Box::new(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(a: &str, b: &str, before: f64, after: f64) -> WeightDelta {
        WeightDelta {
            endpoint_a: a.to_string(),
            endpoint_b: b.to_string(),
            before_weight: before,
            after_weight: after,
            change_type: ChangeType::classify(before, after, 0.01),
        }
    }

    #[test]
    fn test_summary_ranks_by_magnitude() {
        let deltas = vec![
            delta("A", "B", 0.5, 0.6),
            delta("A", "C", 0.5, 0.2),
            delta("B", "C", 0.5, 0.55),
        ];
        let summary = ChangeSummary::from_deltas(&deltas, 5);
        assert_eq!(summary.increased, 2);
        assert_eq!(summary.decreased, 1);
        assert_eq!(summary.unchanged, 2);
        assert_eq!(summary.strongest[0].endpoint_b, "C");
        assert_eq!(summary.strongest[0].endpoint_a, "A");
        assert_eq!(summary.strongest[2].endpoint_a, "B");
    }

    #[test]
    fn test_summary_keeps_top_changes_only() {
        let deltas: Vec<WeightDelta> = (0..8)
            .map(|i| delta("A", &format!("R{}", i), 0.1, 0.2 + i as f64 * 0.05))
            .collect();
        let summary = ChangeSummary::from_deltas(&deltas, 8);
        assert_eq!(summary.strongest.len(), STRONGEST_CHANGES);
        assert_eq!(summary.strongest[0].endpoint_b, "R7");
    }
}
