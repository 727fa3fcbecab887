//! Immutable reference data: brain regions and the weighted connections between them.
//!
//! Both catalogs are built once at process start and shared read-only through
//! [`ReferenceCatalog`]. Every edge and every modifier table is keyed by a [`PairKey`]
//! made of region codes, so there is exactly one naming scheme for a region pair.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// A named anatomical brain area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub display_name: String,
    /// Lower-cased alternate spellings used for text matching
    pub aliases: BTreeSet<String>,
    pub baseline_activity: f64,
    pub neuroplasticity_potential: f64,
}

impl Region {
    pub fn new(
        code: &str,
        display_name: &str,
        aliases: &[&str],
        baseline_activity: f64,
        neuroplasticity_potential: f64,
    ) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            aliases: aliases
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            baseline_activity,
            neuroplasticity_potential,
        }
    }

    fn validate(&self, row: usize) -> Result<(), CatalogError> {
        if self.code.trim().is_empty() {
            return Err(CatalogError::EmptyCode { row });
        }
        check_unit(&self.code, "baseline_activity", self.baseline_activity)?;
        check_unit(
            &self.code,
            "neuroplasticity_potential",
            self.neuroplasticity_potential,
        )
    }
}

fn check_unit(code: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CatalogError::OutOfRange {
            code: code.to_string(),
            field,
            value,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    Excitatory,
    Inhibitory,
    Modulatory,
}

impl FromStr for ConnectionKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excitatory" => Ok(Self::Excitatory),
            "inhibitory" => Ok(Self::Inhibitory),
            "modulatory" => Ok(Self::Modulatory),
            other => Err(CatalogError::UnknownKind(other.to_string())),
        }
    }
}

/// Canonical identifier of an unordered region pair: `"codeA-codeB"`, codes ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn is_self_loop(&self) -> bool {
        self.first == self.second
    }

    pub fn contains(&self, code: &str) -> bool {
        self.first == code || self.second == code
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = CatalogError;

    /// Accepts either order; the result is always canonical.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').map(str::trim).collect();
        match parts.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() => Ok(Self::new(a, b)),
            _ => Err(CatalogError::MalformedPairKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for PairKey {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PairKey> for String {
    fn from(key: PairKey) -> Self {
        key.to_string()
    }
}

/// An undirected, weighted connection between two regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub key: PairKey,
    pub kind: ConnectionKind,
    pub baseline_weight: f64,
}

impl ConnectionEdge {
    pub fn new(
        a: &str,
        b: &str,
        kind: ConnectionKind,
        baseline_weight: f64,
    ) -> Result<Self, CatalogError> {
        let key = PairKey::new(a, b);
        check_unit(&key.to_string(), "baseline_weight", baseline_weight)?;
        Ok(Self {
            key,
            kind,
            baseline_weight,
        })
    }

    pub fn endpoint_a(&self) -> &str {
        self.key.first()
    }

    pub fn endpoint_b(&self) -> &str {
        self.key.second()
    }
}

/// Region records indexed by code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionCatalog {
    regions: BTreeMap<String, Region>,
}

impl RegionCatalog {
    pub fn new(regions: Vec<Region>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for (row, region) in regions.into_iter().enumerate() {
            region.validate(row)?;
            if map.contains_key(&region.code) {
                return Err(CatalogError::DuplicateRegion(region.code));
            }
            map.insert(region.code.clone(), region);
        }
        Ok(Self { regions: map })
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.regions.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Canonicalised connection list. No self-loops, no mirrored duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectivityCatalog {
    edges: Vec<ConnectionEdge>,
}

impl ConnectivityCatalog {
    pub fn new(edges: Vec<ConnectionEdge>) -> Self {
        let mut seen = BTreeSet::new();
        let mut kept = Vec::with_capacity(edges.len());

        for edge in edges {
            if edge.key.is_self_loop() {
                warn!(pair = %edge.key, "Dropping self-loop connection");
                continue;
            }
            if !seen.insert(edge.key.clone()) {
                warn!(pair = %edge.key, "Dropping duplicate connection, first occurrence wins");
                continue;
            }
            kept.push(edge);
        }

        Self { edges: kept }
    }

    pub fn get(&self, key: &PairKey) -> Option<&ConnectionEdge> {
        self.edges.iter().find(|e| &e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEdge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Both catalogs, loaded once and shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    pub regions: RegionCatalog,
    pub connections: ConnectivityCatalog,
}

impl ReferenceCatalog {
    pub fn new(regions: RegionCatalog, connections: ConnectivityCatalog) -> Self {
        let catalog = Self {
            regions,
            connections,
        };
        let unreachable = catalog.unreachable_edges();
        if unreachable > 0 {
            warn!(
                count = unreachable,
                "Connections reference unknown region codes and will never be included"
            );
        }
        catalog
    }

    /// Number of connections with at least one endpoint missing from the region catalog.
    pub fn unreachable_edges(&self) -> usize {
        self.connections
            .iter()
            .filter(|e| !self.regions.contains(e.endpoint_a()) || !self.regions.contains(e.endpoint_b()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_canonical() {
        let k1 = PairKey::new("mPFC", "AMY");
        let k2 = PairKey::new("AMY", "mPFC");
        assert_eq!(k1, k2);
        assert_eq!(k1.to_string(), "AMY-mPFC");
    }

    #[test]
    fn test_pair_key_parse_reorders() {
        let key: PairKey = "mPFC-AMY".parse().unwrap();
        assert_eq!(key.to_string(), "AMY-mPFC");
        assert!("AMY".parse::<PairKey>().is_err());
        assert!("A-B-C".parse::<PairKey>().is_err());
        assert!("-AMY".parse::<PairKey>().is_err());
    }

    #[test]
    fn test_pair_key_serde_as_string() {
        let key = PairKey::new("HPC", "AMY");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"AMY-HPC\"");
        let back: PairKey = serde_json::from_str("\"HPC-AMY\"").unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_region_catalog_rejects_duplicates() {
        let regions = vec![
            Region::new("AMY", "Amygdala", &["amygdala"], 0.5, 0.5),
            Region::new("AMY", "Amygdala again", &[], 0.5, 0.5),
        ];
        assert!(matches!(
            RegionCatalog::new(regions),
            Err(CatalogError::DuplicateRegion(code)) if code == "AMY"
        ));
    }

    #[test]
    fn test_region_catalog_rejects_out_of_range() {
        let regions = vec![Region::new("AMY", "Amygdala", &[], 1.5, 0.5)];
        assert!(matches!(
            RegionCatalog::new(regions),
            Err(CatalogError::OutOfRange { field: "baseline_activity", .. })
        ));
    }

    #[test]
    fn test_aliases_are_lowercased_and_trimmed() {
        let region = Region::new("AMY", "Amygdala", &[" Amygdala ", "AMY", ""], 0.5, 0.5);
        assert_eq!(region.aliases.len(), 2);
        assert!(region.aliases.contains("amygdala"));
        assert!(region.aliases.contains("amy"));
    }

    #[test]
    fn test_connectivity_catalog_drops_mirrors_and_loops() {
        let edges = vec![
            ConnectionEdge::new("AMY", "mPFC", ConnectionKind::Excitatory, 0.65).unwrap(),
            ConnectionEdge::new("mPFC", "AMY", ConnectionKind::Inhibitory, 0.2).unwrap(),
            ConnectionEdge::new("HPC", "HPC", ConnectionKind::Modulatory, 0.3).unwrap(),
        ];
        let catalog = ConnectivityCatalog::new(edges);
        assert_eq!(catalog.len(), 1);
        let kept = catalog.get(&PairKey::new("mPFC", "AMY")).unwrap();
        assert_eq!(kept.kind, ConnectionKind::Excitatory);
        assert_eq!(kept.baseline_weight, 0.65);
    }

    #[test]
    fn test_edge_weight_validated() {
        assert!(ConnectionEdge::new("AMY", "HPC", ConnectionKind::Excitatory, -0.1).is_err());
    }

    #[test]
    fn test_unreachable_edges_counted() {
        let regions = RegionCatalog::new(vec![Region::new("AMY", "Amygdala", &[], 0.5, 0.5)]).unwrap();
        let connections = ConnectivityCatalog::new(vec![
            ConnectionEdge::new("AMY", "XYZ", ConnectionKind::Excitatory, 0.4).unwrap(),
        ]);
        let catalog = ReferenceCatalog::new(regions, connections);
        assert_eq!(catalog.unreachable_edges(), 1);
    }
}
