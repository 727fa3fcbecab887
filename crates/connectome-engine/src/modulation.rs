//! Connection weight perturbation.
//!
//! A [`PerturbationProfile`] combines an intervention table, a setting table and a duration
//! scale. Tables come from a [`ProfileLibrary`] loaded from JSON and are keyed by the same
//! [`PairKey`] as the connectivity catalog.

use crate::catalog::{PairKey, RegionCatalog};
use crate::config::ModulationConfig;
use crate::error::{ConfigError, ProfileError};
use crate::graph::FilteredGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub type ModifierTable = BTreeMap<PairKey, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationScale {
    Short,
    Standard,
    Extended,
}

impl DurationScale {
    pub fn factor(self) -> f64 {
        match self {
            DurationScale::Short => 0.7,
            DurationScale::Standard => 1.0,
            DurationScale::Extended => 1.3,
        }
    }
}

impl FromStr for DurationScale {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" | "4w" => Ok(Self::Short),
            "standard" | "8w" => Ok(Self::Standard),
            "extended" | "12w" => Ok(Self::Extended),
            other => Err(ProfileError::UnknownDuration(other.to_string())),
        }
    }
}

/// The modifier tables and duration scale for one simulated intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationProfile {
    pub intervention: ModifierTable,
    pub setting: ModifierTable,
    pub duration: DurationScale,
}

impl PerturbationProfile {
    pub fn new(intervention: ModifierTable, setting: ModifierTable, duration: DurationScale) -> Self {
        Self {
            intervention,
            setting,
            duration,
        }
    }

    /// Unjittered delta for a pair; unknown pairs contribute nothing.
    pub fn raw_delta(&self, key: &PairKey) -> f64 {
        let intervention = self.intervention.get(key).copied().unwrap_or(0.0);
        let setting = self.setting.get(key).copied().unwrap_or(0.0);
        (intervention + setting) * self.duration.factor()
    }
}

/// Modifier tables keyed by intervention and setting tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileLibrary {
    #[serde(default)]
    pub interventions: BTreeMap<String, ModifierTable>,
    #[serde(default)]
    pub settings: BTreeMap<String, ModifierTable>,
}

/// Library as written on disk, before tags and pair keys are canonicalised.
#[derive(Deserialize)]
struct RawLibrary {
    #[serde(default)]
    interventions: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    settings: BTreeMap<String, BTreeMap<String, f64>>,
}

fn canonical_tables(
    raw: BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, ModifierTable>, ProfileError> {
    let mut tables = BTreeMap::new();
    for (tag, entries) in raw {
        let tag = tag.trim().to_lowercase();
        let mut table = ModifierTable::new();
        for (key, value) in entries {
            let pair: PairKey = key.parse()?;
            if table.insert(pair.clone(), value).is_some() {
                return Err(ProfileError::DuplicatePair {
                    tag,
                    key: pair.to_string(),
                });
            }
        }
        if tables.insert(tag.clone(), table).is_some() {
            return Err(ProfileError::DuplicateTag(tag));
        }
    }
    Ok(tables)
}

impl ProfileLibrary {
    /// Parse a library; tags are matched case-insensitively and pair keys are canonicalised.
    ///
    /// A pair written in both orders within one table is an error, as is a tag that
    /// differs from another only by case.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let raw: RawLibrary = serde_json::from_str(json)?;
        Ok(Self {
            interventions: canonical_tables(raw.interventions)?,
            settings: canonical_tables(raw.settings)?,
        })
    }

    pub fn profile(
        &self,
        intervention: &str,
        setting: &str,
        duration: DurationScale,
    ) -> Result<PerturbationProfile, ProfileError> {
        let intervention_table = self
            .interventions
            .get(&intervention.trim().to_lowercase())
            .ok_or_else(|| ProfileError::UnknownIntervention(intervention.to_string()))?;
        let setting_table = self
            .settings
            .get(&setting.trim().to_lowercase())
            .ok_or_else(|| ProfileError::UnknownSetting(setting.to_string()))?;

        Ok(PerturbationProfile::new(
            intervention_table.clone(),
            setting_table.clone(),
            duration,
        ))
    }

    /// `(tag, pair)` entries naming a region code the catalog does not know.
    ///
    /// Such entries can never affect an edge.
    pub fn unknown_pairs(&self, regions: &RegionCatalog) -> Vec<(String, PairKey)> {
        self.interventions
            .iter()
            .chain(self.settings.iter())
            .flat_map(|(tag, table)| table.keys().map(move |key| (tag, key)))
            .filter(|(_, key)| !regions.contains(key.first()) || !regions.contains(key.second()))
            .map(|(tag, key)| (tag.clone(), key.clone()))
            .collect()
    }

    /// Log entries that can never apply.
    pub fn warn_unknown_pairs(&self, regions: &RegionCatalog) {
        for (tag, key) in self.unknown_pairs(regions) {
            warn!(tag = %tag, pair = %key, "Modifier references unknown region code");
        }
    }
}

/// Source of the multiplicative jitter applied to each raw delta.
pub trait Jitter {
    /// A value in `[-amplitude, amplitude]`
    fn sample(&mut self, amplitude: f64) -> f64;
}

/// Deterministic zero jitter.
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self, _amplitude: f64) -> f64 {
        0.0
    }
}

/// Always returns the same draw, clamped to the amplitude.
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&mut self, amplitude: f64) -> f64 {
        self.0.clamp(-amplitude, amplitude)
    }
}

/// Uniform jitter from a seedable generator.
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&mut self, amplitude: f64) -> f64 {
        if amplitude <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-amplitude..=amplitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Increased,
    Decreased,
    Stable,
}

impl ChangeType {
    pub fn classify(before: f64, after: f64, noise_floor: f64) -> Self {
        let diff = after - before;
        if diff.abs() <= noise_floor {
            ChangeType::Stable
        } else if diff > 0.0 {
            ChangeType::Increased
        } else {
            ChangeType::Decreased
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDelta {
    pub endpoint_a: String,
    pub endpoint_b: String,
    pub before_weight: f64,
    pub after_weight: f64,
    pub change_type: ChangeType,
}

impl WeightDelta {
    pub fn magnitude(&self) -> f64 {
        (self.after_weight - self.before_weight).abs()
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.endpoint_a, &self.endpoint_b)
    }
}

pub struct ConnectivityModulator<J: Jitter> {
    config: ModulationConfig,
    jitter: J,
}

impl<J: Jitter> ConnectivityModulator<J> {
    pub fn new(config: ModulationConfig, jitter: J) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, jitter })
    }

    pub fn config(&self) -> &ModulationConfig {
        &self.config
    }

    /// Perturb every edge in place and return the changes above the noise floor,
    /// in edge order.
    pub fn modulate(
        &mut self,
        graph: &mut FilteredGraph,
        profile: &PerturbationProfile,
    ) -> Vec<WeightDelta> {
        let mut deltas = Vec::new();
        let cfg = &self.config;

        for edge in graph.edges_mut() {
            let mut raw = profile.raw_delta(&edge.key);
            raw *= 1.0 + self.jitter.sample(cfg.jitter_amplitude);

            let before = edge.current_weight;
            let after = (before + raw).clamp(cfg.min_weight, cfg.max_weight);
            edge.current_weight = after;

            let change_type = ChangeType::classify(before, after, cfg.noise_floor);
            if change_type == ChangeType::Stable {
                continue;
            }
            debug!(pair = %edge.key, before, after, "Weight changed");
            deltas.push(WeightDelta {
                endpoint_a: edge.key.first().to_string(),
                endpoint_b: edge.key.second().to_string(),
                before_weight: before,
                after_weight: after,
                change_type,
            });
        }

        info!(
            edges = graph.edges().len(),
            changed = deltas.len(),
            "Modulation applied"
        );
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConnectionEdge, ConnectionKind, ConnectivityCatalog, Region};
    use crate::error::CatalogError;
    use crate::graph::GraphBuilder;
    use std::collections::BTreeSet;

    fn table(entries: &[(&str, f64)]) -> ModifierTable {
        entries
            .iter()
            .map(|(k, v)| (k.parse::<PairKey>().unwrap(), *v))
            .collect()
    }

    fn graph(edges: &[(&str, &str, f64)]) -> FilteredGraph {
        let mut codes = BTreeSet::new();
        let mut regions = Vec::new();
        for (a, b, _) in edges {
            for code in [a, b] {
                if codes.insert(code.to_string()) {
                    regions.push(Region::new(code, code, &[], 0.5, 0.5));
                }
            }
        }
        let regions = RegionCatalog::new(regions).unwrap();
        let connections = ConnectivityCatalog::new(
            edges
                .iter()
                .map(|(a, b, w)| ConnectionEdge::new(a, b, ConnectionKind::Excitatory, *w).unwrap())
                .collect(),
        );
        GraphBuilder::build(&codes, &regions, &connections).0
    }

    #[test]
    fn test_amygdala_prefrontal_example() {
        let mut g = graph(&[("AMY", "mPFC", 0.65)]);
        let profile = PerturbationProfile::new(
            table(&[("AMY-mPFC", 0.20)]),
            table(&[("AMY-mPFC", 0.10)]),
            DurationScale::Standard,
        );
        let mut modulator = ConnectivityModulator::new(ModulationConfig::default(), NoJitter).unwrap();
        let deltas = modulator.modulate(&mut g, &profile);

        assert_eq!(deltas.len(), 1);
        let d = &deltas[0];
        assert_eq!((d.endpoint_a.as_str(), d.endpoint_b.as_str()), ("AMY", "mPFC"));
        assert_eq!(d.before_weight, 0.65);
        assert!((d.after_weight - 0.95).abs() < 1e-9);
        assert_eq!(d.change_type, ChangeType::Increased);
        assert!((g.edges()[0].current_weight - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_duration_scales_delta() {
        let profile = PerturbationProfile::new(
            table(&[("AMY-HPC", -0.2)]),
            ModifierTable::new(),
            DurationScale::Extended,
        );
        let delta = profile.raw_delta(&PairKey::new("HPC", "AMY"));
        assert!((delta + 0.26).abs() < 1e-9);
        assert_eq!(profile.raw_delta(&PairKey::new("AMY", "INS")), 0.0);
    }

    #[test]
    fn test_clamped_to_bounds() {
        let mut g = graph(&[("AMY", "mPFC", 0.9), ("AMY", "HPC", 0.1)]);
        let profile = PerturbationProfile::new(
            table(&[("AMY-mPFC", 0.3), ("AMY-HPC", -0.3)]),
            table(&[("AMY-mPFC", 0.3), ("AMY-HPC", -0.3)]),
            DurationScale::Extended,
        );
        let cfg = ModulationConfig {
            min_weight: 0.05,
            max_weight: 0.95,
            ..Default::default()
        };
        let mut modulator = ConnectivityModulator::new(cfg, FixedJitter(0.1)).unwrap();
        let deltas = modulator.modulate(&mut g, &profile);

        assert_eq!(deltas.len(), 2);
        let hpc = g.edge(&PairKey::new("AMY", "HPC")).unwrap();
        let pfc = g.edge(&PairKey::new("AMY", "mPFC")).unwrap();
        assert_eq!(hpc.current_weight, 0.05);
        assert_eq!(pfc.current_weight, 0.95);
    }

    #[test]
    fn test_weights_stay_in_bounds_for_all_draws() {
        let profile = PerturbationProfile::new(
            table(&[("A-B", 0.3), ("A-C", -0.3), ("B-C", 0.05)]),
            table(&[("A-B", 0.3), ("A-C", -0.3), ("B-C", -0.3)]),
            DurationScale::Extended,
        );
        for seed in 0..200 {
            let mut g = graph(&[("A", "B", 0.99), ("A", "C", 0.01), ("B", "C", 0.5)]);
            let mut modulator =
                ConnectivityModulator::new(ModulationConfig::default(), SeededJitter::new(seed)).unwrap();
            modulator.modulate(&mut g, &profile);
            for edge in g.edges() {
                assert!((0.0..=1.0).contains(&edge.current_weight), "seed {}: {:?}", seed, edge);
            }
        }
    }

    #[test]
    fn test_noise_floor_suppresses_small_changes() {
        let mut g = graph(&[("AMY", "mPFC", 0.5), ("AMY", "HPC", 0.5)]);
        let profile = PerturbationProfile::new(
            table(&[("AMY-mPFC", 0.008), ("AMY-HPC", 0.011)]),
            ModifierTable::new(),
            DurationScale::Standard,
        );
        let mut modulator = ConnectivityModulator::new(ModulationConfig::default(), NoJitter).unwrap();
        let deltas = modulator.modulate(&mut g, &profile);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].pair_key(), PairKey::new("AMY", "HPC"));
        for d in &deltas {
            assert!(d.magnitude() > 0.01);
        }
    }

    #[test]
    fn test_unmapped_pair_has_no_effect() {
        let mut g = graph(&[("AMY", "mPFC", 0.4)]);
        let profile = PerturbationProfile::new(
            table(&[("HPC-INS", 0.3)]),
            ModifierTable::new(),
            DurationScale::Standard,
        );
        let mut modulator =
            ConnectivityModulator::new(ModulationConfig::default(), SeededJitter::new(7)).unwrap();
        assert!(modulator.modulate(&mut g, &profile).is_empty());
        assert_eq!(g.edges()[0].current_weight, 0.4);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let mut a = SeededJitter::new(42);
        let mut b = SeededJitter::new(42);
        for _ in 0..10 {
            let x = a.sample(0.1);
            assert_eq!(x, b.sample(0.1));
            assert!((-0.1..=0.1).contains(&x));
        }
        assert_eq!(a.sample(0.0), 0.0);
    }

    #[test]
    fn test_change_type_classification() {
        assert_eq!(ChangeType::classify(0.5, 0.6, 0.01), ChangeType::Increased);
        assert_eq!(ChangeType::classify(0.5, 0.4, 0.01), ChangeType::Decreased);
        assert_eq!(ChangeType::classify(0.5, 0.505, 0.01), ChangeType::Stable);
    }

    #[test]
    fn test_duration_parse() {
        assert_eq!("Short".parse::<DurationScale>().unwrap(), DurationScale::Short);
        assert_eq!("12w".parse::<DurationScale>().unwrap(), DurationScale::Extended);
        assert!(matches!(
            "forever".parse::<DurationScale>(),
            Err(ProfileError::UnknownDuration(_))
        ));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let cfg = ModulationConfig {
            min_weight: 0.9,
            max_weight: 0.1,
            ..Default::default()
        };
        assert!(ConnectivityModulator::new(cfg, NoJitter).is_err());

        let cfg = ModulationConfig {
            noise_floor: f64::NAN,
            ..Default::default()
        };
        assert!(ConnectivityModulator::new(cfg, NoJitter).is_err());

        let cfg = ModulationConfig {
            jitter_amplitude: f64::INFINITY,
            ..Default::default()
        };
        assert!(ConnectivityModulator::new(cfg, SeededJitter::new(1)).is_err());
    }

    const LIBRARY: &str = r#"{
        "interventions": {
            "Mindfulness": { "mPFC-AMY": 0.2, "AMY-HPC": -0.05 }
        },
        "settings": {
            "nature": { "AMY-mPFC": 0.1, "AMY-XYZ": 0.1 }
        }
    }"#;

    #[test]
    fn test_library_canonicalises_keys_and_tags() {
        let library = ProfileLibrary::from_json(LIBRARY).unwrap();
        let profile = library
            .profile("mindfulness", "NATURE", DurationScale::Standard)
            .unwrap();
        let key = PairKey::new("AMY", "mPFC");
        assert!((profile.raw_delta(&key) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_library_unknown_tags() {
        let library = ProfileLibrary::from_json(LIBRARY).unwrap();
        assert!(matches!(
            library.profile("exercise", "nature", DurationScale::Short),
            Err(ProfileError::UnknownIntervention(t)) if t == "exercise"
        ));
        assert!(matches!(
            library.profile("mindfulness", "office", DurationScale::Short),
            Err(ProfileError::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_library_reports_unknown_pairs() {
        let library = ProfileLibrary::from_json(LIBRARY).unwrap();
        let regions = RegionCatalog::new(vec![
            Region::new("AMY", "Amygdala", &[], 0.5, 0.5),
            Region::new("mPFC", "mPFC", &[], 0.5, 0.5),
            Region::new("HPC", "Hippocampus", &[], 0.5, 0.5),
        ])
        .unwrap();
        let unknown = library.unknown_pairs(&regions);
        assert_eq!(unknown, vec![("nature".to_string(), PairKey::new("AMY", "XYZ"))]);
    }

    #[test]
    fn test_library_rejects_malformed_key() {
        let json = r#"{ "interventions": { "x": { "AMY": 0.1 } } }"#;
        assert!(matches!(
            ProfileLibrary::from_json(json),
            Err(ProfileError::Catalog(CatalogError::MalformedPairKey(_)))
        ));
        assert!(matches!(
            ProfileLibrary::from_json("[1, 2]"),
            Err(ProfileError::Parse(_))
        ));
    }

    #[test]
    fn test_library_rejects_pair_in_both_orders() {
        let json = r#"{ "interventions": { "x": { "AMY-mPFC": 0.2, "mPFC-AMY": 0.1 } } }"#;
        match ProfileLibrary::from_json(json) {
            Err(ProfileError::DuplicatePair { tag, key }) => {
                assert_eq!(tag, "x");
                assert_eq!(key, "AMY-mPFC");
            }
            other => panic!("expected duplicate pair error, got {:?}", other),
        }

        // the same pair in different tables is fine
        let json = r#"{
            "interventions": { "x": { "AMY-mPFC": 0.2 } },
            "settings": { "y": { "mPFC-AMY": 0.1 } }
        }"#;
        assert!(ProfileLibrary::from_json(json).is_ok());
    }

    #[test]
    fn test_library_rejects_tags_differing_by_case() {
        let json = r#"{ "settings": { "Nature": {}, "nature": {} } }"#;
        assert!(matches!(
            ProfileLibrary::from_json(json),
            Err(ProfileError::DuplicateTag(t)) if t == "nature"
        ));
    }
}
