use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CATALOG_PATH: &str = "data/catalog";
const DEFAULT_CONTEXT_WINDOW: usize = 100;
const DEFAULT_EXCERPT_WINDOW: usize = 150;
const DEFAULT_MIN_WEIGHT: f64 = 0.0;
const DEFAULT_MAX_WEIGHT: f64 = 1.0;
const DEFAULT_NOISE_FLOOR: f64 = 0.01;
const DEFAULT_JITTER: f64 = 0.1;

/// Radius (in characters) of the window inspected for gene/protein shapes.
pub const GENE_WINDOW: usize = 15;

/// Extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Characters either side of a match handed to the context validator
    pub context_window: usize,
    /// Fallback excerpt radius when no sentence boundary is found
    pub excerpt_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            excerpt_window: DEFAULT_EXCERPT_WINDOW,
        }
    }
}

/// Weight perturbation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulationConfig {
    pub min_weight: f64,
    pub max_weight: f64,
    /// Changes at or below this magnitude are not reported
    pub noise_floor: f64,
    /// Half-width of the multiplicative jitter applied to each raw delta
    pub jitter_amplitude: f64,
}

impl Default for ModulationConfig {
    fn default() -> Self {
        Self {
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
            noise_floor: DEFAULT_NOISE_FLOOR,
            jitter_amplitude: DEFAULT_JITTER,
        }
    }
}

impl ModulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.min_weight) || !in_unit(self.max_weight) || self.min_weight > self.max_weight {
            return Err(ConfigError::WeightBounds {
                min: self.min_weight,
                max: self.max_weight,
            });
        }
        for (name, value) in [
            ("noise_floor", self.noise_floor),
            ("jitter_amplitude", self.jitter_amplitude),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        // amplitude above 1 could flip the sign of a delta
        if self.jitter_amplitude > 1.0 {
            return Err(ConfigError::JitterTooLarge(self.jitter_amplitude));
        }
        Ok(())
    }
}

/// Process-wide engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub catalog_path: PathBuf,
    pub extraction: ExtractionConfig,
    pub modulation: ModulationConfig,
    /// Fixed jitter seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Budget for the extraction loop, checked between documents
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            extraction: ExtractionConfig::default(),
            modulation: ModulationConfig::default(),
            seed: None,
            deadline: None,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `CONNECTOME_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let catalog_path = std::env::var("CONNECTOME_CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH));

        let extraction = ExtractionConfig {
            context_window: env_or("CONNECTOME_CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW),
            excerpt_window: env_or("CONNECTOME_EXCERPT_WINDOW", DEFAULT_EXCERPT_WINDOW),
        };

        let modulation = ModulationConfig {
            min_weight: env_or("CONNECTOME_MIN_WEIGHT", DEFAULT_MIN_WEIGHT),
            max_weight: env_or("CONNECTOME_MAX_WEIGHT", DEFAULT_MAX_WEIGHT),
            noise_floor: env_or("CONNECTOME_NOISE_FLOOR", DEFAULT_NOISE_FLOOR),
            jitter_amplitude: env_or("CONNECTOME_JITTER", DEFAULT_JITTER),
        };
        modulation.validate()?;

        let seed = std::env::var("CONNECTOME_SEED")
            .ok()
            .and_then(|s| s.parse().ok());
        let deadline = std::env::var("CONNECTOME_DEADLINE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis);

        Ok(Self {
            catalog_path,
            extraction,
            modulation,
            seed,
            deadline,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
