//! Configuration types for the generation pipeline operators.
//!
//! Every operator owns its own config block. A `random_seed` of 0 means the
//! operator draws from an entropy-seeded generator; any other value makes it
//! deterministic for the lifetime of the operator.

use serde::{Deserialize, Serialize};

/// Top-level configuration for one generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fitness direction shared by selection and elitism.
    #[serde(default = "default_higher_is_better")]
    pub higher_is_better: bool,
    /// Tournament selection settings.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Uniform crossover settings for byte genomes.
    #[serde(default)]
    pub byte_crossover: ByteCrossoverConfig,
    /// Simulated binary crossover settings for real genomes.
    #[serde(default)]
    pub real_crossover: RealCrossoverConfig,
    /// Bit-flip mutation settings for byte genomes.
    #[serde(default)]
    pub bit_flip: BitFlipConfig,
    /// Multiplicative + reset mutation settings for real genomes.
    #[serde(default)]
    pub real_mutation: RealMutationConfig,
    /// Per-objective elite archive settings.
    #[serde(default)]
    pub elite: EliteConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            higher_is_better: default_higher_is_better(),
            selection: SelectionConfig::default(),
            byte_crossover: ByteCrossoverConfig::default(),
            real_crossover: RealCrossoverConfig::default(),
            bit_flip: BitFlipConfig::default(),
            real_mutation: RealMutationConfig::default(),
            elite: EliteConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Give every stochastic operator its own deterministic stream derived
    /// from `seed`. A seed of 0 leaves every operator on ambient entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        // Offsets 1..=5 wrap to 0 at most once; that stream takes offset 6.
        let derive = |offset: u64| match (seed, seed.wrapping_add(offset)) {
            (0, _) => 0,
            (_, 0) => seed.wrapping_add(6),
            (_, derived) => derived,
        };
        self.selection.random_seed = derive(1);
        self.byte_crossover.random_seed = derive(2);
        self.real_crossover.random_seed = derive(3);
        self.bit_flip.random_seed = derive(4);
        self.real_mutation.random_seed = derive(5);
        self
    }
}

fn default_higher_is_better() -> bool {
    true
}

/// Tournament selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Candidates drawn per tournament (clamped to `[2, bucket size]`).
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Draw candidates independently (true) or without repeats (false).
    #[serde(default = "default_with_replacement")]
    pub with_replacement: bool,
    /// Probability that the best tournament entrant wins over the runner-up.
    #[serde(default = "default_selection_pressure")]
    pub selection_pressure: f32,
    /// Probability that a parent is drawn from the global bucket instead of
    /// the child's own objective bucket.
    #[serde(default)]
    pub cross_group_parent_chance: f32,
    /// RNG seed (0 = ambient).
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tournament_size: default_tournament_size(),
            with_replacement: default_with_replacement(),
            selection_pressure: default_selection_pressure(),
            cross_group_parent_chance: 0.0,
            random_seed: 0,
        }
    }
}

fn default_tournament_size() -> usize {
    3
}
fn default_with_replacement() -> bool {
    true
}
fn default_selection_pressure() -> f32 {
    0.8
}

/// Uniform crossover configuration for byte genomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ByteCrossoverConfig {
    /// RNG seed (0 = ambient).
    #[serde(default)]
    pub random_seed: u64,
}

/// Simulated binary crossover (SBX) configuration for real genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealCrossoverConfig {
    /// Per-gene probability of SBX; otherwise the gene is copied from a
    /// random parent.
    #[serde(default = "default_crossover_probability")]
    pub crossover_probability: f32,
    /// Distribution index. Higher values keep children closer to parents.
    #[serde(default = "default_eta")]
    pub eta: f32,
    /// Clamp every child gene into `[clamp_min, clamp_max]`.
    #[serde(default = "default_clamp_children")]
    pub clamp_children: bool,
    #[serde(default = "default_range_min")]
    pub clamp_min: f32,
    #[serde(default = "default_range_max")]
    pub clamp_max: f32,
    /// RNG seed (0 = ambient).
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for RealCrossoverConfig {
    fn default() -> Self {
        Self {
            crossover_probability: default_crossover_probability(),
            eta: default_eta(),
            clamp_children: default_clamp_children(),
            clamp_min: default_range_min(),
            clamp_max: default_range_max(),
            random_seed: 0,
        }
    }
}

fn default_crossover_probability() -> f32 {
    0.9
}
fn default_eta() -> f32 {
    15.0
}
fn default_clamp_children() -> bool {
    true
}
fn default_range_min() -> f32 {
    -1.0
}
fn default_range_max() -> f32 {
    1.0
}

/// Which individuals a mutator visits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationScope {
    /// Every individual holding a genome of the mutator's kind.
    All,
    /// Only individuals flagged for replacement this generation.
    Flagged,
}

/// Bit-flip mutation configuration for byte genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitFlipConfig {
    /// Independent per-bit flip probability.
    #[serde(default = "default_bit_flip_probability")]
    pub bit_flip_probability: f32,
    #[serde(default = "default_bit_flip_scope")]
    pub scope: MutationScope,
    /// RNG seed (0 = ambient).
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for BitFlipConfig {
    fn default() -> Self {
        Self {
            bit_flip_probability: default_bit_flip_probability(),
            scope: default_bit_flip_scope(),
            random_seed: 0,
        }
    }
}

fn default_bit_flip_probability() -> f32 {
    0.01
}
fn default_bit_flip_scope() -> MutationScope {
    MutationScope::All
}

/// Real-genome mutation configuration: multiplicative noise on every gene
/// plus an occasional reset of a random subset of genes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealMutationConfig {
    /// Each gene is scaled by `1 + u`, `u ~ U[-delta, +delta]`.
    #[serde(default = "default_per_value_delta")]
    pub per_value_delta_percent: f32,
    /// Per-individual probability of a partial reset.
    #[serde(default = "default_random_mutation_chance")]
    pub random_mutation_chance: f32,
    /// Upper bound on the fraction of genes reset at once.
    #[serde(default = "default_reset_frac_max")]
    pub reset_frac_max: f32,
    #[serde(default = "default_range_min")]
    pub reset_min: f32,
    #[serde(default = "default_range_max")]
    pub reset_max: f32,
    #[serde(default = "default_real_mutation_scope")]
    pub scope: MutationScope,
    /// RNG seed (0 = ambient).
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for RealMutationConfig {
    fn default() -> Self {
        Self {
            per_value_delta_percent: default_per_value_delta(),
            random_mutation_chance: default_random_mutation_chance(),
            reset_frac_max: default_reset_frac_max(),
            reset_min: default_range_min(),
            reset_max: default_range_max(),
            scope: default_real_mutation_scope(),
            random_seed: 0,
        }
    }
}

fn default_per_value_delta() -> f32 {
    0.025
}
fn default_random_mutation_chance() -> f32 {
    0.05
}
fn default_reset_frac_max() -> f32 {
    0.2
}
fn default_real_mutation_scope() -> MutationScope {
    MutationScope::Flagged
}

/// Elite archive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EliteConfig {
    /// Slots kept per objective.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
}

impl Default for EliteConfig {
    fn default() -> Self {
        Self {
            elite_count: default_elite_count(),
        }
    }
}

fn default_elite_count() -> usize {
    4
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Tournament size must be at least 2 (got {0})")]
    TournamentTooSmall(usize),
    #[error("{name} must be within [0, 1] (got {value})")]
    ProbabilityOutOfRange { name: &'static str, value: f32 },
    #[error("{name} must be non-negative (got {value})")]
    Negative { name: &'static str, value: f32 },
    #[error("Elite count must be at least 1")]
    NoElites,
    #[error("Invalid bounds for {name}: min ({min}) > max ({max}) or not finite")]
    InvalidBounds { name: &'static str, min: f32, max: f32 },
}

impl PipelineConfig {
    /// Validate every operator block.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probability = |name: &'static str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::ProbabilityOutOfRange { name, value })
            }
        };
        let non_negative = |name: &'static str, value: f32| {
            if value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Negative { name, value })
            }
        };

        if self.selection.tournament_size < 2 {
            return Err(ConfigError::TournamentTooSmall(
                self.selection.tournament_size,
            ));
        }
        probability("selection_pressure", self.selection.selection_pressure)?;
        probability(
            "cross_group_parent_chance",
            self.selection.cross_group_parent_chance,
        )?;

        probability(
            "crossover_probability",
            self.real_crossover.crossover_probability,
        )?;
        non_negative("eta", self.real_crossover.eta)?;
        if self.real_crossover.clamp_children {
            check_bounds(
                "clamp",
                self.real_crossover.clamp_min,
                self.real_crossover.clamp_max,
            )?;
        }

        probability("bit_flip_probability", self.bit_flip.bit_flip_probability)?;

        non_negative(
            "per_value_delta_percent",
            self.real_mutation.per_value_delta_percent,
        )?;
        probability(
            "random_mutation_chance",
            self.real_mutation.random_mutation_chance,
        )?;
        probability("reset_frac_max", self.real_mutation.reset_frac_max)?;
        // Inverted reset bounds are swapped by the mutator, only finiteness matters.
        let (lo, hi) = (
            self.real_mutation.reset_min.min(self.real_mutation.reset_max),
            self.real_mutation.reset_min.max(self.real_mutation.reset_max),
        );
        check_bounds("reset", lo, hi)?;

        if self.elite.elite_count == 0 {
            return Err(ConfigError::NoElites);
        }

        Ok(())
    }
}

fn check_bounds(name: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidBounds { name, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_small_tournament() {
        let mut config = PipelineConfig::default();
        config.selection.tournament_size = 1;
        assert_eq!(config.validate(), Err(ConfigError::TournamentTooSmall(1)));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut config = PipelineConfig::default();
        config.bit_flip.bit_flip_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange {
                name: "bit_flip_probability",
                ..
            })
        ));
    }

    #[test]
    fn test_inverted_reset_bounds_allowed() {
        let mut config = PipelineConfig::default();
        config.real_mutation.reset_min = 2.0;
        config.real_mutation.reset_max = -2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_clamp_bounds_rejected() {
        let mut config = PipelineConfig::default();
        config.real_crossover.clamp_min = 1.0;
        config.real_crossover.clamp_max = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds { name: "clamp", .. })
        ));
    }

    #[test]
    fn test_with_seed_derives_distinct_streams() {
        let config = PipelineConfig::default().with_seed(1337);
        let seeds = [
            config.selection.random_seed,
            config.byte_crossover.random_seed,
            config.real_crossover.random_seed,
            config.bit_flip.random_seed,
            config.real_mutation.random_seed,
        ];
        assert_eq!(seeds, [1338, 1339, 1340, 1341, 1342]);

        let seeds_of = |seed: u64| {
            let config = PipelineConfig::default().with_seed(seed);
            [
                config.selection.random_seed,
                config.byte_crossover.random_seed,
                config.real_crossover.random_seed,
                config.bit_flip.random_seed,
                config.real_mutation.random_seed,
            ]
        };
        assert_eq!(seeds_of(u64::MAX), [5, 1, 2, 3, 4]);
        assert_eq!(seeds_of(u64::MAX - 2), [u64::MAX - 1, u64::MAX, 3, 1, 2]);
        for seed in [1, u64::MAX - 5, u64::MAX - 4, u64::MAX - 1, u64::MAX] {
            let mut seeds = seeds_of(seed).to_vec();
            assert!(seeds.iter().all(|&s| s != 0), "seed {}", seed);
            seeds.sort_unstable();
            seeds.dedup();
            assert_eq!(seeds.len(), 5, "seed {}", seed);
        }

        let ambient = PipelineConfig::default().with_seed(0);
        assert_eq!(ambient.selection.random_seed, 0);
        assert_eq!(ambient.real_mutation.random_seed, 0);
    }

    #[test]
    fn test_serialization_defaults() {
        let parsed: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.selection.tournament_size, 3);
        assert_eq!(parsed.bit_flip.scope, MutationScope::All);
        assert_eq!(parsed.real_mutation.scope, MutationScope::Flagged);
        assert_eq!(parsed.elite.elite_count, 4);

        let json = serde_json::to_string(&PipelineConfig::default()).unwrap();
        let round: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(round.real_crossover.eta, 15.0);
    }
}
