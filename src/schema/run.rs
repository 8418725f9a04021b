//! Run description for the command-line demo.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, MutationScope, PipelineConfig};

/// What the demo population is evolved towards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Problem {
    /// Byte genomes matched bit-for-bit against a target string.
    /// Fitness: (matching bits)^2.
    TargetBytes { text: String },
    /// Real genomes matched against a target vector. Fitness: -SSE.
    TargetVector { values: Vec<f32> },
}

impl Default for Problem {
    fn default() -> Self {
        Self::TargetBytes {
            text: "Evolved by tournament".to_string(),
        }
    }
}

impl Problem {
    /// Genes per genome implied by the target.
    pub fn genome_len(&self) -> usize {
        match self {
            Problem::TargetBytes { text } => text.len(),
            Problem::TargetVector { values } => values.len(),
        }
    }
}

/// Everything the demo binary needs to run one evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub problem: Problem,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Fraction of the population flagged for replacement each generation.
    #[serde(default = "default_replace_fraction")]
    pub replace_fraction: f32,
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Seed for the initial population and, via [`PipelineConfig::with_seed`],
    /// for every operator. 0 means ambient entropy.
    #[serde(default)]
    pub random_seed: u64,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            problem: Problem::default(),
            population_size: default_population_size(),
            replace_fraction: default_replace_fraction(),
            max_generations: default_max_generations(),
            random_seed: 0,
            pipeline: PipelineConfig::default(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_replace_fraction() -> f32 {
    0.4
}
fn default_max_generations() -> usize {
    600
}

/// Errors raised while loading a run description.
#[derive(Debug, thiserror::Error)]
pub enum RunConfigError {
    #[error("Failed to read run file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse run file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Replace fraction must be within [0, 1] (got {0})")]
    InvalidReplaceFraction(f32),
    #[error("Problem target is empty")]
    EmptyTarget,
    #[error("Pipeline config invalid: {0}")]
    Pipeline(#[from] ConfigError),
}

impl RunConfig {
    /// The byte run printed by `--example`: 50 genomes, 40% replaced per
    /// generation, tournaments of 8 at pressure 0.7, three elites.
    ///
    /// Bit flips are limited to freshly bred genomes. Mutating every genome
    /// keeps knocking the best individuals back down and the run stalls well
    /// short of the target.
    pub fn example() -> Self {
        let mut run = RunConfig {
            problem: Problem::TargetBytes {
                text: "tournament selection!!".to_string(),
            },
            random_seed: 42,
            ..Default::default()
        };
        run.pipeline.selection.tournament_size = 8;
        run.pipeline.selection.selection_pressure = 0.7;
        run.pipeline.bit_flip.bit_flip_probability = 0.025;
        run.pipeline.bit_flip.scope = MutationScope::Flagged;
        run.pipeline.elite.elite_count = 3;
        run
    }

    /// Read and validate a JSON run file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RunConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.population_size < 2 {
            return Err(RunConfigError::PopulationTooSmall);
        }
        if !(0.0..=1.0).contains(&self.replace_fraction) {
            return Err(RunConfigError::InvalidReplaceFraction(
                self.replace_fraction,
            ));
        }
        if self.problem.genome_len() == 0 {
            return Err(RunConfigError::EmptyTarget);
        }
        self.pipeline.validate()?;
        Ok(())
    }
}
