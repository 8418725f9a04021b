//! Generation pipeline: Elite → Select → Crossover → Mutate → Cleanup.
//!
//! The pipeline owns one instance of every operator, so each operator's
//! generator is seeded once and advances across generations. Callers own the
//! loop: evaluate fitness, flag individuals for replacement, then call
//! [`GenerationPipeline::step`].

use log::debug;

use crate::schema::{BreedingPair, ConfigError, PipelineConfig, Population};

use super::archive::EliteArchive;
use super::bucket::fitness_order;
use super::crossover::{ByteCrossover, Crossover, RealCrossover};
use super::genome::GenomeKind;
use super::janitor::GenerationJanitor;
use super::mutation::{BitFlipMutator, Mutator, RealMutator};
use super::report::{GenerationReport, ObjectiveSummary};
use super::selection::TournamentSelector;

/// Stage runner for one genome kind.
pub struct GenerationPipeline<C, M>
where
    C: Crossover,
    M: Mutator<Kind = C::Kind>,
{
    config: PipelineConfig,
    archive: EliteArchive<C::Kind>,
    selector: TournamentSelector,
    crossover: C,
    mutator: M,
    janitor: GenerationJanitor,
    pairs: Vec<BreedingPair>,
    generation: u64,
}

/// Pipeline over byte genomes: uniform crossover and bit-flip mutation.
pub type BytePipeline = GenerationPipeline<ByteCrossover, BitFlipMutator>;

/// Pipeline over real genomes: SBX and multiplicative/reset mutation.
pub type RealPipeline = GenerationPipeline<RealCrossover, RealMutator>;

impl BytePipeline {
    pub fn bytes(config: PipelineConfig) -> Result<Self, ConfigError> {
        let crossover = ByteCrossover::new(config.byte_crossover.clone());
        let mutator = BitFlipMutator::new(config.bit_flip.clone());
        Self::with_operators(config, crossover, mutator)
    }
}

impl RealPipeline {
    pub fn real(config: PipelineConfig) -> Result<Self, ConfigError> {
        let crossover = RealCrossover::new(config.real_crossover.clone());
        let mutator = RealMutator::new(config.real_mutation.clone());
        Self::with_operators(config, crossover, mutator)
    }
}

impl<C, M> GenerationPipeline<C, M>
where
    C: Crossover,
    M: Mutator<Kind = C::Kind>,
{
    /// Build a pipeline around caller-supplied breeding operators. Selection
    /// and elitism come from `config`.
    pub fn with_operators(
        config: PipelineConfig,
        crossover: C,
        mutator: M,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            archive: EliteArchive::new(config.elite.clone(), config.higher_is_better),
            selector: TournamentSelector::new(config.selection.clone(), config.higher_is_better),
            crossover,
            mutator,
            janitor: GenerationJanitor::new(),
            pairs: Vec::new(),
            generation: 0,
            config,
        })
    }

    /// Run every stage once, in order. Never fails; anything unusual is in
    /// the report.
    pub fn step(&mut self, population: &mut Population) -> GenerationReport {
        let generation = self.generation;
        let objectives = summarize_objectives::<C::Kind>(population, self.config.higher_is_better);

        let elite = self.archive.update(population, generation);

        let (pairs, selection) = self.selector.select::<C::Kind>(population);
        self.pairs.extend(pairs);

        let crossover = self.crossover.breed(population, &self.pairs);
        let mutation = self.mutator.mutate(population);
        let cleanup = self.janitor.clean(&mut self.pairs, population);

        self.generation += 1;

        let report = GenerationReport {
            generation,
            objectives,
            elite,
            selection,
            crossover,
            mutation,
            cleanup,
        };
        if let Some(summary) = report.objectives.first() {
            debug!(
                "Generation {}: best {:.4}, mean {:.4}, bred {}, mutated {}, {} anomalies",
                generation,
                summary.best,
                summary.mean,
                report.crossover.bred,
                report.mutation.mutated,
                report.anomalies().count()
            );
        }
        report
    }

    /// Generations completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn archive(&self) -> &EliteArchive<C::Kind> {
        &self.archive
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Best and mean score per objective over rated individuals of kind `K`.
/// NaN scores are left out of both.
pub fn summarize_objectives<K: GenomeKind>(
    population: &Population,
    higher_is_better: bool,
) -> Vec<ObjectiveSummary> {
    let mut summaries: Vec<ObjectiveSummary> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();

    for (_, individual) in population.iter() {
        if !K::is_rated(individual) {
            continue;
        }
        for (objective, &value) in individual.fitness.iter().enumerate() {
            if summaries.len() <= objective {
                summaries.push(ObjectiveSummary {
                    objective,
                    best: f32::NAN,
                    mean: f32::NAN,
                    count: 0,
                });
                sums.push(0.0);
            }
            if value.is_nan() {
                continue;
            }
            let summary = &mut summaries[objective];
            if summary.count == 0 || fitness_order(value, summary.best, higher_is_better).is_lt() {
                summary.best = value;
            }
            summary.count += 1;
            sums[objective] += value as f64;
        }
    }

    for (summary, sum) in summaries.iter_mut().zip(sums) {
        if summary.count > 0 {
            summary.mean = (sum / summary.count as f64) as f32;
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::fitness::{bit_match_squared, evaluate_population, negative_sse};
    use crate::compute::genome::GenomeRng;
    use crate::compute::report::Anomaly;
    use crate::schema::{Genome, IndividualId};

    const TARGET: &[u8] = b"pipeline";

    fn score_bytes(population: &mut Population) {
        evaluate_population(population, |genome| {
            genome
                .as_bytes()
                .map(|genes| vec![bit_match_squared(genes, TARGET)])
                .unwrap_or_default()
        });
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.elite.elite_count = 0;
        assert!(matches!(BytePipeline::bytes(config), Err(ConfigError::NoElites)));
    }

    #[test]
    fn test_step_leaves_clean_state() {
        let mut rng = GenomeRng::new(3);
        let mut population = Population::random_bytes(20, TARGET.len(), &mut rng);
        let mut pipeline = BytePipeline::bytes(PipelineConfig::default().with_seed(3)).unwrap();

        for expected in 0..5 {
            score_bytes(&mut population);
            population.flag_worst(0.5, 0, true);

            let report = pipeline.step(&mut population);
            assert_eq!(report.generation, expected);
            assert_eq!(report.selection.flagged, 10);
            assert_eq!(report.crossover.bred, 10);
            assert_eq!(report.cleanup.pairs_destroyed, 10);
            assert_eq!(report.cleanup.flags_cleared, 10);
            assert!(report.is_clean());
            assert_eq!(population.flagged_count(), 0);
        }
        assert_eq!(pipeline.generation(), 5);
    }

    #[test]
    fn test_elite_sees_population_before_breeding() {
        let mut population = Population::from_genomes([
            Genome::Real(vec![0.9, 0.9]),
            Genome::Real(vec![0.1, 0.1]),
            Genome::Real(vec![0.2, 0.2]),
        ]);
        evaluate_population(&mut population, |genome| {
            vec![negative_sse(genome.as_real().unwrap_or(&[]), &[1.0, 1.0])]
        });
        population.set_replace_flag(IndividualId(0), true);

        let mut config = PipelineConfig::default().with_seed(8);
        config.elite.elite_count = 1;
        let mut pipeline = RealPipeline::real(config).unwrap();
        let report = pipeline.step(&mut population);

        assert_eq!(report.elite.slots_written, 1);
        assert_eq!(pipeline.archive().slots(0)[0].genome, vec![0.9, 0.9]);
        assert_eq!(report.objectives[0].count, 3);
    }

    #[test]
    fn test_starved_generation_completes() {
        let mut population = Population::from_genomes(vec![Genome::Bytes(vec![0; 4]); 4]);
        population.set_replace_flag(IndividualId(1), true);

        let mut pipeline = BytePipeline::bytes(PipelineConfig::default().with_seed(1)).unwrap();
        let report = pipeline.step(&mut population);

        assert_eq!(report.elite.candidates, 0);
        assert!(report.objectives.is_empty());
        assert_eq!(
            report.anomalies().cloned().collect::<Vec<_>>(),
            vec![
                Anomaly::Starvation {
                    individual: IndividualId(1)
                },
                Anomaly::PairShortfall {
                    processed: 0,
                    missing: 1
                },
            ]
        );
        assert_eq!(population.flagged_count(), 0);
    }

    #[test]
    fn test_summary_skips_nan() {
        let mut population = Population::from_genomes(vec![Genome::Bytes(vec![0]); 3]);
        population.set_fitness(IndividualId(0), vec![1.0, 4.0]);
        population.set_fitness(IndividualId(1), vec![f32::NAN]);
        population.set_fitness(IndividualId(2), vec![3.0]);

        let summaries = summarize_objectives::<crate::compute::genome::ByteGenes>(&population, true);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].best, 3.0);
        assert_eq!(summaries[0].mean, 2.0);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[1].best, 4.0);
        assert_eq!(summaries[1].count, 1);
    }
}
