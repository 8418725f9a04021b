//! In-place mutation operators for byte and real genomes.

use std::collections::HashSet;

use log::{debug, warn};

use crate::schema::{BitFlipConfig, IndividualId, MutationScope, Population, RealMutationConfig};

use super::genome::{ByteGenes, GenomeKind, GenomeRng, RealGenes, lerp};
use super::report::{Anomaly, MutationReport};

/// At or above this flip probability every bit is flipped outright.
const FLIP_ALL_THRESHOLD: f64 = 1.0 - 1e-4;

/// Smallest uniform draw fed to the geometric gap, keeps `ln(u)` finite.
const MIN_GAP_DRAW: f64 = 1e-12;

/// Mutates genomes of one kind in place.
pub trait Mutator {
    type Kind: GenomeKind;

    fn mutate(&mut self, population: &mut Population) -> MutationReport;
}

/// Per-genome outcome reported back to the shared driver.
struct Mutated {
    genes_changed: usize,
    reset: bool,
}

fn mutate_with<K, F>(
    population: &mut Population,
    scope: MutationScope,
    stage: &str,
    mut mutate: F,
) -> MutationReport
where
    K: GenomeKind,
    F: FnMut(&mut [K::Gene]) -> Mutated,
{
    let mut report = MutationReport::default();

    for (i, individual) in population.individuals_mut().iter_mut().enumerate() {
        if scope == MutationScope::Flagged && !individual.replace {
            continue;
        }
        let Some(genes) = individual.genome.as_mut().and_then(|genome| K::genes_mut(genome)) else {
            continue;
        };
        if genes.is_empty() {
            let id = IndividualId(i as u32);
            warn!("{}: zero-length genome on {}", stage, id);
            report
                .anomalies
                .push(Anomaly::DegenerateGenome { individual: id });
            continue;
        }

        let outcome = mutate(genes);
        report.mutated += 1;
        report.genes_changed += outcome.genes_changed;
        if outcome.reset {
            report.resets += 1;
        }
    }

    debug!(
        "{}: {} {} genomes, {} genes changed, {} resets",
        stage,
        report.mutated,
        K::NAME,
        report.genes_changed,
        report.resets
    );
    report
}

// ============================================================================
// Byte genomes
// ============================================================================

/// Flips each bit independently with a fixed probability.
#[derive(Debug)]
pub struct BitFlipMutator {
    probability: f32,
    scope: MutationScope,
    rng: GenomeRng,
}

impl BitFlipMutator {
    pub fn new(config: BitFlipConfig) -> Self {
        let probability = if config.bit_flip_probability.is_nan() {
            0.0
        } else {
            config.bit_flip_probability.clamp(0.0, 1.0)
        };
        Self {
            probability,
            scope: config.scope,
            rng: GenomeRng::from_config_seed(config.random_seed),
        }
    }

    /// Flip bits of `genes` with probability `p` each and return how many
    /// flipped. Gaps between flips are drawn from the geometric distribution,
    /// so the draw count tracks the number of flips rather than the number of
    /// bits.
    pub fn flip_bits(rng: &mut GenomeRng, genes: &mut [u8], p: f32) -> usize {
        let total_bits = genes.len() as u64 * 8;
        let p = p as f64;
        if total_bits == 0 || p <= 0.0 {
            return 0;
        }
        if p >= FLIP_ALL_THRESHOLD {
            for byte in genes.iter_mut() {
                *byte ^= 0xFF;
            }
            return total_bits as usize;
        }

        let ln_keep = (1.0 - p).ln();
        let mut flipped = 0;
        // Cursor sits one before the next candidate bit.
        let mut cursor: u64 = 0;
        loop {
            let u = rng.next_f64().max(MIN_GAP_DRAW);
            let skip = (u.ln() / ln_keep).floor() as u64;
            cursor = cursor.saturating_add(skip).saturating_add(1);
            if cursor > total_bits {
                break;
            }
            let bit = cursor - 1;
            genes[(bit / 8) as usize] ^= 1u8 << (bit % 8);
            flipped += 1;
        }
        flipped
    }
}

impl Mutator for BitFlipMutator {
    type Kind = ByteGenes;

    fn mutate(&mut self, population: &mut Population) -> MutationReport {
        let (rng, p) = (&mut self.rng, self.probability);
        mutate_with::<ByteGenes, _>(population, self.scope, "BitFlipMutator", |genes| Mutated {
            genes_changed: Self::flip_bits(rng, genes, p),
            reset: false,
        })
    }
}

// ============================================================================
// Real genomes
// ============================================================================

/// Multiplicative noise on every gene plus an occasional partial reset.
#[derive(Debug)]
pub struct RealMutator {
    delta: f32,
    reset_chance: f32,
    reset_frac_max: f32,
    reset_min: f32,
    reset_max: f32,
    scope: MutationScope,
    rng: GenomeRng,
    seen: HashSet<usize>,
    before: Vec<f32>,
}

impl RealMutator {
    pub fn new(config: RealMutationConfig) -> Self {
        let unit = |p: f32| if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let (reset_min, reset_max) = if config.reset_min <= config.reset_max {
            (config.reset_min, config.reset_max)
        } else {
            (config.reset_max, config.reset_min)
        };
        Self {
            delta: config.per_value_delta_percent.max(0.0),
            reset_chance: unit(config.random_mutation_chance),
            reset_frac_max: unit(config.reset_frac_max),
            reset_min,
            reset_max,
            scope: config.scope,
            rng: GenomeRng::from_config_seed(config.random_seed),
            seen: HashSet::new(),
            before: Vec::new(),
        }
    }

    /// Overwrite a random set of unique genes with uniform values in
    /// `[min, max]`. At least one gene is always reset. Returns the count.
    pub fn reset_genes(
        rng: &mut GenomeRng,
        seen: &mut HashSet<usize>,
        genes: &mut [f32],
        frac_max: f32,
        min: f32,
        max: f32,
    ) -> usize {
        let count = genes.len();
        if count == 0 {
            return 0;
        }
        let upper = (frac_max * count as f32).floor() as usize;
        let k = if upper == 0 {
            1
        } else {
            (rng.next_range(0, upper.min(i32::MAX as usize) as i32) as usize).clamp(1, count)
        };

        seen.clear();
        while seen.len() < k {
            let index = rng.next_index(count);
            if seen.insert(index) {
                genes[index] = lerp(min, max, rng.next_u01());
            }
        }
        k
    }

    fn mutate_genes(&mut self, genes: &mut [f32]) -> Mutated {
        self.before.clear();
        self.before.extend_from_slice(genes);

        for gene in genes.iter_mut() {
            let u = (self.rng.next_u01() * 2.0 - 1.0) * self.delta;
            *gene *= 1.0 + u;
        }

        let reset = self.rng.next_u01() < self.reset_chance;
        if reset {
            Self::reset_genes(
                &mut self.rng,
                &mut self.seen,
                genes,
                self.reset_frac_max,
                self.reset_min,
                self.reset_max,
            );
        }

        let genes_changed = genes
            .iter()
            .zip(&self.before)
            .filter(|(now, was)| now.to_bits() != was.to_bits())
            .count();
        Mutated {
            genes_changed,
            reset,
        }
    }
}

impl Mutator for RealMutator {
    type Kind = RealGenes;

    fn mutate(&mut self, population: &mut Population) -> MutationReport {
        let scope = self.scope;
        mutate_with::<RealGenes, _>(population, scope, "RealMutator", |genes| {
            self.mutate_genes(genes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Genome;
    use proptest::prelude::*;

    fn count_ones(genes: &[u8]) -> u32 {
        genes.iter().map(|b| b.count_ones()).sum()
    }

    #[test]
    fn test_flip_extremes() {
        let mut rng = GenomeRng::new(1);
        let mut genes = vec![0b1010_0101; 16];
        assert_eq!(BitFlipMutator::flip_bits(&mut rng, &mut genes, 0.0), 0);
        assert_eq!(genes, vec![0b1010_0101; 16]);

        assert_eq!(BitFlipMutator::flip_bits(&mut rng, &mut genes, 1.0), 128);
        assert_eq!(genes, vec![0b0101_1010; 16]);

        assert_eq!(BitFlipMutator::flip_bits(&mut rng, &mut [], 0.5), 0);
    }

    #[test]
    fn test_flip_rate_matches_probability() {
        let mut rng = GenomeRng::new(2024);
        let mut genes = vec![0u8; 8192];
        let flipped = BitFlipMutator::flip_bits(&mut rng, &mut genes, 0.2);
        // Starting from zero, every flip sets a distinct bit.
        assert_eq!(flipped as u32, count_ones(&genes));
        let rate = flipped as f64 / (8192.0 * 8.0);
        assert!((0.19..0.21).contains(&rate), "rate {}", rate);
    }

    #[test]
    fn test_flip_scope() {
        let mut population = Population::from_genomes(vec![Genome::Bytes(vec![0; 64]); 3]);
        population.set_replace_flag(IndividualId(1), true);

        let mut mutator = BitFlipMutator::new(BitFlipConfig {
            bit_flip_probability: 1.0,
            scope: MutationScope::Flagged,
            random_seed: 4,
        });
        let report = mutator.mutate(&mut population);
        assert_eq!(report.mutated, 1);
        assert_eq!(report.genes_changed, 512);
        assert_eq!(population.genome(IndividualId(0)), Some(&Genome::Bytes(vec![0; 64])));
        assert_eq!(population.genome(IndividualId(1)), Some(&Genome::Bytes(vec![0xFF; 64])));

        let mut everyone = BitFlipMutator::new(BitFlipConfig {
            bit_flip_probability: 1.0,
            scope: MutationScope::All,
            random_seed: 4,
        });
        assert_eq!(everyone.mutate(&mut population).mutated, 3);
    }

    #[test]
    fn test_degenerate_and_foreign_genomes() {
        let mut population = Population::from_genomes([
            Genome::Bytes(vec![]),
            Genome::Real(vec![0.5; 4]),
            Genome::Bytes(vec![0; 4]),
        ]);
        let mut mutator = BitFlipMutator::new(BitFlipConfig {
            bit_flip_probability: 0.5,
            scope: MutationScope::All,
            random_seed: 9,
        });
        let report = mutator.mutate(&mut population);
        assert_eq!(report.mutated, 1);
        assert_eq!(
            report.anomalies,
            vec![Anomaly::DegenerateGenome {
                individual: IndividualId(0)
            }]
        );
        assert_eq!(population.genome(IndividualId(1)), Some(&Genome::Real(vec![0.5; 4])));
    }

    #[test]
    fn test_real_noise_bounded() {
        let mut population = Population::from_genomes([Genome::Real(vec![0.5; 200])]);
        population.set_replace_flag(IndividualId(0), true);

        let mut mutator = RealMutator::new(RealMutationConfig {
            per_value_delta_percent: 0.1,
            random_mutation_chance: 0.0,
            random_seed: 6,
            ..Default::default()
        });
        let report = mutator.mutate(&mut population);
        assert_eq!(report.mutated, 1);
        assert_eq!(report.resets, 0);

        let genes = population.genome(IndividualId(0)).and_then(Genome::as_real).unwrap();
        assert!(genes.iter().all(|&g| (0.45..=0.55).contains(&g)));
        let changed = genes.iter().filter(|&&g| g != 0.5).count();
        assert!(changed > 190, "changed {}", changed);
        assert_eq!(report.genes_changed, changed);
    }

    #[test]
    fn test_real_counts_only_changed_genes() {
        let mut population = Population::from_genomes([
            Genome::Real(vec![0.5; 50]),
            Genome::Real(vec![0.0; 50]),
        ]);
        let mut still = RealMutator::new(RealMutationConfig {
            per_value_delta_percent: 0.0,
            random_mutation_chance: 0.0,
            scope: MutationScope::All,
            random_seed: 8,
            ..Default::default()
        });
        let report = still.mutate(&mut population);
        assert_eq!(report.mutated, 2);
        assert_eq!(report.genes_changed, 0);

        // Noise cannot move a zero gene.
        let mut noisy = RealMutator::new(RealMutationConfig {
            per_value_delta_percent: 0.5,
            random_mutation_chance: 0.0,
            scope: MutationScope::All,
            random_seed: 8,
            ..Default::default()
        });
        let report = noisy.mutate(&mut population);
        let moved = population
            .genome(IndividualId(0))
            .and_then(Genome::as_real)
            .unwrap()
            .iter()
            .filter(|&&g| g != 0.5)
            .count();
        assert_eq!(report.genes_changed, moved);
        assert_eq!(population.genome(IndividualId(1)), Some(&Genome::Real(vec![0.0; 50])));
    }

    #[test]
    fn test_real_default_scope_skips_unflagged() {
        let mut population = Population::from_genomes([Genome::Real(vec![0.5; 8])]);
        let mut mutator = RealMutator::new(RealMutationConfig {
            random_seed: 6,
            ..Default::default()
        });
        assert_eq!(mutator.mutate(&mut population).mutated, 0);
        assert_eq!(population.genome(IndividualId(0)), Some(&Genome::Real(vec![0.5; 8])));
    }

    #[test]
    fn test_reset_at_least_one_gene() {
        let mut rng = GenomeRng::new(12);
        let mut seen = HashSet::new();
        let mut genes = vec![10.0f32; 3];
        // floor(0.2 * 3) == 0 still resets one gene.
        let k = RealMutator::reset_genes(&mut rng, &mut seen, &mut genes, 0.2, -1.0, 1.0);
        assert_eq!(k, 1);
        assert_eq!(genes.iter().filter(|&&g| g != 10.0).count(), 1);
    }

    #[test]
    fn test_inverted_reset_bounds() {
        let mut population = Population::from_genomes([Genome::Real(vec![10.0; 20])]);
        let mut mutator = RealMutator::new(RealMutationConfig {
            per_value_delta_percent: 0.0,
            random_mutation_chance: 1.0,
            reset_frac_max: 1.0,
            reset_min: 2.0,
            reset_max: -2.0,
            scope: MutationScope::All,
            random_seed: 31,
        });
        let report = mutator.mutate(&mut population);
        assert_eq!(report.resets, 1);
        let genes = population.genome(IndividualId(0)).and_then(Genome::as_real).unwrap();
        for &g in genes {
            assert!(g == 10.0 || (-2.0..=2.0).contains(&g));
        }
        assert!(genes.iter().any(|&g| g != 10.0));
    }

    proptest! {
        #[test]
        fn prop_reset_indices_unique(
            count in 1usize..64,
            frac in 0.0f32..=1.0,
            seed in 1u64..u64::MAX,
        ) {
            let mut rng = GenomeRng::new(seed);
            let mut seen = HashSet::new();
            let mut genes = vec![10.0f32; count];
            let k = RealMutator::reset_genes(&mut rng, &mut seen, &mut genes, frac, -1.0, 1.0);

            let upper = ((frac * count as f32).floor() as usize).max(1);
            prop_assert!(k >= 1 && k <= upper.min(count));
            prop_assert_eq!(genes.iter().filter(|&&g| g != 10.0).count(), k);
        }

        #[test]
        fn prop_flip_count_matches_changed_bits(
            genes in proptest::collection::vec(any::<u8>(), 0..256),
            p in 0.0f32..0.5,
            seed in 1u64..u64::MAX,
        ) {
            let mut mutated = genes.clone();
            let flipped = BitFlipMutator::flip_bits(&mut GenomeRng::new(seed), &mut mutated, p);
            let diff: u32 = genes.iter().zip(&mutated).map(|(a, b)| (a ^ b).count_ones()).sum();
            prop_assert_eq!(diff as usize, flipped);
        }
    }
}
