//! Crossover operators: uniform byte crossover and simulated binary crossover.
//!
//! Breeding pairs are matched one-to-one against the flagged stream of the
//! operator's genome kind. Every child is computed from the parents' current
//! genes before any child is written back, so a flagged individual can still
//! serve as a parent in the same pass.

use log::{debug, warn};

use crate::schema::{
    BreedingPair, ByteCrossoverConfig, IndividualId, Population, RealCrossoverConfig,
};

use super::genome::{ByteGenes, GenomeKind, GenomeRng, RealGenes};
use super::report::{Anomaly, CrossoverReport};

/// Breeds flagged individuals from selected parent pairs.
pub trait Crossover {
    type Kind: GenomeKind;

    /// Overwrite flagged genomes with children of `pairs`. Pairs are not
    /// consumed; destroying them is the janitor's job.
    fn breed(&mut self, population: &mut Population, pairs: &[BreedingPair]) -> CrossoverReport;
}

/// Shared pair/child matching. `cross` fills `child[..n]` from `a[..n]` and `b[..n]`.
fn breed_with<K, F>(
    population: &mut Population,
    pairs: &[BreedingPair],
    stage: &str,
    mut cross: F,
) -> CrossoverReport
where
    K: GenomeKind,
    F: FnMut(&[K::Gene], &[K::Gene], &mut [K::Gene]),
{
    let mut report = CrossoverReport::default();
    let flagged = population.flagged_ids_where(K::holds);

    let overlap = flagged.len().min(pairs.len());
    if pairs.len() < flagged.len() {
        let missing = flagged.len() - pairs.len();
        warn!("{}: {} pairs for {} flagged individuals", stage, pairs.len(), flagged.len());
        report.anomalies.push(Anomaly::PairShortfall {
            processed: overlap,
            missing,
        });
    } else if pairs.len() > flagged.len() {
        let unused = pairs.len() - flagged.len();
        warn!("{}: {} pairs left unused", stage, unused);
        report.anomalies.push(Anomaly::PairSurplus { unused });
    }
    report.pairs_consumed = overlap;

    let genes_of = |population: &Population, id: IndividualId| -> Option<Vec<K::Gene>> {
        population
            .genome(id)
            .and_then(|genome| K::genes(genome))
            .map(<[K::Gene]>::to_vec)
    };

    let mut children: Vec<(IndividualId, Vec<K::Gene>)> = Vec::with_capacity(overlap);
    for (&child_id, pair) in flagged.iter().zip(pairs) {
        let parent_a = population.genome(pair.parent_a).and_then(|genome| K::genes(genome));
        let parent_b = population.genome(pair.parent_b).and_then(|genome| K::genes(genome));

        let (a, b) = match (parent_a, parent_b) {
            (Some(a), Some(b)) => (a, b),
            (None, _) | (_, None) => {
                let individual = if parent_a.is_none() {
                    pair.parent_a
                } else {
                    pair.parent_b
                };
                warn!("{}: parent {} has no {} genome", stage, individual, K::NAME);
                report.anomalies.push(Anomaly::MissingGenome {
                    individual,
                    kind: K::NAME,
                });
                continue;
            }
        };

        let Some(mut child) = genes_of(&*population, child_id) else {
            continue;
        };
        let n = a.len().min(b.len()).min(child.len());
        if n == 0 {
            warn!("{}: zero-length genome while breeding {}", stage, child_id);
            report
                .anomalies
                .push(Anomaly::DegenerateGenome { individual: child_id });
            continue;
        }

        cross(&a[..n], &b[..n], &mut child[..n]);
        children.push((child_id, child));
    }

    for (id, child) in children {
        if let Some(genes) = population.genome_mut(id).and_then(|genome| K::genes_mut(genome)) {
            genes.copy_from_slice(&child);
            report.bred += 1;
        }
    }

    debug!(
        "{}: bred {} of {} flagged {} individuals",
        stage,
        report.bred,
        flagged.len(),
        K::NAME
    );
    report
}

// ============================================================================
// Byte genomes
// ============================================================================

/// Uniform crossover: every child byte comes from parent A or B with equal
/// probability.
#[derive(Debug)]
pub struct ByteCrossover {
    rng: GenomeRng,
}

impl ByteCrossover {
    pub fn new(config: ByteCrossoverConfig) -> Self {
        Self {
            rng: GenomeRng::from_config_seed(config.random_seed),
        }
    }

    /// Fill `child` gene by gene from `a` or `b`. Whole words use one 32-bit
    /// mask (high 16 bits drawn first), bit `k` set selecting A; the tail uses
    /// a coin per gene.
    pub fn cross_genes(rng: &mut GenomeRng, a: &[u8], b: &[u8], child: &mut [u8]) {
        let n = a.len().min(b.len()).min(child.len());
        let words = n / 32;

        for word in 0..words {
            let hi = rng.next_range(0, 0xFFFF) as u32;
            let lo = rng.next_range(0, 0xFFFF) as u32;
            let mask = (hi << 16) | lo;
            let base = word * 32;
            for bit in 0..32 {
                let i = base + bit;
                child[i] = if (mask >> bit) & 1 == 1 { a[i] } else { b[i] };
            }
        }

        for i in words * 32..n {
            child[i] = if rng.coin() { a[i] } else { b[i] };
        }
    }
}

impl Crossover for ByteCrossover {
    type Kind = ByteGenes;

    fn breed(&mut self, population: &mut Population, pairs: &[BreedingPair]) -> CrossoverReport {
        let rng = &mut self.rng;
        breed_with::<ByteGenes, _>(population, pairs, "ByteCrossover", |a, b, child| {
            Self::cross_genes(rng, a, b, child)
        })
    }
}

// ============================================================================
// Real genomes
// ============================================================================

/// One SBX child gene from parents `x1` and `x2`.
///
/// `u` in `[0, 1)` sets the spread factor; `pick_first` chooses the child
/// nearer `x1` (true) or nearer `x2` (false). Higher `eta` keeps children
/// closer to their parents.
pub fn sbx_child(x1: f32, x2: f32, u: f32, eta: f32, pick_first: bool) -> f32 {
    let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
    let exponent = 1.0 / (eta.max(0.0) + 1.0);
    let beta = if u <= 0.5 {
        (2.0 * u).powf(exponent)
    } else {
        (1.0 / (2.0 * (1.0 - u))).powf(exponent)
    };

    let mid = lo + hi;
    let spread = beta * (hi - lo);
    let c1 = 0.5 * (mid - spread);
    let c2 = 0.5 * (mid + spread);

    let (near_first, near_second) = if x1 <= x2 { (c1, c2) } else { (c2, c1) };
    if pick_first { near_first } else { near_second }
}

/// Per-gene simulated binary crossover with optional clamping.
#[derive(Debug)]
pub struct RealCrossover {
    crossover_probability: f32,
    eta: f32,
    clamp: Option<(f32, f32)>,
    rng: GenomeRng,
}

impl RealCrossover {
    pub fn new(config: RealCrossoverConfig) -> Self {
        let probability = if config.crossover_probability.is_nan() {
            0.0
        } else {
            config.crossover_probability.clamp(0.0, 1.0)
        };
        let (lo, hi) = (
            config.clamp_min.min(config.clamp_max),
            config.clamp_min.max(config.clamp_max),
        );
        let clamp = (config.clamp_children && lo <= hi).then_some((lo, hi));

        Self {
            crossover_probability: probability,
            eta: config.eta.max(0.0),
            clamp,
            rng: GenomeRng::from_config_seed(config.random_seed),
        }
    }

    fn cross_genes(&mut self, a: &[f32], b: &[f32], child: &mut [f32]) {
        for ((c, &x1), &x2) in child.iter_mut().zip(a).zip(b) {
            let value = if self.rng.next_u01() < self.crossover_probability {
                let u = self.rng.next_u01();
                let pick_first = self.rng.coin();
                sbx_child(x1, x2, u, self.eta, pick_first)
            } else if self.rng.coin() {
                x1
            } else {
                x2
            };
            *c = match self.clamp {
                Some((lo, hi)) => value.clamp(lo, hi),
                None => value,
            };
        }
    }
}

impl Crossover for RealCrossover {
    type Kind = RealGenes;

    fn breed(&mut self, population: &mut Population, pairs: &[BreedingPair]) -> CrossoverReport {
        breed_with::<RealGenes, _>(population, pairs, "RealCrossover", |a, b, child| {
            self.cross_genes(a, b, child)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Genome, Individual};
    use proptest::prelude::*;

    fn pair(a: u32, b: u32) -> BreedingPair {
        BreedingPair {
            parent_a: IndividualId(a),
            parent_b: IndividualId(b),
        }
    }

    #[test]
    fn test_byte_child_takes_parent_genes() {
        let mut population = Population::from_genomes([
            Genome::Bytes(vec![0x00; 70]),
            Genome::Bytes(vec![0xFF; 70]),
            Genome::Bytes(vec![0x55; 70]),
        ]);
        population.set_replace_flag(IndividualId(2), true);

        let mut crossover = ByteCrossover::new(ByteCrossoverConfig { random_seed: 5 });
        let report = crossover.breed(&mut population, &[pair(0, 1)]);

        assert_eq!(report.bred, 1);
        assert_eq!(report.pairs_consumed, 1);
        assert!(report.anomalies.is_empty());
        let child = population.genome(IndividualId(2)).and_then(Genome::as_bytes).unwrap();
        assert!(child.iter().all(|&g| g == 0x00 || g == 0xFF));
        assert!(child.contains(&0x00) && child.contains(&0xFF));
    }

    #[test]
    fn test_byte_mask_bit_order() {
        // Replaying the generator shows which mask each word was built from.
        let a: Vec<u8> = vec![1; 64];
        let b: Vec<u8> = vec![2; 64];
        let mut child = vec![0; 64];
        ByteCrossover::cross_genes(&mut GenomeRng::new(77), &a, &b, &mut child);

        let mut replay = GenomeRng::new(77);
        for word in 0..2 {
            let hi = replay.next_range(0, 0xFFFF) as u32;
            let lo = replay.next_range(0, 0xFFFF) as u32;
            let mask = (hi << 16) | lo;
            for bit in 0..32 {
                let expected = if (mask >> bit) & 1 == 1 { 1 } else { 2 };
                assert_eq!(child[word * 32 + bit], expected);
            }
        }
    }

    #[test]
    fn test_genes_beyond_shortest_untouched() {
        let mut population = Population::from_genomes([
            Genome::Bytes(vec![1; 3]),
            Genome::Bytes(vec![1; 8]),
            Genome::Bytes(vec![9; 6]),
        ]);
        population.set_replace_flag(IndividualId(2), true);

        let mut crossover = ByteCrossover::new(ByteCrossoverConfig { random_seed: 1 });
        crossover.breed(&mut population, &[pair(0, 1)]);
        assert_eq!(
            population.genome(IndividualId(2)),
            Some(&Genome::Bytes(vec![1, 1, 1, 9, 9, 9]))
        );
    }

    #[test]
    fn test_children_read_parents_before_write() {
        // #0 is both a flagged child and a parent of #1.
        let mut population = Population::from_genomes([
            Genome::Bytes(vec![7; 4]),
            Genome::Bytes(vec![0; 4]),
            Genome::Bytes(vec![3; 4]),
        ]);
        population.set_replace_flag(IndividualId(0), true);
        population.set_replace_flag(IndividualId(1), true);

        let mut crossover = ByteCrossover::new(ByteCrossoverConfig { random_seed: 3 });
        crossover.breed(&mut population, &[pair(2, 2), pair(0, 0)]);
        assert_eq!(population.genome(IndividualId(0)), Some(&Genome::Bytes(vec![3; 4])));
        assert_eq!(population.genome(IndividualId(1)), Some(&Genome::Bytes(vec![7; 4])));
    }

    #[test]
    fn test_pair_count_mismatch() {
        let mut population = Population::from_genomes(vec![Genome::Bytes(vec![0; 4]); 4]);
        population.set_replace_flag(IndividualId(1), true);
        population.set_replace_flag(IndividualId(3), true);

        let mut crossover = ByteCrossover::new(ByteCrossoverConfig { random_seed: 2 });
        let short = crossover.breed(&mut population, &[pair(0, 2)]);
        assert_eq!(short.bred, 1);
        assert_eq!(
            short.anomalies,
            vec![Anomaly::PairShortfall {
                processed: 1,
                missing: 1
            }]
        );

        let surplus = crossover.breed(&mut population, &[pair(0, 2), pair(0, 2), pair(2, 0)]);
        assert_eq!(surplus.bred, 2);
        assert_eq!(surplus.anomalies, vec![Anomaly::PairSurplus { unused: 1 }]);
    }

    #[test]
    fn test_degenerate_and_missing_parents() {
        let mut population = Population::from_genomes([
            Genome::Bytes(vec![]),
            Genome::Bytes(vec![4; 4]),
            Genome::Real(vec![0.5; 4]),
            Genome::Bytes(vec![0; 4]),
            Genome::Bytes(vec![0; 4]),
        ]);
        population.push(Individual::default());
        population.set_replace_flag(IndividualId(3), true);
        population.set_replace_flag(IndividualId(4), true);

        let mut crossover = ByteCrossover::new(ByteCrossoverConfig { random_seed: 2 });
        let report = crossover.breed(&mut population, &[pair(0, 1), pair(1, 2)]);
        assert_eq!(report.bred, 0);
        assert_eq!(
            report.anomalies,
            vec![
                Anomaly::DegenerateGenome {
                    individual: IndividualId(3)
                },
                Anomaly::MissingGenome {
                    individual: IndividualId(2),
                    kind: "byte"
                },
            ]
        );
    }

    #[test]
    fn test_sbx_formula() {
        let close = |a: f32, b: f32| (a - b).abs() < 1e-6;
        // u = 0.5 gives beta = 1: children are the parents themselves.
        assert!(close(sbx_child(0.2, 0.8, 0.5, 15.0, true), 0.2));
        assert!(close(sbx_child(0.2, 0.8, 0.5, 15.0, false), 0.8));
        // Reversed parent order maps children back to their own parent.
        assert!(close(sbx_child(0.8, 0.2, 0.5, 15.0, true), 0.8));
        // u = 0 collapses both children onto the midpoint.
        assert!(close(sbx_child(-1.0, 1.0, 0.0, 2.0, true), 0.0));
        assert!(close(sbx_child(0.3, 0.3, 0.9, 5.0, false), 0.3));
    }

    #[test]
    fn test_sbx_large_eta_stays_near_parents() {
        let mut rng = GenomeRng::new(11);
        for _ in 0..1000 {
            let u = rng.next_u01();
            let near_a = sbx_child(-0.4, 0.6, u, 1e6, true);
            let near_b = sbx_child(-0.4, 0.6, u, 1e6, false);
            assert!((near_a + 0.4).abs() < 1e-3);
            assert!((near_b - 0.6).abs() < 1e-3);
        }
    }

    #[test]
    fn test_real_copy_without_crossover() {
        let mut population = Population::from_genomes([
            Genome::Real(vec![0.25; 16]),
            Genome::Real(vec![-0.75; 16]),
            Genome::Real(vec![0.0; 16]),
        ]);
        population.set_replace_flag(IndividualId(2), true);

        let mut crossover = RealCrossover::new(RealCrossoverConfig {
            crossover_probability: 0.0,
            random_seed: 8,
            ..Default::default()
        });
        let report = crossover.breed(&mut population, &[pair(0, 1)]);
        assert_eq!(report.bred, 1);
        let child = population.genome(IndividualId(2)).and_then(Genome::as_real).unwrap();
        assert!(child.iter().all(|&g| g == 0.25 || g == -0.75));
    }

    proptest! {
        #[test]
        fn prop_byte_child_genes_come_from_parents(
            a in proptest::collection::vec(any::<u8>(), 0..100),
            b in proptest::collection::vec(any::<u8>(), 0..100),
            seed in 1u64..u64::MAX,
        ) {
            let mut child = vec![0u8; a.len().max(b.len())];
            let before = child.clone();
            ByteCrossover::cross_genes(&mut GenomeRng::new(seed), &a, &b, &mut child);
            let n = a.len().min(b.len());
            for i in 0..n {
                prop_assert!(child[i] == a[i] || child[i] == b[i]);
            }
            prop_assert_eq!(&child[n..], &before[n..]);
        }

        #[test]
        fn prop_sbx_clamped_children_in_bounds(
            genes in proptest::collection::vec((-5.0f32..5.0, -5.0f32..5.0), 1..40),
            eta in 0.0f32..50.0,
            seed in 1u64..u64::MAX,
        ) {
            let (a, b): (Vec<f32>, Vec<f32>) = genes.into_iter().unzip();
            let mut child = vec![0.0; a.len()];
            let mut crossover = RealCrossover::new(RealCrossoverConfig {
                crossover_probability: 1.0,
                eta,
                clamp_children: true,
                clamp_min: -1.0,
                clamp_max: 1.0,
                random_seed: seed,
            });
            crossover.cross_genes(&a, &b, &mut child);
            prop_assert!(child.iter().all(|g| (-1.0..=1.0).contains(g)));
        }
    }
}
