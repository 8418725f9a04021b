//! Random source and genome-kind plumbing shared by every operator.
//!
//! Provides the seeded generator wrapper, random genome construction, and
//! the [`GenomeKind`] trait that lets one algorithm serve both byte and real
//! genomes.

use std::fmt;

use rand::prelude::*;

use crate::schema::{Genome, Individual, Population};

/// Random number generator wrapper for genome operations.
///
/// Operators construct one of these once and keep advancing it across
/// generations; there is no way to reseed an existing generator.
#[derive(Debug, Clone)]
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Config convention: 0 selects ambient entropy, anything else is a seed.
    pub fn from_config_seed(seed: u64) -> Self {
        if seed == 0 {
            Self::from_entropy()
        } else {
            Self::new(seed)
        }
    }

    /// Uniform float in [0, 1).
    #[inline]
    pub fn next_u01(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    /// Uniform double in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform integer in the inclusive range `[lo, hi]`. Returns `lo` when
    /// the range is empty or a single value.
    #[inline]
    pub fn next_range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            lo
        } else {
            self.rng.gen_range(lo..=hi)
        }
    }

    /// Uniform index in `[0, len)`; 0 for an empty range.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            0
        } else {
            self.rng.gen_range(0..len)
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Fair coin, drawn as an integer in `[0, 1]`.
    #[inline]
    pub fn coin(&mut self) -> bool {
        self.next_range(0, 1) == 0
    }

    /// Uniform float between `min` and `max`.
    #[inline]
    pub fn uniform(&mut self, min: f32, max: f32) -> f32 {
        lerp(min, max, self.next_u01())
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Random byte genome, every byte uniform over `0..=255`.
    pub fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.next_range(0, 255) as u8).collect()
    }

    /// Random real genome, every gene uniform over `[min, max]`.
    pub fn random_reals(&mut self, len: usize, min: f32, max: f32) -> Vec<f32> {
        (0..len).map(|_| self.uniform(min, max)).collect()
    }
}

/// Linear blend between two values.
#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Population {
    /// `size` individuals with random byte genomes of `len` genes.
    pub fn random_bytes(size: usize, len: usize, rng: &mut GenomeRng) -> Self {
        Self::from_genomes((0..size).map(|_| Genome::Bytes(rng.random_bytes(len))))
    }

    /// `size` individuals with random real genomes of `len` genes in `[min, max]`.
    pub fn random_reals(size: usize, len: usize, min: f32, max: f32, rng: &mut GenomeRng) -> Self {
        Self::from_genomes((0..size).map(|_| Genome::Real(rng.random_reals(len, min, max))))
    }
}

/// A genome representation the pipeline can operate on.
///
/// Selection, elitism, and cleanup are written once against this trait; the
/// two implementations only say how to reach the gene buffer.
pub trait GenomeKind: Send + Sync + 'static {
    type Gene: Copy + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Human-readable name used in log messages.
    const NAME: &'static str;

    fn genes(genome: &Genome) -> Option<&[Self::Gene]>;

    fn genes_mut(genome: &mut Genome) -> Option<&mut [Self::Gene]>;

    /// Wrap a gene buffer back into a [`Genome`].
    fn wrap(genes: Vec<Self::Gene>) -> Genome;

    /// Individual carries a genome of this kind.
    fn holds(individual: &Individual) -> bool {
        individual
            .genome
            .as_ref()
            .and_then(|genome| Self::genes(genome))
            .is_some()
    }

    /// Individual has a genome of this kind and at least one fitness score.
    fn is_rated(individual: &Individual) -> bool {
        !individual.fitness.is_empty() && Self::holds(individual)
    }

    /// Individual may enter the elite archive. Elite copies are excluded so
    /// the archive never feeds on itself.
    fn is_candidate(individual: &Individual) -> bool {
        !individual.elite && Self::is_rated(individual)
    }

    /// Copy the individual's genes into `dest`, reusing its allocation.
    fn copy_genome(source: &Individual, dest: &mut Vec<Self::Gene>) {
        dest.clear();
        if let Some(genes) = source.genome.as_ref().and_then(|genome| Self::genes(genome)) {
            dest.extend_from_slice(genes);
        }
    }
}

/// Fixed-length byte genomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteGenes;

impl GenomeKind for ByteGenes {
    type Gene = u8;
    const NAME: &'static str = "byte";

    fn genes(genome: &Genome) -> Option<&[u8]> {
        genome.as_bytes()
    }

    fn genes_mut(genome: &mut Genome) -> Option<&mut [u8]> {
        genome.as_bytes_mut()
    }

    fn wrap(genes: Vec<u8>) -> Genome {
        Genome::Bytes(genes)
    }
}

/// Fixed-length real-valued genomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealGenes;

impl GenomeKind for RealGenes {
    type Gene = f32;
    const NAME: &'static str = "real";

    fn genes(genome: &Genome) -> Option<&[f32]> {
        genome.as_real()
    }

    fn genes_mut(genome: &mut Genome) -> Option<&mut [f32]> {
        genome.as_real_mut()
    }

    fn wrap(genes: Vec<f32>) -> Genome {
        Genome::Real(genes)
    }
}
