//! Target-matching fitness functions and parallel population evaluation.
//!
//! The pipeline never scores genomes itself. These helpers serve the demo
//! binary, tests, and benchmarks.

use rayon::prelude::*;

use crate::schema::{Genome, Population};

/// Number of bits that agree between `genes` and `target`, squared.
/// Only the overlapping prefix is compared.
pub fn bit_match_squared(genes: &[u8], target: &[u8]) -> f32 {
    let matching: u32 = genes
        .iter()
        .zip(target)
        .map(|(g, t)| 8 - (g ^ t).count_ones())
        .sum();
    (matching as f32).powi(2)
}

/// Highest score [`bit_match_squared`] can give for `target`.
pub fn bit_match_max(target: &[u8]) -> f32 {
    ((target.len() * 8) as f32).powi(2)
}

/// Negated sum of squared errors over the overlapping prefix.
pub fn negative_sse(genes: &[f32], target: &[f32]) -> f32 {
    -genes
        .iter()
        .zip(target)
        .map(|(g, t)| (g - t) * (g - t))
        .sum::<f32>()
}

/// Root mean squared error over the overlapping prefix; 0 when empty.
pub fn rmse(genes: &[f32], target: &[f32]) -> f32 {
    let n = genes.len().min(target.len());
    if n == 0 {
        return 0.0;
    }
    (-negative_sse(genes, target) / n as f32).sqrt()
}

/// Score every individual that has a genome, in parallel. Individuals
/// without a genome keep their previous fitness; objective tags are untouched.
pub fn evaluate_population<F>(population: &mut Population, fitness: F)
where
    F: Fn(&Genome) -> Vec<f32> + Sync,
{
    population
        .individuals_mut()
        .par_iter_mut()
        .for_each(|individual| {
            if let Some(genome) = &individual.genome {
                individual.fitness = fitness(genome);
            }
        });
}
