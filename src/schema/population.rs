//! Population store: individuals, their genomes, fitness, and per-generation flags.
//!
//! Individuals are addressed by [`IndividualId`], an index into the store.
//! Ascending index is the stream order every operator iterates in and the
//! universal tie-break for ranking.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable handle of an individual inside a [`Population`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub u32);

impl IndividualId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fixed-length genome. The representation is chosen when the individual
/// is created and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Genome {
    Bytes(Vec<u8>),
    Real(Vec<f32>),
}

impl Genome {
    /// Number of genes.
    pub fn len(&self) -> usize {
        match self {
            Genome::Bytes(genes) => genes.len(),
            Genome::Real(genes) => genes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Genome::Bytes(genes) => Some(genes),
            Genome::Real(_) => None,
        }
    }

    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Genome::Bytes(genes) => Some(genes),
            Genome::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<&[f32]> {
        match self {
            Genome::Real(genes) => Some(genes),
            Genome::Bytes(_) => None,
        }
    }

    pub fn as_real_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Genome::Real(genes) => Some(genes),
            Genome::Bytes(_) => None,
        }
    }

    fn same_shape(&self, other: &Genome) -> bool {
        matches!(
            (self, other),
            (Genome::Bytes(_), Genome::Bytes(_)) | (Genome::Real(_), Genome::Real(_))
        ) && self.len() == other.len()
    }
}

/// One member of the population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// `None` when the individual carries no genome at all.
    pub genome: Option<Genome>,
    /// One score per tracked objective.
    pub fitness: Vec<f32>,
    /// Objective this individual was built for.
    pub objective: Option<usize>,
    /// Genome will be overwritten by breeding this generation.
    pub replace: bool,
    /// Individual is itself an elite copy; never an archive candidate.
    pub elite: bool,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome: Some(genome),
            ..Default::default()
        }
    }

    /// Score used when this individual competes outside a specific objective:
    /// its own objective's slot when that is valid, otherwise slot 0.
    pub fn primary_fitness(&self) -> Option<f32> {
        self.objective
            .and_then(|objective| self.fitness.get(objective))
            .or_else(|| self.fitness.first())
            .copied()
    }
}

/// Parents chosen by selection for one flagged individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingPair {
    pub parent_a: IndividualId,
    pub parent_b: IndividualId,
}

/// Ordered store of individuals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a population from genomes, in stream order.
    pub fn from_genomes<I: IntoIterator<Item = Genome>>(genomes: I) -> Self {
        Self {
            individuals: genomes.into_iter().map(Individual::new).collect(),
        }
    }

    /// Append an individual and return its handle.
    pub fn push(&mut self, individual: Individual) -> IndividualId {
        let id = IndividualId(self.individuals.len() as u32);
        self.individuals.push(individual);
        id
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn get(&self, id: IndividualId) -> Option<&Individual> {
        self.individuals.get(id.index())
    }

    pub fn get_mut(&mut self, id: IndividualId) -> Option<&mut Individual> {
        self.individuals.get_mut(id.index())
    }

    /// Iterate `(handle, individual)` in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (IndividualId, &Individual)> {
        self.individuals
            .iter()
            .enumerate()
            .map(|(i, ind)| (IndividualId(i as u32), ind))
    }

    pub fn ids(&self) -> impl Iterator<Item = IndividualId> + '_ {
        (0..self.individuals.len()).map(|i| IndividualId(i as u32))
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn genome(&self, id: IndividualId) -> Option<&Genome> {
        self.get(id).and_then(|ind| ind.genome.as_ref())
    }

    pub fn genome_mut(&mut self, id: IndividualId) -> Option<&mut Genome> {
        self.get_mut(id).and_then(|ind| ind.genome.as_mut())
    }

    /// Replace a genome's contents. Refuses to change representation or
    /// length; an individual without a genome may receive one.
    pub fn set_genome(&mut self, id: IndividualId, genome: Genome) -> bool {
        let Some(individual) = self.get_mut(id) else {
            return false;
        };
        match &individual.genome {
            Some(current) if !current.same_shape(&genome) => false,
            _ => {
                individual.genome = Some(genome);
                true
            }
        }
    }

    pub fn fitness(&self, id: IndividualId) -> Option<&[f32]> {
        self.get(id).map(|ind| ind.fitness.as_slice())
    }

    pub fn set_fitness(&mut self, id: IndividualId, fitness: Vec<f32>) -> bool {
        match self.get_mut(id) {
            Some(individual) => {
                individual.fitness = fitness;
                true
            }
            None => false,
        }
    }

    pub fn set_objective(&mut self, id: IndividualId, objective: Option<usize>) -> bool {
        match self.get_mut(id) {
            Some(individual) => {
                individual.objective = objective;
                true
            }
            None => false,
        }
    }

    pub fn set_replace_flag(&mut self, id: IndividualId, replace: bool) -> bool {
        match self.get_mut(id) {
            Some(individual) => {
                individual.replace = replace;
                true
            }
            None => false,
        }
    }

    pub fn set_elite_tag(&mut self, id: IndividualId, elite: bool) -> bool {
        match self.get_mut(id) {
            Some(individual) => {
                individual.elite = elite;
                true
            }
            None => false,
        }
    }

    /// Handles of every flagged individual, in stream order.
    pub fn flagged_ids(&self) -> Vec<IndividualId> {
        self.flagged_ids_where(|_| true)
    }

    /// Flagged individuals accepted by `filter`, in stream order. Selection
    /// and crossover both derive their flagged stream from this function.
    pub fn flagged_ids_where<F>(&self, filter: F) -> Vec<IndividualId>
    where
        F: Fn(&Individual) -> bool,
    {
        self.iter()
            .filter(|(_, ind)| ind.replace && filter(ind))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn flagged_count(&self) -> usize {
        self.individuals.iter().filter(|ind| ind.replace).count()
    }

    /// Flag the worst `fraction` of individuals that have a score for
    /// `objective`. Ties: the later individual in stream order is flagged first.
    /// Returns the number of newly flagged individuals.
    pub fn flag_worst(&mut self, fraction: f32, objective: usize, higher_is_better: bool) -> usize {
        let mut rated: Vec<(usize, f32)> = self
            .individuals
            .iter()
            .enumerate()
            .filter_map(|(i, ind)| ind.fitness.get(objective).map(|&f| (i, f)))
            .collect();

        let count = ((rated.len() as f32) * fraction.clamp(0.0, 1.0)).floor() as usize;
        if count == 0 {
            return 0;
        }

        // Worst first.
        rated.sort_by(|a, b| worse_first(a.1, b.1, higher_is_better).then(b.0.cmp(&a.0)));

        let mut flagged = 0;
        for &(i, _) in rated.iter().take(count) {
            if !self.individuals[i].replace {
                self.individuals[i].replace = true;
                flagged += 1;
            }
        }
        flagged
    }
}

/// Ordering that places the worse score first. NaN is worse than anything.
fn worse_first(a: f32, b: f32, higher_is_better: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if higher_is_better { ord } else { ord.reverse() }
        }
    }
}
