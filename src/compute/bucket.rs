//! Objective bucketing and stable fitness ranking shared by selection and elitism.

use std::cmp::Ordering;

use crate::schema::{Individual, IndividualId, Population};

/// One individual's score inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketEntry {
    pub value: f32,
    /// Position in the bucketing stream; lower wins ties.
    pub order: u32,
    pub id: IndividualId,
}

/// Rated individuals grouped per objective, plus one global bucket.
///
/// Bucket `d` holds every accepted individual whose fitness vector has a
/// slot `d`, valued by that slot. The global bucket holds each accepted
/// individual once, valued by [`Individual::primary_fitness`]. Buffers are
/// kept between fills.
#[derive(Debug, Default)]
pub struct ObjectiveBuckets {
    per_objective: Vec<Vec<BucketEntry>>,
    global: Vec<BucketEntry>,
    dims: usize,
}

impl ObjectiveBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-bucket `population`, keeping only individuals `accept` returns true for.
    pub fn fill<F>(&mut self, population: &Population, accept: F)
    where
        F: Fn(&Individual) -> bool,
    {
        for bucket in &mut self.per_objective {
            bucket.clear();
        }
        self.global.clear();
        self.dims = 0;

        let mut order = 0u32;
        for (id, individual) in population.iter() {
            if !accept(individual) {
                continue;
            }
            let Some(primary) = individual.primary_fitness() else {
                continue;
            };

            let dims = individual.fitness.len();
            if self.per_objective.len() < dims {
                self.per_objective.resize_with(dims, Vec::new);
            }
            self.dims = self.dims.max(dims);

            for (objective, &value) in individual.fitness.iter().enumerate() {
                self.per_objective[objective].push(BucketEntry { value, order, id });
            }
            self.global.push(BucketEntry {
                value: primary,
                order,
                id,
            });
            order += 1;
        }
    }

    /// Number of objectives seen in the last fill.
    pub fn objective_count(&self) -> usize {
        self.dims
    }

    /// Bucket for `objective`; empty when no individual scored it.
    pub fn objective(&self, objective: usize) -> &[BucketEntry] {
        if objective < self.dims {
            &self.per_objective[objective]
        } else {
            &[]
        }
    }

    pub fn global(&self) -> &[BucketEntry] {
        &self.global
    }
}

/// Order two scores so the better one comes first. NaN always sorts last.
pub fn fitness_order(a: f32, b: f32, higher_is_better: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if higher_is_better { ord.reverse() } else { ord }
        }
    }
}

/// Full ranking order: score, then stream order, then handle.
pub fn entry_order(a: &BucketEntry, b: &BucketEntry, higher_is_better: bool) -> Ordering {
    fitness_order(a.value, b.value, higher_is_better)
        .then(a.order.cmp(&b.order))
        .then(a.id.cmp(&b.id))
}
