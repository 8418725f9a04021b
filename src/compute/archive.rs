//! Persistent per-objective elite archive.
//!
//! Each objective that ever had a candidate owns exactly `elite_count` slots.
//! Every update ranks the fresh candidates together with the genomes already
//! held, so a slot is only ever replaced by a better genome.

use std::cmp::Ordering;
use std::marker::PhantomData;

use log::debug;

use crate::schema::{EliteConfig, IndividualId, Population};

use super::bucket::{BucketEntry, ObjectiveBuckets, entry_order, fitness_order};
use super::genome::{ByteGenes, GenomeKind, RealGenes};
use super::report::EliteReport;

/// One archived genome.
#[derive(Debug, Clone, PartialEq)]
pub struct EliteSlot<G> {
    pub genome: Vec<G>,
    /// `None` until the slot is first written.
    pub fitness: Option<f32>,
    /// Individual the genome was copied from.
    pub source: Option<IndividualId>,
    /// Generation of the last write.
    pub generation: u64,
}

impl<G> Default for EliteSlot<G> {
    fn default() -> Self {
        Self {
            genome: Vec::new(),
            fitness: None,
            source: None,
            generation: 0,
        }
    }
}

impl<G> EliteSlot<G> {
    pub fn is_filled(&self) -> bool {
        self.fitness.is_some()
    }
}

/// A genome competing for a slot: one already archived or a fresh candidate.
#[derive(Debug, Clone, Copy)]
enum Contender {
    Held { slot: usize, value: f32 },
    Fresh(BucketEntry),
}

impl Contender {
    fn value(&self) -> f32 {
        match self {
            Contender::Held { value, .. } => *value,
            Contender::Fresh(entry) => entry.value,
        }
    }
}

/// Better score first. Held genomes win ties against fresh candidates.
fn contender_order(a: &Contender, b: &Contender, higher_is_better: bool) -> Ordering {
    fitness_order(a.value(), b.value(), higher_is_better).then_with(|| match (a, b) {
        (Contender::Held { slot: x, .. }, Contender::Held { slot: y, .. }) => x.cmp(y),
        (Contender::Held { .. }, Contender::Fresh(_)) => Ordering::Less,
        (Contender::Fresh(_), Contender::Held { .. }) => Ordering::Greater,
        (Contender::Fresh(x), Contender::Fresh(y)) => entry_order(x, y, higher_is_better),
    })
}

/// Elite archive over one genome kind.
#[derive(Debug)]
pub struct EliteArchive<K: GenomeKind> {
    elite_count: usize,
    higher_is_better: bool,
    /// Indexed by objective; empty for objectives never seen.
    slots: Vec<Vec<EliteSlot<K::Gene>>>,
    buckets: ObjectiveBuckets,
    contenders: Vec<Contender>,
    _kind: PhantomData<K>,
}

pub type ByteEliteArchive = EliteArchive<ByteGenes>;
pub type RealEliteArchive = EliteArchive<RealGenes>;

impl<K: GenomeKind> EliteArchive<K> {
    pub fn new(config: EliteConfig, higher_is_better: bool) -> Self {
        Self {
            elite_count: config.elite_count.max(1),
            higher_is_better,
            slots: Vec::new(),
            buckets: ObjectiveBuckets::new(),
            contenders: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Rank candidates per objective against the held genomes and keep the
    /// best `elite_count` in the slots.
    pub fn update(&mut self, population: &Population, generation: u64) -> EliteReport {
        let Self {
            elite_count,
            higher_is_better,
            slots,
            buckets,
            contenders,
            ..
        } = self;

        buckets.fill(population, K::is_candidate);
        let mut report = EliteReport {
            candidates: buckets.global().len(),
            ..Default::default()
        };

        for objective in 0..buckets.objective_count() {
            let bucket = buckets.objective(objective);
            if bucket.is_empty() {
                continue;
            }
            if slots.len() <= objective {
                slots.resize_with(objective + 1, Vec::new);
            }
            let objective_slots = &mut slots[objective];
            objective_slots.resize_with(*elite_count, EliteSlot::default);

            contenders.clear();
            contenders.extend(objective_slots.iter().enumerate().filter_map(|(slot, held)| {
                held.fitness.map(|value| Contender::Held { slot, value })
            }));
            contenders.extend(bucket.iter().copied().map(Contender::Fresh));
            contenders.sort_by(|a, b| contender_order(a, b, *higher_is_better));
            contenders.truncate(*elite_count);

            let mut previous = std::mem::take(objective_slots);
            for contender in contenders.iter() {
                let slot = match *contender {
                    Contender::Held { slot, .. } => std::mem::take(&mut previous[slot]),
                    Contender::Fresh(entry) => {
                        let Some(individual) = population.get(entry.id) else {
                            continue;
                        };
                        let mut slot = EliteSlot::default();
                        K::copy_genome(individual, &mut slot.genome);
                        slot.fitness = Some(entry.value);
                        slot.source = Some(entry.id);
                        slot.generation = generation;
                        report.slots_written += 1;
                        slot
                    }
                };
                objective_slots.push(slot);
            }
            objective_slots.resize_with(*elite_count, EliteSlot::default);
            report.objectives_updated += 1;
        }

        debug!(
            "EliteArchive<{}>: {} candidates, {} objectives, {} slots written",
            K::NAME,
            report.candidates,
            report.objectives_updated,
            report.slots_written
        );
        report
    }

    pub fn elite_count(&self) -> usize {
        self.elite_count
    }

    /// Objectives that own slots, ascending.
    pub fn objectives(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slots)| !slots.is_empty())
            .map(|(objective, _)| objective)
    }

    /// Slots of `objective`, best first.
    pub fn slots(&self, objective: usize) -> &[EliteSlot<K::Gene>] {
        self.slots.get(objective).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Best filled slot of `objective`.
    pub fn best(&self, objective: usize) -> Option<&EliteSlot<K::Gene>> {
        self.slots(objective)
            .iter()
            .filter_map(|slot| slot.fitness.map(|fitness| (slot, fitness)))
            .min_by(|a, b| fitness_order(a.1, b.1, self.higher_is_better))
            .map(|(slot, _)| slot)
    }

    /// Number of objectives that own slots.
    pub fn len(&self) -> usize {
        self.objectives().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
