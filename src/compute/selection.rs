//! Tournament selection: one breeding pair per flagged individual.

use log::{debug, warn};

use crate::schema::{BreedingPair, IndividualId, Population, SelectionConfig};

use super::bucket::{BucketEntry, ObjectiveBuckets, entry_order};
use super::genome::{GenomeKind, GenomeRng};
use super::report::{Anomaly, SelectionReport};

/// Tournament selector with per-objective buckets and cross-group sampling.
///
/// For every flagged individual the two parents are drawn independently:
/// each comes from the global bucket with probability
/// `cross_group_parent_chance`, otherwise from the bucket of the
/// individual's own objective (falling back to global when that bucket is
/// empty or the individual has no objective).
#[derive(Debug)]
pub struct TournamentSelector {
    config: SelectionConfig,
    higher_is_better: bool,
    rng: GenomeRng,
    buckets: ObjectiveBuckets,
    pool: Vec<usize>,
    entrants: Vec<usize>,
}

impl TournamentSelector {
    pub fn new(config: SelectionConfig, higher_is_better: bool) -> Self {
        let rng = GenomeRng::from_config_seed(config.random_seed);
        let config = SelectionConfig {
            tournament_size: config.tournament_size.max(2),
            selection_pressure: sanitize_probability(config.selection_pressure),
            cross_group_parent_chance: sanitize_probability(config.cross_group_parent_chance),
            ..config
        };
        Self {
            config,
            higher_is_better,
            rng,
            buckets: ObjectiveBuckets::new(),
            pool: Vec::new(),
            entrants: Vec::new(),
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Emit one pair per flagged individual holding a `K` genome, in stream
    /// order. Starved individuals get no pair and are reported.
    pub fn select<K: GenomeKind>(
        &mut self,
        population: &Population,
    ) -> (Vec<BreedingPair>, SelectionReport) {
        let mut report = SelectionReport::default();

        for (id, individual) in population.iter() {
            if individual.replace && individual.genome.is_none() {
                warn!("TournamentSelector: flagged individual {} has no genome", id);
                report.anomalies.push(Anomaly::MissingGenome {
                    individual: id,
                    kind: K::NAME,
                });
            }
        }

        let flagged = population.flagged_ids_where(K::holds);
        report.flagged = flagged.len();
        if flagged.is_empty() {
            return (Vec::new(), report);
        }

        self.buckets.fill(population, K::is_rated);

        let mut pairs = Vec::with_capacity(flagged.len());
        for id in flagged {
            let objective = population.get(id).and_then(|ind| ind.objective);
            let parent_a = self.pick_parent(objective);
            let parent_b = self.pick_parent(objective);

            match (parent_a, parent_b) {
                (Some(parent_a), Some(parent_b)) => {
                    pairs.push(BreedingPair { parent_a, parent_b });
                }
                _ => {
                    warn!("TournamentSelector: no parent candidates for {}", id);
                    report.anomalies.push(Anomaly::Starvation { individual: id });
                }
            }
        }

        report.pairs_emitted = pairs.len();
        debug!(
            "TournamentSelector: {} pairs for {} flagged {} individuals",
            report.pairs_emitted,
            report.flagged,
            K::NAME
        );
        (pairs, report)
    }

    /// Choose a bucket for one parent slot and run a tournament in it.
    fn pick_parent(&mut self, objective: Option<usize>) -> Option<IndividualId> {
        let Self {
            config,
            higher_is_better,
            rng,
            buckets,
            pool,
            entrants,
        } = self;

        let cross_group = config.cross_group_parent_chance > 0.0
            && rng.next_u01() < config.cross_group_parent_chance;

        let bucket = match objective {
            Some(objective) if !cross_group && !buckets.objective(objective).is_empty() => {
                buckets.objective(objective)
            }
            _ => buckets.global(),
        };

        let mut tournament = Tournament {
            rng,
            pool,
            entrants,
            size: config.tournament_size,
            with_replacement: config.with_replacement,
            pressure: config.selection_pressure,
            higher_is_better: *higher_is_better,
        };
        tournament.run(bucket)
    }
}

/// One tournament over a bucket, borrowing the selector's scratch buffers.
struct Tournament<'a> {
    rng: &'a mut GenomeRng,
    pool: &'a mut Vec<usize>,
    entrants: &'a mut Vec<usize>,
    size: usize,
    with_replacement: bool,
    pressure: f32,
    higher_is_better: bool,
}

impl Tournament<'_> {
    fn run(&mut self, bucket: &[BucketEntry]) -> Option<IndividualId> {
        let n = bucket.len();
        if n == 0 {
            return None;
        }
        let k = self.size.max(2).min(n);

        self.entrants.clear();
        if self.with_replacement {
            for _ in 0..k {
                self.entrants.push(self.rng.next_index(n));
            }
        } else {
            // Partial Fisher-Yates: the first k slots end up a uniform sample.
            self.pool.clear();
            self.pool.extend(0..n);
            for i in 0..k {
                let j = i + self.rng.next_index(n - i);
                self.pool.swap(i, j);
            }
            self.entrants.extend_from_slice(&self.pool[..k]);
        }

        let mut best = self.entrants[0];
        let mut second: Option<usize> = None;
        for &candidate in &self.entrants[1..] {
            if candidate == best {
                continue;
            }
            if entry_order(&bucket[candidate], &bucket[best], self.higher_is_better).is_lt() {
                second = Some(best);
                best = candidate;
            } else if second.is_none_or(|s| {
                candidate != s
                    && entry_order(&bucket[candidate], &bucket[s], self.higher_is_better).is_lt()
            }) {
                second = Some(candidate);
            }
        }

        let winner = match second {
            Some(second) if self.rng.next_u01() >= self.pressure => second,
            _ => best,
        };
        Some(bucket[winner].id)
    }
}

fn sanitize_probability(p: f32) -> f32 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
