//! Per-stage reports and the anomaly taxonomy.
//!
//! No stage ever fails: problems with individual inputs are recorded as
//! [`Anomaly`] values, logged, and skipped.

use crate::schema::IndividualId;

/// A non-fatal condition detected while running a stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Anomaly {
    /// No parent candidates available for a flagged individual.
    #[error("no parent candidates for flagged individual {individual}")]
    Starvation { individual: IndividualId },
    /// Fewer breeding pairs than flagged individuals.
    #[error("ran out of breeding pairs after {processed} flagged individuals ({missing} left unbred)")]
    PairShortfall { processed: usize, missing: usize },
    /// Breeding pairs left over after every flagged individual was bred.
    #[error("{unused} breeding pairs left unused")]
    PairSurplus { unused: usize },
    /// A participant's genome has zero genes to work with.
    #[error("zero-length genome for individual {individual}")]
    DegenerateGenome { individual: IndividualId },
    /// A participant lacks the genome this stage operates on.
    #[error("individual {individual} has no {kind} genome")]
    MissingGenome {
        individual: IndividualId,
        kind: &'static str,
    },
}

/// Outcome of one tournament-selection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionReport {
    /// Flagged individuals seen in the stream.
    pub flagged: usize,
    pub pairs_emitted: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Outcome of one crossover pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossoverReport {
    pub bred: usize,
    pub pairs_consumed: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Outcome of one mutation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationReport {
    /// Individuals whose genome was visited.
    pub mutated: usize,
    /// Bits flipped (byte genomes) or genes whose value changed (real genomes).
    pub genes_changed: usize,
    /// Partial resets triggered (real genomes only).
    pub resets: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Outcome of one elite-archive update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EliteReport {
    pub candidates: usize,
    pub objectives_updated: usize,
    pub slots_written: usize,
}

/// Outcome of end-of-generation cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub pairs_destroyed: usize,
    pub flags_cleared: usize,
}

/// Best and mean score of one objective across the rated population.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveSummary {
    pub objective: usize,
    pub best: f32,
    pub mean: f32,
    pub count: usize,
}

/// Everything that happened in one generation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Index of the generation this report describes (0-based).
    pub generation: u64,
    pub objectives: Vec<ObjectiveSummary>,
    pub elite: EliteReport,
    pub selection: SelectionReport,
    pub crossover: CrossoverReport,
    pub mutation: MutationReport,
    pub cleanup: CleanupReport,
}

impl GenerationReport {
    /// Every anomaly reported by any stage, in stage order.
    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        self.selection
            .anomalies
            .iter()
            .chain(&self.crossover.anomalies)
            .chain(&self.mutation.anomalies)
    }

    /// No stage reported anything unusual.
    pub fn is_clean(&self) -> bool {
        self.anomalies().next().is_none()
    }
}
