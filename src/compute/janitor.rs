//! End-of-generation cleanup.

use log::debug;

use crate::schema::{BreedingPair, Population};

use super::report::CleanupReport;

/// Destroys every breeding pair and clears every replacement flag so the
/// next generation starts from a clean population.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerationJanitor;

impl GenerationJanitor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, pairs: &mut Vec<BreedingPair>, population: &mut Population) -> CleanupReport {
        let report = CleanupReport {
            pairs_destroyed: pairs.len(),
            flags_cleared: population.flagged_count(),
        };
        pairs.clear();
        for individual in population.individuals_mut() {
            individual.replace = false;
        }

        debug!(
            "GenerationJanitor: destroyed {} pairs, cleared {} flags",
            report.pairs_destroyed, report.flags_cleared
        );
        report
    }
}
