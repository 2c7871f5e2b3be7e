//! Strategy policy table

use std::fmt;
use at_data::SelectionTuning;

/// Algorithm used to grow the selection up to a target size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Current page, then a few following pages one at a time
    Sequential,
    /// Current page, then every needed page concurrently
    Hybrid,
    /// Current page, then needed pages in fixed-size concurrent batches
    ParallelBatched,
    /// Identifier-only crawl, merged in page order, with a one page preview
    BulkId,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Hybrid => "hybrid",
            Strategy::ParallelBatched => "parallel-batched",
            Strategy::BulkId => "bulk-id",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Predicate = Box<dyn Fn(usize) -> bool + Send + Sync>;

/// Ordered (predicate, strategy) rules keyed by the number of records still
/// to select. The first matching rule wins.
pub struct SelectionPolicy {
    rules: Vec<(Predicate, Strategy)>,
}

impl SelectionPolicy {
    /// Build the four-tier table from configured thresholds
    pub fn from_tuning(tuning: &SelectionTuning) -> Self {
        let sequential_max = tuning.sequential_max;
        let hybrid_max = tuning.hybrid_max;
        let batched_max = tuning.batched_max;

        Self {
            rules: vec![
                (
                    Box::new(move |remaining: usize| remaining <= sequential_max) as Predicate,
                    Strategy::Sequential,
                ),
                (
                    Box::new(move |remaining: usize| remaining <= hybrid_max) as Predicate,
                    Strategy::Hybrid,
                ),
                (
                    Box::new(move |remaining: usize| remaining <= batched_max) as Predicate,
                    Strategy::ParallelBatched,
                ),
                (Box::new(|_: usize| true) as Predicate, Strategy::BulkId),
            ],
        }
    }

    /// Pick the strategy for `remaining` additional records
    pub fn choose(&self, remaining: usize) -> Strategy {
        self.rules
            .iter()
            .find(|(applies, _)| applies(remaining))
            .map(|(_, strategy)| *strategy)
            .unwrap_or(Strategy::BulkId)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_tuning(&SelectionTuning::default())
    }
}
