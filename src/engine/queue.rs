// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::BindingId;

/// Bindings triggered while a rebuild is in flight.
///
/// Semantics:
/// - Each queued entry is a *batch* of bindings that will be rebuilt together
///   as one future rebuild.
/// - A binding already waiting in any batch is not queued again.
/// - `max_runs` (`[watch].queue_length`) bounds the number of batches. Once
///   the bound is reached, new bindings merge into the last batch, so no
///   trigger is lost.
/// - [`TriggerQueue::pop_next`] hands out one batch per rebuild, oldest first.
#[derive(Debug)]
pub struct TriggerQueue {
    max_runs: usize,
    runs: VecDeque<BTreeSet<BindingId>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(max_runs: usize) -> Self {
        Self {
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn max_runs(&self) -> usize {
        self.max_runs
    }

    pub fn contains(&self, binding: BindingId) -> bool {
        self.runs.iter().any(|batch| batch.contains(&binding))
    }

    /// Record a binding triggered during a rebuild.
    pub fn record_trigger(&mut self, binding: BindingId) {
        if self.contains(binding) {
            debug!(binding, "binding already queued; coalesced");
            return;
        }

        if self.runs.len() < self.max_runs {
            self.runs.push_back(BTreeSet::from([binding]));
            debug!(binding, batches = self.runs.len(), "queued new rebuild batch");
        } else if let Some(last) = self.runs.back_mut() {
            last.insert(binding);
            debug!(binding, "queue full; merged into last batch");
        }
    }

    /// Take the oldest queued batch.
    pub fn pop_next(&mut self) -> Option<Vec<BindingId>> {
        let batch = self.runs.pop_front()?;
        debug!(bindings = ?batch, remaining = self.runs.len(), "dequeued rebuild batch");
        Some(batch.into_iter().collect())
    }
}
