//! In-process evaluation graph.
//!
//! Values are registered either as ready, or as pending with the value they
//! will have once evaluated. Queries against pending keys answer "not ready"
//! until the driver evaluates them, after which they are memoized.

use std::cell::RefCell;
use std::collections::HashMap;
use tracing::trace;

use super::{GraphError, GraphKey, GraphLookup, GraphValue};
use crate::restart::GraphEvaluator;

#[derive(Debug, Default)]
pub struct InMemoryGraph {
    ready: HashMap<GraphKey, GraphValue>,
    pending: HashMap<GraphKey, GraphValue>,
    failures: HashMap<GraphKey, String>,
    interrupted: bool,
    queries: RefCell<HashMap<GraphKey, usize>>,
    evaluations: HashMap<GraphKey, usize>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value that is already computed.
    pub fn insert_ready(&mut self, key: GraphKey, value: GraphValue) {
        self.pending.remove(&key);
        self.ready.insert(key, value);
    }

    /// Register a value that becomes available once `key` is evaluated.
    pub fn insert_pending(&mut self, key: GraphKey, value: GraphValue) {
        self.ready.remove(&key);
        self.pending.insert(key, value);
    }

    /// Make `key` fail deterministically.
    pub fn insert_failure(&mut self, key: GraphKey, message: impl Into<String>) {
        self.ready.remove(&key);
        self.pending.remove(&key);
        self.failures.insert(key, message.into());
    }

    pub fn set_interrupted(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
    }

    /// Evaluate every pending key at once.
    pub fn complete_all(&mut self) {
        let pending: Vec<_> = self.pending.keys().cloned().collect();
        for key in pending {
            self.complete(&key);
        }
    }

    pub fn is_ready(&self, key: &GraphKey) -> bool {
        self.ready.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// How often `key` has been queried.
    pub fn query_count(&self, key: &GraphKey) -> usize {
        self.queries.borrow().get(key).copied().unwrap_or(0)
    }

    /// How often `key` has actually been computed (at most once).
    pub fn evaluation_count(&self, key: &GraphKey) -> usize {
        self.evaluations.get(key).copied().unwrap_or(0)
    }

    fn complete(&mut self, key: &GraphKey) -> bool {
        match self.pending.remove(key) {
            Some(value) => {
                trace!(%key, "evaluated");
                *self.evaluations.entry(key.clone()).or_default() += 1;
                self.ready.insert(key.clone(), value);
                true
            }
            None => false,
        }
    }
}

impl GraphLookup for InMemoryGraph {
    fn query(&self, key: &GraphKey) -> Result<Option<GraphValue>, GraphError> {
        *self.queries.borrow_mut().entry(key.clone()).or_default() += 1;

        if self.interrupted {
            return Err(GraphError::Interrupted);
        }
        if let Some(message) = self.failures.get(key) {
            return Err(GraphError::DependencyFailed {
                key: key.clone(),
                message: message.clone(),
            });
        }
        Ok(self.ready.get(key).cloned())
    }
}

impl GraphEvaluator for InMemoryGraph {
    fn evaluate(&mut self, key: &GraphKey) -> Result<(), GraphError> {
        if self.interrupted {
            return Err(GraphError::Interrupted);
        }
        if self.ready.contains_key(key) || self.complete(key) {
            return Ok(());
        }
        let message = self
            .failures
            .get(key)
            .cloned()
            .unwrap_or_else(|| "no value registered for key".to_string());
        Err(GraphError::DependencyFailed {
            key: key.clone(),
            message,
        })
    }
}
