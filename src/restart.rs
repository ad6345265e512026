//! Minimal restart driver.
//!
//! Runs a restartable computation against a graph: every attempt goes through
//! a [`RecordingLookup`] that remembers which keys answered "not ready"; after
//! a suspended attempt those keys are evaluated and the computation is run
//! again from scratch.

use std::cell::RefCell;
use thiserror::Error;
use tracing::debug;

use crate::error::ResolutionError;
use crate::graph::{GraphError, GraphKey, GraphLookup, GraphValue};

/// A graph that can compute a pending key on request.
pub trait GraphEvaluator: GraphLookup {
    fn evaluate(&mut self, key: &GraphKey) -> Result<(), GraphError>;
}

#[derive(Debug, Error)]
pub enum RestartError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("graph evaluation failed: {0}")]
    Graph(#[from] GraphError),

    #[error("attempt {attempt} suspended without requesting any graph value")]
    NoProgress { attempt: usize },

    #[error("still not ready after {limit} restarts")]
    TooManyRestarts { limit: usize },
}

/// Wraps a lookup and records every key that was not ready.
pub struct RecordingLookup<'g> {
    inner: &'g dyn GraphLookup,
    pending: RefCell<Vec<GraphKey>>,
}

impl<'g> RecordingLookup<'g> {
    pub fn new(inner: &'g dyn GraphLookup) -> Self {
        Self {
            inner,
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Keys that answered "not ready", in first-request order, deduplicated.
    pub fn into_pending(self) -> Vec<GraphKey> {
        self.pending.into_inner()
    }
}

impl GraphLookup for RecordingLookup<'_> {
    fn query(&self, key: &GraphKey) -> Result<Option<GraphValue>, GraphError> {
        let value = self.inner.query(key)?;
        if value.is_none() {
            let mut pending = self.pending.borrow_mut();
            if !pending.contains(key) {
                pending.push(key.clone());
            }
        }
        Ok(value)
    }
}

/// Value of a completed computation and the number of restarts it took.
#[derive(Debug)]
pub struct Completed<T> {
    pub value: T,
    pub restarts: usize,
}

/// Run `attempt` until it completes, evaluating whatever it was waiting on
/// between attempts.
pub fn run_with_restarts<G, T, F>(
    graph: &mut G,
    max_restarts: usize,
    mut attempt: F,
) -> Result<Completed<T>, RestartError>
where
    G: GraphEvaluator,
    F: FnMut(&dyn GraphLookup) -> Result<Option<T>, ResolutionError>,
{
    for restarts in 0..=max_restarts {
        let pending = {
            let recording = RecordingLookup::new(&*graph);
            if let Some(value) = attempt(&recording)? {
                debug!(restarts, "computation completed");
                return Ok(Completed { value, restarts });
            }
            recording.into_pending()
        };

        if pending.is_empty() {
            return Err(RestartError::NoProgress {
                attempt: restarts + 1,
            });
        }

        debug!(restarts, pending = pending.len(), "restarting after evaluating pending keys");
        for key in &pending {
            graph.evaluate(key)?;
        }
    }

    Err(RestartError::TooManyRestarts {
        limit: max_restarts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Artifact, ArtifactValue, InMemoryGraph};

    fn built() -> GraphValue {
        GraphValue::Artifact(ArtifactValue {
            digest: "d".into(),
            size: 1,
        })
    }

    #[test]
    fn recording_lookup_deduplicates() {
        let graph = InMemoryGraph::new();
        let recording = RecordingLookup::new(&graph);
        let key = Artifact::new("out/a").key();
        assert_eq!(recording.query(&key), Ok(None));
        assert_eq!(recording.query(&key), Ok(None));
        assert_eq!(recording.into_pending(), vec![key]);
    }

    #[test]
    fn runs_until_ready() {
        let a = Artifact::new("out/a").key();
        let b = Artifact::new("out/b").key();
        let mut graph = InMemoryGraph::new();
        graph.insert_pending(a.clone(), built());
        graph.insert_pending(b.clone(), built());

        // sequential dependency: b is only requested once a is ready
        let completed = run_with_restarts(&mut graph, 5, |g| {
            if g.query(&a).unwrap().is_none() {
                return Ok(None);
            }
            Ok(g.query(&b).unwrap().map(|_| "done"))
        })
        .unwrap();

        assert_eq!(completed.value, "done");
        assert_eq!(completed.restarts, 2);
        assert_eq!(graph.evaluation_count(&a), 1);
    }

    #[test]
    fn suspension_without_pending_keys_is_no_progress() {
        let mut graph = InMemoryGraph::new();
        let result = run_with_restarts(&mut graph, 3, |_| Ok::<Option<()>, _>(None));
        assert!(matches!(result, Err(RestartError::NoProgress { attempt: 1 })));
    }

    #[test]
    fn restart_limit() {
        let mut graph = InMemoryGraph::new();
        let keys: Vec<_> = (0..4).map(|i| Artifact::new(format!("out/{i}")).key()).collect();
        for key in &keys {
            graph.insert_pending(key.clone(), built());
        }

        // one new key per attempt
        let result = run_with_restarts(&mut graph, 2, |g| {
            for key in &keys {
                if g.query(key).unwrap().is_none() {
                    return Ok(None);
                }
            }
            Ok(Some(()))
        });
        assert!(matches!(result, Err(RestartError::TooManyRestarts { limit: 2 })));
    }
}
