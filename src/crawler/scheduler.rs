//! Scheduler for managing the route frontier and bounded concurrency
//!
//! This module handles:
//! - The frontier: every route ever discovered, in first-discovery order
//! - Membership tracking so a route is dispatched at most once
//! - Global concurrency limiting via a semaphore
//!
//! Routes are dispatched strictly in the order they were discovered. The
//! frontier is an arena: records are appended, their state is updated in
//! place, and they are never removed.

use crate::route::RoutePath;
use crate::state::RouteState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One route known to the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    /// The logical route
    pub path: RoutePath,

    /// Index of the route whose render first referenced this one
    /// (None for entry routes)
    pub parent: Option<usize>,

    /// Lifecycle state
    pub state: RouteState,
}

/// Arena of discovered routes plus a membership index
#[derive(Debug, Default)]
pub struct Frontier {
    records: Vec<RouteRecord>,
    index: HashMap<RoutePath, usize>,
    cursor: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route if it has never been seen
    ///
    /// # Returns
    ///
    /// * `Some(index)` - The route is new and was appended
    /// * `None` - The route was already known
    pub fn discover(&mut self, path: RoutePath, parent: Option<usize>) -> Option<usize> {
        if self.index.contains_key(&path) {
            return None;
        }

        let index = self.records.len();
        self.index.insert(path.clone(), index);
        self.records.push(RouteRecord {
            path,
            parent,
            state: RouteState::Pending,
        });
        Some(index)
    }

    /// Returns true if there is a route that has not been dispatched yet
    pub fn has_pending(&self) -> bool {
        self.cursor < self.records.len()
    }

    /// Marks the next pending route in progress and returns it
    pub fn next_pending(&mut self) -> Option<(usize, RoutePath)> {
        let index = self.cursor;
        let record = self.records.get_mut(index)?;
        record.state = RouteState::InProgress;
        self.cursor += 1;
        Some((index, record.path.clone()))
    }

    /// Records the terminal state of a dispatched route
    pub fn complete(&mut self, index: usize, state: RouteState) {
        if let Some(record) = self.records.get_mut(index) {
            record.state = state;
        }
    }

    /// Returns routes that were in flight when the build stopped to pending
    ///
    /// # Returns
    ///
    /// The number of routes reset
    pub fn requeue_unfinished(&mut self) -> usize {
        let mut reset = 0;
        for record in &mut self.records {
            if record.state == RouteState::InProgress {
                record.state = RouteState::Pending;
                reset += 1;
            }
        }
        reset
    }

    pub fn contains(&self, path: &RoutePath) -> bool {
        self.index.contains_key(path)
    }

    pub fn get(&self, index: usize) -> Option<&RouteRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counts routes by state
    pub fn count_by_state(&self) -> HashMap<RouteState, usize> {
        let mut counts = HashMap::new();
        for record in &self.records {
            *counts.entry(record.state).or_insert(0) += 1;
        }
        counts
    }
}

/// A dispatched route with its concurrency permit
///
/// The permit is released when this value (or the task it moves into) is
/// dropped.
pub struct ScheduledRoute {
    /// Frontier index of the route
    pub index: usize,

    /// The route to render
    pub path: RoutePath,

    /// The semaphore permit for this dispatch
    pub _permit: OwnedSemaphorePermit,
}

/// Scheduler combines the frontier with a global concurrency limit
pub struct Scheduler {
    /// Global semaphore for limiting concurrent renders
    semaphore: Arc<Semaphore>,

    /// Every route discovered so far
    frontier: Frontier,

    concurrency: usize,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of routes rendered at once
    /// * `entries` - Seed routes; duplicates are dropped
    pub fn new(concurrency: usize, entries: impl IntoIterator<Item = RoutePath>) -> Self {
        let concurrency = concurrency.max(1);
        let mut frontier = Frontier::new();
        for entry in entries {
            frontier.discover(entry, None);
        }

        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            frontier,
            concurrency,
        }
    }

    /// Gets the next route to render
    ///
    /// Never waits: returns None when no route is pending or when every
    /// permit is held by an in-flight render.
    pub fn next_route(&mut self) -> Option<ScheduledRoute> {
        if !self.frontier.has_pending() {
            return None;
        }

        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        let (index, path) = self.frontier.next_pending()?;

        tracing::trace!("Dispatching route #{}: {}", index, path);
        Some(ScheduledRoute {
            index,
            path,
            _permit: permit,
        })
    }

    /// Adds a newly discovered route
    pub fn discover(&mut self, path: RoutePath, parent: Option<usize>) -> Option<usize> {
        self.frontier.discover(path, parent)
    }

    pub fn complete(&mut self, index: usize, state: RouteState) {
        self.frontier.complete(index, state);
    }

    pub fn has_pending(&self) -> bool {
        self.frontier.has_pending()
    }

    /// Number of renders currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.semaphore.available_permits()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn frontier_mut(&mut self) -> &mut Frontier {
        &mut self.frontier
    }
}
