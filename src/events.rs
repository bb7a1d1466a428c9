//! Synchronous notifications of the assembly lifecycle
use crate::{mesh::Grid, Result};
use log::debug;

/// Kind of assembly event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PreAssemble,
    PostAssemble,
    ResolveCoreConflicts,
}

/// Assembly events
#[derive(Debug, Clone, Copy)]
pub enum AssemblyEvent<'a> {
    /// Sent before any merge work
    PreAssemble,
    /// Sent once all the sections are merged, with the assembled grid
    PostAssemble(&'a Grid),
    /// Sent after `PostAssemble`
    ResolveCoreConflicts,
}

impl AssemblyEvent<'_> {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PreAssemble => EventKind::PreAssemble,
            Self::PostAssemble(_) => EventKind::PostAssemble,
            Self::ResolveCoreConflicts => EventKind::ResolveCoreConflicts,
        }
    }
}

type Callback = Box<dyn FnMut(&AssemblyEvent<'_>) -> Result<()>>;

/// Subscribers to the assembly events. Callbacks are run in subscription
/// order, before `publish` returns
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(usize, EventKind, Callback)>,
    next_id: usize,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one kind of event, and get the subscription id
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> usize
    where
        F: FnMut(&AssemblyEvent<'_>) -> Result<()> + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, kind, Box::new(callback)));
        id
    }

    /// Remove a subscription, returns false if it does not exist
    pub fn unsubscribe(&mut self, id: usize) -> bool {
        let n = self.subscribers.len();
        self.subscribers.retain(|(i, _, _)| *i != id);
        self.subscribers.len() != n
    }

    #[must_use]
    pub fn n_subscribers(&self) -> usize {
        self.subscribers.len()
    }

    /// Run the callbacks subscribed to this kind of event. Stops at the first
    /// failing callback
    pub fn publish(&mut self, event: &AssemblyEvent<'_>) -> Result<()> {
        let kind = event.kind();
        debug!("publish {kind:?}");
        for (_, k, callback) in &mut self.subscribers {
            if *k == kind {
                callback(event)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("n_subscribers", &self.subscribers.len())
            .finish()
    }
}
