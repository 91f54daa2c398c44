//! Entitlements store
//!
//! Holds the current [`AuthorityState`] in a `tokio::sync::watch` cell.
//! Reads are synchronous borrows; writes replace the whole snapshot.
//!
//! Resolution passes can overlap. Each pass takes a generation number when
//! it starts and may only commit if no newer pass has committed already, so
//! a slow pass that started first can never overwrite a faster, newer one.
//! While any newer pass is still in flight the committed snapshot keeps
//! `is_loading` set.
//!
//! A pass that will never commit, because its future was dropped, must be
//! handed back with [`EntitlementsStore::abandon`] so the loading flag it
//! raised is cleared. [`PendingPass`] does this on drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::state::AuthorityState;

/// Resolution statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Passes started
    pub passes_started: u64,
    /// Passes whose result was committed
    pub passes_committed: u64,
    /// Passes discarded because a newer pass had already committed
    pub passes_discarded: u64,
    /// Passes that kept the previous state because a source failed
    pub source_failures: u64,
    /// Passes dropped before committing
    pub passes_abandoned: u64,
}

/// Handle for an in-flight resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTicket {
    generation: u64,
}

impl PassTicket {
    /// Generation this pass was started with.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of [`EntitlementsStore::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The snapshot was replaced
    Committed,
    /// The pass produced the snapshot already stored
    Unchanged,
    /// A newer pass had already committed
    Discarded,
}

/// Single source of truth for the resolved authority state.
pub struct EntitlementsStore {
    /// Current snapshot
    state: watch::Sender<Arc<AuthorityState>>,
    /// Generation handed to the most recently started pass
    started: AtomicU64,
    /// Generation of the most recently committed pass
    committed: AtomicU64,
    /// Generation of the most recent pass abandoned while it was the newest
    abandoned: AtomicU64,
    /// Statistics
    commits: AtomicU64,
    discards: AtomicU64,
    failures: AtomicU64,
    abandons: AtomicU64,
}

impl std::fmt::Debug for EntitlementsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementsStore")
            .field("state", &*self.state.borrow())
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("committed", &self.committed.load(Ordering::SeqCst))
            .finish()
    }
}

impl EntitlementsStore {
    /// Create a store in the initial loading state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(AuthorityState::initial()));
        Self {
            state,
            started: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            discards: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            abandons: AtomicU64::new(0),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<AuthorityState> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthorityState>> {
        self.state.subscribe()
    }

    /// Start a pass: take a generation and mark the state loading.
    pub fn begin_pass(&self) -> PassTicket {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;

        self.state.send_if_modified(|current| {
            if current.is_loading {
                return false;
            }
            let mut next = AuthorityState::clone(current);
            next.is_loading = true;
            *current = Arc::new(next);
            true
        });

        debug!(generation, "Resolution pass started");
        PassTicket { generation }
    }

    /// Commit the result of a pass.
    ///
    /// `resolve` receives the currently stored snapshot and returns the
    /// replacement. It is not called when the pass is stale.
    pub fn commit<F>(&self, ticket: PassTicket, resolve: F) -> CommitOutcome
    where
        F: FnOnce(&AuthorityState) -> AuthorityState,
    {
        let mut outcome = CommitOutcome::Discarded;

        self.state.send_if_modified(|current| {
            // Checked and updated under the channel's write lock, so commits
            // are totally ordered.
            if ticket.generation <= self.committed.load(Ordering::SeqCst) {
                return false;
            }
            self.committed.store(ticket.generation, Ordering::SeqCst);

            let mut next = resolve(current);
            let newest = self.started.load(Ordering::SeqCst);
            next.is_loading =
                newest > ticket.generation && self.abandoned.load(Ordering::SeqCst) != newest;

            if next.same_resolution(current) {
                outcome = CommitOutcome::Unchanged;
                return false;
            }
            *current = Arc::new(next);
            outcome = CommitOutcome::Committed;
            true
        });

        match outcome {
            CommitOutcome::Discarded => {
                self.discards.fetch_add(1, Ordering::SeqCst);
                debug!(generation = ticket.generation, "Discarded stale resolution pass");
            }
            CommitOutcome::Committed | CommitOutcome::Unchanged => {
                self.commits.fetch_add(1, Ordering::SeqCst);
                debug!(generation = ticket.generation, ?outcome, "Resolution pass committed");
            }
        }

        outcome
    }

    /// Give up on a pass that will not commit.
    ///
    /// Clears `is_loading` if the pass was the newest one started, since no
    /// later commit would clear it. A store that has never resolved stays
    /// loading.
    pub fn abandon(&self, ticket: PassTicket) {
        self.abandons.fetch_add(1, Ordering::SeqCst);

        self.state.send_if_modified(|current| {
            if self.started.load(Ordering::SeqCst) != ticket.generation
                || ticket.generation <= self.committed.load(Ordering::SeqCst)
            {
                return false;
            }
            self.abandoned.store(ticket.generation, Ordering::SeqCst);

            if !current.is_loading || current.resolved_at.is_none() {
                return false;
            }
            let mut next = AuthorityState::clone(current);
            next.is_loading = false;
            *current = Arc::new(next);
            true
        });

        debug!(generation = ticket.generation, "Resolution pass abandoned");
    }

    /// Record that a pass kept the previous state because a source failed.
    pub fn record_source_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether the stored snapshot is still loading.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Resolution statistics.
    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            passes_started: self.started.load(Ordering::SeqCst),
            passes_committed: self.commits.load(Ordering::SeqCst),
            passes_discarded: self.discards.load(Ordering::SeqCst),
            source_failures: self.failures.load(Ordering::SeqCst),
            passes_abandoned: self.abandons.load(Ordering::SeqCst),
        }
    }
}

impl Default for EntitlementsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A started pass that is abandoned if dropped before it commits.
#[derive(Debug)]
pub struct PendingPass<'a> {
    store: &'a EntitlementsStore,
    ticket: PassTicket,
    finished: bool,
}

impl<'a> PendingPass<'a> {
    /// Start a pass on `store`.
    pub fn begin(store: &'a EntitlementsStore) -> Self {
        Self {
            store,
            ticket: store.begin_pass(),
            finished: false,
        }
    }

    /// Generation this pass was started with.
    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }

    /// Commit the result; see [`EntitlementsStore::commit`].
    pub fn commit<F>(mut self, resolve: F) -> CommitOutcome
    where
        F: FnOnce(&AuthorityState) -> AuthorityState,
    {
        self.finished = true;
        self.store.commit(self.ticket, resolve)
    }
}

impl Drop for PendingPass<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.abandon(self.ticket);
        }
    }
}
