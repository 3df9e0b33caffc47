//! Optimistic mutation lifecycle
//!
//! Every move or rename the adapter applies ahead of the server gets a
//! record that starts `Pending` and ends either `Committed` or `RolledBack`.
//! Rolling back restores the mirror from the snapshot taken before the local
//! change. Failed mutations are never retried.
//!
//! The adapter keeps every pending record plus a bounded tail of settled
//! ones in a [`MutationLog`].

use super::mirror::{Mirror, MirrorSnapshot};
use crate::error::ApiError;
use crate::types::NodeID;
use std::collections::VecDeque;

pub type MutationId = u64;

/// Settled records kept for inspection; pending ones are never dropped
pub const SETTLED_MUTATION_HISTORY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Move { id: NodeID, new_parent_id: NodeID },
    Rename { id: NodeID, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack { error: ApiError },
}

#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub id: MutationId,
    pub kind: MutationKind,
    state: MutationState,
    snapshot: Option<MirrorSnapshot>,
}

impl MutationRecord {
    pub fn pending(id: MutationId, kind: MutationKind, snapshot: MirrorSnapshot) -> Self {
        Self {
            id,
            kind,
            state: MutationState::Pending,
            snapshot: Some(snapshot),
        }
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, MutationState::Pending)
    }

    /// `Pending -> Committed`. Returns false if the record already settled.
    pub fn commit(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.state = MutationState::Committed;
        self.snapshot = None;
        true
    }

    /// `Pending -> RolledBack`, restoring the mirror.
    ///
    /// Returns the folders whose listings were reloaded since the snapshot
    /// and so could not be restored, or `None` if the record already settled,
    /// in which case the mirror is untouched.
    pub(crate) fn roll_back(&mut self, mirror: &mut Mirror, error: ApiError) -> Option<Vec<NodeID>> {
        if !self.is_pending() {
            return None;
        }
        let stale = self
            .snapshot
            .take()
            .map(|snapshot| mirror.restore(&snapshot))
            .unwrap_or_default();
        self.state = MutationState::RolledBack { error };
        Some(stale)
    }
}

/// Mutation records of one adapter, oldest first
#[derive(Debug)]
pub(crate) struct MutationLog {
    next_id: MutationId,
    records: VecDeque<MutationRecord>,
    settled_limit: usize,
}

impl MutationLog {
    pub(crate) fn new(settled_limit: usize) -> Self {
        Self {
            next_id: 1,
            records: VecDeque::new(),
            settled_limit,
        }
    }

    pub(crate) fn begin(&mut self, kind: MutationKind, snapshot: MirrorSnapshot) -> MutationId {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push_back(MutationRecord::pending(id, kind, snapshot));
        id
    }

    pub(crate) fn get(&self, id: MutationId) -> Option<&MutationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn commit(&mut self, id: MutationId) -> bool {
        let committed = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .map_or(false, MutationRecord::commit);
        self.prune();
        committed
    }

    pub(crate) fn roll_back(
        &mut self,
        id: MutationId,
        mirror: &mut Mirror,
        error: ApiError,
    ) -> Option<Vec<NodeID>> {
        let stale = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .and_then(|r| r.roll_back(mirror, error));
        self.prune();
        stale
    }

    /// Kinds of every still-pending mutation, in the order they were issued
    pub(crate) fn pending_kinds(&self) -> Vec<MutationKind> {
        self.records
            .iter()
            .filter(|r| r.is_pending())
            .map(|r| r.kind.clone())
            .collect()
    }

    pub(crate) fn records(&self) -> Vec<MutationRecord> {
        self.records.iter().cloned().collect()
    }

    fn prune(&mut self) {
        let mut settled = self.records.iter().filter(|r| !r.is_pending()).count();
        while settled > self.settled_limit {
            match self.records.iter().position(|r| !r.is_pending()) {
                Some(oldest) => {
                    self.records.remove(oldest);
                    settled -= 1;
                }
                None => break,
            }
        }
    }
}
