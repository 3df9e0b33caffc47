//! In-flight loads
//!
//! Tracks at most one outstanding fetch per node id. A second expand of a
//! folder that is already loading gets the same shared future instead of
//! issuing another request. The adapter keeps one registry for children
//! listings and one for item records.

use crate::error::ApiError;
use crate::types::NodeID;
use futures::future::{BoxFuture, Shared};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::adapter::ExpandOutcome;

/// Fetch shared between every caller waiting on the same id
pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

/// Children listing fetch shared between every caller expanding one folder
pub type SharedLoad = SharedFetch<ExpandOutcome>;

struct InFlight<T: Clone> {
    token: u64,
    load: SharedFetch<T>,
}

/// Registry of outstanding fetches keyed by node id
pub struct InFlightLoads<T: Clone = ExpandOutcome> {
    loads: Arc<RwLock<HashMap<NodeID, InFlight<T>>>>,
}

impl<T: Clone> Clone for InFlightLoads<T> {
    fn clone(&self) -> Self {
        Self {
            loads: self.loads.clone(),
        }
    }
}

impl<T: Clone> Default for InFlightLoads<T> {
    fn default() -> Self {
        Self {
            loads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> InFlightLoads<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the outstanding load for `id`, or register the one built by `start`.
    ///
    /// The boolean is true when `start` ran.
    pub fn get_or_start<F>(&self, id: &str, start: F) -> (SharedFetch<T>, bool)
    where
        F: FnOnce() -> (u64, SharedFetch<T>),
    {
        {
            let map = self.loads.read();
            if let Some(existing) = map.get(id) {
                return (existing.load.clone(), false);
            }
        }

        let mut map = self.loads.write();
        // Re-check: another caller may have registered between the two locks
        if let Some(existing) = map.get(id) {
            return (existing.load.clone(), false);
        }
        let (token, load) = start();
        map.insert(
            id.to_string(),
            InFlight {
                token,
                load: load.clone(),
            },
        );
        (load, true)
    }

    /// Drop the entry for `id` if it still belongs to the load with `token`
    pub fn finish(&self, id: &str, token: u64) {
        let mut map = self.loads.write();
        if map.get(id).map(|f| f.token) == Some(token) {
            map.remove(id);
        }
    }

    /// Forget the outstanding load for `id`; its result will be discarded
    pub fn cancel(&self, id: &str) -> Option<u64> {
        self.loads.write().remove(id).map(|f| f.token)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loads.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.loads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
