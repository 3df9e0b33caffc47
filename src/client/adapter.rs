//! Tree adapter
//!
//! Presents the mirror to the rendering layer and keeps it in step with the
//! data source.
//!
//! Loading: expanding a folder fetches its children with one combined call
//! when the source supports it, otherwise (or when that call fails) with an
//! ids-only call whose rows are hydrated later via [`TreeAdapter::hydrate`].
//! While a fetch is outstanding the folder shows a single placeholder row,
//! replaced in one step once the response lands. Collapsing a folder with a
//! fetch in flight discards that response.
//!
//! Item records go through their own registry, so concurrent expands of an
//! unhydrated folder fetch its record once too.
//!
//! Mutations: move and rename change the mirror first, then ask the source.
//! A failure restores the pre-mutation snapshot and is surfaced once through
//! [`TreeAdapter::take_error`]. A success reloads only the folders named in
//! the outcome. Listings that land while a mutation is pending get its
//! change re-applied on top.

use super::inflight::{InFlightLoads, SharedFetch, SharedLoad};
use super::mirror::{placeholder, ChildrenState, Mirror, MirrorSnapshot, TreeItem};
use super::optimistic::{
    MutationId, MutationKind, MutationLog, MutationRecord, MutationState,
    SETTLED_MUTATION_HISTORY,
};
use super::presentation::DepthPolicy;
use super::source::TreeDataSource;
use crate::config::{AdapterConfig, ViewConfig};
use crate::error::ApiError;
use crate::service::{MoveOutcome, RenameOutcome};
use crate::tree::{sort_key, Node};
use crate::types::{NodeID, ROOT_ID};
use crate::virtualization::{compute_window, VisibleWindow, WindowParams};
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of an expand or load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Children fetched and applied
    Loaded,
    /// Children were already in the mirror
    AlreadyLoaded,
    /// Depth policy or node kind forbids expansion
    NotExpandable,
    /// Folder was collapsed or invalidated before the response arrived
    Discarded,
}

/// One rendered row of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub item: TreeItem,
    /// Relative depth; children of the root are 0
    pub depth: usize,
    pub expandable: bool,
    pub expanded: bool,
}

enum Fetched {
    WithData(Vec<Node>),
    IdsOnly(Vec<NodeID>),
}

pub struct TreeAdapter {
    source: Arc<dyn TreeDataSource>,
    mirror: Arc<RwLock<Mirror>>,
    inflight: InFlightLoads,
    item_loads: InFlightLoads<Node>,
    policy: DepthPolicy,
    prefer_combined: bool,
    mutations: Arc<Mutex<MutationLog>>,
    last_error: Mutex<Option<ApiError>>,
}

impl TreeAdapter {
    pub fn new(source: Arc<dyn TreeDataSource>, config: &AdapterConfig) -> Self {
        Self {
            source,
            mirror: Arc::new(RwLock::new(Mirror::new())),
            inflight: InFlightLoads::new(),
            item_loads: InFlightLoads::new(),
            policy: DepthPolicy::new(config.max_folder_depth),
            prefer_combined: config.prefer_combined_loads,
            mutations: Arc::new(Mutex::new(MutationLog::new(SETTLED_MUTATION_HISTORY))),
            last_error: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> DepthPolicy {
        self.policy
    }

    /// Whether `item` at `depth` may present expandable children
    pub fn is_folder(&self, item: &TreeItem, depth: usize) -> bool {
        self.policy.is_folder(item, depth)
    }

    /// Mirrored record of a node, if hydrated
    pub fn item(&self, id: &str) -> Option<Node> {
        self.mirror.read().data(id).cloned()
    }

    /// Loaded child ids of a folder
    pub fn children(&self, id: &str) -> Option<Vec<NodeID>> {
        self.mirror.read().loaded_children(id).map(<[NodeID]>::to_vec)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.mirror.read().entry(id).map_or(false, |e| e.expanded)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.inflight.is_loading(id)
    }

    /// Fetch a node's record and its children
    pub async fn load(&self, id: &str) -> Result<ExpandOutcome, ApiError> {
        self.ensure_item(id).await?;
        self.load_children(id, false).await
    }

    /// Mirrored record of a node, fetching it if missing.
    ///
    /// Concurrent callers for the same id share one fetch.
    pub async fn ensure_item(&self, id: &str) -> Result<Node, ApiError> {
        let fetch = {
            let mut mirror = self.mirror.write();
            if let Some(node) = mirror.data(id) {
                return Ok(node.clone());
            }
            let (fetch, _) = self.item_loads.get_or_start(id, || {
                let token = mirror.next_token();
                (token, self.fetch_item_shared(id, token))
            });
            fetch
        };
        fetch.await
    }

    fn fetch_item_shared(&self, id: &str, token: u64) -> SharedFetch<Node> {
        let source = self.source.clone();
        let mirror = self.mirror.clone();
        let item_loads = self.item_loads.clone();
        let id = id.to_string();

        async move {
            let fetched = source.load_item(&id).await;
            let mut mirror = mirror.write();
            item_loads.finish(&id, token);
            if let Ok(node) = &fetched {
                mirror.set_data(node.clone());
            }
            fetched
        }
        .boxed()
        .shared()
    }

    /// Expand a folder, loading its children if needed.
    ///
    /// A collapse that arrives before the children are applied wins: the
    /// folder stays collapsed and the outcome is `Discarded`.
    pub async fn expand(&self, id: &str) -> Result<ExpandOutcome, ApiError> {
        if id != ROOT_ID {
            let marked = self.mark_expanded(id, true);
            let node = match self.ensure_item(id).await {
                Ok(node) => node,
                Err(e) => {
                    self.mark_expanded(id, false);
                    return Err(e);
                }
            };
            if marked && !self.is_expanded(id) {
                debug!(node_id = %id, "Collapsed before expand resolved");
                return Ok(ExpandOutcome::Discarded);
            }

            let depth = self.mirror.read().row_depth(id);
            let expandable = depth.map_or(false, |d| self.policy.is_folder(&TreeItem::Node(node), d));
            if !expandable {
                self.mark_expanded(id, false);
                return Ok(ExpandOutcome::NotExpandable);
            }
            if !marked {
                self.mark_expanded(id, true);
            }
        } else {
            self.mark_expanded(id, true);
        }

        self.load_children(id, true).await
    }

    /// Set the expanded flag; false if the node has no mirror entry yet
    fn mark_expanded(&self, id: &str, expanded: bool) -> bool {
        let mut mirror = self.mirror.write();
        match mirror.entry_mut(id) {
            Some(entry) => {
                entry.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Collapse a folder. A fetch still in flight for it is discarded.
    pub fn collapse(&self, id: &str) {
        let mut mirror = self.mirror.write();
        let Some(entry) = mirror.entry_mut(id) else {
            return;
        };
        entry.expanded = false;
        if matches!(entry.children(), ChildrenState::Loading { .. }) {
            entry.set_children(ChildrenState::Unloaded);
            self.inflight.cancel(id);
            debug!(node_id = %id, "Collapsed while loading, response will be discarded");
        }
    }

    async fn load_children(&self, id: &str, require_expanded: bool) -> Result<ExpandOutcome, ApiError> {
        let load = {
            let mut mirror = self.mirror.write();
            match mirror.entry(id) {
                None => return Err(ApiError::NodeNotFound(id.to_string())),
                Some(entry) if require_expanded && !entry.expanded => {
                    return Ok(ExpandOutcome::Discarded)
                }
                Some(entry) => {
                    if let ChildrenState::Loaded(_) = entry.children() {
                        return Ok(ExpandOutcome::AlreadyLoaded);
                    }
                }
            }

            let mut started = None;
            let (load, _) = self.inflight.get_or_start(id, || {
                let token = mirror.next_token();
                started = Some(token);
                (token, self.fetch_children_shared(id, token))
            });
            if let Some(token) = started {
                if let Some(entry) = mirror.entry_mut(id) {
                    entry.set_children(ChildrenState::Loading { token });
                }
                debug!(node_id = %id, token, "Started children load");
            }
            load
        };
        load.await
    }

    fn fetch_children_shared(&self, id: &str, token: u64) -> SharedLoad {
        let source = self.source.clone();
        let mirror = self.mirror.clone();
        let inflight = self.inflight.clone();
        let mutations = self.mutations.clone();
        let prefer_combined = self.prefer_combined;
        let id = id.to_string();

        async move {
            let fetched = fetch_children(source.as_ref(), &id, prefer_combined).await;
            settle_load(&mirror, &inflight, &mutations, &id, token, fetched)
        }
        .boxed()
        .shared()
    }

    /// Depth-first rows of every expanded folder, placeholders included
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let mirror = self.mirror.read();
        let mut rows = Vec::new();
        self.push_rows(&mirror, ROOT_ID, 0, &mut rows);
        rows
    }

    fn push_rows(&self, mirror: &Mirror, folder: &str, depth: usize, rows: &mut Vec<TreeRow>) {
        let Some(entry) = mirror.entry(folder) else {
            return;
        };
        if !entry.expanded {
            return;
        }
        match entry.children() {
            ChildrenState::Unloaded => {}
            ChildrenState::Loading { .. } => rows.push(TreeRow {
                item: placeholder(folder),
                depth,
                expandable: false,
                expanded: false,
            }),
            ChildrenState::Loaded(children) => {
                for child in children {
                    let item = match mirror.data(child) {
                        Some(node) => TreeItem::Node(node.clone()),
                        None => TreeItem::Unhydrated(child.clone()),
                    };
                    let expandable = self.policy.is_folder(&item, depth);
                    let expanded =
                        expandable && mirror.entry(child).map_or(false, |e| e.expanded);
                    rows.push(TreeRow {
                        item,
                        depth,
                        expandable,
                        expanded,
                    });
                    if expanded {
                        self.push_rows(mirror, child, depth + 1, rows);
                    }
                }
            }
        }
    }

    /// Fetch records for un-hydrated rows within `rows`; returns how many
    /// were filled in.
    pub async fn hydrate(&self, rows: Range<usize>) -> Result<usize, ApiError> {
        let missing: Vec<NodeID> = self
            .visible_rows()
            .into_iter()
            .skip(rows.start)
            .take(rows.end.saturating_sub(rows.start))
            .filter_map(|row| match row.item {
                TreeItem::Unhydrated(id) => Some(id),
                _ => None,
            })
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let results = join_all(missing.iter().map(|id| self.ensure_item(id))).await;
        let mut hydrated = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(_) => hydrated += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => {
                warn!(hydrated, error = %e, "Some rows could not be hydrated");
                Err(e)
            }
            None => Ok(hydrated),
        }
    }

    /// Rows inside the virtualization window for `scroll_offset`
    pub fn window(&self, view: &ViewConfig, scroll_offset: u32) -> (VisibleWindow, Vec<TreeRow>) {
        let rows = self.visible_rows();
        let window = compute_window(&WindowParams {
            scroll_offset,
            row_height: view.row_height,
            viewport_height: view.viewport_height,
            overscan: view.overscan,
            total_rows: rows.len(),
        });
        let visible = rows[window.range()].to_vec();
        (window, visible)
    }

    /// Optimistically move `id` under `new_parent_id`
    pub async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
        let mutation = {
            let mut mirror = self.mirror.write();
            let old_parent = mirror.entry(id).and_then(|e| e.parent_id.clone());
            let mut folders = vec![new_parent_id];
            if let Some(old) = old_parent.as_deref() {
                folders.push(old);
            }
            let snapshot = mirror.snapshot(id, &folders);
            mirror.apply_move(id, new_parent_id);
            self.record(
                MutationKind::Move {
                    id: id.to_string(),
                    new_parent_id: new_parent_id.to_string(),
                },
                snapshot,
            )
        };
        debug!(mutation, node_id = %id, new_parent = %new_parent_id, "Applied optimistic move");

        match self.source.move_node(id, new_parent_id).await {
            Ok(outcome) => {
                self.commit(mutation);
                info!(
                    mutation,
                    node_id = %id,
                    old_parent = %outcome.old_parent_id,
                    new_parent = %outcome.new_parent_id,
                    "Move committed"
                );
                self.reconcile(vec![
                    outcome.old_parent_id.clone(),
                    outcome.new_parent_id.clone(),
                ])
                .await;
                Ok(outcome)
            }
            Err(e) => {
                let stale = self.roll_back(mutation, e.clone());
                self.reconcile(stale).await;
                Err(e)
            }
        }
    }

    /// Optimistically rename `id`
    pub async fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError> {
        let mutation = {
            let mut mirror = self.mirror.write();
            let parent = mirror.entry(id).and_then(|e| e.parent_id.clone());
            let folders: Vec<&str> = parent.as_deref().into_iter().collect();
            let snapshot = mirror.snapshot(id, &folders);
            mirror.apply_rename(id, name, sort_key::encode(name).ok());
            self.record(
                MutationKind::Rename {
                    id: id.to_string(),
                    name: name.to_string(),
                },
                snapshot,
            )
        };
        debug!(mutation, node_id = %id, "Applied optimistic rename");

        match self.source.rename_node(id, name).await {
            Ok(outcome) => {
                self.commit(mutation);
                info!(mutation, node_id = %id, parent_id = %outcome.parent_id, "Rename committed");
                self.reconcile(vec![outcome.parent_id.clone()]).await;
                Ok(outcome)
            }
            Err(e) => {
                let stale = self.roll_back(mutation, e.clone());
                self.reconcile(stale).await;
                Err(e)
            }
        }
    }

    /// Last mutation failure, reported once
    pub fn take_error(&self) -> Option<ApiError> {
        self.last_error.lock().take()
    }

    /// State of a mutation, while its record is still kept
    pub fn mutation_state(&self, mutation: MutationId) -> Option<MutationState> {
        self.mutations
            .lock()
            .get(mutation)
            .map(|r| r.state().clone())
    }

    /// Pending mutations and the most recent settled ones, oldest first
    pub fn mutations(&self) -> Vec<MutationRecord> {
        self.mutations.lock().records()
    }

    fn record(&self, kind: MutationKind, snapshot: MirrorSnapshot) -> MutationId {
        self.mutations.lock().begin(kind, snapshot)
    }

    fn commit(&self, mutation: MutationId) {
        self.mutations.lock().commit(mutation);
    }

    /// Restore the mirror and re-apply the mutations still pending on top.
    /// Returns the folders that must be reloaded instead.
    fn roll_back(&self, mutation: MutationId, error: ApiError) -> Vec<NodeID> {
        let stale = {
            let mut mirror = self.mirror.write();
            let mut mutations = self.mutations.lock();
            let stale = mutations
                .roll_back(mutation, &mut mirror, error.clone())
                .unwrap_or_default();
            mirror.replay(&mutations.pending_kinds());
            stale
        };
        warn!(mutation, error = %error, stale = stale.len(), "Mutation failed, mirror rolled back");
        *self.last_error.lock() = Some(error);
        stale
    }

    /// Drop the cached listings of `folders` and reload the expanded ones
    async fn reconcile(&self, mut folders: Vec<NodeID>) {
        folders.sort_unstable();
        folders.dedup();
        let mut reload = Vec::new();
        {
            let mut mirror = self.mirror.write();
            for folder in folders {
                let Some(entry) = mirror.entry_mut(&folder) else {
                    continue;
                };
                entry.set_children(ChildrenState::Unloaded);
                self.inflight.cancel(&folder);
                if entry.expanded {
                    reload.push(folder);
                }
            }
        }

        for folder in reload {
            if let Err(e) = self.load_children(&folder, false).await {
                warn!(node_id = %folder, error = %e, "Reload after mutation failed");
            }
        }
    }
}

async fn fetch_children(
    source: &dyn TreeDataSource,
    id: &str,
    prefer_combined: bool,
) -> Result<Fetched, ApiError> {
    if prefer_combined && source.capabilities().children_with_data {
        match source.load_children_with_data(id).await {
            Ok(nodes) => return Ok(Fetched::WithData(nodes)),
            Err(e) => {
                warn!(node_id = %id, error = %e, "Combined children load failed, falling back to ids");
            }
        }
    }
    source.load_children(id).await.map(Fetched::IdsOnly)
}

/// Apply a finished fetch if it is still the folder's current load, then
/// re-apply pending mutations the response does not know about yet
fn settle_load(
    mirror: &RwLock<Mirror>,
    inflight: &InFlightLoads,
    mutations: &Mutex<MutationLog>,
    id: &str,
    token: u64,
    fetched: Result<Fetched, ApiError>,
) -> Result<ExpandOutcome, ApiError> {
    let mut mirror = mirror.write();
    inflight.finish(id, token);

    let current = matches!(
        mirror.entry(id).map(|e| e.children()),
        Some(ChildrenState::Loading { token: t }) if *t == token
    );
    if !current {
        debug!(node_id = %id, token, "Discarded stale children response");
        return Ok(ExpandOutcome::Discarded);
    }

    match fetched {
        Ok(Fetched::WithData(nodes)) => mirror.apply_children_with_data(id, nodes),
        Ok(Fetched::IdsOnly(ids)) => mirror.apply_children_ids(id, ids),
        Err(e) => {
            if let Some(entry) = mirror.entry_mut(id) {
                entry.set_children(ChildrenState::Unloaded);
            }
            return Err(e);
        }
    }
    mirror.replay(&mutations.lock().pending_kinds());
    Ok(ExpandOutcome::Loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local::LocalDataSource;
    use crate::client::presentation::item_name;
    use crate::client::source::SourceCapabilities;
    use crate::store::seed::demo_seed;
    use crate::store::NodeStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, Semaphore};

    #[derive(Default)]
    struct Behavior {
        no_combined: bool,
        combined_fails: bool,
        mutations_fail: bool,
        yield_items: bool,
        gate_id: Option<&'static str>,
    }

    /// Local source with call counters, injectable failures and a gate that
    /// holds requests for one id until released.
    struct TestSource {
        inner: LocalDataSource,
        behavior: Behavior,
        combined_calls: AtomicUsize,
        ids_calls: AtomicUsize,
        item_calls: AtomicUsize,
        gate: Semaphore,
        started: Notify,
    }

    impl TestSource {
        fn new(store: Arc<NodeStore>, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                inner: LocalDataSource::new(store),
                behavior,
                combined_calls: AtomicUsize::new(0),
                ids_calls: AtomicUsize::new(0),
                item_calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                started: Notify::new(),
            })
        }

        async fn wait_gate(&self, id: &str) {
            if self.behavior.gate_id == Some(id) {
                self.started.notify_one();
                self.gate.acquire().await.unwrap().forget();
            }
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl TreeDataSource for TestSource {
        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities {
                children_with_data: !self.behavior.no_combined,
            }
        }

        async fn load_item(&self, id: &str) -> Result<Node, ApiError> {
            self.item_calls.fetch_add(1, Ordering::SeqCst);
            if self.behavior.yield_items {
                tokio::task::yield_now().await;
            }
            self.inner.load_item(id).await
        }

        async fn load_children(&self, id: &str) -> Result<Vec<NodeID>, ApiError> {
            self.ids_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate(id).await;
            self.inner.load_children(id).await
        }

        async fn load_children_with_data(&self, id: &str) -> Result<Vec<Node>, ApiError> {
            self.combined_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate(id).await;
            if self.behavior.combined_fails {
                return Err(ApiError::RequestFailed("connection reset".into()));
            }
            self.inner.load_children_with_data(id).await
        }

        async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
            self.wait_gate(id).await;
            if self.behavior.mutations_fail {
                return Err(ApiError::RequestFailed("backend unavailable".into()));
            }
            self.inner.move_node(id, new_parent_id).await
        }

        async fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError> {
            self.wait_gate(id).await;
            if self.behavior.mutations_fail {
                return Err(ApiError::RequestFailed("backend unavailable".into()));
            }
            self.inner.rename_node(id, name).await
        }
    }

    fn setup(behavior: Behavior) -> (Arc<NodeStore>, Arc<TestSource>, TreeAdapter) {
        setup_with(behavior, AdapterConfig::default())
    }

    fn setup_with(
        behavior: Behavior,
        config: AdapterConfig,
    ) -> (Arc<NodeStore>, Arc<TestSource>, TreeAdapter) {
        let store = Arc::new(NodeStore::from_seed(&demo_seed()).unwrap());
        let source = TestSource::new(store.clone(), behavior);
        let adapter = TreeAdapter::new(source.clone(), &config);
        (store, source, adapter)
    }

    fn row_ids(adapter: &TreeAdapter) -> Vec<String> {
        adapter
            .visible_rows()
            .iter()
            .map(|r| r.item.id().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_expand_root_loads_once() {
        let (_, source, adapter) = setup(Behavior::default());

        assert_eq!(adapter.expand(ROOT_ID).await.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(
            row_ids(&adapter),
            vec!["analytics", "finance", "q-readme", "scratch"]
        );
        assert_eq!(
            adapter.expand(ROOT_ID).await.unwrap(),
            ExpandOutcome::AlreadyLoaded
        );
        assert_eq!(source.combined_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.ids_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_expands_share_one_fetch() {
        let (_, source, adapter) = setup(Behavior {
            gate_id: Some("analytics"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        let before = source.combined_calls.load(Ordering::SeqCst);

        let (first, second, _) = tokio::join!(
            adapter.expand("analytics"),
            adapter.expand("analytics"),
            async {
                source.started.notified().await;
                assert!(adapter.is_loading("analytics"));
                source.release();
            }
        );

        assert_eq!(first.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(second.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(source.combined_calls.load(Ordering::SeqCst), before + 1);
        assert!(!adapter.is_loading("analytics"));
    }

    #[tokio::test]
    async fn test_placeholder_shown_while_loading() {
        let (_, source, adapter) = setup(Behavior {
            gate_id: Some("analytics"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();

        let (outcome, _) = tokio::join!(adapter.expand("analytics"), async {
            source.started.notified().await;
            let rows = adapter.visible_rows();
            let loading: Vec<&TreeRow> = rows.iter().filter(|r| r.item.is_placeholder()).collect();
            assert_eq!(loading.len(), 1);
            assert_eq!(loading[0].depth, 1);
            assert_eq!(item_name(&loading[0].item), crate::types::PLACEHOLDER_LABEL);
            assert_eq!(rows[1].item.id(), crate::types::PLACEHOLDER_ID);
            source.release();
        });

        assert_eq!(outcome.unwrap(), ExpandOutcome::Loaded);
        let rows = adapter.visible_rows();
        assert!(rows.iter().all(|r| !r.item.is_placeholder()));
        assert_eq!(
            row_ids(&adapter)[..4],
            ["analytics", "analytics-daily", "q-retention", "q-funnel"]
        );
    }

    #[tokio::test]
    async fn test_collapse_discards_in_flight_response() {
        let (_, source, adapter) = setup(Behavior {
            gate_id: Some("analytics"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();

        let (outcome, _) = tokio::join!(adapter.expand("analytics"), async {
            source.started.notified().await;
            adapter.collapse("analytics");
            source.release();
        });

        assert_eq!(outcome.unwrap(), ExpandOutcome::Discarded);
        assert_eq!(adapter.children("analytics"), None);
        assert!(!adapter.is_expanded("analytics"));
        assert_eq!(row_ids(&adapter).len(), 4);

        source.release();
        assert_eq!(adapter.expand("analytics").await.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(adapter.children("analytics").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_combined_failure_falls_back_to_ids() {
        let (_, source, adapter) = setup(Behavior {
            combined_fails: true,
            ..Behavior::default()
        });

        assert_eq!(adapter.expand(ROOT_ID).await.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(source.combined_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.ids_calls.load(Ordering::SeqCst), 1);

        let rows = adapter.visible_rows();
        assert!(rows.iter().all(|r| matches!(r.item, TreeItem::Unhydrated(_))));
        assert_eq!(item_name(&rows[0].item), "analytics");
        assert!(!rows[0].expandable);

        assert_eq!(adapter.hydrate(0..2).await.unwrap(), 2);
        let rows = adapter.visible_rows();
        assert_eq!(item_name(&rows[0].item), "Analytics");
        assert!(rows[0].expandable);
        assert!(matches!(rows[2].item, TreeItem::Unhydrated(_)));
        assert_eq!(source.item_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_source_without_combined_uses_ids() {
        let (_, source, adapter) = setup(Behavior {
            no_combined: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        assert_eq!(source.combined_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.ids_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expand_hydrates_unknown_folder_first() {
        let (_, source, adapter) = setup(Behavior {
            no_combined: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        assert_eq!(adapter.expand("analytics").await.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(source.item_calls.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.item("analytics").unwrap().name, "Analytics");
    }

    #[tokio::test]
    async fn test_depth_policy_blocks_deep_folders() {
        let (store, _, adapter) = setup_with(
            Behavior::default(),
            AdapterConfig {
                max_folder_depth: 2,
                ..AdapterConfig::default()
            },
        );
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        adapter.expand("analytics-daily").await.unwrap();

        assert_eq!(
            adapter.expand("analytics-daily-old").await.unwrap(),
            ExpandOutcome::NotExpandable
        );
        let row = adapter
            .visible_rows()
            .into_iter()
            .find(|r| r.item.id() == "analytics-daily-old")
            .unwrap();
        assert_eq!(row.depth, 2);
        assert!(!row.expandable);
        assert!(store.get_item("analytics-daily-old").unwrap().is_folder());

        assert_eq!(adapter.expand("q-readme").await.unwrap(), ExpandOutcome::NotExpandable);
    }

    #[tokio::test]
    async fn test_move_applies_before_server_replies() {
        let (store, source, adapter) = setup(Behavior {
            gate_id: Some("q-funnel"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        adapter.expand("finance").await.unwrap();

        let (result, _) = tokio::join!(adapter.move_node("q-funnel", "finance"), async {
            source.started.notified().await;
            assert_eq!(
                adapter.item("q-funnel").unwrap().parent_id.as_deref(),
                Some("finance")
            );
            assert!(!adapter.children("analytics").unwrap().contains(&"q-funnel".to_string()));
            assert_eq!(adapter.mutation_state(1), Some(MutationState::Pending));
            assert_eq!(store.get_parent_id("q-funnel").unwrap().as_deref(), Some("analytics"));
            source.release();
        });

        let outcome = result.unwrap();
        assert_eq!(outcome.old_parent_id, "analytics");
        assert_eq!(outcome.new_parent_id, "finance");
        assert_eq!(adapter.mutation_state(1), Some(MutationState::Committed));
        assert_eq!(
            adapter.children("finance").unwrap(),
            store.get_children_ids("finance").unwrap()
        );
        assert!(adapter.take_error().is_none());
    }

    #[tokio::test]
    async fn test_move_success_reloads_only_affected_folders() {
        let (_, source, adapter) = setup(Behavior::default());
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        adapter.expand("scratch").await.unwrap();
        let before = source.combined_calls.load(Ordering::SeqCst);

        adapter.move_node("q-funnel", "finance").await.unwrap();

        // analytics is expanded and reloads; finance is only invalidated
        assert_eq!(source.combined_calls.load(Ordering::SeqCst), before + 1);
        assert_eq!(adapter.children("finance"), None);
        assert_eq!(
            adapter.children("analytics").unwrap(),
            vec!["analytics-daily", "q-retention"]
        );
        assert!(adapter.children("scratch").is_some());
    }

    #[tokio::test]
    async fn test_failed_move_rolls_back() {
        let (store, _, adapter) = setup(Behavior {
            mutations_fail: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        let before = adapter.visible_rows();

        let err = adapter.move_node("q-funnel", ROOT_ID).await.unwrap_err();
        assert_eq!(err, ApiError::RequestFailed("backend unavailable".into()));
        assert_eq!(adapter.visible_rows(), before);
        assert_eq!(store.get_parent_id("q-funnel").unwrap().as_deref(), Some("analytics"));
        assert!(matches!(
            adapter.mutation_state(1),
            Some(MutationState::RolledBack { .. })
        ));
        assert_eq!(adapter.take_error(), Some(err));
        assert_eq!(adapter.take_error(), None);
    }

    #[tokio::test]
    async fn test_rejected_cycle_rolls_back() {
        let (_, _, adapter) = setup(Behavior::default());
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        let before = adapter.visible_rows();

        let err = adapter
            .move_node("analytics", "analytics-daily")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidMove(_)));
        assert_eq!(adapter.visible_rows(), before);
        assert_eq!(adapter.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_repositions_and_commits() {
        let (store, _, adapter) = setup(Behavior::default());
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();

        let outcome = adapter.rename_node("q-funnel", "Aardvark").await.unwrap();
        assert_eq!(outcome.parent_id, "analytics");
        assert_eq!(
            adapter.children("analytics").unwrap(),
            vec!["q-funnel", "analytics-daily", "q-retention"]
        );
        assert_eq!(store.get_item("q-funnel").unwrap().name, "Aardvark");
        assert_eq!(adapter.item("q-funnel").unwrap().name, "Aardvark");
    }

    #[tokio::test]
    async fn test_failed_rename_rolls_back() {
        let (_, _, adapter) = setup(Behavior::default());
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();
        let before = adapter.visible_rows();

        let err = adapter.rename_node("q-funnel", "").await.unwrap_err();
        assert_eq!(err, ApiError::EmptyName);
        assert_eq!(adapter.visible_rows(), before);
        assert_eq!(adapter.item("q-funnel").unwrap().name, "Signup funnel");
        assert_eq!(adapter.take_error(), Some(ApiError::EmptyName));
    }

    #[tokio::test]
    async fn test_window_slices_rows() {
        let (_, _, adapter) = setup(Behavior::default());
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();

        let view = ViewConfig {
            row_height: 10,
            viewport_height: 20,
            overscan: 1,
        };
        let (window, rows) = adapter.window(&view, 20);
        assert_eq!(window.range(), 1..5);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].item.id(), "analytics-daily");
    }

    #[tokio::test]
    async fn test_concurrent_expands_of_unhydrated_folder_fetch_once() {
        let (_, source, adapter) = setup(Behavior {
            no_combined: true,
            yield_items: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        assert!(adapter.item("analytics").is_none());

        let (first, second) = tokio::join!(adapter.expand("analytics"), adapter.expand("analytics"));
        for outcome in [first.unwrap(), second.unwrap()] {
            assert!(matches!(
                outcome,
                ExpandOutcome::Loaded | ExpandOutcome::AlreadyLoaded
            ));
        }
        assert_eq!(source.item_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.ids_calls.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.item("analytics").unwrap().name, "Analytics");
    }

    #[tokio::test]
    async fn test_hydrate_joins_item_fetch_started_by_expand() {
        let (_, source, adapter) = setup(Behavior {
            no_combined: true,
            yield_items: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();

        let (expanded, hydrated) = tokio::join!(adapter.expand("analytics"), adapter.hydrate(0..1));
        assert_eq!(expanded.unwrap(), ExpandOutcome::Loaded);
        assert_eq!(hydrated.unwrap(), 1);
        assert_eq!(source.item_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collapse_while_item_loads_wins() {
        let (_, source, adapter) = setup(Behavior {
            no_combined: true,
            yield_items: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();

        let (outcome, _) = tokio::join!(adapter.expand("analytics"), async {
            adapter.collapse("analytics");
        });

        assert_eq!(outcome.unwrap(), ExpandOutcome::Discarded);
        assert!(!adapter.is_expanded("analytics"));
        assert_eq!(adapter.children("analytics"), None);
        assert_eq!(source.ids_calls.load(Ordering::SeqCst), 1);
        assert_eq!(row_ids(&adapter).len(), 4);
    }

    #[tokio::test]
    async fn test_failed_move_does_not_restore_listing_reloaded_meanwhile() {
        let (store, source, adapter) = setup(Behavior {
            gate_id: Some("q-funnel"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();

        // the move targets a file, so the source rejects it once released
        let (moved, _) = tokio::join!(adapter.move_node("q-funnel", "q-readme"), async {
            source.started.notified().await;
            adapter.rename_node("q-retention", "Aaa").await.unwrap();
            // the reload for the rename keeps the pending move applied
            assert_eq!(
                adapter.children("analytics").unwrap(),
                vec!["q-retention", "analytics-daily"]
            );
            assert_eq!(adapter.item("q-retention").unwrap().name, "Aaa");
            source.release();
        });

        assert!(matches!(moved, Err(ApiError::InvalidMove(_))));
        assert_eq!(
            adapter.children("analytics").unwrap(),
            store.get_children_ids("analytics").unwrap()
        );
        assert_eq!(
            adapter.children("analytics").unwrap(),
            vec!["q-retention", "analytics-daily", "q-funnel"]
        );
        assert_eq!(
            adapter.item("q-funnel").unwrap().parent_id.as_deref(),
            Some("analytics")
        );
        assert!(matches!(
            adapter.mutation_state(1),
            Some(MutationState::RolledBack { .. })
        ));
        assert_eq!(adapter.mutation_state(2), Some(MutationState::Committed));
    }

    #[tokio::test]
    async fn test_rollback_keeps_other_pending_rename() {
        let (store, source, adapter) = setup(Behavior {
            gate_id: Some("q-funnel"),
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();
        adapter.expand("analytics").await.unwrap();

        let (renamed, failed) = tokio::join!(adapter.rename_node("q-funnel", "Aardvark"), async {
            source.started.notified().await;
            let failed = adapter.rename_node("q-retention", "").await;
            // the failed rename restored its snapshot without undoing the held one
            assert_eq!(
                adapter.children("analytics").unwrap(),
                vec!["q-funnel", "analytics-daily", "q-retention"]
            );
            source.release();
            failed
        });

        assert_eq!(failed.unwrap_err(), ApiError::EmptyName);
        renamed.unwrap();
        assert_eq!(
            adapter.children("analytics").unwrap(),
            store.get_children_ids("analytics").unwrap()
        );
    }

    #[tokio::test]
    async fn test_settled_mutation_history_is_bounded() {
        let (_, _, adapter) = setup(Behavior {
            mutations_fail: true,
            ..Behavior::default()
        });
        adapter.expand(ROOT_ID).await.unwrap();

        let total = SETTLED_MUTATION_HISTORY as u64 + 6;
        for _ in 0..total {
            assert!(adapter.rename_node("scratch", "Scratchpad").await.is_err());
        }

        let records = adapter.mutations();
        assert_eq!(records.len(), SETTLED_MUTATION_HISTORY);
        assert_eq!(records.last().map(|r| r.id), Some(total));
        assert_eq!(adapter.mutation_state(1), None);
        assert!(matches!(
            adapter.mutation_state(total),
            Some(MutationState::RolledBack { .. })
        ));
        assert_eq!(adapter.item("scratch").unwrap().name, "Scratch");
    }
}
