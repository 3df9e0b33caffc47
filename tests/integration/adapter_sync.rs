use std::sync::Arc;

use querytree::client::{
    item_name, ExpandOutcome, LocalDataSource, MutationState, TreeAdapter, TreeItem,
};
use querytree::config::AdapterConfig;
use querytree::store::seed::demo_seed;
use querytree::store::NodeStore;
use querytree::types::ROOT_ID;

fn adapter() -> (Arc<NodeStore>, Arc<TreeAdapter>) {
    let store = Arc::new(NodeStore::from_seed(&demo_seed()).unwrap());
    let source = Arc::new(LocalDataSource::new(store.clone()));
    let adapter = Arc::new(TreeAdapter::new(source, &AdapterConfig::default()));
    (store, adapter)
}

fn names(adapter: &TreeAdapter) -> Vec<String> {
    adapter
        .visible_rows()
        .iter()
        .map(|r| item_name(&r.item).to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_expands_from_tasks_settle_consistently() {
    let (store, adapter) = adapter();
    adapter.expand(ROOT_ID).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        for folder in ["analytics", "finance", "scratch"] {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move { adapter.expand(folder).await }));
        }
    }
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            ExpandOutcome::Loaded | ExpandOutcome::AlreadyLoaded
        ));
    }

    for folder in ["analytics", "finance", "scratch"] {
        assert_eq!(
            adapter.children(folder).unwrap(),
            store.get_children_ids(folder).unwrap()
        );
        assert!(!adapter.is_loading(folder));
    }
    assert!(adapter.visible_rows().iter().all(|r| !r.item.is_placeholder()));
}

#[tokio::test]
async fn mirror_matches_store_after_mixed_mutations() {
    let (store, adapter) = adapter();
    adapter.expand(ROOT_ID).await.unwrap();
    adapter.expand("analytics").await.unwrap();
    adapter.expand("analytics-daily").await.unwrap();
    adapter.expand("finance").await.unwrap();

    adapter.move_node("q-refunds", "analytics-daily").await.unwrap();
    adapter.rename_node("analytics-daily", "Zz daily").await.unwrap();
    assert!(adapter.move_node("analytics", "analytics-daily-old").await.is_err());
    adapter.move_node("q-readme", "finance").await.unwrap();

    for folder in [ROOT_ID, "analytics", "analytics-daily", "finance"] {
        assert_eq!(
            adapter.children(folder).unwrap(),
            store.get_children_ids(folder).unwrap(),
            "mirror diverged for {}",
            folder
        );
    }
    let states: Vec<bool> = adapter
        .mutations()
        .iter()
        .map(|m| matches!(m.state(), MutationState::Committed))
        .collect();
    assert_eq!(states, vec![true, true, false, true]);
    assert!(adapter.take_error().is_some());
    store.verify_invariants().unwrap();
}

#[tokio::test]
async fn rows_follow_natural_order_and_depth() {
    let (_, adapter) = adapter();
    adapter.expand(ROOT_ID).await.unwrap();
    adapter.expand("analytics").await.unwrap();
    adapter.expand("analytics-daily").await.unwrap();

    assert_eq!(
        names(&adapter),
        vec![
            "Analytics",
            "Daily",
            "Archive",
            "Report 1",
            "report 2",
            "report 10",
            "Retention cohort",
            "Signup funnel",
            "Finance",
            "README",
            "Scratch",
        ]
    );
    let depths: Vec<usize> = adapter.visible_rows().iter().map(|r| r.depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 2, 2, 2, 1, 1, 0, 0, 0]);

    adapter.collapse("analytics");
    assert_eq!(names(&adapter), vec!["Analytics", "Finance", "README", "Scratch"]);
    adapter.expand("analytics").await.unwrap();
    assert_eq!(names(&adapter).len(), 11);
}

#[tokio::test]
async fn load_fetches_item_and_children_directly() {
    let (_, adapter) = adapter();
    assert_eq!(adapter.load("finance").await.unwrap(), ExpandOutcome::Loaded);
    assert_eq!(adapter.item("finance").unwrap().name, "Finance");
    assert_eq!(
        adapter.children("finance").unwrap(),
        vec!["q-refunds", "q-revenue"]
    );
    assert!(!adapter.is_expanded("finance"));
    assert!(adapter.load("ghost").await.is_err());
    assert!(matches!(
        adapter.visible_rows().first().map(|r| &r.item),
        None | Some(TreeItem::Node(_))
    ));
}
