use std::sync::Arc;
use std::thread;

use querytree::error::ApiError;
use querytree::store::NodeStore;
use querytree::tree::NewNode;
use querytree::types::ROOT_ID;

/// Two sibling chains whose tips are moved under each other from
/// different threads; at most one of each conflicting pair may win.
#[test]
fn crossing_moves_never_form_a_cycle() {
    for round in 0..50 {
        let store = Arc::new(NodeStore::new("Queries"));
        store.insert(NewNode::folder("a", ROOT_ID, "a")).unwrap();
        store.insert(NewNode::folder("b", ROOT_ID, "b")).unwrap();
        store.insert(NewNode::folder("a1", "a", "a1")).unwrap();
        store.insert(NewNode::folder("b1", "b", "b1")).unwrap();

        let left = {
            let store = store.clone();
            thread::spawn(move || store.move_node("a", "b1"))
        };
        let right = {
            let store = store.clone();
            thread::spawn(move || store.move_node("b", "a1"))
        };
        let results = [left.join().unwrap(), right.join().unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "round {}: {:?}", round, results);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ApiError::InvalidMove(_)))));
        store.verify_invariants().unwrap();
    }
}

#[test]
fn concurrent_renames_keep_listing_sorted() {
    let store = Arc::new(NodeStore::new("Queries"));
    for i in 0..20 {
        store
            .insert(NewNode::file(&format!("q{}", i), ROOT_ID, &format!("query {}", i)))
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for i in (worker..20).step_by(4) {
                    store
                        .rename_node(&format!("q{}", i), &format!("item {}", 100 - i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    store.verify_invariants().unwrap();
    let names: Vec<String> = store
        .get_children_with_data(ROOT_ID)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    let expected: Vec<String> = (81..=100).map(|n| format!("item {}", n)).collect();
    assert_eq!(names, expected);
}

#[test]
fn readers_never_observe_a_half_applied_move() {
    let store = Arc::new(NodeStore::new("Queries"));
    store.insert(NewNode::folder("left", ROOT_ID, "left")).unwrap();
    store.insert(NewNode::folder("right", ROOT_ID, "right")).unwrap();
    store.insert(NewNode::file("q", "left", "query")).unwrap();

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..500 {
                let target = if i % 2 == 0 { "right" } else { "left" };
                store.move_node("q", target).unwrap();
            }
        })
    };

    for _ in 0..500 {
        for folder in ["left", "right"] {
            for node in store.get_children_with_data(folder).unwrap() {
                assert_eq!(node.parent_id.as_deref(), Some(folder));
            }
        }
    }
    writer.join().unwrap();
    store.verify_invariants().unwrap();
    assert_eq!(store.get_parent_id("q").unwrap().as_deref(), Some("left"));
}
