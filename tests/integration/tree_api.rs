use std::sync::Arc;

use querytree::api::{HttpRequest, TreeRouter};
use querytree::store::seed::demo_seed;
use querytree::store::NodeStore;
use querytree::types::ROOT_ID;
use serde_json::json;

fn router() -> (Arc<NodeStore>, TreeRouter) {
    let store = Arc::new(NodeStore::from_seed(&demo_seed()).unwrap());
    (store.clone(), TreeRouter::for_store(store))
}

fn path(endpoint: &str) -> String {
    format!("/api/fs-tree/{}", endpoint)
}

#[test]
fn natural_order_is_served_for_numbered_names() {
    let (_, router) = router();
    let response = router.handle(
        &HttpRequest::get(path("children-with-data")).with_query("id", "analytics-daily"),
    );
    assert!(response.is_success());
    let names: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Archive", "Report 1", "report 2", "report 10"]);
}

#[test]
fn children_ids_match_children_with_data() {
    let (_, router) = router();
    for folder in ["analytics", "finance", "scratch", ROOT_ID] {
        let ids = router.handle(&HttpRequest::get(path("children")).with_query("id", folder));
        let data = router
            .handle(&HttpRequest::get(path("children-with-data")).with_query("id", folder));
        let from_data: Vec<&str> = data
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap())
            .collect();
        let ids: Vec<&str> = ids
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(ids, from_data, "listing mismatch for {}", folder);
    }
}

#[test]
fn move_then_rename_round_trip_through_router() {
    let (store, router) = router();

    let moved = router.handle(&HttpRequest::post_json(
        path("move"),
        &json!({ "id": "q-revenue", "newParentId": "scratch" }),
    ));
    assert_eq!(moved.status, 200);
    assert_eq!(moved.body["oldParentId"], "finance");
    assert_eq!(moved.body["newParentId"], "scratch");

    let renamed = router.handle(&HttpRequest::post_json(
        path("rename"),
        &json!({ "id": "q-revenue", "name": "0 Revenue" }),
    ));
    assert_eq!(renamed.body["parentId"], "scratch");

    let listing = router.handle(&HttpRequest::get(path("children")).with_query("id", "scratch"));
    assert_eq!(listing.body[0], "q-revenue");

    let parent = router.handle(&HttpRequest::get(path("parent")).with_query("id", "q-revenue"));
    assert_eq!(parent.body, json!({ "parentId": "scratch" }));
    store.verify_invariants().unwrap();
}

#[test]
fn cycle_attempt_leaves_tree_untouched() {
    let (store, router) = router();
    let before = store.get_children_ids("analytics").unwrap();

    let response = router.handle(&HttpRequest::post_json(
        path("move"),
        &json!({ "id": "analytics", "newParentId": "analytics-daily-old" }),
    ));
    assert_eq!(response.status, 400);
    assert!(response.error_message().is_some());
    assert_eq!(store.get_children_ids("analytics").unwrap(), before);
    assert_eq!(store.get_parent_id("analytics").unwrap().as_deref(), Some(ROOT_ID));
}

#[test]
fn error_statuses_follow_failure_kind() {
    let (_, router) = router();
    let cases = [
        (HttpRequest::get(path("item")).with_query("id", "ghost"), 404),
        (HttpRequest::get(path("children")).with_query("id", "q-readme"), 404),
        (HttpRequest::get(path("parent")), 400),
        (HttpRequest::get(path("unknown")), 404),
        (HttpRequest::get(path("move")), 405),
        (
            HttpRequest::post_json(path("rename"), &json!({ "id": "q-tmp", "name": " " })),
            400,
        ),
        (
            HttpRequest::post_json(path("move"), &json!({ "id": ROOT_ID, "newParentId": "scratch" })),
            400,
        ),
    ];
    for (request, status) in cases {
        let response = router.handle(&request);
        assert_eq!(response.status, status, "{:?}", request);
        assert!(response.body.get("error").is_some());
    }
}
