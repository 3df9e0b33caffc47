use std::fs;

use querytree::error::ApiError;
use querytree::tooling::cli::{CliContext, Commands};
use tempfile::TempDir;

fn context_with_seed(temp_dir: &TempDir, file: &str, contents: &str) -> CliContext {
    let workspace_root = temp_dir.path().join("workspace");
    fs::create_dir_all(&workspace_root).unwrap();
    let seed = workspace_root.join(file);
    fs::write(&seed, contents).unwrap();
    CliContext::new(workspace_root, None, Some(seed)).unwrap()
}

const JSON_SEED: &str = r#"{
  "rootName": "Team queries",
  "nodes": [
    { "id": "q10", "parentId": "ops", "kind": "file", "name": "Step 10" },
    { "id": "ops", "kind": "folder", "name": "Ops" },
    { "id": "q9", "parentId": "ops", "kind": "file", "name": "step 9" }
  ]
}"#;

#[test]
fn item_json_contract_has_camel_case_fields() {
    let temp_dir = TempDir::new().unwrap();
    let cli = context_with_seed(&temp_dir, "seed.json", JSON_SEED);

    let output = cli
        .execute(&Commands::Item {
            id: Some("q10".to_string()),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["id"], "q10");
    assert_eq!(parsed["parentId"], "ops");
    assert_eq!(parsed["kind"], "file");
    assert_eq!(parsed["name"], "Step 10");
    assert!(parsed["sortKey"].as_str().is_some());
}

#[test]
fn root_item_uses_seed_root_name() {
    let temp_dir = TempDir::new().unwrap();
    let cli = context_with_seed(&temp_dir, "seed.json", JSON_SEED);
    let output = cli.execute(&Commands::Item { id: None }).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["name"], "Team queries");
    assert!(parsed["parentId"].is_null());
}

#[test]
fn children_follow_natural_order_from_toml_seed() {
    let temp_dir = TempDir::new().unwrap();
    let cli = context_with_seed(
        &temp_dir,
        "seed.toml",
        r#"
[[nodes]]
id = "ops"
kind = "folder"
name = "Ops"

[[nodes]]
id = "q10"
parentId = "ops"
kind = "file"
name = "Step 10"

[[nodes]]
id = "q9"
parentId = "ops"
kind = "file"
name = "step 9"
"#,
    );
    let output = cli
        .execute(&Commands::Children {
            id: Some("ops".to_string()),
            with_data: false,
            format: "json".to_string(),
        })
        .unwrap();
    let ids: Vec<String> = serde_json::from_str(&output).unwrap();
    assert_eq!(ids, vec!["q9", "q10"]);
}

#[test]
fn rename_contract_and_error_status() {
    let temp_dir = TempDir::new().unwrap();
    let cli = context_with_seed(&temp_dir, "seed.json", JSON_SEED);

    let output = cli
        .execute(&Commands::Rename {
            id: "q9".to_string(),
            name: "Step 11".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["ok"], true);
    assert_eq!(parsed["parentId"], "ops");

    let err = cli
        .execute(&Commands::Rename {
            id: "q9".to_string(),
            name: format!("q{}", "1".repeat(40)),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::Remote { status: 400, .. }));
}

#[test]
fn workspace_config_sets_seed_and_depth() {
    let temp_dir = TempDir::new().unwrap();
    let workspace_root = temp_dir.path().to_path_buf();
    fs::write(workspace_root.join("tree.json"), JSON_SEED).unwrap();
    fs::write(
        workspace_root.join("querytree.toml"),
        "[tree]\nseed_path = \"tree.json\"\n\n[adapter]\nmax_folder_depth = 1\n",
    )
    .unwrap();

    let cli = CliContext::new(workspace_root, None, None).unwrap();
    assert_eq!(cli.config().adapter.max_folder_depth, 1);
    let output = cli
        .execute(&Commands::Tree {
            expand: vec!["ops".to_string()],
            expand_all: false,
            scroll: 0,
            remote: false,
        })
        .unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["▾ Ops", "    step 9", "    Step 10", "rows 1-3 of 3"]);
}

#[test]
fn unknown_seed_extension_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let seed = temp_dir.path().join("seed.ini");
    fs::write(&seed, "").unwrap();
    let result = CliContext::new(temp_dir.path().to_path_buf(), None, Some(seed));
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}
