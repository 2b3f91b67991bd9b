use super::*;

use scoped_fs_search::{Error, PolicyConfig};

fn json_contains_string(value: &serde_json::Value, needle: &str) -> bool {
    match value {
        serde_json::Value::String(text) => text.contains(needle),
        serde_json::Value::Array(values) => values.iter().any(|v| json_contains_string(v, needle)),
        serde_json::Value::Object(map) => map.values().any(|v| json_contains_string(v, needle)),
        _ => false,
    }
}

fn fixture() -> (tempfile::TempDir, Context) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("docs")).expect("mkdir");
    std::fs::write(dir.path().join("docs").join("a.txt"), "alpha\nneedle\n").expect("write");
    std::fs::write(dir.path().join("b.md"), "needle\n").expect("write");
    let ctx = Context::new(PolicyConfig::single_root(dir.path())).expect("ctx");
    (dir, ctx)
}

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["scoped-fs-search", "--policy", "policy.toml"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("parse")
}

#[test]
fn traversal_flags_map_onto_options() {
    let cli = parse(&[
        "list",
        "docs",
        "--strategy",
        "dfs",
        "--max-depth",
        "2",
        "--page",
        "1",
        "--page-size",
        "5",
        "--time-limit",
        "-1",
        "--include-hidden",
        "--files-only",
    ]);
    let Command::List { path, traversal } = cli.command else {
        panic!("expected list");
    };
    assert_eq!(path, "docs");
    let options = TraversalOptions::from(traversal);
    assert_eq!(options.strategy, Strategy::DepthFirst);
    assert_eq!(options.max_depth, Some(2));
    assert_eq!(options.page_index, 1);
    assert_eq!(options.page_size, 5);
    assert_eq!(options.time_limit_seconds, Some(-1.0));
    assert_eq!(options.include_hidden, Some(true));
    assert!(options.files_only);
    assert!(!options.absolute_paths);
}

#[test]
fn path_defaults_to_the_first_root() {
    let cli = parse(&["grep", "needle", "-C", "2"]);
    let Command::Grep { path, context, .. } = cli.command else {
        panic!("expected grep");
    };
    assert_eq!(path, ".");
    assert_eq!(context, 2);
}

#[test]
fn repeated_patterns_are_collected() {
    let cli = parse(&["find", "^a", "docs", "-e", "^b", "--exclude", "tmp", "--exclude", "old"]);
    let Command::Find {
        pattern,
        extra_patterns,
        exclude,
        ..
    } = cli.command
    else {
        panic!("expected find");
    };
    assert_eq!(with_extra(pattern, extra_patterns), vec!["^a", "^b"]);
    assert_eq!(exclude, vec!["tmp", "old"]);
}

#[test]
fn execute_runs_batches() {
    let (_dir, ctx) = fixture();

    let value = execute(&ctx, parse(&["read-files", "b.md", "../x.txt"]).command)
        .expect("read-files");
    assert_eq!(value["results"][0]["ok"]["content"], serde_json::json!("needle\n"));
    assert_eq!(
        value["results"][1]["error"]["code"],
        serde_json::json!("access_denied")
    );

    let value = execute(
        &ctx,
        parse(&["grep-files", "alpha", "docs/a.txt", "b.md", "-e", "needle"]).command,
    )
    .expect("grep-files");
    let first = value["results"][0]["ok"]["matches"].as_array().expect("matches");
    assert_eq!(first.len(), 2);
    assert_eq!(
        value["results"][1]["ok"]["matches"][0]["file_path"],
        serde_json::json!("b.md")
    );
}

#[test]
fn path_type_requires_at_least_one_path() {
    let err = Cli::try_parse_from(["scoped-fs-search", "--policy", "p.toml", "path-type"])
        .expect_err("missing paths");
    assert!(err.to_string().contains("<PATHS>"), "{err}");
}

#[test]
fn execute_lists_and_searches() {
    let (_dir, ctx) = fixture();

    let value = execute(&ctx, parse(&["list", "--files-only"]).command).expect("list");
    let paths = value["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["path"].as_str().expect("path").to_string())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["b.md".to_string(), "docs/a.txt".to_string()]);
    assert_eq!(value["has_more"], serde_json::json!(false));

    let value = execute(&ctx, parse(&["grep", "needle", "--file-glob", "**/*.txt"]).command)
        .expect("grep");
    assert_eq!(value["items"][0]["file_path"], serde_json::json!("docs/a.txt"));
    assert_eq!(value["items"][0]["line_number"], serde_json::json!(2));
    assert_eq!(value["scanned_files"], serde_json::json!(1));

    let value = execute(&ctx, parse(&["find", "md$"]).command).expect("find");
    assert_eq!(value["items"][0]["path"], serde_json::json!("b.md"));

    let value = execute(&ctx, parse(&["read", "docs/a.txt", "--max-chars", "5"]).command)
        .expect("read");
    assert_eq!(value["content"], serde_json::json!("alpha"));
    assert_eq!(value["truncated"], serde_json::json!(true));

    let value = execute(&ctx, parse(&["path-type", "docs", "nope"]).command).expect("types");
    assert_eq!(value[0]["kind"], serde_json::json!("directory"));
    assert_eq!(value[1]["kind"], serde_json::json!("not_accessible"));
}

#[test]
fn json_errors_do_not_reveal_denial_reasons() {
    let (dir, ctx) = fixture();
    let err = execute(&ctx, parse(&["read", "../outside.txt"]).command).expect_err("denied");
    let rendered = render_json_error(&err);
    assert_eq!(rendered["error"]["code"], serde_json::json!("access_denied"));
    assert_eq!(
        rendered["error"]["message"],
        serde_json::json!("path is not accessible: ../outside.txt")
    );
    assert_eq!(
        rendered["error"]["details"],
        serde_json::json!({ "kind": "access_denied" })
    );
    assert!(!json_contains_string(
        &rendered,
        &dir.path().to_string_lossy()
    ));
}

#[test]
fn json_error_details_carry_structured_fields() {
    let err = CliError::from(Error::InvalidPattern {
        pattern: "(".to_string(),
        message: "unclosed group".to_string(),
    });
    let rendered = render_json_error(&err);
    assert_eq!(rendered["error"]["code"], serde_json::json!("invalid_pattern"));
    assert_eq!(rendered["error"]["details"]["pattern"], serde_json::json!("("));

    let err = CliError::from(Error::TimeLimitExceeded {
        limit_ms: 10,
        elapsed_ms: 12,
    });
    let rendered = render_json_error(&err);
    let details = &rendered["error"]["details"];
    assert_eq!(details["kind"], serde_json::json!("time_limit_exceeded"));
    assert_eq!(details["limit_ms"], serde_json::json!(10));
}

#[test]
fn json_serialization_errors_have_their_own_code() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
    let err = CliError::from(json_err);
    assert_eq!(err.code(), "json");
    let rendered = render_json_error(&err);
    assert!(rendered["error"].get("details").is_none());
}

#[test]
fn run_reports_missing_policy_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let policy = dir.path().join("missing.toml").to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["scoped-fs-search", "--policy", policy.as_str(), "roots"])
        .expect("parse");
    let err = run(cli).expect_err("missing policy");
    assert_eq!(err.code(), "io");
}
