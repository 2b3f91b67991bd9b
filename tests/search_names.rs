mod common;

use common::{names, test_context, write_file};
use scoped_fs_search::{ErrorKind, SearchNamesRequest, Strategy};

fn tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(dir.path(), "notes.md", "n");
    write_file(dir.path(), "src/lib.rs", "l");
    write_file(dir.path(), "src/main.rs", "m");
    write_file(dir.path(), "target/debug/build.rs", "b");
    write_file(dir.path(), "docs/readme.md", "r");
    dir
}

#[test]
fn pattern_is_searched_in_entry_names() {
    let dir = tree();
    let ctx = test_context(dir.path());

    let page = ctx
        .search_file_names(SearchNamesRequest::new(".", r"\.rs$"))
        .expect("search");
    assert_eq!(
        names(&page.items),
        vec!["src/lib.rs", "src/main.rs", "target/debug/build.rs"]
    );

    // Unanchored: a match anywhere in the name counts.
    let page = ctx
        .search_file_names(SearchNamesRequest::new(".", "read"))
        .expect("search");
    assert_eq!(names(&page.items), vec!["docs/readme.md"]);
}

#[test]
fn directories_match_too() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let page = ctx
        .search_file_names(SearchNamesRequest::new(".", "^(src|docs)$"))
        .expect("search");
    assert_eq!(names(&page.items), vec!["docs", "src"]);
    assert!(page.items.iter().all(|item| item.is_directory));
}

#[test]
fn exclude_pattern_prunes_whole_subtrees() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let mut req = SearchNamesRequest::new(".", r"\.rs$");
    req.exclude_patterns = vec!["^target$".to_string()];
    let page = ctx.search_file_names(req).expect("search");
    assert_eq!(names(&page.items), vec!["src/lib.rs", "src/main.rs"]);

    let mut req = SearchNamesRequest::new(".", r"\.(rs|md)$");
    req.exclude_patterns = vec!["^target$".to_string(), "^main".to_string(), String::new()];
    let page = ctx.search_file_names(req).expect("search");
    assert_eq!(
        names(&page.items),
        vec!["notes.md", "docs/readme.md", "src/lib.rs"]
    );
}

#[test]
fn any_of_several_patterns_matches() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let mut req = SearchNamesRequest::new(".", "^lib");
    req.patterns.push("^notes".to_string());
    let page = ctx.search_file_names(req).expect("search");
    assert_eq!(names(&page.items), vec!["notes.md", "src/lib.rs"]);

    let mut req = SearchNamesRequest::new(".", "ok");
    req.patterns.clear();
    let err = ctx.search_file_names(req).expect_err("no patterns");
    assert_eq!(err.kind(), ErrorKind::InvalidPattern);
}

#[test]
fn requests_accept_one_pattern_or_a_list() {
    let req: SearchNamesRequest =
        serde_json::from_str(r#"{"path": "src", "pattern": "\\.rs$", "exclude_pattern": "^t"}"#)
            .expect("single");
    assert_eq!(req.patterns, vec![r"\.rs$".to_string()]);
    assert_eq!(req.exclude_patterns, vec!["^t".to_string()]);

    let req: SearchNamesRequest =
        serde_json::from_str(r#"{"patterns": ["a", "b"], "page_size": 5}"#).expect("list");
    assert_eq!(req.patterns, vec!["a".to_string(), "b".to_string()]);
    assert!(req.exclude_patterns.is_empty());
    assert_eq!(req.traversal.page_size, 5);
}

#[test]
fn search_respects_strategy_and_depth() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let mut req = SearchNamesRequest::new(".", r"\.(rs|md)$");
    req.traversal.strategy = Strategy::DepthFirst;
    req.traversal.max_depth = Some(1);
    let page = ctx.search_file_names(req).expect("search");
    assert_eq!(
        names(&page.items),
        vec!["docs/readme.md", "notes.md", "src/lib.rs", "src/main.rs"]
    );
}

#[test]
fn paging_applies_to_matches_only() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let mut req = SearchNamesRequest::new(".", r"\.rs$");
    req.traversal.page_size = 2;
    req.traversal.page_index = 1;
    let page = ctx.search_file_names(req).expect("search");
    assert_eq!(names(&page.items), vec!["target/debug/build.rs"]);
    assert!(!page.has_more);
    assert_eq!(page.total_items, Some(3));
}

#[test]
fn invalid_patterns_are_reported() {
    let dir = tree();
    let ctx = test_context(dir.path());
    let err = ctx
        .search_file_names(SearchNamesRequest::new(".", "("))
        .expect_err("invalid regex");
    assert_eq!(err.kind(), ErrorKind::InvalidPattern);
    assert_eq!(err.code(), "invalid_pattern");

    let mut req = SearchNamesRequest::new(".", "ok");
    req.exclude_patterns = vec!["[".to_string()];
    let err = ctx.search_file_names(req).expect_err("invalid exclude");
    assert_eq!(err.kind(), ErrorKind::InvalidPattern);

    let huge = "a".repeat(16 * 1024);
    let err = ctx
        .search_file_names(SearchNamesRequest::new(".", huge))
        .expect_err("pattern too large");
    assert_eq!(err.kind(), ErrorKind::InvalidPattern);
}

#[test]
fn hidden_names_are_not_matched() {
    let dir = tree();
    write_file(dir.path(), ".secret.rs", "s");
    let ctx = test_context(dir.path());
    let page = ctx
        .search_file_names(SearchNamesRequest::new(".", "secret"))
        .expect("search");
    assert!(page.items.is_empty());
}
