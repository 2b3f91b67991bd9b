use std::fs;
use std::path::{Path, PathBuf};

use crate::policy::PolicyConfig;

use super::*;

fn context_for(root: &Path) -> Context {
    Context::new(PolicyConfig::single_root(root)).expect("ctx")
}

#[test]
fn resolve_maps_first_root_aliases_to_the_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context_for(dir.path());
    let canonical_root = dir.path().canonicalize().expect("canonicalize");

    for input in ["", ".", "./", "/"] {
        let resolved = ctx.resolve(input).expect("resolve");
        assert_eq!(resolved.path, canonical_root, "{input:?}");
        assert_eq!(resolved.display_relative(), ".", "{input:?}");
    }
}

#[test]
fn resolve_tries_roots_in_order() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");
    fs::write(second.path().join("only-second.txt"), "x").expect("write");
    fs::write(first.path().join("both.txt"), "1").expect("write");
    fs::write(second.path().join("both.txt"), "2").expect("write");

    let mut policy = PolicyConfig::single_root(first.path());
    policy.allowed_roots.push(second.path().to_path_buf());
    let ctx = Context::new(policy).expect("ctx");

    let resolved = ctx.resolve("only-second.txt").expect("resolve");
    assert_eq!(resolved.root, second.path().canonicalize().expect("canonicalize"));

    let resolved = ctx.resolve("both.txt").expect("resolve");
    assert_eq!(resolved.root, first.path().canonicalize().expect("canonicalize"));
}

#[test]
fn absolute_paths_outside_every_root_are_denied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root");
    fs::create_dir_all(root.join("etc")).expect("mkdir");
    fs::write(root.join("etc").join("hostname"), "inside-root\n").expect("write");
    fs::write(dir.path().join("outside.txt"), "o").expect("write");
    let ctx = context_for(&root);

    // An absolute path is never reinterpreted relative to a root.
    let outside = dir.path().join("etc").join("hostname");
    let err = ctx
        .resolve(&outside.to_string_lossy())
        .expect_err("missing outside path");
    assert_eq!(err.kind(), crate::ErrorKind::OutsideAllowedPaths);

    let existing = dir.path().join("outside.txt");
    let err = ctx
        .resolve(&existing.to_string_lossy())
        .expect_err("existing outside path");
    assert_eq!(err.kind(), crate::ErrorKind::OutsideAllowedPaths);
    assert_eq!(err.code(), crate::ACCESS_DENIED_CODE);

    let inside = root.join("etc").join("hostname");
    let resolved = ctx.resolve(&inside.to_string_lossy()).expect("inside");
    assert_eq!(resolved.relative, PathBuf::from("etc").join("hostname"));
}

#[test]
fn absolute_paths_in_nested_roots_resolve_under_the_first_root() {
    let outer = tempfile::tempdir().expect("tempdir");
    let inner = outer.path().join("inner");
    fs::create_dir(&inner).expect("mkdir");
    fs::write(inner.join("a.txt"), "a").expect("write");

    let mut policy = PolicyConfig::single_root(outer.path());
    policy.allowed_roots.push(inner.clone());
    let ctx = Context::new(policy).expect("ctx");

    let resolved = ctx
        .resolve(&inner.join("a.txt").to_string_lossy())
        .expect("resolve");
    assert_eq!(resolved.relative, PathBuf::from("inner").join("a.txt"));
}

#[test]
fn resolve_denials_share_one_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root");
    fs::create_dir_all(root.join("private")).expect("mkdir");
    fs::write(root.join(".env"), "SECRET=1").expect("write");
    fs::write(root.join("private").join("a.txt"), "a").expect("write");
    fs::write(dir.path().join("outside.txt"), "o").expect("write");

    let mut policy = PolicyConfig::single_root(&root);
    policy.excluded_roots.push(root.join("private"));
    let ctx = Context::new(policy).expect("ctx");

    for input in ["../outside.txt", "private/a.txt", ".env", "missing.txt"] {
        let err = ctx.resolve(input).expect_err("denied");
        assert!(err.is_access_denial(), "{input}: {err:?}");
        assert_eq!(err.code(), crate::ACCESS_DENIED_CODE, "{input}");
        assert_eq!(err.to_string(), format!("path is not accessible: {input}"));
    }
}

#[test]
fn hidden_paths_resolve_when_policy_allows_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(".env"), "x").expect("write");
    let mut policy = PolicyConfig::single_root(dir.path());
    policy.hide_hidden = false;
    let ctx = Context::new(policy).expect("ctx");

    ctx.resolve(".env").expect("resolve hidden");
    assert!(!ctx.hides_hidden(None));
    assert!(ctx.hides_hidden(Some(false)));
}

#[test]
fn masked_input_is_unmasked_before_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.txt"), "a").expect("write");
    let canonical = dir.path().canonicalize().expect("canonicalize");
    let secret = canonical
        .file_name()
        .and_then(|name| name.to_str())
        .expect("utf-8 tempdir name")
        .to_string();

    let mut policy = PolicyConfig::single_root(dir.path());
    policy.masker.enabled = true;
    policy.masker.mode = crate::policy::MaskMode::Segment;
    policy.masker.look_for = vec![secret.clone()];
    let ctx = Context::new(policy).expect("ctx");

    let masked_input = canonical
        .join("a.txt")
        .to_string_lossy()
        .replace(&secret, "MASK");
    let resolved = ctx.resolve(&masked_input).expect("resolve masked input");
    assert_eq!(resolved.path, canonical.join("a.txt"));

    let roots = ctx.get_allowed_paths();
    assert_eq!(roots.len(), 1);
    assert!(!roots[0].contains(&secret), "{}", roots[0]);
    assert!(roots[0].ends_with("MASK"), "{}", roots[0]);
}

#[test]
fn path_types_do_not_reveal_denied_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("sub")).expect("mkdir");
    fs::write(dir.path().join("a.txt"), "a").expect("write");
    fs::write(dir.path().join(".hidden"), "h").expect("write");
    let ctx = context_for(dir.path());

    let kinds = ctx
        .get_path_type(&[
            "a.txt".to_string(),
            "sub".to_string(),
            ".hidden".to_string(),
            "missing".to_string(),
        ])
        .into_iter()
        .map(|entry| (entry.path, entry.kind))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            ("a.txt".to_string(), PathKind::File),
            ("sub".to_string(), PathKind::Directory),
            (".hidden".to_string(), PathKind::NotAccessible),
            ("missing".to_string(), PathKind::NotAccessible),
        ]
    );
}

#[test]
#[cfg(unix)]
fn path_type_reports_symlinks_inside_the_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("target.txt"), "t").expect("write");
    std::os::unix::fs::symlink("target.txt", dir.path().join("link.txt")).expect("symlink");
    let ctx = context_for(dir.path());

    let kinds = ctx.get_path_type(&["link.txt".to_string()]);
    assert_eq!(kinds[0].kind, PathKind::Symlink);
}

#[test]
#[cfg(unix)]
fn content_search_skips_symlinked_files_that_leave_the_root() {
    let outside = tempfile::tempdir().expect("tempdir");
    fs::write(outside.path().join("secret.txt"), "needle\n").expect("write");
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("inside.txt"), "needle\n").expect("write");
    std::os::unix::fs::symlink("inside.txt", dir.path().join("alias.txt")).expect("symlink");
    std::os::unix::fs::symlink(
        outside.path().join("secret.txt"),
        dir.path().join("escape.txt"),
    )
    .expect("symlink");
    let ctx = context_for(dir.path());

    let response = ctx
        .search_file_contents(SearchContentsRequest::new(".", "needle"))
        .expect("search");
    let files = response
        .page
        .items
        .iter()
        .map(|item| item.file_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(files, vec!["alias.txt", "inside.txt"]);
    assert_eq!(response.scanned_files, 2);
}

#[test]
fn context_debug_does_not_print_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context_for(dir.path());
    let debug = format!("{ctx:?}");
    assert!(!debug.contains(&*dir.path().to_string_lossy()), "{debug}");
    assert!(debug.contains("extractors"), "{debug}");
}

#[test]
fn context_rejects_roots_that_are_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").expect("write");
    let err = Context::new(PolicyConfig::single_root(&file)).expect_err("file root");
    assert_eq!(err.code(), "invalid_policy");

    let err = Context::new(PolicyConfig::single_root(dir.path().join("missing")))
        .expect_err("missing root");
    assert_eq!(err.code(), "invalid_policy");
}
