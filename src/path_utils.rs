//! Path utilities used by path resolution and traversal.
//!
//! Everything here is **lexical**: nothing touches the filesystem or resolves symlinks.
//!
//! Invariants of `normalize_path_lexical`:
//! - Removes `.` segments.
//! - Resolves `..` against preceding *normal* segments when possible.
//! - Preserves leading `..` for relative paths (e.g. `../../a/../b` → `../../b`).
//! - For absolute paths, `..` cannot escape the filesystem root (e.g. `/../etc` → `/etc`).
//! - On Windows, preserves path prefixes (Disk/UNC/verbatim).
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

pub fn normalize_path_lexical(path: &Path) -> PathBuf {
    #[derive(Debug)]
    enum Segment {
        ParentDir,
        Normal(OsString),
    }

    let mut path_prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut segments: Vec<Segment> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(segments.last(), Some(Segment::Normal(_))) {
                    segments.pop();
                } else if !has_root {
                    segments.push(Segment::ParentDir);
                }
            }
            Component::Normal(part) => segments.push(Segment::Normal(part.to_os_string())),
            Component::RootDir => has_root = true,
            Component::Prefix(prefix_comp) => {
                path_prefix = Some(prefix_comp.as_os_str().to_os_string());
            }
        }
    }

    let mut out = PathBuf::new();
    if let Some(prefix) = path_prefix {
        out.push(Path::new(&prefix));
    }
    if has_root {
        if out.as_os_str().is_empty() {
            out.push(std::path::MAIN_SEPARATOR_STR);
        } else {
            // Pushing `RootDir` after a Windows `Prefix` would drop the prefix.
            out.as_mut_os_string().push(std::path::MAIN_SEPARATOR_STR);
        }
    }
    for segment in segments {
        match segment {
            Segment::ParentDir => out.push(".."),
            Segment::Normal(part) => out.push(part),
        }
    }

    if out.as_os_str().is_empty() && path.is_relative() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Names starting with `.` are hidden. `.` and `..` themselves are not entry names.
#[inline]
pub fn is_hidden_name(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    bytes.first() == Some(&b'.') && bytes != b"." && bytes != b".."
}

/// `true` when any normal component of the (root-relative) `path` is hidden.
pub fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => is_hidden_name(name),
        _ => false,
    })
}

/// Renders a root-relative path for callers, using `.` for the root itself.
pub fn display_relative(relative: &Path) -> String {
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.to_string_lossy().into_owned()
    }
}

#[cfg(windows)]
#[inline]
fn components_eq(a: Component<'_>, b: Component<'_>) -> bool {
    match (a, b) {
        (Component::Prefix(a), Component::Prefix(b)) => {
            a.as_os_str().eq_ignore_ascii_case(b.as_os_str())
        }
        (Component::Normal(a), Component::Normal(b)) => a.eq_ignore_ascii_case(b),
        (a, b) => a == b,
    }
}

#[inline]
fn normalized_for_boundary(path: &Path) -> Cow<'_, Path> {
    if path.as_os_str().is_empty() {
        return Cow::Borrowed(path);
    }
    let normalized = normalize_path_lexical(path);
    if normalized == path {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(normalized)
    }
}

/// A `Path::starts_with` that ignores ASCII case on Windows.
///
/// Inputs are normalized lexically before comparison. On non-Windows platforms this is
/// equivalent to `Path::starts_with`.
pub fn starts_with_case_insensitive(path: &Path, prefix: &Path) -> bool {
    strip_prefix_case_insensitive(path, prefix).is_some()
}

/// A `Path::strip_prefix` that ignores ASCII case on Windows.
///
/// Inputs are normalized lexically before comparison. On non-Windows platforms this is
/// equivalent to `Path::strip_prefix`.
pub fn strip_prefix_case_insensitive(path: &Path, prefix: &Path) -> Option<PathBuf> {
    let path = normalized_for_boundary(path);
    let prefix = normalized_for_boundary(prefix);

    #[cfg(windows)]
    {
        let mut path_components = path.components();
        for prefix_comp in prefix.components() {
            let path_comp = path_components.next()?;
            if !components_eq(path_comp, prefix_comp) {
                return None;
            }
        }
        Some(path_components.as_path().to_path_buf())
    }

    #[cfg(not(windows))]
    {
        path.strip_prefix(prefix.as_ref()).ok().map(PathBuf::from)
    }
}
