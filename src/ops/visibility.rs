use std::ffi::OsStr;
use std::path::Path;

use super::Context;

impl Context {
    pub(super) fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_roots()
            .iter()
            .any(|excluded| crate::path_utils::starts_with_case_insensitive(path, excluded))
    }

    /// Whether hidden entries are filtered for a call with the given `include_hidden` option.
    pub(super) fn hides_hidden(&self, include_hidden: Option<bool>) -> bool {
        self.policy().hide_hidden || !include_hidden.unwrap_or(true)
    }

    /// The single visibility predicate shared by every walker.
    ///
    /// `path` is the entry's real path (its parent is canonical); `name` is its file name.
    /// A `false` result also means the entry's subtree is never visited.
    pub(super) fn should_visit(&self, path: &Path, name: &OsStr, hide_hidden: bool) -> bool {
        if hide_hidden && crate::path_utils::is_hidden_name(name) {
            return false;
        }
        !self.is_excluded(path)
    }
}
