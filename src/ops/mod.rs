use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::masking::PathMasker;
use crate::policy::PolicyConfig;

mod batch;
mod context;
mod extract;
mod grep;
mod io;
mod list_paths;
mod paging;
mod path_type;
mod patterns;
mod read;
mod resolve;
mod search_names;
mod traversal;
mod visibility;

pub use batch::{BatchError, BatchItem, BatchOutcome};
pub use extract::{
    DocumentFormat, DocxExtractor, ExtractError, PAGE_BREAK, TextExtractor, default_extractors,
};
#[cfg(feature = "pdf")]
pub use extract::PdfExtractor;
pub use grep::{
    ContentMatch, FileMatches, SearchContentsRequest, SearchContentsResponse, SearchFilesRequest,
    SearchFilesResponse, search_contents_in_files, search_file_contents,
};
pub use list_paths::{ListPathsRequest, list_paths};
pub use paging::PageResult;
pub use path_type::{PathKind, PathTypeEntry, get_allowed_paths, get_path_type};
pub use read::{
    ContentFormat, ReadFilesRequest, ReadFilesResponse, ReadRequest, ReadResponse, read_file,
    read_files,
};
pub use search_names::{SearchNamesRequest, search_file_names};

#[cfg(test)]
mod tests;

/// Process-wide, read-only state shared by every operation.
///
/// Built once from a validated [`PolicyConfig`]; every call re-scans the filesystem.
pub struct Context {
    policy: PolicyConfig,
    masker: PathMasker,
    // Canonical allowed roots, in configuration order.
    allowed_roots: Vec<PathBuf>,
    // Canonical excluded roots plus their lexical spelling when it differs.
    excluded_roots: Vec<PathBuf>,
    extractors: HashMap<DocumentFormat, Arc<dyn TextExtractor>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formats = self.extractors.keys().collect::<Vec<_>>();
        formats.sort_unstable();
        f.debug_struct("Context")
            .field("allowed_roots", &self.allowed_roots.len())
            .field("excluded_roots", &self.excluded_roots.len())
            .field("hide_hidden", &self.policy.hide_hidden)
            .field("masking", &self.masker.is_enabled())
            .field("extractors", &formats)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    #[serde(alias = "bfs")]
    BreadthFirst,
    #[serde(alias = "dfs")]
    DepthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    pub(crate) fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// One listed or matched entry. Every path-bearing field is already masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Path relative to the allowed root the request resolved under.
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub is_directory: bool,
    /// Children of the traversal start are at depth 1.
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_path: Option<String>,
}

const fn default_page_size() -> usize {
    100
}

/// Options shared by every traversal-backed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalOptions {
    #[serde(default)]
    pub strategy: Strategy,
    /// Directories at depth `d` (the start is depth 0) are expanded while `d <= max_depth`.
    /// `None` walks the whole subtree.
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub page_index: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Wall-clock budget in seconds. `None` uses the policy default; negative is unlimited.
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
    /// Only honored when the policy does not hide hidden entries.
    #[serde(default)]
    pub include_hidden: Option<bool>,
    #[serde(default)]
    pub files_only: bool,
    #[serde(default)]
    pub absolute_paths: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_depth: None,
            page_index: 0,
            page_size: default_page_size(),
            time_limit_seconds: None,
            include_hidden: None,
            files_only: false,
            absolute_paths: false,
        }
    }
}
