//! `scoped-fs-search` provides read-only, policy-bounded filesystem inspection.
//!
//! Every operation resolves the caller's path against an explicit allow-list of roots, honors
//! excluded subtrees and hidden-file rules, and masks every path it returns. Operations:
//! list paths, search file names, read files (plain text, DOCX, PDF) one at a time or in
//! batches, and search file contents below a directory or across a list of files.

mod error;
pub mod masking;
pub mod ops;
pub mod path_utils;
pub mod policy;
#[cfg(feature = "policy-io")]
pub mod policy_io;

pub use error::{ACCESS_DENIED_CODE, Error, ErrorKind, Result};

pub use masking::PathMasker;
pub use ops::{
    BatchError, BatchItem, BatchOutcome, ContentFormat, ContentMatch, Context, DocumentFormat,
    DocxExtractor, EntryInfo, EntryKind, ExtractError, FileMatches, ListPathsRequest, PAGE_BREAK,
    PageResult, PathKind, PathTypeEntry, ReadFilesRequest, ReadFilesResponse, ReadRequest,
    ReadResponse, SearchContentsRequest, SearchContentsResponse, SearchFilesRequest,
    SearchFilesResponse, SearchNamesRequest, Strategy, TextExtractor, TraversalOptions,
    get_allowed_paths, get_path_type, list_paths, read_file, read_files, search_contents_in_files,
    search_file_contents, search_file_names,
};
#[cfg(feature = "pdf")]
pub use ops::PdfExtractor;

pub use policy::{Limits, MaskMode, MaskerRules, PolicyConfig};
