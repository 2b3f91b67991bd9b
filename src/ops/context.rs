use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::masking::PathMasker;
use crate::policy::PolicyConfig;

use super::{
    Context, DocumentFormat, EntryInfo, ListPathsRequest, PageResult, PathTypeEntry,
    ReadFilesRequest, ReadFilesResponse, ReadRequest, ReadResponse, SearchContentsRequest,
    SearchContentsResponse, SearchFilesRequest, SearchFilesResponse, SearchNamesRequest,
    TextExtractor,
};

impl Context {
    pub fn new(policy: PolicyConfig) -> Result<Self> {
        policy.validate()?;
        let masker = PathMasker::from_rules(&policy.masker)?;

        let mut allowed_roots = Vec::<PathBuf>::with_capacity(policy.allowed_roots.len());
        for (index, root) in policy.allowed_roots.iter().enumerate() {
            let canonical = root.canonicalize().map_err(|err| {
                Error::InvalidPolicy(format!(
                    "failed to canonicalize allowed root #{index} ({}): {err}",
                    masker.mask_path(root)
                ))
            })?;
            let meta = fs::metadata(&canonical).map_err(|err| {
                Error::InvalidPolicy(format!(
                    "failed to stat allowed root #{index} ({}): {err}",
                    masker.mask_path(&canonical)
                ))
            })?;
            if !meta.is_dir() {
                return Err(Error::InvalidPolicy(format!(
                    "allowed root #{index} ({}) is not a directory",
                    masker.mask_path(&canonical)
                )));
            }
            // Kept index-aligned with `policy.allowed_roots`.
            allowed_roots.push(canonical);
        }

        // Excluded roots match both canonically and lexically; missing ones stay lexical.
        let mut excluded_roots = Vec::<PathBuf>::with_capacity(policy.excluded_roots.len() * 2);
        for root in &policy.excluded_roots {
            let lexical = crate::path_utils::normalize_path_lexical(root);
            if let Ok(canonical) = lexical.canonicalize()
                && !excluded_roots.contains(&canonical)
            {
                excluded_roots.push(canonical);
            }
            if !excluded_roots.contains(&lexical) {
                excluded_roots.push(lexical);
            }
        }

        let extractors = super::default_extractors()
            .into_iter()
            .map(|extractor| (extractor.format(), extractor))
            .collect::<HashMap<_, _>>();

        tracing::debug!(
            allowed_roots = allowed_roots.len(),
            excluded_roots = excluded_roots.len(),
            hide_hidden = policy.hide_hidden,
            masking = masker.is_enabled(),
            "context initialized"
        );

        Ok(Self {
            policy,
            masker,
            allowed_roots,
            excluded_roots,
            extractors,
        })
    }

    #[cfg(feature = "policy-io")]
    pub fn from_policy_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let policy = crate::policy_io::load_policy(path)?;
        Self::new(policy)
    }

    /// Registers `extractor` for its format, replacing any previous one.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractors.insert(extractor.format(), extractor);
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn masker(&self) -> &PathMasker {
        &self.masker
    }

    pub fn get_allowed_paths(&self) -> Vec<String> {
        super::get_allowed_paths(self)
    }

    pub fn get_path_type(&self, paths: &[String]) -> Vec<PathTypeEntry> {
        super::get_path_type(self, paths)
    }

    pub fn list_paths(&self, request: ListPathsRequest) -> Result<PageResult<EntryInfo>> {
        super::list_paths(self, request)
    }

    pub fn search_file_names(&self, request: SearchNamesRequest) -> Result<PageResult<EntryInfo>> {
        super::search_file_names(self, request)
    }

    pub fn read_file(&self, request: ReadRequest) -> Result<ReadResponse> {
        super::read_file(self, request)
    }

    pub fn read_files(&self, request: ReadFilesRequest) -> ReadFilesResponse {
        super::read_files(self, request)
    }

    pub fn search_file_contents(
        &self,
        request: SearchContentsRequest,
    ) -> Result<SearchContentsResponse> {
        super::search_file_contents(self, request)
    }

    pub fn search_contents_in_files(
        &self,
        request: SearchFilesRequest,
    ) -> Result<SearchFilesResponse> {
        super::search_contents_in_files(self, request)
    }

    pub(super) fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    pub(super) fn excluded_roots(&self) -> &[PathBuf] {
        &self.excluded_roots
    }

    pub(super) fn extractor(&self, format: DocumentFormat) -> Option<&Arc<dyn TextExtractor>> {
        self.extractors.get(&format)
    }
}
