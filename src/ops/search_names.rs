use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::paging::{PageCollector, PageResult};
use super::patterns::{PatternSet, one_or_many};
use super::traversal::{Deadline, TraversalDiagnostics, WalkOptions, walk};
use super::{Context, EntryInfo, EntryKind, TraversalOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchNamesRequest {
    #[serde(default)]
    pub path: String,
    /// Regular expressions searched (not fully matched) against each entry name; an entry
    /// matches when any of them does. A single string is accepted too.
    #[serde(alias = "pattern", deserialize_with = "one_or_many")]
    pub patterns: Vec<String>,
    /// Entries whose name matches any of these are dropped and their subtree is not visited.
    #[serde(default, alias = "exclude_pattern", deserialize_with = "one_or_many")]
    pub exclude_patterns: Vec<String>,
    #[serde(flatten)]
    pub traversal: TraversalOptions,
}

impl SearchNamesRequest {
    pub fn new(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            patterns: vec![pattern.into()],
            exclude_patterns: Vec::new(),
            traversal: TraversalOptions::default(),
        }
    }
}

pub fn search_file_names(
    ctx: &Context,
    request: SearchNamesRequest,
) -> Result<PageResult<EntryInfo>> {
    let deadline = Deadline::new(ctx, request.traversal.time_limit_seconds);
    let options = &request.traversal;
    let patterns = PatternSet::compile(&request.patterns)?;
    let exclude = PatternSet::compile_optional(&request.exclude_patterns)?;
    let mut collector = PageCollector::new(ctx, options.page_index, options.page_size)?;

    let start = ctx.resolve(&request.path)?;
    if !start.path.is_dir() {
        return Err(Error::NotADirectory(start.masked(ctx)));
    }

    let walk_options = WalkOptions {
        strategy: options.strategy,
        max_depth: options.max_depth,
        hide_hidden: ctx.hides_hidden(options.include_hidden),
        prune: exclude.as_ref(),
    };
    let mut diag = TraversalDiagnostics::default();
    walk(ctx, &start, &walk_options, &deadline, &mut diag, |entry, _diag| {
        if options.files_only && entry.kind != EntryKind::File {
            return Ok(ControlFlow::Continue(()));
        }
        if !patterns.is_match(&entry.name_lossy()) {
            return Ok(ControlFlow::Continue(()));
        }
        Ok(collector
            .offer(|| entry.to_info(ctx, options.absolute_paths))
            .map_continue(|_| ()))
    })?;

    let page = collector.finish(deadline.elapsed_ms());
    tracing::debug!(
        path = %start.masked(ctx).display(),
        matches = page.items.len(),
        has_more = page.has_more,
        scanned_entries = diag.scanned_entries(),
        elapsed_ms = page.elapsed_ms,
        "search_file_names"
    );
    Ok(page)
}
