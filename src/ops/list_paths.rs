use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::paging::{PageCollector, PageResult};
use super::traversal::{Deadline, TraversalDiagnostics, WalkOptions, walk};
use super::{Context, EntryInfo, EntryKind, TraversalOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPathsRequest {
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub traversal: TraversalOptions,
}

impl ListPathsRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            traversal: TraversalOptions::default(),
        }
    }
}

pub fn list_paths(ctx: &Context, request: ListPathsRequest) -> Result<PageResult<EntryInfo>> {
    let deadline = Deadline::new(ctx, request.traversal.time_limit_seconds);
    let options = &request.traversal;
    let mut collector = PageCollector::new(ctx, options.page_index, options.page_size)?;

    let start = ctx.resolve(&request.path)?;
    if !start.path.is_dir() {
        return Err(Error::NotADirectory(start.masked(ctx)));
    }

    let walk_options = WalkOptions {
        strategy: options.strategy,
        max_depth: options.max_depth,
        hide_hidden: ctx.hides_hidden(options.include_hidden),
        prune: None,
    };
    let mut diag = TraversalDiagnostics::default();
    walk(ctx, &start, &walk_options, &deadline, &mut diag, |entry, _diag| {
        if options.files_only && entry.kind != EntryKind::File {
            return Ok(ControlFlow::Continue(()));
        }
        Ok(collector
            .offer(|| entry.to_info(ctx, options.absolute_paths))
            .map_continue(|_| ()))
    })?;

    let page = collector.finish(deadline.elapsed_ms());
    tracing::debug!(
        path = %start.masked(ctx).display(),
        items = page.items.len(),
        has_more = page.has_more,
        scanned_entries = diag.scanned_entries(),
        skipped_walk_errors = diag.skipped_walk_errors(),
        elapsed_ms = page.elapsed_ms,
        "list_paths"
    );
    Ok(page)
}
