use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Cursor};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::batch::{BatchError, BatchItem, BatchOutcome};
use super::io::open_regular_file_for_read;
use super::paging::{PageCollector, PageResult, Position};
use super::patterns::{PatternSet, compile_pattern, one_or_many};
use super::read::load_document;
use super::resolve::ResolvedPath;
use super::traversal::{Deadline, TraversalDiagnostics, WalkEntry, WalkOptions, walk};
use super::{Context, EntryKind, TraversalOptions};

const LINE_DEADLINE_SAMPLE_INTERVAL: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchContentsRequest {
    /// A directory to scan, or a single regular file.
    #[serde(default)]
    pub path: String,
    /// A line matches when any of these regular expressions does. A single string is
    /// accepted too.
    #[serde(alias = "pattern", deserialize_with = "one_or_many")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub context_lines: usize,
    /// Regular expression a file name must match for the file to be scanned.
    #[serde(default)]
    pub file_pattern: Option<String>,
    /// Glob over the file path relative to the search start (e.g. `**/*.md`).
    #[serde(default)]
    pub file_glob: Option<String>,
    #[serde(flatten)]
    pub traversal: TraversalOptions,
}

impl SearchContentsRequest {
    pub fn new(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            patterns: vec![pattern.into()],
            context_lines: 0,
            file_pattern: None,
            file_glob: None,
            traversal: TraversalOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_path: Option<String>,
    /// 1-based.
    pub line_number: u64,
    pub matched_line: String,
    #[serde(default)]
    pub line_truncated: bool,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchContentsResponse {
    #[serde(flatten)]
    pub page: PageResult<ContentMatch>,
    #[serde(default)]
    pub scanned_files: u64,
    #[serde(default)]
    pub skipped_non_utf8_files: u64,
    #[serde(default)]
    pub skipped_unreadable_files: u64,
    #[serde(default)]
    pub skipped_too_large_files: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanCounters {
    scanned_files: u64,
    skipped_non_utf8_files: u64,
    skipped_unreadable_files: u64,
    skipped_too_large_files: u64,
}

fn invalid_glob(pattern: &str, message: impl Into<String>) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

fn compile_file_glob(pattern: &str) -> Result<GlobMatcher> {
    let normalized = if cfg!(windows) {
        pattern.replace('\\', "/")
    } else {
        pattern.to_string()
    };
    if normalized.starts_with('/') {
        return Err(invalid_glob(
            pattern,
            "glob patterns are relative to the search path (must not start with '/')",
        ));
    }
    if normalized.split('/').any(|segment| segment == "..") {
        return Err(invalid_glob(pattern, "glob patterns must not contain '..' segments"));
    }
    let mut builder = GlobBuilder::new(&normalized);
    builder.literal_separator(true);
    #[cfg(windows)]
    builder.case_insensitive(true);
    builder
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| invalid_glob(pattern, err.kind().to_string()))
}

fn glob_is_match(glob: &GlobMatcher, path: &Path) -> bool {
    if cfg!(windows) {
        let normalized = path.to_string_lossy().replace('\\', "/");
        glob.is_match(normalized)
    } else {
        glob.is_match(path)
    }
}

/// Returns `line` cut to `max_bytes` on a char boundary, and whether it was cut.
fn clip_line(line: &str, max_bytes: usize) -> (String, bool) {
    if line.len() <= max_bytes {
        return (line.to_string(), false);
    }
    let mut end = max_bytes;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    (line[..end].to_string(), true)
}

fn trim_line_ending(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => line,
    }
}

/// Per-request state for content search.
struct ContentScanner<'a> {
    ctx: &'a Context,
    patterns: &'a PatternSet,
    context_lines: usize,
    max_line_bytes: usize,
    deadline: &'a Deadline,
    absolute_paths: bool,
    collector: PageCollector<ContentMatch>,
    counters: ScanCounters,
}

impl ContentScanner<'_> {
    /// Scans one file. Documents go through their extractor; everything else is streamed line
    /// by line, so plain files of any size are searched.
    ///
    /// `listed` is the path reported as `absolute_path`.
    fn scan_file(&mut self, real_path: &Path, shown: &Path, listed: &Path) -> Result<()> {
        let file_path = shown.to_string_lossy().into_owned();
        let absolute_path = self
            .absolute_paths
            .then(|| self.ctx.masker().mask_path(listed));
        if let Some(document) = load_document(self.ctx, real_path, shown)? {
            let reader = Cursor::new(document.text.as_bytes());
            return self.scan_lines(reader, &file_path, absolute_path, shown);
        }
        let (file, _) = open_regular_file_for_read(real_path, shown)?;
        self.scan_lines(BufReader::new(file), &file_path, absolute_path, shown)
    }

    /// Page bookkeeping continues across files in traversal order. Invalid UTF-8 stops the
    /// file with `InvalidEncoding`; matches already taken from it are kept.
    fn scan_lines<R: BufRead>(
        &mut self,
        mut reader: R,
        file_path: &str,
        absolute_path: Option<String>,
        shown: &Path,
    ) -> Result<()> {
        let mut buffer = String::new();
        let mut before = VecDeque::<String>::with_capacity(self.context_lines);
        // (item index, after-context lines still owed)
        let mut pending = Vec::<(usize, usize)>::new();
        let mut page_full = false;

        for index in 0usize.. {
            if index % LINE_DEADLINE_SAMPLE_INTERVAL == LINE_DEADLINE_SAMPLE_INTERVAL - 1 {
                self.deadline.check()?;
            }
            buffer.clear();
            let read = reader.read_line(&mut buffer).map_err(|err| {
                if err.kind() == std::io::ErrorKind::InvalidData {
                    Error::InvalidEncoding(shown.to_path_buf())
                } else {
                    Error::io_path("read", shown, err)
                }
            })?;
            if read == 0 {
                break;
            }
            let line = trim_line_ending(&buffer);

            if !pending.is_empty() {
                let (clipped, _) = clip_line(line, self.max_line_bytes);
                for (item_index, owed) in &mut pending {
                    if let Some(item) = self.collector.item_mut(*item_index) {
                        item.context_after.push(clipped.clone());
                    }
                    *owed -= 1;
                }
                pending.retain(|(_, owed)| *owed > 0);
            }
            if page_full {
                if pending.is_empty() {
                    break;
                }
                continue;
            }

            if self.patterns.is_match(line) {
                match self.collector.next_position() {
                    Position::InPage => {
                        let (matched_line, line_truncated) = clip_line(line, self.max_line_bytes);
                        let item = ContentMatch {
                            file_path: file_path.to_string(),
                            absolute_path: absolute_path.clone(),
                            line_number: u64::try_from(index + 1).unwrap_or(u64::MAX),
                            matched_line,
                            line_truncated,
                            context_before: before.iter().cloned().collect(),
                            context_after: Vec::new(),
                        };
                        if let ControlFlow::Continue(Some(item_index)) = self.collector.push(item)
                            && self.context_lines > 0
                        {
                            pending.push((item_index, self.context_lines));
                        }
                    }
                    Position::BeforePage | Position::AfterPage => {
                        if self.collector.skip().is_break() {
                            page_full = true;
                            if pending.is_empty() {
                                break;
                            }
                        }
                    }
                }
            }

            if self.context_lines > 0 {
                if before.len() == self.context_lines {
                    before.pop_front();
                }
                before.push_back(clip_line(line, self.max_line_bytes).0);
            }
        }
        Ok(())
    }

    /// Scans a file met during a directory walk; unreadable files are counted and skipped.
    fn scan_walk_file(&mut self, real_path: &Path, entry: &WalkEntry) -> Result<()> {
        let shown = PathBuf::from(self.ctx.masker().mask_path(&entry.relative));
        let Err(err) = self.scan_file(real_path, &shown, &entry.path) else {
            self.counters.scanned_files = self.counters.scanned_files.saturating_add(1);
            return Ok(());
        };
        let counter = match &err {
            Error::InvalidEncoding(_) => Some(&mut self.counters.skipped_non_utf8_files),
            Error::FileTooLarge { .. } => Some(&mut self.counters.skipped_too_large_files),
            Error::UnreadableDocument { .. }
            | Error::NotARegularFile(_)
            | Error::InvalidPath(_)
            | Error::IoPath { .. }
            | Error::Io(_) => Some(&mut self.counters.skipped_unreadable_files),
            _ => None,
        };
        let Some(counter) = counter else {
            return Err(err);
        };
        *counter = counter.saturating_add(1);
        tracing::debug!(path = %shown.display(), error = %err, "skipping file");
        Ok(())
    }

    /// Symlinked files are scanned only when their target passes the full path policy.
    fn symlink_target(&self, start: &ResolvedPath, entry: &WalkEntry) -> Option<PathBuf> {
        let canonical = entry.path.canonicalize().ok()?;
        let shown = self.ctx.masker().mask_path(&entry.relative);
        let resolved = self
            .ctx
            .check_canonical(&shown, canonical, Some(&start.root))
            .ok()?;
        resolved.path.is_file().then_some(resolved.path)
    }
}

struct FileFilters {
    name: Option<Regex>,
    glob: Option<GlobMatcher>,
}

impl FileFilters {
    fn accepts(&self, start: &ResolvedPath, entry: &WalkEntry) -> bool {
        if let Some(name) = &self.name
            && !name.is_match(&entry.name_lossy())
        {
            return false;
        }
        if let Some(glob) = &self.glob {
            let below_start = entry
                .relative
                .strip_prefix(&start.relative)
                .unwrap_or(&entry.relative);
            if !glob_is_match(glob, below_start) {
                return false;
            }
        }
        true
    }
}

fn clamped_context_lines(ctx: &Context, requested: usize) -> usize {
    let max = ctx.policy().limits.max_context_lines;
    if requested > max {
        tracing::debug!(requested, max, "clamping context_lines");
    }
    requested.min(max)
}

pub fn search_file_contents(
    ctx: &Context,
    request: SearchContentsRequest,
) -> Result<SearchContentsResponse> {
    let deadline = Deadline::new(ctx, request.traversal.time_limit_seconds);
    let options = &request.traversal;
    let patterns = PatternSet::compile(&request.patterns)?;
    let filters = FileFilters {
        name: request
            .file_pattern
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(compile_pattern)
            .transpose()?,
        glob: request
            .file_glob
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(compile_file_glob)
            .transpose()?,
    };
    let collector = PageCollector::new(ctx, options.page_index, options.page_size)?;

    let start = ctx.resolve(&request.path)?;
    let mut scanner = ContentScanner {
        ctx,
        patterns: &patterns,
        context_lines: clamped_context_lines(ctx, request.context_lines),
        max_line_bytes: ctx.policy().limits.max_line_bytes,
        deadline: &deadline,
        absolute_paths: options.absolute_paths,
        collector,
        counters: ScanCounters::default(),
    };

    let mut diag = TraversalDiagnostics::default();
    if start.path.is_file() {
        // An explicitly named file reports its own errors instead of being skipped.
        let shown = start.masked(ctx);
        scanner.scan_file(&start.path, &shown, &start.path)?;
        scanner.counters.scanned_files = 1;
    } else if start.path.is_dir() {
        let walk_options = WalkOptions {
            strategy: options.strategy,
            max_depth: options.max_depth,
            hide_hidden: ctx.hides_hidden(options.include_hidden),
            prune: None,
        };
        walk(ctx, &start, &walk_options, &deadline, &mut diag, |entry, _diag| {
            let real_path = match entry.kind {
                EntryKind::File => entry.path.clone(),
                EntryKind::Symlink => match scanner.symlink_target(&start, entry) {
                    Some(target) => target,
                    None => return Ok(ControlFlow::Continue(())),
                },
                EntryKind::Directory | EntryKind::Other => {
                    return Ok(ControlFlow::Continue(()));
                }
            };
            if !filters.accepts(&start, entry) {
                return Ok(ControlFlow::Continue(()));
            }
            deadline.check()?;
            scanner.scan_walk_file(&real_path, entry)?;
            Ok(if scanner.collector.is_done() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })?;
    } else {
        return Err(Error::NotARegularFile(start.masked(ctx)));
    }

    let counters = scanner.counters;
    let page = scanner.collector.finish(deadline.elapsed_ms());
    tracing::debug!(
        path = %start.masked(ctx).display(),
        matches = page.items.len(),
        has_more = page.has_more,
        scanned_files = counters.scanned_files,
        scanned_entries = diag.scanned_entries(),
        skipped_non_utf8_files = counters.skipped_non_utf8_files,
        skipped_unreadable_files = counters.skipped_unreadable_files,
        skipped_too_large_files = counters.skipped_too_large_files,
        elapsed_ms = page.elapsed_ms,
        "search_file_contents"
    );
    Ok(SearchContentsResponse {
        page,
        scanned_files: counters.scanned_files,
        skipped_non_utf8_files: counters.skipped_non_utf8_files,
        skipped_unreadable_files: counters.skipped_unreadable_files,
        skipped_too_large_files: counters.skipped_too_large_files,
    })
}

/// Content search over an explicit list of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilesRequest {
    /// Regular files to search. A single string is accepted too.
    #[serde(deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
    #[serde(alias = "pattern", deserialize_with = "one_or_many")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub context_lines: usize,
    /// Budget for the whole batch. `None` uses the policy default; negative is unlimited.
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
    #[serde(default)]
    pub absolute_paths: bool,
}

impl SearchFilesRequest {
    pub fn new<I, S>(paths: I, pattern: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            patterns: vec![pattern.into()],
            context_lines: 0,
            time_limit_seconds: None,
            absolute_paths: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatches {
    pub matches: Vec<ContentMatch>,
    /// More matches exist than `limits.max_page_size`.
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilesResponse {
    /// One entry per requested path, in request order.
    pub results: Vec<BatchItem<FileMatches>>,
    pub elapsed_ms: u64,
}

/// Searches each listed file. A path that is denied, missing, or unreadable is reported in its
/// own entry; only pattern errors and the time limit fail the whole call.
pub fn search_contents_in_files(
    ctx: &Context,
    request: SearchFilesRequest,
) -> Result<SearchFilesResponse> {
    let deadline = Deadline::new(ctx, request.time_limit_seconds);
    let patterns = PatternSet::compile(&request.patterns)?;
    let context_lines = clamped_context_lines(ctx, request.context_lines);

    let mut results = Vec::with_capacity(request.paths.len());
    for requested in &request.paths {
        deadline.check()?;
        let scanned = ctx.resolve(requested).and_then(|resolved| {
            let shown = resolved.masked(ctx);
            if !resolved.path.is_file() {
                return Err(Error::NotARegularFile(shown));
            }
            let mut scanner = ContentScanner {
                ctx,
                patterns: &patterns,
                context_lines,
                max_line_bytes: ctx.policy().limits.max_line_bytes,
                deadline: &deadline,
                absolute_paths: request.absolute_paths,
                collector: PageCollector::new(ctx, 0, ctx.policy().limits.max_page_size)?,
                counters: ScanCounters::default(),
            };
            scanner.scan_file(&resolved.path, &shown, &resolved.path)?;
            let page = scanner.collector.finish(0);
            Ok(FileMatches {
                matches: page.items,
                truncated: page.has_more,
            })
        });
        let outcome = match scanned {
            Ok(matches) => BatchOutcome::Ok(matches),
            Err(err @ Error::TimeLimitExceeded { .. }) => return Err(err),
            Err(err) => BatchOutcome::Error(BatchError::new(ctx, requested, &err)),
        };
        results.push(BatchItem::new(ctx, requested, outcome));
    }

    let elapsed_ms = deadline.elapsed_ms();
    tracing::debug!(
        paths = results.len(),
        failed = results.iter().filter(|item| item.error().is_some()).count(),
        elapsed_ms,
        "search_contents_in_files"
    );
    Ok(SearchFilesResponse {
        results,
        elapsed_ms,
    })
}
