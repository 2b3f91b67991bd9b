use std::borrow::Cow;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

use super::patterns::PatternSet;
use super::resolve::ResolvedPath;
use super::{Context, EntryInfo, EntryKind, Strategy};

// Large directories sample the deadline while their entries are being read.
const DEADLINE_SAMPLE_INTERVAL: usize = 256;

pub(super) fn elapsed_ms(started: &Instant) -> u64 {
    duration_ms(started.elapsed())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Wall-clock budget for one call.
#[derive(Debug, Clone, Copy)]
pub(super) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// `None` uses the policy default; a negative (or non-finite) value disables the limit.
    pub(super) fn new(ctx: &Context, requested_seconds: Option<f64>) -> Self {
        let seconds = requested_seconds.unwrap_or(ctx.policy().time_limit_seconds);
        let limit = if seconds.is_finite() && seconds >= 0.0 {
            Duration::try_from_secs_f64(seconds).ok()
        } else {
            None
        };
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub(super) fn check(&self) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.started.elapsed();
        if elapsed < limit {
            return Ok(());
        }
        let (limit_ms, elapsed_ms) = (duration_ms(limit), duration_ms(elapsed));
        tracing::warn!(limit_ms, elapsed_ms, "time limit exceeded; discarding partial results");
        Err(Error::TimeLimitExceeded {
            limit_ms,
            elapsed_ms,
        })
    }

    pub(super) fn elapsed_ms(&self) -> u64 {
        elapsed_ms(&self.started)
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct WalkOptions<'a> {
    pub(super) strategy: Strategy,
    pub(super) max_depth: Option<usize>,
    pub(super) hide_hidden: bool,
    /// Entries whose name matches are dropped together with their subtree.
    pub(super) prune: Option<&'a PatternSet>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct TraversalDiagnostics {
    scanned_entries: u64,
    skipped_walk_errors: u64,
}

impl TraversalDiagnostics {
    pub(super) fn scanned_entries(&self) -> u64 {
        self.scanned_entries
    }

    pub(super) fn skipped_walk_errors(&self) -> u64 {
        self.skipped_walk_errors
    }

    fn inc_skipped_walk_errors(&mut self) {
        self.skipped_walk_errors = self.skipped_walk_errors.saturating_add(1);
    }
}

#[derive(Debug)]
pub(super) struct WalkEntry {
    /// Real path; every ancestor below the allowed root is a canonical directory.
    pub(super) path: PathBuf,
    /// Path relative to the allowed root of the walk.
    pub(super) relative: PathBuf,
    pub(super) name: OsString,
    pub(super) kind: EntryKind,
    pub(super) depth: usize,
}

impl WalkEntry {
    pub(super) fn name_lossy(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }

    /// Masked caller-facing view of this entry.
    pub(super) fn to_info(&self, ctx: &Context, absolute_paths: bool) -> EntryInfo {
        let masker = ctx.masker();
        EntryInfo {
            path: masker.mask_path(&self.relative),
            name: masker.mask_name(&self.name_lossy()).into_owned(),
            kind: self.kind,
            is_directory: self.kind == EntryKind::Directory,
            depth: self.depth,
            absolute_path: absolute_paths.then(|| masker.mask_path(&self.path)),
        }
    }
}

struct Walker<'a> {
    ctx: &'a Context,
    options: &'a WalkOptions<'a>,
    deadline: &'a Deadline,
}

impl Walker<'_> {
    fn read_children(
        &self,
        dir: &Path,
        relative: &Path,
        depth: usize,
        diag: &mut TraversalDiagnostics,
        is_start: bool,
    ) -> Result<Vec<WalkEntry>> {
        let (ctx, options) = (self.ctx, self.options);
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) if is_start => {
                let display = crate::path_utils::display_relative(relative);
                let shown = ctx.masker().mask(&display);
                return Err(Error::io_path("read_dir", shown.into_owned(), err));
            }
            Err(err) => {
                tracing::debug!(
                    path = %ctx.masker().mask_path(relative),
                    error = %err,
                    "skipping unreadable directory"
                );
                diag.inc_skipped_walk_errors();
                return Ok(Vec::new());
            }
        };

        let mut children = Vec::<WalkEntry>::new();
        for (index, entry) in read_dir.enumerate() {
            if index % DEADLINE_SAMPLE_INTERVAL == DEADLINE_SAMPLE_INTERVAL - 1 {
                self.deadline.check()?;
            }
            // Entries that vanish or fail mid-listing are skipped.
            let Ok(entry) = entry else {
                diag.inc_skipped_walk_errors();
                continue;
            };
            let Ok(file_type) = entry.file_type() else {
                diag.inc_skipped_walk_errors();
                continue;
            };
            let name = entry.file_name();
            let path = entry.path();
            if !ctx.should_visit(&path, &name, options.hide_hidden) {
                continue;
            }
            if options
                .prune
                .is_some_and(|prune| prune.is_match(&name.to_string_lossy()))
            {
                continue;
            }
            children.push(WalkEntry {
                relative: relative.join(&name),
                path,
                name,
                kind: EntryKind::from_file_type(file_type),
                depth,
            });
        }
        children.sort_by(|a, b| a.name.as_encoded_bytes().cmp(b.name.as_encoded_bytes()));
        Ok(children)
    }
}

fn enqueue(pending: &mut VecDeque<WalkEntry>, children: Vec<WalkEntry>, strategy: Strategy) {
    match strategy {
        Strategy::BreadthFirst => pending.extend(children),
        // Reversed so the first sibling is popped (and fully explored) first.
        Strategy::DepthFirst => pending.extend(children.into_iter().rev()),
    }
}

/// Walks the subtree under `start` with an explicit work queue.
///
/// Entries reach `on_entry` in breadth-first or depth-first pre-order with siblings sorted by
/// name. Symlinked directories are reported but never descended.
pub(super) fn walk(
    ctx: &Context,
    start: &ResolvedPath,
    options: &WalkOptions<'_>,
    deadline: &Deadline,
    diag: &mut TraversalDiagnostics,
    mut on_entry: impl FnMut(&WalkEntry, &mut TraversalDiagnostics) -> Result<ControlFlow<()>>,
) -> Result<()> {
    deadline.check()?;
    let walker = Walker {
        ctx,
        options,
        deadline,
    };
    let mut pending = VecDeque::<WalkEntry>::new();
    let children = walker.read_children(&start.path, &start.relative, 1, diag, true)?;
    enqueue(&mut pending, children, options.strategy);

    loop {
        let next = match options.strategy {
            Strategy::BreadthFirst => pending.pop_front(),
            Strategy::DepthFirst => pending.pop_back(),
        };
        let Some(entry) = next else {
            break;
        };
        deadline.check()?;
        diag.scanned_entries = diag.scanned_entries.saturating_add(1);

        if on_entry(&entry, diag)?.is_break() {
            break;
        }

        let expand = entry.kind == EntryKind::Directory
            && options.max_depth.is_none_or(|max| entry.depth <= max);
        if expand {
            let children = walker.read_children(
                &entry.path,
                &entry.relative,
                entry.depth + 1,
                diag,
                false,
            )?;
            enqueue(&mut pending, children, options.strategy);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_time_limit_is_unlimited() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::new(crate::policy::PolicyConfig::single_root(dir.path()))
            .expect("ctx");
        let deadline = Deadline::new(&ctx, Some(-1.0));
        assert!(deadline.limit.is_none());
        deadline.check().expect("unlimited");

        let deadline = Deadline::new(&ctx, None);
        assert_eq!(deadline.limit, Some(Duration::from_secs(10)));
    }

    #[test]
    fn start_directory_errors_carry_masked_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut policy = crate::policy::PolicyConfig::single_root(dir.path());
        policy.masker.enabled = true;
        policy.masker.mode = crate::policy::MaskMode::Segment;
        policy.masker.look_for = vec!["secret".to_string()];
        let ctx = Context::new(policy).expect("ctx");

        let options = WalkOptions {
            strategy: Strategy::BreadthFirst,
            max_depth: None,
            hide_hidden: true,
            prune: None,
        };
        let deadline = Deadline::new(&ctx, Some(-1.0));
        let walker = Walker {
            ctx: &ctx,
            options: &options,
            deadline: &deadline,
        };
        let relative = Path::new("secret").join("gone");
        let err = walker
            .read_children(
                &dir.path().join(&relative),
                &relative,
                1,
                &mut TraversalDiagnostics::default(),
                true,
            )
            .expect_err("missing start");
        let Error::IoPath { op, path, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(op, "read_dir");
        assert_eq!(path, Path::new("MASK").join("gone"));
    }

    #[test]
    fn zero_time_limit_fails_immediately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::new(crate::policy::PolicyConfig::single_root(dir.path()))
            .expect("ctx");
        let err = Deadline::new(&ctx, Some(0.0)).check().expect_err("exceeded");
        assert_eq!(err.code(), "time_limit_exceeded");
    }
}
