use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::Context;

/// A canonical path proven to be inside an allowed root and outside every excluded root.
#[derive(Debug, Clone)]
pub(super) struct ResolvedPath {
    pub(super) path: PathBuf,
    /// Canonical allowed root the path resolved under.
    pub(super) root: PathBuf,
    /// `path` relative to `root`; empty for the root itself.
    pub(super) relative: PathBuf,
    /// The candidate before symlink resolution.
    pub(super) lexical: PathBuf,
}

impl ResolvedPath {
    pub(super) fn display_relative(&self) -> String {
        crate::path_utils::display_relative(&self.relative)
    }

    /// Root-relative path as the caller may see it.
    pub(super) fn masked(&self, ctx: &Context) -> PathBuf {
        PathBuf::from(ctx.masker().mask(&self.display_relative()).as_ref())
    }
}

fn names_first_root(input: &str) -> bool {
    let trimmed = input
        .trim()
        .trim_end_matches(|ch| ch == '/' || (cfg!(windows) && ch == '\\'));
    trimmed.is_empty() || trimmed == "."
}

impl Context {
    /// Resolves a caller-supplied path to a [`ResolvedPath`].
    ///
    /// Relative inputs are tried against each allowed root in order and the first existing
    /// candidate wins. Absolute inputs are checked as given. Every failure is one of the
    /// access-denial errors carrying only `input`.
    pub(super) fn resolve(&self, input: &str) -> Result<ResolvedPath> {
        let unmasked = self.masker().unmask(input);
        let denied_missing = || Error::FileNotFound {
            requested: input.to_string(),
        };

        let requested = Path::new(unmasked.as_ref());
        let (root_index, candidate) = if names_first_root(&unmasked) {
            (Some(0), self.allowed_roots()[0].clone())
        } else if requested.is_absolute() {
            let normalized = crate::path_utils::normalize_path_lexical(requested);
            (self.root_index_containing_lexical(&normalized), normalized)
        } else {
            let found = self
                .allowed_roots()
                .iter()
                .enumerate()
                .map(|(index, root)| (index, root.join(requested)))
                .find(|(_, candidate)| std::fs::symlink_metadata(candidate).is_ok());
            let Some((index, candidate)) = found else {
                tracing::debug!(requested = %self.masker().mask(input), "no candidate exists");
                return Err(denied_missing());
            };
            (Some(index), candidate)
        };

        let canonical = candidate.canonicalize().map_err(|_| match root_index {
            Some(_) => denied_missing(),
            None => Error::OutsideAllowedPaths {
                requested: input.to_string(),
            },
        })?;
        let preferred = root_index
            .and_then(|index| self.allowed_roots().get(index))
            .map(PathBuf::as_path);
        let mut resolved = self.check_canonical(input, canonical, preferred)?;
        resolved.lexical = candidate;
        Ok(resolved)
    }

    fn root_index_containing_lexical(&self, path: &Path) -> Option<usize> {
        let configured = &self.policy().allowed_roots;
        (0..self.allowed_roots().len()).find(|&index| {
            crate::path_utils::starts_with_case_insensitive(path, &self.allowed_roots()[index])
                || configured.get(index).is_some_and(|lexical| {
                    crate::path_utils::starts_with_case_insensitive(path, lexical)
                })
        })
    }

    /// Applies containment, exclusion, and hidden rules to an already canonical path.
    ///
    /// `preferred_root` picks the allowed root to report when roots nest.
    pub(super) fn check_canonical(
        &self,
        input: &str,
        canonical: PathBuf,
        preferred_root: Option<&Path>,
    ) -> Result<ResolvedPath> {
        let roots = self.allowed_roots();
        let containing = preferred_root
            .filter(|root| crate::path_utils::starts_with_case_insensitive(&canonical, root))
            .or_else(|| {
                roots
                    .iter()
                    .map(PathBuf::as_path)
                    .find(|root| crate::path_utils::starts_with_case_insensitive(&canonical, root))
            });
        let Some(root) = containing else {
            return Err(Error::OutsideAllowedPaths {
                requested: input.to_string(),
            });
        };
        if self.is_excluded(&canonical) {
            return Err(Error::ExcludedPath {
                requested: input.to_string(),
            });
        }
        let relative = crate::path_utils::strip_prefix_case_insensitive(&canonical, root)
            .ok_or_else(|| Error::OutsideAllowedPaths {
                requested: input.to_string(),
            })?;
        if self.policy().hide_hidden && crate::path_utils::has_hidden_component(&relative) {
            return Err(Error::HiddenPathAccessDenied {
                requested: input.to_string(),
            });
        }
        Ok(ResolvedPath {
            lexical: canonical.clone(),
            path: canonical,
            root: root.to_path_buf(),
            relative,
        })
    }
}
