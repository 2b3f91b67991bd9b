use std::fs;

use serde::{Deserialize, Serialize};

use super::{Context, EntryKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Directory,
    Symlink,
    Other,
    /// Denied by policy, or missing.
    NotAccessible,
}

impl From<EntryKind> for PathKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Self::File,
            EntryKind::Directory => Self::Directory,
            EntryKind::Symlink => Self::Symlink,
            EntryKind::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTypeEntry {
    /// The requested path, masked.
    pub path: String,
    pub kind: PathKind,
}

/// Allowed roots as absolute paths, masked, in configuration order.
pub fn get_allowed_paths(ctx: &Context) -> Vec<String> {
    ctx.allowed_roots()
        .iter()
        .map(|root| ctx.masker().mask_path(root))
        .collect()
}

/// Classifies each requested path. Resolution follows symlinks, so a symlink is only reported
/// when the requested name itself is a link whose target passes the policy.
pub fn get_path_type(ctx: &Context, paths: &[String]) -> Vec<PathTypeEntry> {
    paths
        .iter()
        .map(|requested| {
            let kind = match ctx.resolve(requested) {
                Ok(resolved) => {
                    let is_link = fs::symlink_metadata(&resolved.lexical)
                        .is_ok_and(|meta| meta.file_type().is_symlink());
                    if is_link {
                        PathKind::Symlink
                    } else {
                        fs::metadata(&resolved.path)
                            .map(|meta| EntryKind::from_file_type(meta.file_type()).into())
                            .unwrap_or(PathKind::NotAccessible)
                    }
                }
                Err(err) => {
                    tracing::debug!(code = err.code(), "path type lookup denied");
                    PathKind::NotAccessible
                }
            };
            PathTypeEntry {
                path: ctx.masker().mask(requested).into_owned(),
                kind,
            }
        })
        .collect()
}
