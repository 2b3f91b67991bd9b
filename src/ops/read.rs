use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::batch::{BatchError, BatchItem, BatchOutcome};
use super::extract::{DocumentFormat, PAGE_BREAK};
use super::patterns::one_or_many;
use super::Context;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub path: String,
    /// Caps the returned content at this many characters (never splitting a code point).
    #[serde(default)]
    pub max_chars: Option<usize>,
}

impl ReadRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            max_chars: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Text,
    Pdf,
    Docx,
}

impl From<DocumentFormat> for ContentFormat {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Pdf => Self::Pdf,
            DocumentFormat::Docx => Self::Docx,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    pub path: String,
    pub content: String,
    pub format: ContentFormat,
    pub truncated: bool,
    pub total_chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

/// Decoded text of one file.
#[derive(Debug)]
pub(super) struct LoadedText {
    pub(super) text: String,
    pub(super) format: ContentFormat,
    pub(super) page_count: Option<usize>,
}

/// Extracts `path` through its registered extractor, or `None` when it is not a document.
///
/// Documents are loaded whole, so they stay bounded by `max_read_bytes`. `shown` is the
/// caller-facing spelling used in errors.
pub(super) fn load_document(
    ctx: &Context,
    path: &Path,
    shown: &Path,
) -> Result<Option<LoadedText>> {
    let extractor = DocumentFormat::from_path(path)
        .and_then(|format| ctx.extractor(format).map(|extractor| (format, extractor)));
    let Some((format, extractor)) = extractor else {
        return Ok(None);
    };

    let bytes = super::io::read_bytes_limited(path, shown, ctx.policy().limits.max_read_bytes)?;
    let pages = extractor
        .extract_text(&bytes)
        .map_err(|err| Error::UnreadableDocument {
            path: shown.to_path_buf(),
            reason: err.to_string(),
        })?;
    Ok(Some(LoadedText {
        text: pages.join(PAGE_BREAK),
        format: format.into(),
        page_count: Some(pages.len()),
    }))
}

/// Loads `path` as text: documents go through their extractor, everything else must be UTF-8.
fn load_text(ctx: &Context, path: &Path, shown: &Path) -> Result<LoadedText> {
    if let Some(loaded) = load_document(ctx, path, shown)? {
        return Ok(loaded);
    }
    let bytes = super::io::read_bytes_limited(path, shown, ctx.policy().limits.max_read_bytes)?;
    let text = String::from_utf8(bytes).map_err(|_| Error::InvalidEncoding(shown.to_path_buf()))?;
    Ok(LoadedText {
        text,
        format: ContentFormat::Text,
        page_count: None,
    })
}

/// Cuts `text` after `max_chars` characters. Returns whether anything was removed.
fn truncate_chars(text: &mut String, max_chars: usize) -> bool {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            text.truncate(byte_index);
            true
        }
        None => false,
    }
}

pub fn read_file(ctx: &Context, request: ReadRequest) -> Result<ReadResponse> {
    let resolved = ctx.resolve(&request.path)?;
    let shown = resolved.masked(ctx);
    if resolved.path.is_dir() {
        return Err(Error::NotARegularFile(shown));
    }

    let loaded = load_text(ctx, &resolved.path, &shown)?;
    let mut content = loaded.text;
    let total_chars = content.chars().count();
    let truncated = request
        .max_chars
        .is_some_and(|max_chars| truncate_chars(&mut content, max_chars));

    tracing::debug!(
        path = %shown.display(),
        format = ?loaded.format,
        total_chars,
        truncated,
        "read_file"
    );
    Ok(ReadResponse {
        path: shown.to_string_lossy().into_owned(),
        content,
        format: loaded.format,
        truncated,
        total_chars,
        page_count: loaded.page_count,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFilesRequest {
    /// A single string is accepted too.
    #[serde(deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
    #[serde(default)]
    pub max_chars: Option<usize>,
}

impl ReadFilesRequest {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            max_chars: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFilesResponse {
    /// One entry per requested path, in request order.
    pub results: Vec<BatchItem<ReadResponse>>,
    pub elapsed_ms: u64,
}

/// Reads several files. A failing path is reported in its own entry and never fails the batch.
pub fn read_files(ctx: &Context, request: ReadFilesRequest) -> ReadFilesResponse {
    let started = Instant::now();
    let results = request
        .paths
        .iter()
        .map(|requested| {
            let outcome = match read_file(
                ctx,
                ReadRequest {
                    path: requested.clone(),
                    max_chars: request.max_chars,
                },
            ) {
                Ok(response) => BatchOutcome::Ok(response),
                Err(err) => BatchOutcome::Error(BatchError::new(ctx, requested, &err)),
            };
            BatchItem::new(ctx, requested, outcome)
        })
        .collect::<Vec<_>>();

    let elapsed_ms = super::traversal::elapsed_ms(&started);
    tracing::debug!(
        paths = results.len(),
        failed = results.iter().filter(|item| item.error().is_some()).count(),
        elapsed_ms,
        "read_files"
    );
    ReadFilesResponse {
        results,
        elapsed_ms,
    }
}
