use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// Replace every path segment that equals a `look_for` entry.
    Segment,
    /// Replace everything up to and including the last `look_for` segment.
    #[default]
    Prefix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskerRules {
    #[serde(default, alias = "ENABLED")]
    pub enabled: bool,
    #[serde(default, alias = "MODE")]
    pub mode: MaskMode,
    #[serde(default = "default_mask_token", alias = "MASK_TOKEN")]
    pub mask_token: String,
    #[serde(default, alias = "LOOK_FOR")]
    pub look_for: Vec<String>,
}

fn default_mask_token() -> String {
    "MASK".to_string()
}

impl Default for MaskerRules {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: MaskMode::default(),
            mask_token: default_mask_token(),
            look_for: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Upper bound on bytes loaded into memory by `read_file` and document extraction.
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: u64,
    /// Lines returned by content search are cut to this many bytes (on a char boundary).
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default = "default_max_context_lines")]
    pub max_context_lines: usize,
}

const fn default_max_read_bytes() -> u64 {
    16 * 1024 * 1024
}

const fn default_max_line_bytes() -> usize {
    4096
}

const fn default_max_page_size() -> usize {
    10_000
}

const fn default_max_context_lines() -> usize {
    100
}

const DEFAULT_TIME_LIMIT_SECONDS: f64 = 10.0;

// Hard caps are policy-level guardrails against misconfiguration.
const MAX_READ_BYTES_HARD_CAP: u64 = 256 * 1024 * 1024;
const MAX_LINE_BYTES_HARD_CAP: usize = 1024 * 1024;
const MAX_PAGE_SIZE_HARD_CAP: usize = 1_000_000;
const MAX_CONTEXT_LINES_HARD_CAP: usize = 10_000;
const MAX_MASK_TOKEN_BYTES: usize = 256;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_read_bytes: default_max_read_bytes(),
            max_line_bytes: default_max_line_bytes(),
            max_page_size: default_max_page_size(),
            max_context_lines: default_max_context_lines(),
        }
    }
}

const fn default_hide_hidden() -> bool {
    true
}

const fn default_time_limit_seconds() -> f64 {
    DEFAULT_TIME_LIMIT_SECONDS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(alias = "ALLOWED_PATHS")]
    pub allowed_roots: Vec<PathBuf>,
    #[serde(default, alias = "EXCLUDE_PATHS")]
    pub excluded_roots: Vec<PathBuf>,
    #[serde(default = "default_hide_hidden", alias = "HIDE_HIDDEN_FILES")]
    pub hide_hidden: bool,
    /// Default wall-clock budget for one traversal or search call. Negative means unlimited.
    #[serde(default = "default_time_limit_seconds", alias = "DEFAULT_TIME_LIMIT")]
    pub time_limit_seconds: f64,
    #[serde(default, alias = "PATH_MASKER")]
    pub masker: MaskerRules,
    #[serde(default)]
    pub limits: Limits,
    /// Transport bind address. Read and kept so full server configs load; unused here.
    #[serde(default, alias = "HOST", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, alias = "PORT", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

fn validate_usize_limit(value: usize, field: &str, hard_cap: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidPolicy(format!("{field} must be > 0")));
    }
    if value > hard_cap {
        return Err(Error::InvalidPolicy(format!(
            "{field} must be <= {hard_cap}"
        )));
    }
    Ok(())
}

fn contains_separator(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

impl PolicyConfig {
    pub fn single_root(path: impl Into<PathBuf>) -> Self {
        Self {
            allowed_roots: vec![path.into()],
            excluded_roots: Vec::new(),
            hide_hidden: default_hide_hidden(),
            time_limit_seconds: default_time_limit_seconds(),
            masker: MaskerRules::default(),
            limits: Limits::default(),
            host: None,
            port: None,
        }
    }

    /// Structural validation only: no filesystem IO happens here.
    ///
    /// Root existence checks and canonicalization happen in `ops::Context::new`.
    pub fn validate(&self) -> Result<()> {
        if self.allowed_roots.is_empty() {
            return Err(Error::InvalidPolicy("allowed_roots is empty".to_string()));
        }
        for (field, paths) in [
            ("allowed_roots", &self.allowed_roots),
            ("excluded_roots", &self.excluded_roots),
        ] {
            for path in paths {
                if path.as_os_str().is_empty() {
                    return Err(Error::InvalidPolicy(format!("{field} contains an empty path")));
                }
                if !path.is_absolute() {
                    return Err(Error::InvalidPolicy(format!(
                        "{field} entries must be absolute (got {})",
                        path.display()
                    )));
                }
            }
        }
        if !self.time_limit_seconds.is_finite() {
            return Err(Error::InvalidPolicy(
                "time_limit_seconds must be a finite number".to_string(),
            ));
        }

        if self.limits.max_read_bytes == 0 {
            return Err(Error::InvalidPolicy(
                "limits.max_read_bytes must be > 0".to_string(),
            ));
        }
        if self.limits.max_read_bytes > MAX_READ_BYTES_HARD_CAP {
            return Err(Error::InvalidPolicy(format!(
                "limits.max_read_bytes must be <= {MAX_READ_BYTES_HARD_CAP}"
            )));
        }
        validate_usize_limit(
            self.limits.max_line_bytes,
            "limits.max_line_bytes",
            MAX_LINE_BYTES_HARD_CAP,
        )?;
        validate_usize_limit(
            self.limits.max_page_size,
            "limits.max_page_size",
            MAX_PAGE_SIZE_HARD_CAP,
        )?;
        if self.limits.max_context_lines > MAX_CONTEXT_LINES_HARD_CAP {
            return Err(Error::InvalidPolicy(format!(
                "limits.max_context_lines must be <= {MAX_CONTEXT_LINES_HARD_CAP}"
            )));
        }

        self.validate_masker()
    }

    fn validate_masker(&self) -> Result<()> {
        let masker = &self.masker;
        if masker.mask_token.trim().is_empty() {
            return Err(Error::InvalidPolicy(
                "masker.mask_token must not be empty".to_string(),
            ));
        }
        if masker.mask_token.len() > MAX_MASK_TOKEN_BYTES {
            return Err(Error::InvalidPolicy(format!(
                "masker.mask_token is too long (max {MAX_MASK_TOKEN_BYTES} bytes)"
            )));
        }
        if contains_separator(&masker.mask_token) {
            return Err(Error::InvalidPolicy(
                "masker.mask_token must not contain path separators".to_string(),
            ));
        }
        for segment in &masker.look_for {
            if segment.is_empty() {
                return Err(Error::InvalidPolicy(
                    "masker.look_for must not contain empty segments".to_string(),
                ));
            }
            if contains_separator(segment) {
                return Err(Error::InvalidPolicy(format!(
                    "masker.look_for entries are single path segments (got {segment:?})"
                )));
            }
        }
        Ok(())
    }
}
