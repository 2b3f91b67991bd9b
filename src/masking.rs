//! Path masking applied to every path that leaves the crate.
//!
//! Masking is purely textual and never touches the filesystem. Internal containment checks
//! always run on real paths; the masker only sees finished response values.
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::policy::{MaskMode, MaskerRules};

#[cfg(windows)]
const SEPARATOR: &str = "\\";
#[cfg(not(windows))]
const SEPARATOR: &str = "/";

#[inline]
fn is_separator(ch: char) -> bool {
    ch == '/' || (cfg!(windows) && ch == '\\')
}

#[derive(Debug, Clone)]
pub struct PathMasker {
    enabled: bool,
    mode: MaskMode,
    token: String,
    look_for: HashSet<String>,
    // `look_for` in configuration order; unmasking is only unambiguous with a single entry.
    ordered: Vec<String>,
}

impl PathMasker {
    pub fn from_rules(rules: &MaskerRules) -> Result<Self> {
        let mut ordered = Vec::<String>::with_capacity(rules.look_for.len());
        let mut look_for = HashSet::<String>::with_capacity(rules.look_for.len());
        for segment in &rules.look_for {
            if look_for.insert(segment.clone()) {
                ordered.push(segment.clone());
            }
        }
        Ok(Self {
            enabled: rules.enabled && !look_for.is_empty(),
            mode: rules.mode,
            token: rules.mask_token.clone(),
            look_for,
            ordered,
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            mode: MaskMode::default(),
            token: String::new(),
            look_for: HashSet::new(),
            ordered: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> MaskMode {
        self.mode
    }

    pub fn mask<'a>(&self, path: &'a str) -> Cow<'a, str> {
        if !self.enabled {
            return Cow::Borrowed(path);
        }
        match self.mode {
            MaskMode::Segment => self.mask_segments(path),
            MaskMode::Prefix => self.mask_prefix(path),
        }
    }

    pub fn mask_path(&self, path: &Path) -> String {
        let raw = path.to_string_lossy();
        self.mask(raw.as_ref()).into_owned()
    }

    /// Masks a single entry name. Both modes replace a name equal to a `look_for` entry.
    pub fn mask_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.enabled && self.look_for.contains(name) {
            Cow::Owned(self.token.clone())
        } else {
            Cow::Borrowed(name)
        }
    }

    /// Best-effort inverse of [`PathMasker::mask`] for caller-supplied input paths.
    ///
    /// Only `segment` mode with exactly one `look_for` entry can be inverted; any other
    /// configuration returns the input unchanged.
    pub fn unmask<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !self.enabled || self.mode != MaskMode::Segment || self.ordered.len() != 1 {
            return Cow::Borrowed(input);
        }
        if !input.split(is_separator).any(|segment| segment == self.token) {
            return Cow::Borrowed(input);
        }
        let original = self.ordered[0].as_str();
        let parts = input
            .split(is_separator)
            .map(|segment| {
                if segment == self.token {
                    original
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>();
        Cow::Owned(parts.join(SEPARATOR))
    }

    fn mask_segments<'a>(&self, path: &'a str) -> Cow<'a, str> {
        if !path
            .split(is_separator)
            .any(|segment| self.look_for.contains(segment))
        {
            return Cow::Borrowed(path);
        }
        let parts = path
            .split(is_separator)
            .map(|segment| {
                if self.look_for.contains(segment) {
                    self.token.as_str()
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>();
        Cow::Owned(parts.join(SEPARATOR))
    }

    fn mask_prefix<'a>(&self, path: &'a str) -> Cow<'a, str> {
        let parts = path.split(is_separator).collect::<Vec<_>>();
        let Some(last_hit) = parts
            .iter()
            .rposition(|segment| self.look_for.contains(*segment))
        else {
            return Cow::Borrowed(path);
        };
        let mut out = self.token.clone();
        for segment in &parts[last_hit + 1..] {
            out.push_str(SEPARATOR);
            out.push_str(segment);
        }
        Cow::Owned(out)
    }
}
