use regex::{Regex, RegexSet};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

const MAX_PATTERN_BYTES: usize = 8 * 1024;

fn check_pattern_size(pattern: &str) -> Result<()> {
    if pattern.len() > MAX_PATTERN_BYTES {
        return Err(Error::InvalidPattern {
            pattern: pattern.chars().take(64).collect(),
            message: format!("pattern is too large (max {MAX_PATTERN_BYTES} bytes)"),
        });
    }
    Ok(())
}

pub(super) fn compile_pattern(pattern: &str) -> Result<Regex> {
    check_pattern_size(pattern)?;
    Regex::new(pattern).map_err(|err| Error::invalid_pattern(pattern, err))
}

/// Regular expressions matched as a group: a haystack matches when ANY member matches.
#[derive(Debug, Clone)]
pub(super) struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    pub(super) fn compile(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: String::new(),
                message: "at least one pattern is required".to_string(),
            });
        }
        for pattern in patterns {
            check_pattern_size(pattern)?;
        }
        let set = RegexSet::new(patterns).map_err(|set_err| {
            // Name the offending member rather than the whole set.
            patterns
                .iter()
                .find_map(|pattern| Regex::new(pattern).err().map(|err| (pattern, err)))
                .map_or_else(
                    || Error::InvalidPattern {
                        pattern: patterns.join(", "),
                        message: set_err.to_string(),
                    },
                    |(pattern, err)| Error::invalid_pattern(pattern.as_str(), err),
                )
        })?;
        Ok(Self { set })
    }

    /// Like [`PatternSet::compile`], but empty entries are dropped and an empty list is `None`.
    pub(super) fn compile_optional(patterns: &[String]) -> Result<Option<Self>> {
        let patterns = patterns
            .iter()
            .filter(|pattern| !pattern.is_empty())
            .cloned()
            .collect::<Vec<_>>();
        if patterns.is_empty() {
            return Ok(None);
        }
        Self::compile(&patterns).map(Some)
    }

    pub(super) fn is_match(&self, haystack: &str) -> bool {
        self.set.is_match(haystack)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accepts either a single string or a list of strings.
pub(super) fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
