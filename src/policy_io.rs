use std::io::Read;
use std::path::Path;

use crate::{Error, PolicyConfig, Result};

const DEFAULT_MAX_POLICY_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Toml,
    Json,
}

impl PolicyFormat {
    /// `.json` => JSON, `.toml` or no extension => TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") | None => Ok(Self::Toml),
            Some(other) => Err(Error::InvalidPolicy(format!(
                "unsupported policy format {other:?}; expected .toml or .json"
            ))),
        }
    }
}

pub fn parse_policy(raw: &str, format: PolicyFormat) -> Result<PolicyConfig> {
    match format {
        PolicyFormat::Json => serde_json::from_str(raw)
            .map_err(|err| Error::InvalidPolicy(format!("invalid json policy: {err}"))),
        PolicyFormat::Toml => toml::from_str(raw)
            .map_err(|err| Error::InvalidPolicy(format!("invalid toml policy: {err}"))),
    }
}

pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    load_policy_limited(path, DEFAULT_MAX_POLICY_BYTES)
}

/// Load and validate a policy file from disk with a byte limit.
///
/// Symlinks and non-regular files (FIFOs, sockets, device nodes) are refused.
pub fn load_policy_limited(path: impl AsRef<Path>, max_bytes: u64) -> Result<PolicyConfig> {
    if max_bytes == 0 {
        return Err(Error::InvalidPolicy(
            "max policy bytes must be > 0".to_string(),
        ));
    }

    let path = path.as_ref();
    let meta =
        std::fs::symlink_metadata(path).map_err(|err| Error::io_path("metadata", path, err))?;
    if meta.file_type().is_symlink() {
        return Err(Error::InvalidPath(format!(
            "path {} is a symlink; refusing to load policy from symlink paths",
            path.display()
        )));
    }
    if !meta.is_file() {
        return Err(Error::NotARegularFile(path.to_path_buf()));
    }
    let format = PolicyFormat::from_path(path)?;

    let limit = max_bytes.saturating_add(1);
    let mut bytes = Vec::<u8>::new();
    std::fs::File::open(path)
        .map_err(|err| Error::io_path("open", path, err))?
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io_path("read", path, err))?;

    if bytes.len() as u64 > max_bytes {
        return Err(Error::InputTooLarge {
            size_bytes: bytes.len() as u64,
            max_bytes,
        });
    }

    let raw =
        std::str::from_utf8(&bytes).map_err(|_| Error::InvalidEncoding(path.to_path_buf()))?;
    let policy = parse_policy(raw, format)?;
    policy.validate()?;
    Ok(policy)
}
