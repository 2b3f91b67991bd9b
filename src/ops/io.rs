use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

#[cfg(unix)]
fn is_symlink_open_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::ELOOP)
}

#[cfg(not(unix))]
fn is_symlink_open_error(_err: &std::io::Error) -> bool {
    false
}

// O_NONBLOCK keeps a FIFO that replaced a resolved file from blocking the open.
#[cfg(unix)]
fn open_readonly_nofollow(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = fs::OpenOptions::new();
    options
        .read(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK);
    options.open(path)
}

#[cfg(windows)]
fn open_readonly_nofollow(path: &Path) -> std::io::Result<fs::File> {
    use std::os::windows::fs::OpenOptionsExt;
    use windows_sys::Win32::Storage::FileSystem::FILE_FLAG_OPEN_REPARSE_POINT;

    let mut options = fs::OpenOptions::new();
    options
        .read(true)
        .custom_flags(FILE_FLAG_OPEN_REPARSE_POINT);
    options.open(path)
}

#[cfg(all(not(unix), not(windows)))]
fn open_readonly_nofollow(path: &Path) -> std::io::Result<fs::File> {
    fs::File::open(path)
}

/// Opens a resolved path without following a final symlink and checks it is a regular file.
///
/// `shown` is the caller-facing (masked, root-relative) spelling used in errors.
pub(super) fn open_regular_file_for_read(
    path: &Path,
    shown: &Path,
) -> Result<(fs::File, fs::Metadata)> {
    let file = open_readonly_nofollow(path).map_err(|err| {
        if is_symlink_open_error(&err) {
            return Error::InvalidPath(format!("path {} is a symlink", shown.display()));
        }
        Error::io_path("open", shown, err)
    })?;
    let meta = file
        .metadata()
        .map_err(|err| Error::io_path("metadata", shown, err))?;
    if !meta.is_file() {
        return Err(Error::NotARegularFile(shown.to_path_buf()));
    }
    Ok((file, meta))
}

fn file_too_large(shown: &Path, size_bytes: u64, max_bytes: u64) -> Error {
    Error::FileTooLarge {
        path: shown.to_path_buf(),
        size_bytes,
        max_bytes,
    }
}

/// Reads at most `max_bytes`; larger files fail with `FileTooLarge` instead of truncating.
pub(super) fn read_bytes_limited(path: &Path, shown: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let (file, meta) = open_regular_file_for_read(path, shown)?;
    if meta.len() > max_bytes {
        return Err(file_too_large(shown, meta.len(), max_bytes));
    }

    let limit = max_bytes.saturating_add(1);
    let mut bytes = Vec::<u8>::with_capacity(usize::try_from(meta.len()).unwrap_or(0));
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io_path("read", shown, err))?;
    let read_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if read_size > max_bytes {
        return Err(file_too_large(shown, read_size, max_bytes));
    }
    Ok(bytes)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn read_bytes_limited_rejects_oversized_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 32]).expect("write");

        let err = read_bytes_limited(&path, Path::new("big.txt"), 16).expect_err("too large");
        assert_eq!(err.code(), "file_too_large");
        let bytes = read_bytes_limited(&path, Path::new("big.txt"), 32).expect("read");
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("target.txt");
        std::fs::write(&target, "x").expect("write");
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let err = open_regular_file_for_read(&link, Path::new("link.txt")).expect_err("symlink");
        assert_eq!(err.code(), "invalid_path");
    }

    #[test]
    fn directories_are_not_regular_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = open_regular_file_for_read(dir.path(), Path::new(".")).expect_err("dir");
        assert_eq!(err.code(), "not_a_regular_file");
    }
}
