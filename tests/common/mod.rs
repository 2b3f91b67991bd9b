#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use scoped_fs_search::{Context, MaskMode, PolicyConfig};

pub fn test_policy(root: &Path) -> PolicyConfig {
    PolicyConfig::single_root(root)
}

pub fn test_context(root: &Path) -> Context {
    Context::new(test_policy(root)).expect("ctx")
}

pub fn masked_policy(root: &Path, mode: MaskMode, look_for: &[&str]) -> PolicyConfig {
    let mut policy = test_policy(root);
    policy.masker.enabled = true;
    policy.masker.mode = mode;
    policy.masker.look_for = look_for.iter().map(|segment| segment.to_string()).collect();
    policy
}

/// Writes `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(&path, contents).expect("write");
}

/// A minimal `.docx` containing `document_xml` as `word/document.xml`.
pub fn docx_bytes(document_xml: &str) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer
            .start_file("[Content_Types].xml", options)
            .expect("start content types");
        writer
            .write_all(br#"<?xml version="1.0"?><Types/>"#)
            .expect("write content types");
        writer
            .start_file("word/document.xml", options)
            .expect("start document");
        writer
            .write_all(document_xml.as_bytes())
            .expect("write document");
        writer.finish().expect("finish zip");
    }
    cursor.into_inner()
}

/// Wraps paragraphs of plain text in a WordprocessingML body.
pub fn docx_paragraphs(paragraphs: &[&str]) -> String {
    let body = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect::<String>();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

pub fn names(items: &[scoped_fs_search::EntryInfo]) -> Vec<&str> {
    items.iter().map(|item| item.path.as_str()).collect()
}

#[cfg(unix)]
pub fn create_fifo(path: &Path) {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).expect("fifo path");
    // Safety: `c_path` is NUL-terminated and outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    assert_eq!(rc, 0, "mkfifo {}: {}", path.display(), std::io::Error::last_os_error());
}
