use std::borrow::Cow;
use std::io::{Cursor, Read};

use super::{DocumentFormat, ExtractError, TextExtractor};

const DOCUMENT_PART: &str = "word/document.xml";
const DEFAULT_MAX_XML_BYTES: u64 = 64 * 1024 * 1024;

/// Flattens `word/document.xml` into text: one line per paragraph, tables rendered as
/// `<table>`, one `a | b` line per row, `</table>`.
#[derive(Debug, Clone)]
pub struct DocxExtractor {
    max_xml_bytes: u64,
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self {
            max_xml_bytes: DEFAULT_MAX_XML_BYTES,
        }
    }
}

impl DocxExtractor {
    /// Caps the decompressed size of the document body.
    pub fn with_max_xml_bytes(max_xml_bytes: u64) -> Self {
        Self { max_xml_bytes }
    }
}

impl TextExtractor for DocxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| ExtractError::new(format!("not a docx container: {err}")))?;
        let part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|err| ExtractError::new(format!("missing {DOCUMENT_PART}: {err}")))?;

        let mut raw = Vec::<u8>::new();
        part.take(self.max_xml_bytes.saturating_add(1))
            .read_to_end(&mut raw)
            .map_err(|err| ExtractError::new(format!("failed to inflate {DOCUMENT_PART}: {err}")))?;
        if u64::try_from(raw.len()).unwrap_or(u64::MAX) > self.max_xml_bytes {
            return Err(ExtractError::new(format!(
                "{DOCUMENT_PART} exceeds {} bytes",
                self.max_xml_bytes
            )));
        }
        let xml = String::from_utf8(raw)
            .map_err(|_| ExtractError::new(format!("{DOCUMENT_PART} is not valid utf-8")))?;
        Ok(vec![render_document_xml(&xml)])
    }
}

struct Tag<'a> {
    name: &'a str,
    closing: bool,
    self_closing: bool,
}

fn parse_tag(raw: &str) -> Option<Tag<'_>> {
    if raw.starts_with('?') || raw.starts_with('!') {
        return None;
    }
    let (closing, body) = match raw.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, raw),
    };
    let self_closing = body.ends_with('/');
    let name = body
        .trim_end_matches('/')
        .split(char::is_whitespace)
        .next()
        .filter(|name| !name.is_empty())?;
    Some(Tag {
        name,
        closing,
        self_closing,
    })
}

#[derive(Debug, Default)]
struct TableState {
    row: Vec<String>,
    cell: String,
}

#[derive(Debug, Default)]
struct DocumentText {
    lines: Vec<String>,
    paragraph: String,
    // `w:tab` also appears in paragraph properties as a tab-stop definition.
    in_run: bool,
    in_text: bool,
    tables: Vec<TableState>,
}

impl DocumentText {
    /// Sends a finished line to the table cell `depth` levels deep, or to the body at 0.
    fn emit(&mut self, depth: usize, line: String) {
        match depth.checked_sub(1).and_then(|index| self.tables.get_mut(index)) {
            Some(table) => {
                if !table.cell.is_empty() && !line.is_empty() {
                    table.cell.push(' ');
                }
                table.cell.push_str(&line);
            }
            None => self.lines.push(line),
        }
    }

    fn on_tag(&mut self, tag: Tag<'_>) {
        match (tag.name, tag.closing, tag.self_closing) {
            ("w:p", false, false) => self.paragraph.clear(),
            ("w:p", false, true) => self.emit(self.tables.len(), String::new()),
            ("w:p", true, _) => {
                let paragraph = std::mem::take(&mut self.paragraph);
                self.emit(self.tables.len(), paragraph);
            }
            ("w:t", false, false) => self.in_text = true,
            ("w:t", true, _) => self.in_text = false,
            ("w:r", false, false) => self.in_run = true,
            ("w:r", true, _) => self.in_run = false,
            ("w:tab", false, _) if self.in_run => self.paragraph.push('\t'),
            ("w:br" | "w:cr", false, _) if self.in_run => self.paragraph.push('\n'),
            ("w:tbl", false, false) => {
                self.emit(self.tables.len(), "<table>".to_string());
                self.tables.push(TableState::default());
            }
            ("w:tbl", true, _) => {
                if self.tables.pop().is_some() {
                    self.emit(self.tables.len(), "</table>".to_string());
                }
            }
            ("w:tc", false, false) => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell.clear();
                }
            }
            ("w:tc", true, _) => {
                if let Some(table) = self.tables.last_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            ("w:tr", true, _) => {
                let Some(table) = self.tables.last_mut() else {
                    return;
                };
                let row = std::mem::take(&mut table.row).join(" | ");
                let depth = self.tables.len() - 1;
                self.emit(depth, row);
            }
            _ => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        if self.in_text {
            self.paragraph.push_str(&unescape_xml(text));
        }
    }

    fn on_cdata(&mut self, text: &str) {
        if self.in_text {
            self.paragraph.push_str(text);
        }
    }
}

/// Index of the `>` closing a tag body, ignoring any inside quoted attribute values.
fn tag_end(body: &str) -> Option<usize> {
    let mut quote = None;
    for (index, byte) in body.bytes().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(open), _) if byte == open => quote = None,
            (None, b'>') => return Some(index),
            _ => {}
        }
    }
    None
}

fn render_document_xml(xml: &str) -> String {
    const CDATA_OPEN: &str = "![CDATA[";
    const COMMENT_OPEN: &str = "!--";

    let mut doc = DocumentText::default();
    let mut rest = xml;
    while let Some(open) = rest.find('<') {
        doc.on_text(&rest[..open]);
        let after = &rest[open + 1..];
        if let Some(cdata) = after.strip_prefix(CDATA_OPEN) {
            let Some(close) = cdata.find("]]>") else {
                break;
            };
            doc.on_cdata(&cdata[..close]);
            rest = &cdata[close + 3..];
            continue;
        }
        if let Some(comment) = after.strip_prefix(COMMENT_OPEN) {
            let Some(close) = comment.find("-->") else {
                break;
            };
            rest = &comment[close + 3..];
            continue;
        }
        let Some(close) = tag_end(after) else {
            break;
        };
        if let Some(tag) = parse_tag(&after[..close]) {
            doc.on_tag(tag);
        }
        rest = &after[close + 1..];
    }
    doc.lines.join("\n")
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn unescape_xml(text: &str) -> Cow<'_, str> {
    const MAX_ENTITY_LEN: usize = 10;

    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= MAX_ENTITY_LEN)
            .and_then(|semi| decode_entity(&after[..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
