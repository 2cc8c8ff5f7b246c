//! Text extraction for attached documents (.txt, .pdf, .docx).
//!
//! [`extract`] never fails: decode errors and unsupported types come back as a readable
//! message that is folded into the user's turn like any other text. [`try_extract`] keeps
//! the structured error for callers that want it.

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;

pub const PLAIN_TEXT: &str = "text/plain";
pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MSWORD: &str = "application/msword";

/// Extensions the upload control accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["txt", "pdf", "docx"];

pub const EMPTY_PDF_TEXT: &str = "No extractable text found in PDF.";
pub const TRUNCATION_MARKER: &str = "\n...[truncated]...";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("{0}")]
    Pdf(String),
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("{0}")]
    Xml(#[from] quick_xml::Error),
    #[error("unsupported file extension: {0:?} (accepted: .txt, .pdf, .docx)")]
    UnsupportedExtension(String),
}

/// Decoder chosen for an upload from its declared type and file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
    WordDocument,
    Unsupported,
}

impl MediaType {
    /// Declared type wins; a `.docx` file name also selects the word decoder.
    pub fn classify(declared: &str, filename: &str) -> Self {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            PLAIN_TEXT => MediaType::PlainText,
            PDF => MediaType::Pdf,
            DOCX | MSWORD => MediaType::WordDocument,
            _ if filename.to_lowercase().ends_with(".docx") => MediaType::WordDocument,
            _ => MediaType::Unsupported,
        }
    }
}

/// Declared media type for one of the accepted extensions.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some(PLAIN_TEXT),
        "pdf" => Some(PDF),
        "docx" => Some(DOCX),
        _ => None,
    }
}

/// Extract plain text, or a diagnostic message when the file cannot be read.
pub fn extract(bytes: &[u8], media_type: &str, filename: &str) -> String {
    match try_extract(bytes, media_type, filename) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("extracting {} failed: {}", filename, e);
            format!("Error reading file: {}", e)
        }
    }
}

/// Like [`extract`] but keeps decode failures as errors. Unsupported types are still
/// answered with a message, not an error.
pub fn try_extract(bytes: &[u8], media_type: &str, filename: &str) -> Result<String, ExtractError> {
    match MediaType::classify(media_type, filename) {
        MediaType::PlainText => Ok(String::from_utf8(bytes.to_vec())?),
        MediaType::Pdf => pdf_pages(bytes).map(join_pdf_pages),
        MediaType::WordDocument => docx_paragraphs(bytes).map(|p| p.join("\n")),
        MediaType::Unsupported => Ok(format!(
            "File type {} is not supported. Please upload a .txt, .pdf, or .docx file.",
            media_type
        )),
    }
}

fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some malformed documents.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(pages) => pages.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("pdf decoder panicked".to_string())),
    }
}

/// Each page with text, newline-terminated, in page order.
fn join_pdf_pages(pages: Vec<String>) -> String {
    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.trim().is_empty()) {
        text.push_str(page);
        text.push('\n');
    }
    if text.is_empty() {
        EMPTY_PDF_TEXT.to_string()
    } else {
        text
    }
}

/// Elements whose whole subtree is left out: tables, text boxes, and the alternate
/// renderings Word stores for drawings (each text box appears in both `mc:Choice` and
/// `mc:Fallback`).
const SKIPPED_SUBTREES: [&[u8]; 3] = [b"tbl", b"txbxContent", b"AlternateContent"];

fn is_skipped(local_name: &[u8]) -> bool {
    SKIPPED_SUBTREES.contains(&local_name)
}

/// Body paragraphs of `word/document.xml`, in document order. A paragraph's text comes
/// from its own runs only; tabs and line breaks inside runs are kept.
fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut skip_depth = 0usize;
    let mut in_para = false;
    let mut in_run = false;
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if is_skipped(e.local_name().as_ref()) => skip_depth += 1,
            Event::End(e) if is_skipped(e.local_name().as_ref()) => {
                skip_depth = skip_depth.saturating_sub(1)
            }
            Event::Eof => break,
            _ if skip_depth > 0 => {}
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    current.clear();
                    in_para = true;
                }
                b"r" => in_run = true,
                b"t" => in_text = in_run,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if !in_para => paragraphs.push(String::new()),
                b"tab" if in_run && in_para => current.push('\t'),
                b"br" | b"cr" if in_run && in_para => current.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" if in_para => {
                    in_para = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text && in_para => current.push_str(&t.unescape()?),
            _ => {}
        }
    }
    Ok(paragraphs)
}

/// Cut `text` to `max_chars` characters, marking the cut. Shorter text is returned as is.
pub fn truncate_for_message(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

/// One uploaded file: name, declared media type, raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

/// Name, size and type of an attachment, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSummary {
    pub name: String,
    pub size: usize,
    pub media_type: String,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a .txt, .pdf or .docx file from disk; other extensions are refused.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let media_type = media_type_for_path(path).ok_or_else(|| {
            ExtractError::UnsupportedExtension(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::debug!("attached {} ({} bytes, {})", name, bytes.len(), media_type);
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extract(&self) -> String {
        extract(&self.bytes, &self.media_type, &self.name)
    }

    pub fn summary(&self) -> AttachmentSummary {
        AttachmentSummary {
            name: self.name.clone(),
            size: self.bytes.len(),
            media_type: self.media_type.clone(),
        }
    }
}
