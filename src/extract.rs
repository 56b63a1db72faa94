//! Multi-format text extraction (PDF, OOXML, plain text).
//!
//! Dispatch is by file extension. [`extract_text`] never fails: an unreadable
//! file, a corrupt document, or an unsupported extension all yield an empty
//! string, which the grouper treats as "no signal". [`try_extract_text`]
//! exposes the reason for callers that want to report it.
//!
//! A panic inside the PDF parser is caught and reported as
//! [`ExtractError::Pdf`]. The process panic hook still runs first; the CLI
//! swaps it in JSON progress mode so stderr stays line-delimited JSON.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY: &str = "word/document.xml";
const PPTX_SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Document family selected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word,
    Presentation,
    PlainText,
}

impl DocumentFormat {
    /// Classify a path by its extension, case-insensitively.
    ///
    /// Returns `None` for extensions with no extraction rule.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let (_, ext) = name.rsplit_once('.')?;
        match ext {
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" => Some(Self::Word),
            "ppt" | "pptx" => Some(Self::Presentation),
            "txt" | "md" | "csv" | "json" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Why a single file produced no text.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Io(std::io::Error),
    Pdf(String),
    Ooxml(String),
    Encoding(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(name) => {
                write!(f, "unsupported file type: {}", name)
            }
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
            ExtractError::Encoding(e) => write!(f, "not valid UTF-8: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

/// Extract plain text from `path`, returning an empty string on any failure.
pub fn extract_text(path: &Path) -> String {
    try_extract_text(path).unwrap_or_default()
}

/// Extract plain text from `path`, reporting why extraction failed.
pub fn try_extract_text(path: &Path) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        ExtractError::UnsupportedExtension(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
        )
    })?;
    let bytes = std::fs::read(path)?;
    match format {
        DocumentFormat::Pdf => extract_pdf(&bytes),
        DocumentFormat::Word => extract_docx(&bytes),
        DocumentFormat::Presentation => extract_pptx(&bytes),
        DocumentFormat::PlainText => {
            String::from_utf8(bytes).map_err(|e| ExtractError::Encoding(e.to_string()))
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join(" "))
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, DOCX_BODY, MAX_XML_ENTRY_BYTES)?;
    Ok(docx_paragraphs(&xml)?.join(" "))
}

/// Body paragraphs of a `word/document.xml`, in document order.
///
/// Paragraphs inside tables and text inside drawings are not body text.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut paragraphs = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut table_depth = 0usize;
    let mut skip_depth = 0usize;
    let mut para_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"drawing" | b"pict" => skip_depth += 1,
                b"p" if skip_depth == 0 => {
                    para_depth += 1;
                    if para_depth == 1 && table_depth == 0 {
                        current = Some(String::new());
                    }
                }
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let collecting = skip_depth == 0 && para_depth == 1 && run_depth > 0;
                match (e.local_name().as_ref(), current.as_mut()) {
                    (b"p", _) if skip_depth == 0 && para_depth == 0 && table_depth == 0 => {
                        paragraphs.push(String::new());
                    }
                    (b"tab", Some(text)) if collecting => text.push('\t'),
                    (b"br" | b"cr", Some(text)) if collecting => text.push('\n'),
                    _ => {}
                }
            }
            Ok(Event::Text(te)) => {
                if in_text && skip_depth == 0 && para_depth == 1 {
                    if let Some(text) = current.as_mut() {
                        let unescaped = te
                            .unescape()
                            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"drawing" | b"pict" => skip_depth = skip_depth.saturating_sub(1),
                b"p" if skip_depth == 0 => {
                    if para_depth == 1 {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                    para_depth = para_depth.saturating_sub(1);
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(PPTX_SLIDE_PREFIX) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches(PPTX_SLIDE_PREFIX)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut texts = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        texts.extend(slide_shape_texts(&xml)?);
    }
    Ok(texts.join(" "))
}

/// Text of every top-level shape with a text body on one slide.
///
/// A shape's paragraphs are joined with `\n`. Shapes inside group shapes
/// are skipped, as are pictures, connectors and graphic frames.
fn slide_shape_texts(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut texts = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut group_depth = 0usize;
    let mut in_shape = false;
    let mut in_text = false;
    let mut paragraphs: Option<Vec<String>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"grpSp" => group_depth += 1,
                b"sp" if group_depth == 0 => in_shape = true,
                b"txBody" if in_shape => paragraphs = Some(Vec::new()),
                b"p" => {
                    if let Some(paras) = paragraphs.as_mut() {
                        paras.push(String::new());
                    }
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if let Some(paras) = paragraphs.as_mut() {
                    match e.local_name().as_ref() {
                        b"p" => paras.push(String::new()),
                        b"br" => {
                            if let Some(last) = paras.last_mut() {
                                last.push('\n');
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(te)) if in_text => {
                if let Some(last) = paragraphs.as_mut().and_then(|p| p.last_mut()) {
                    let unescaped = te
                        .unescape()
                        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    last.push_str(&unescaped);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"grpSp" => group_depth = group_depth.saturating_sub(1),
                b"sp" if group_depth == 0 => {
                    if let Some(paras) = paragraphs.take() {
                        texts.push(paras.join("\n"));
                    }
                    in_shape = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(texts)
}
